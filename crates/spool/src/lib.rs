//! # Spool - Streaming Template Rendering
//!
//! Spool renders templates into an ordered chain of output chunks. Helpers
//! can transform what they write, render nested bodies, and fork
//! asynchronous branches; output still reaches the sink in template order,
//! whichever branch finishes first.
//!
//! Around the renderer sit two extension points:
//!
//! - Plugins receive a fixed sequence of [`LifecycleEvent`]s on every render
//!   pass, in the order they were attached
//! - Data extension handlers teach the [`DataRegistry`] how to turn files of a
//!   given extension into context data
//!
//! ## Crates
//!
//! | Crate | Contents |
//! |-------|----------|
//! | [`stream`] | Chunks, transform stacks, the render tree, layered context |
//! | [`data`] | Extension handlers and data directory loading |
//! | `spool-render` | Templates, helpers, plugins, and the [`Renderer`] |
//!
//! ## Quick Start
//!
//! ```rust
//! use spool::prelude::*;
//!
//! let mut renderer = Renderer::new();
//! renderer.add_template(
//!     "report",
//!     Template::new()
//!         .text("Report for ")
//!         .reference("owner")
//!         .section(
//!             Section::new("each")
//!                 .param_path("of", "items")
//!                 .block(Template::new().text("\n- ").reference("name")),
//!         ),
//! );
//!
//! let data = serde_json::json!({
//!     "owner": "bob",
//!     "items": [{"name": "alpha"}, {"name": "beta"}],
//! });
//! let output = renderer.render("report", &data).unwrap();
//! assert_eq!(output, "Report for bob\n- alpha\n- beta");
//! ```

pub use spool_data as data;
pub use spool_stream as stream;

pub use spool_render::{helper, plugin, template};

pub use spool_render::{
    Bodies, Helper, HelperErrorPolicy, HelperOutput, Params, PluginErrorPolicy, RenderConfig,
    RenderError, RenderStage, Renderer, TemplateRenderError,
};
pub use spool_render::{
    EventSet, HandlerPlugin, LifecycleEvent, Plugin, PluginError, PluginHost, PluginManager,
    PluginState, RenderState,
};
pub use spool_render::{EngineError, MiniJinjaEngine, Node, Param, Section, Template, TemplateEngine};

pub use spool_data::{DataError, DataFile, DataRegistry, ExtensionHandler, STORE_AS_KEY};
pub use spool_stream::{
    Body, Chunk, ChunkId, Context, Fragment, OutputSink, RenderTree, StreamError, StringSink,
    Transform, TransformStack, WriterSink,
};

pub mod prelude {
    //! Everything needed to build templates, helpers and plugins.
    pub use spool_render::prelude::*;
    pub use spool_render::{HelperErrorPolicy, PluginErrorPolicy};
    pub use spool_stream::{OutputSink, StringSink, WriterSink};
}
