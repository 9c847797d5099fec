//! # Spool Render - Streaming Template Renderer
//!
//! `spool-render` renders programmatically built templates into a
//! [`spool_stream`] render tree. Helpers can transform, nest, and fork
//! asynchronous work while the final output keeps template order. Plugins
//! hook into each stage of a render pass and can extend how data files are
//! loaded into the render context.
//!
//! ## Core Concepts
//!
//! - [`Template`]: Tree of nodes (text, markup, references, expressions,
//!   helper sections, partials, conditionals)
//! - [`Helper`]: Function invoked by a [`Section`] with the chunk, context,
//!   bodies and params
//! - [`Plugin`]: Extension notified at each [`LifecycleEvent`]
//! - [`Renderer`]: Owns templates, helpers, the [`DataRegistry`] and the
//!   [`PluginManager`]
//! - [`RenderConfig`]: Error policies and data directories
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use spool_render::{Renderer, Section, Template};
//!
//! let mut renderer = Renderer::new();
//! renderer.add_template(
//!     "greeting",
//!     Template::new()
//!         .text("Hello, ")
//!         .section(Section::new("upper").block(Template::new().reference("name")))
//!         .markup("<br>"),
//! );
//!
//! let output = renderer.render("greeting", &json!({"name": "bob"})).unwrap();
//! assert_eq!(output, "Hello, BOB<br>");
//! ```
//!
//! ## Asynchronous Helpers
//!
//! A helper that needs to wait forks a branch with
//! [`Chunk::map`](spool_stream::Chunk::map) and returns immediately. The
//! template keeps executing after the branch; the branch's output still
//! lands at the helper's position.
//!
//! ```rust
//! use serde_json::json;
//! use spool_render::{HelperOutput, Renderer, Section, Template};
//!
//! let mut renderer = Renderer::new();
//! renderer.add_helper("later", |chunk, _ctx, _bodies, _params| {
//!     chunk.map(|mut branch| async move {
//!         branch.write("(fetched)")?;
//!         branch.end()
//!     })?;
//!     Ok(HelperOutput::Chunk)
//! });
//! renderer.add_template(
//!     "page",
//!     Template::new().text("a ").section(Section::new("later")).text(" b"),
//! );
//!
//! assert_eq!(renderer.render("page", &json!({})).unwrap(), "a (fetched) b");
//! ```

mod config;
mod error;
pub mod helper;
pub mod plugin;
pub mod prelude;
mod renderer;
pub mod template;

pub use config::{HelperErrorPolicy, PluginErrorPolicy, RenderConfig};
pub use error::{EngineError, RenderError, RenderStage, TemplateRenderError};
pub use helper::{Bodies, Helper, HelperOutput, Params};
pub use plugin::{
    EventSet, HandlerPlugin, LifecycleEvent, Plugin, PluginError, PluginHost, PluginManager,
    PluginState, RenderState,
};
pub use renderer::Renderer;
pub use template::{MiniJinjaEngine, Node, Param, Section, Template, TemplateEngine};

// Re-exports from the stream and data crates
pub use spool_data::{DataError, DataFile, DataRegistry, ExtensionHandler, STORE_AS_KEY};
pub use spool_stream::{
    Body, Chunk, Context, Fragment, OutputSink, StreamError, StringSink, WriterSink,
};
