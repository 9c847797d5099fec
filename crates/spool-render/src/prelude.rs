//! Common imports for writing templates, helpers and plugins.
//!
//! ```rust
//! use spool_render::prelude::*;
//!
//! let mut renderer = Renderer::new();
//! renderer.add_template("hi", Template::new().text("hi"));
//! assert_eq!(renderer.render("hi", &()).unwrap(), "hi");
//! ```

pub use crate::{
    Bodies, Chunk, Context, HandlerPlugin, HelperOutput, LifecycleEvent, Params, Plugin,
    PluginError, PluginHost, RenderConfig, RenderError, RenderState, Renderer, Section,
    StreamError, Template,
};
