//! Template model, compilation, and expression evaluation.
//!
//! Templates are trees of [`Node`]s built with [`Template`]'s builder
//! methods. A render pass compiles the requested template into a
//! [`Body`](spool_stream::Body), a closure that writes into a
//! [`Chunk`](spool_stream::Chunk) and resolves helpers and partials through
//! the renderer's registries.
//!
//! Inline [`Node::Expr`] nodes are evaluated by a [`TemplateEngine`],
//! [`MiniJinjaEngine`] by default.

mod compile;
mod engine;
mod node;

pub(crate) use compile::{compile, Environment};
pub use engine::{register_filters, MiniJinjaEngine, TemplateEngine};
pub use node::{display_value, is_truthy, Node, Param, Section, Template};
