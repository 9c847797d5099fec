//! # Spool Stream - Ordered Asynchronous Output Chunks
//!
//! `spool-stream` is the output layer of the `spool` renderer. Templates and
//! helpers write into [`Chunk`]s; chunks form a forward-linked chain owned by
//! a [`RenderTree`], and the tree flushes the completed prefix of that chain
//! to an [`OutputSink`].
//!
//! ## Core Concepts
//!
//! - [`Chunk`]: write handle with `write`, `tap`/`untap`, `render`, `map`, `end`
//! - [`TransformStack`]: LIFO stack of taps applied innermost-first
//! - [`RenderTree`]: arena coordinator, drives asynchronous branches
//! - [`Context`]: layered, immutable view over JSON frames
//! - [`OutputSink`]: receives flushed [`Fragment`]s in document order
//!
//! ## Ordering
//!
//! Output reaches the sink in template order regardless of which
//! asynchronous branch completes first. A late branch delays everything
//! after it; it never reorders it.
//!
//! ```rust
//! use spool_stream::{RenderTree, StringSink};
//!
//! let sink = StringSink::new();
//! let (tree, mut root) = RenderTree::start(sink.clone());
//!
//! for name in ["a", "b", "c"] {
//!     root.map(move |mut branch| async move {
//!         branch.write(name)?;
//!         branch.end()
//!     })
//!     .unwrap();
//! }
//! root.end().unwrap();
//!
//! futures::executor::block_on(tree.run()).unwrap();
//! assert_eq!(sink.contents(), "abc");
//! ```

mod chunk;
pub mod context;
mod error;
pub mod sink;
pub mod transform;
mod tree;

pub use chunk::{Body, Chunk};
pub use context::Context;
pub use error::{BoxError, Result, StreamError};
pub use sink::{Fragment, OutputSink, StringSink, WriterSink};
pub use transform::{Transform, TransformStack};
pub use tree::{ChunkId, RenderTree};
