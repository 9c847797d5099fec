//! Writable chunk handles.
//!
//! A [`Chunk`] is the write cursor a template or helper holds. It commits
//! fragments into its record in the render tree, owns the transform stack
//! applied to every [`write`](Chunk::write), and can fork asynchronous
//! branches with [`map`](Chunk::map).
//!
//! # Tap composition
//!
//! ```rust
//! use spool_stream::{RenderTree, StringSink};
//!
//! let sink = StringSink::new();
//! let (_tree, mut chunk) = RenderTree::start(sink.clone());
//!
//! chunk.tap(|s| format!("[{s}]")).unwrap();
//! chunk.tap(|s| s.to_uppercase()).unwrap();
//! chunk.write("hi").unwrap();
//! chunk.untap().unwrap().untap().unwrap();
//! chunk.end().unwrap();
//!
//! // the newest tap (uppercase) ran first
//! assert_eq!(sink.contents(), "[HI]");
//! ```

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;

use crate::context::Context;
use crate::error::{Result, StreamError};
use crate::sink::Fragment;
use crate::transform::TransformStack;
use crate::tree::{ChunkId, TreeState};

/// A compiled template body: writes its output into a chunk.
pub type Body = Rc<dyn Fn(&mut Chunk, &Context) -> Result<()>>;

/// Write handle for one position in a render tree.
///
/// Handles are not `Clone`: every chunk record has exactly one writer.
pub struct Chunk {
    id: ChunkId,
    taps: TransformStack,
    /// Transforms at the bottom of `taps` copied from the forking chunk.
    /// They apply to writes but belong to the parent's installers.
    inherited: usize,
    tree: Rc<RefCell<TreeState>>,
}

impl Chunk {
    pub(crate) fn new(id: ChunkId, tree: Rc<RefCell<TreeState>>) -> Self {
        Self {
            id,
            taps: TransformStack::new(),
            inherited: 0,
            tree,
        }
    }

    /// The record this handle currently writes into.
    pub fn id(&self) -> ChunkId {
        self.id
    }

    pub fn is_complete(&self) -> bool {
        self.tree.borrow().is_complete(self.id)
    }

    /// Number of transforms installed on this handle.
    ///
    /// Transforms inherited from a forking chunk still apply to writes but
    /// are not counted, and cannot be removed with [`untap`](Self::untap).
    pub fn tap_depth(&self) -> usize {
        self.taps.len() - self.inherited
    }

    /// Appends `data` after running it through the transform stack.
    ///
    /// Empty writes are accepted and commit nothing.
    ///
    /// # Errors
    ///
    /// [`StreamError::InvalidState`] if the chunk has already been ended.
    pub fn write(&mut self, data: &str) -> Result<&mut Self> {
        self.tree.borrow().ensure_open(self.id)?;
        let text = self.taps.apply(data);
        let mut tree = self.tree.borrow_mut();
        if !text.is_empty() {
            tree.commit(self.id, Fragment::Text(text))?;
        }
        drop(tree);
        Ok(self)
    }

    /// Appends markup verbatim, bypassing the transform stack.
    pub fn write_raw(&mut self, markup: &str) -> Result<&mut Self> {
        let mut tree = self.tree.borrow_mut();
        tree.ensure_open(self.id)?;
        if !markup.is_empty() {
            tree.commit(self.id, Fragment::Markup(markup.to_string()))?;
        }
        drop(tree);
        Ok(self)
    }

    /// Installs a transform that sees written data before any earlier tap.
    ///
    /// Every `tap` must be paired with an [`untap`](Self::untap) before the
    /// chunk is ended.
    pub fn tap<F>(&mut self, transform: F) -> Result<&mut Self>
    where
        F: Fn(&str) -> String + 'static,
    {
        self.tree.borrow().ensure_open(self.id)?;
        self.taps.push(Rc::new(transform));
        Ok(self)
    }

    /// Removes the most recently installed transform.
    ///
    /// # Errors
    ///
    /// [`StreamError::ImbalancedTap`] if no transform was installed on this
    /// handle.
    pub fn untap(&mut self) -> Result<&mut Self> {
        if self.tap_depth() == 0 {
            return Err(StreamError::ImbalancedTap {
                chunk: self.id,
                pending: 0,
            });
        }
        self.taps.pop();
        Ok(self)
    }

    /// Executes `body` with `ctx`, writing into this chunk.
    ///
    /// A body that forks asynchronous work through [`map`](Self::map) leaves
    /// this handle pointing at a continuation spliced after the fork, so the
    /// call returns without waiting for the branch.
    pub fn render(&mut self, body: &Body, ctx: &Context) -> Result<&mut Self> {
        self.tree.borrow().ensure_open(self.id)?;
        body(self, ctx)?;
        Ok(self)
    }

    /// Forks an asynchronous branch at the current position.
    ///
    /// A branch chunk is spliced immediately after everything written so
    /// far, and `branch` is called with it to start its work. This handle
    /// then moves to a fresh continuation after the branch, so subsequent
    /// writes land after the branch's output in document order. The branch
    /// writes through a copy of the current transform stack, starts with a
    /// [`tap_depth`](Self::tap_depth) of zero, and must be ended by its
    /// future.
    pub fn map<F, Fut>(&mut self, branch: F) -> Result<&mut Self>
    where
        F: FnOnce(Chunk) -> Fut,
        Fut: Future<Output = Result<()>> + 'static,
    {
        let (branch_id, cursor_id) = self.tree.borrow_mut().split(self.id)?;
        tracing::trace!(from = %self.id, branch = %branch_id, cursor = %cursor_id, "forked branch");

        let branch_chunk = Chunk {
            id: branch_id,
            taps: self.taps.clone(),
            inherited: self.taps.len(),
            tree: Rc::clone(&self.tree),
        };
        self.id = cursor_id;

        let future = branch(branch_chunk).boxed_local();
        let mut tree = self.tree.borrow_mut();
        tree.spawn(future);
        tree.flush()?;
        drop(tree);
        Ok(self)
    }

    /// Marks the chunk complete and flushes every newly eligible chunk.
    ///
    /// # Errors
    ///
    /// [`StreamError::ImbalancedTap`] if transforms are still installed,
    /// [`StreamError::InvalidState`] if the chunk was already ended.
    pub fn end(&mut self) -> Result<()> {
        let pending = self.tap_depth();
        if pending > 0 {
            return Err(StreamError::ImbalancedTap {
                chunk: self.id,
                pending,
            });
        }
        self.tree.borrow_mut().complete(self.id)
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("id", &self.id)
            .field("taps", &self.taps)
            .field("inherited", &self.inherited)
            .finish()
    }
}
