//! The render tree coordinator.
//!
//! Chunks live in an arena owned by a single [`RenderTree`]. Each record
//! holds its committed fragments, a forward-only link to the next chunk in
//! document order, and a completion flag. Flushing walks from the earliest
//! unflushed chunk and emits the longest completed prefix to the sink, so
//! output always leaves in document order no matter which branch finishes
//! first in real time.
//!
//! ```text
//!  head
//!   │
//!   ▼
//! [root ✓] → [branch A …] → [cursor ✓] → [branch B ✓] → [tail …]
//!   flushed   blocks everything after it until it completes
//! ```
//!
//! Asynchronous branches started with [`Chunk::map`] are queued on the tree
//! and driven by [`RenderTree::run`] on the current task. No threads are
//! involved: concurrency here means interleaved completion of futures.

use std::cell::RefCell;
use std::fmt;
use std::future::poll_fn;
use std::rc::Rc;
use std::task::Poll;

use futures::future::LocalBoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};

use crate::chunk::Chunk;
use crate::error::{Result, StreamError};
use crate::sink::{Fragment, OutputSink};

/// Index of a chunk record in its render tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub(crate) usize);

impl ChunkId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) type Branch = LocalBoxFuture<'static, Result<()>>;

#[derive(Debug, Default)]
struct ChunkRecord {
    fragments: Vec<Fragment>,
    next: Option<ChunkId>,
    complete: bool,
    flushed: bool,
}

/// Arena state shared by a tree and its chunk handles.
pub(crate) struct TreeState {
    records: Vec<ChunkRecord>,
    head: Option<ChunkId>,
    sink: Box<dyn OutputSink>,
    spawned: Vec<Branch>,
}

impl TreeState {
    fn alloc(&mut self, next: Option<ChunkId>) -> ChunkId {
        let id = ChunkId(self.records.len());
        self.records.push(ChunkRecord {
            next,
            ..ChunkRecord::default()
        });
        id
    }

    fn record(&self, id: ChunkId) -> &ChunkRecord {
        &self.records[id.0]
    }

    fn record_mut(&mut self, id: ChunkId) -> &mut ChunkRecord {
        &mut self.records[id.0]
    }

    pub(crate) fn is_complete(&self, id: ChunkId) -> bool {
        self.record(id).complete
    }

    pub(crate) fn ensure_open(&self, id: ChunkId) -> Result<()> {
        if self.record(id).complete {
            Err(StreamError::InvalidState { chunk: id })
        } else {
            Ok(())
        }
    }

    pub(crate) fn commit(&mut self, id: ChunkId, fragment: Fragment) -> Result<()> {
        self.ensure_open(id)?;
        self.record_mut(id).fragments.push(fragment);
        Ok(())
    }

    /// Splices `branch` and a fresh cursor after `id`, completing `id`.
    ///
    /// Returns `(branch, cursor)`. Document order becomes
    /// `id → branch → cursor → (old next)`.
    pub(crate) fn split(&mut self, id: ChunkId) -> Result<(ChunkId, ChunkId)> {
        self.ensure_open(id)?;
        let old_next = self.record(id).next;
        let cursor = self.alloc(old_next);
        let branch = self.alloc(Some(cursor));
        let record = self.record_mut(id);
        record.next = Some(branch);
        record.complete = true;
        Ok((branch, cursor))
    }

    pub(crate) fn complete(&mut self, id: ChunkId) -> Result<()> {
        self.ensure_open(id)?;
        self.record_mut(id).complete = true;
        self.flush()
    }

    pub(crate) fn spawn(&mut self, branch: Branch) {
        self.spawned.push(branch);
    }

    /// Emits the completed prefix of the chain starting at `head`.
    ///
    /// `head` only moves past a chunk once all of its fragments reached the
    /// sink. On a sink error the fragments not yet written stay queued and a
    /// later flush resumes with them.
    pub(crate) fn flush(&mut self) -> Result<()> {
        while let Some(id) = self.head {
            let record = &mut self.records[id.0];
            if !record.complete {
                break;
            }
            tracing::trace!(chunk = %id, fragments = record.fragments.len(), "flushing chunk");

            let mut emitted = 0;
            let mut failure = None;
            for fragment in &record.fragments {
                if let Err(err) = self.sink.emit(fragment) {
                    failure = Some(err);
                    break;
                }
                emitted += 1;
            }
            record.fragments.drain(..emitted);
            if let Some(err) = failure {
                return Err(err.into());
            }

            record.flushed = true;
            self.head = record.next;
        }
        Ok(())
    }
}

/// Owner of a chunk chain and its pending asynchronous branches.
///
/// # Example
///
/// ```rust
/// use spool_stream::{RenderTree, StringSink};
///
/// let sink = StringSink::new();
/// let (tree, mut root) = RenderTree::start(sink.clone());
///
/// root.write("Hello, ").unwrap();
/// root.map(|mut branch| async move {
///     branch.write("async ")?;
///     branch.end()
/// })
/// .unwrap();
/// root.write("world").unwrap();
/// root.end().unwrap();
///
/// futures::executor::block_on(tree.run()).unwrap();
/// assert_eq!(sink.contents(), "Hello, async world");
/// ```
pub struct RenderTree {
    state: Rc<RefCell<TreeState>>,
}

impl RenderTree {
    /// Creates a tree writing to `sink` and returns it with its root chunk.
    pub fn start(sink: impl OutputSink + 'static) -> (RenderTree, Chunk) {
        let mut state = TreeState {
            records: Vec::new(),
            head: None,
            sink: Box::new(sink),
            spawned: Vec::new(),
        };
        let root = state.alloc(None);
        state.head = Some(root);

        let state = Rc::new(RefCell::new(state));
        let chunk = Chunk::new(root, Rc::clone(&state));
        (RenderTree { state }, chunk)
    }

    /// Number of chunks created so far, flushed ones included.
    pub fn chunk_count(&self) -> usize {
        self.state.borrow().records.len()
    }

    /// Returns true once every chunk has been flushed.
    pub fn is_drained(&self) -> bool {
        self.state.borrow().head.is_none()
    }

    /// Number of branches spawned but not yet picked up by [`run`](Self::run).
    pub fn queued_branches(&self) -> usize {
        self.state.borrow().spawned.len()
    }

    /// Drives every spawned branch to completion, then checks that the whole
    /// chain was flushed.
    ///
    /// Branches spawned while other branches run are picked up as they
    /// appear. The first branch error aborts the run; remaining branches are
    /// dropped without being polled again.
    pub async fn run(&self) -> Result<()> {
        let mut pending: FuturesUnordered<Branch> = FuturesUnordered::new();

        poll_fn(|cx| loop {
            let spawned = std::mem::take(&mut self.state.borrow_mut().spawned);
            pending.extend(spawned);

            match pending.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(()))) => continue,
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Err(err)),
                Poll::Ready(None) | Poll::Pending => {
                    if self.state.borrow().spawned.is_empty() {
                        return if pending.is_empty() {
                            Poll::Ready(Ok(()))
                        } else {
                            Poll::Pending
                        };
                    }
                }
            }
        })
        .await?;

        let state = self.state.borrow();
        match state.head {
            None => Ok(()),
            Some(chunk) => Err(StreamError::Incomplete { chunk }),
        }
    }
}

impl fmt::Debug for RenderTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("RenderTree")
            .field("chunks", &state.records.len())
            .field("head", &state.head)
            .field("queued", &state.spawned.len())
            .finish()
    }
}
