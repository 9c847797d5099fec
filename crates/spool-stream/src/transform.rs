//! Per-chunk transform stacks.
//!
//! Transforms ("taps") rewrite text before it is committed to a chunk. They
//! compose innermost-first: the most recently tapped transform sees the raw
//! data, and its output feeds the transform installed before it.

use std::fmt;
use std::rc::Rc;

/// A synchronous text rewrite installed with [`Chunk::tap`](crate::Chunk::tap).
pub type Transform = Rc<dyn Fn(&str) -> String>;

/// LIFO stack of transforms owned by a single chunk.
#[derive(Clone, Default)]
pub struct TransformStack {
    transforms: Vec<Transform>,
}

impl TransformStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a transform on top of the stack.
    pub fn push(&mut self, transform: Transform) {
        self.transforms.push(transform);
    }

    /// Removes the most recently installed transform.
    pub fn pop(&mut self) -> Option<Transform> {
        self.transforms.pop()
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Runs `data` through every installed transform, newest first.
    pub fn apply(&self, data: &str) -> String {
        self.transforms
            .iter()
            .rev()
            .fold(data.to_string(), |acc, transform| transform(&acc))
    }
}

impl fmt::Debug for TransformStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformStack")
            .field("depth", &self.transforms.len())
            .finish()
    }
}
