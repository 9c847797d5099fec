//! Output fragments and the sinks that receive flushed output.
//!
//! A sink only ever sees fragments in document order: the render tree hands
//! over a chunk's fragments once that chunk and every chunk before it have
//! completed. Sinks never see partial or reordered output.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// A committed unit of chunk output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Text that passed through the chunk's transform stack.
    Text(String),
    /// Structural markup written verbatim, bypassing transforms.
    Markup(String),
}

impl Fragment {
    /// Returns the fragment's content.
    pub fn as_str(&self) -> &str {
        match self {
            Fragment::Text(s) | Fragment::Markup(s) => s,
        }
    }

    /// Returns true if this is a markup fragment.
    pub fn is_markup(&self) -> bool {
        matches!(self, Fragment::Markup(_))
    }
}

/// Destination for flushed output.
pub trait OutputSink {
    /// Receives the next fragment in document order.
    fn emit(&mut self, fragment: &Fragment) -> std::io::Result<()>;
}

/// Collects flushed output into a string.
///
/// Clones share the same buffer, so a caller can keep one handle while the
/// render tree owns the other.
///
/// ```rust
/// use spool_stream::{Fragment, OutputSink, StringSink};
///
/// let sink = StringSink::new();
/// let mut owned = sink.clone();
/// owned.emit(&Fragment::Text("hello".into())).unwrap();
/// assert_eq!(sink.contents(), "hello");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StringSink {
    buffer: Rc<RefCell<String>>,
}

impl StringSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything flushed so far.
    pub fn contents(&self) -> String {
        self.buffer.borrow().clone()
    }

    /// Takes the flushed output, leaving the buffer empty.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.buffer.borrow_mut())
    }
}

impl OutputSink for StringSink {
    fn emit(&mut self, fragment: &Fragment) -> std::io::Result<()> {
        self.buffer.borrow_mut().push_str(fragment.as_str());
        Ok(())
    }
}

/// Streams flushed output into any [`std::io::Write`].
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputSink for WriterSink<W> {
    fn emit(&mut self, fragment: &Fragment) -> std::io::Result<()> {
        self.writer.write_all(fragment.as_str().as_bytes())
    }
}
