//! Error types for the stream crate.

use thiserror::Error;

use crate::tree::ChunkId;

/// Boxed error used as the source of failures raised by bodies and helpers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while writing to, transforming, or flushing chunks.
///
/// `InvalidState` and `ImbalancedTap` are contract violations by the caller:
/// they are reported immediately and never recovered from by the stream
/// itself.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A write, tap, map or end was attempted on a chunk that is already complete.
    #[error("chunk {chunk} is already complete")]
    InvalidState { chunk: ChunkId },

    /// `untap` on an empty transform stack, or `end` with transforms still installed.
    #[error("imbalanced tap on chunk {chunk}: {pending} transform(s) installed")]
    ImbalancedTap { chunk: ChunkId, pending: usize },

    /// The render tree drained every branch but a chunk was never ended.
    #[error("render finished with chunk {chunk} still incomplete")]
    Incomplete { chunk: ChunkId },

    /// A helper failed while writing its output.
    #[error("helper `{helper}` failed: {source}")]
    Helper {
        helper: String,
        #[source]
        source: BoxError,
    },

    /// A body or branch failed for any other reason.
    #[error("{message}")]
    Render {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The output sink rejected a flushed fragment.
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// Creates a generic render failure with a message.
    pub fn render(message: impl Into<String>) -> Self {
        StreamError::Render {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an arbitrary error as a render failure.
    pub fn failed<E>(source: E) -> Self
    where
        E: Into<BoxError>,
    {
        let source = source.into();
        StreamError::Render {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Attributes this error to the named helper.
    ///
    /// Errors already attributed to a helper keep their original attribution
    /// so that nested helper failures point at the innermost helper.
    pub fn in_helper(self, helper: impl Into<String>) -> Self {
        match self {
            err @ StreamError::Helper { .. } => err,
            other => StreamError::Helper {
                helper: helper.into(),
                source: Box::new(other),
            },
        }
    }

    /// Returns true for contract violations (write-after-end, imbalanced tap).
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            StreamError::InvalidState { .. } | StreamError::ImbalancedTap { .. }
        )
    }
}

/// Result type for stream operations.
pub type Result<T> = std::result::Result<T, StreamError>;
