//! Error types for data loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving handlers or loading data files.
#[derive(Debug, Error)]
pub enum DataError {
    /// No handler is registered for the file's extension.
    #[error("no data handler registered for extension '{extension}' ({path})")]
    UnsupportedExtension { extension: String, path: PathBuf },

    /// The file could not be read.
    #[error("failed to read data file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A handler could not parse the file's content.
    #[error("failed to parse data file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// `$storeAs` was present but not a non-empty string.
    #[error("'$storeAs' in {path} must be a non-empty string")]
    InvalidStoreAs { path: PathBuf },

    /// The directory to load does not exist or is not a directory.
    #[error("data directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },
}

impl DataError {
    /// Creates a parse error for `path`.
    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        DataError::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;
