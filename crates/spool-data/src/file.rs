//! The file handle passed to extension handlers.

use std::path::{Path, PathBuf};

use crate::error::{DataError, Result};

#[derive(Debug, Clone)]
enum Source {
    Disk,
    Memory(String),
}

/// A data file about to be loaded.
///
/// Handlers read it with [`read_to_string`](Self::read_to_string). Files can
/// live on disk or be supplied in memory (for embedded data and tests); the
/// handler cannot tell the difference.
#[derive(Debug, Clone)]
pub struct DataFile {
    path: PathBuf,
    source: Source,
}

impl DataFile {
    /// A file read from disk on demand.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            source: Source::Disk,
        }
    }

    /// A file whose content is already in memory. `name` supplies the
    /// extension and base name, e.g. `"users.json"`.
    pub fn in_memory(name: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: name.into(),
            source: Source::Memory(content.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The base name without extension, used as the default storage key.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The normalized (lowercase) extension, or an empty string.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|s| s.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// Reads the whole file synchronously.
    pub fn read_to_string(&self) -> Result<String> {
        match &self.source {
            Source::Memory(content) => Ok(content.clone()),
            Source::Disk => std::fs::read_to_string(&self.path).map_err(|source| DataError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_and_extension() {
        let file = DataFile::in_memory("data/Users.JSON", "{}");
        assert_eq!(file.stem(), "Users");
        assert_eq!(file.extension(), "json");
    }

    #[test]
    fn no_extension() {
        let file = DataFile::in_memory("README", "");
        assert_eq!(file.extension(), "");
        assert_eq!(file.stem(), "README");
    }

    #[test]
    fn missing_disk_file_is_io_error() {
        let file = DataFile::from_path("/definitely/not/here.json");
        assert!(matches!(file.read_to_string(), Err(DataError::Io { .. })));
    }
}
