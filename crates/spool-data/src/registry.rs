//! Extension handler registry.
//!
//! [`DataRegistry`] maps file extensions to [`ExtensionHandler`]s and loads
//! data files into a context map.
//!
//! # Extensions
//!
//! Extensions are case-insensitive and stored without a leading dot:
//! `"JSON"`, `".json"` and `"json"` name the same handler. Registering a
//! handler for an extension that already has one replaces it; the registry
//! never keeps both.
//!
//! | Extension | Default handler |
//! |-----------|-----------------|
//! | `json` | [`JsonHandler`] |
//! | `yaml` | [`YamlHandler`] |
//! | `yml` | [`YamlHandler`] |
//!
//! # Storage keys
//!
//! Loaded values are stored under the file's base name (`users.json` →
//! `users`) unless the handler returns a `$storeAs` key. When two files
//! resolve to the same key, the later load overwrites the earlier one; values
//! are never deep-merged.
//!
//! # Example
//!
//! ```rust
//! use serde_json::{json, Map, Value};
//! use spool_data::{DataFile, DataRegistry};
//!
//! let mut registry = DataRegistry::new();
//! registry.add_extension_handler(".TXT", |file: &DataFile| -> spool_data::Result<Value> {
//!     Ok(Value::String(file.read_to_string()?))
//! });
//!
//! let mut data = Map::new();
//! registry
//!     .load_into(&DataFile::in_memory("motd.txt", "hello"), &mut data)
//!     .unwrap();
//! assert_eq!(data["motd"], json!("hello"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::error::{DataError, Result};
use crate::file::DataFile;
use crate::handler::{resolve_storage, ExtensionHandler, JsonHandler, YamlHandler};

/// Normalizes an extension: trimmed, no leading dot, lowercase.
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// A loaded file's storage key and value.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedData {
    pub key: String,
    pub value: Value,
}

/// Registry of extension handlers, owned by one renderer.
#[derive(Clone)]
pub struct DataRegistry {
    handlers: HashMap<String, Rc<dyn ExtensionHandler>>,
}

impl Default for DataRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DataRegistry {
    /// Creates a registry with the JSON and YAML handlers installed.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.add_extension_handler("json", JsonHandler);
        registry.add_extension_handler("yaml", YamlHandler);
        registry.add_extension_handler("yml", YamlHandler);
        registry
    }

    /// Creates a registry with no handlers.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` for `extension`, replacing any previous handler.
    pub fn add_extension_handler<H>(&mut self, extension: &str, handler: H)
    where
        H: ExtensionHandler + 'static,
    {
        self.insert_handler(extension, Rc::new(handler));
    }

    /// Registers an already shared handler. See [`add_extension_handler`](Self::add_extension_handler).
    pub fn insert_handler(&mut self, extension: &str, handler: Rc<dyn ExtensionHandler>) {
        let extension = normalize_extension(extension);
        if self.handlers.insert(extension.clone(), handler).is_some() {
            tracing::debug!(%extension, "overriding data extension handler");
        } else {
            tracing::debug!(%extension, "registered data extension handler");
        }
    }

    pub fn has_handler(&self, extension: &str) -> bool {
        self.handlers.contains_key(&normalize_extension(extension))
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }

    /// Looks up the handler for `file`'s extension.
    ///
    /// # Errors
    ///
    /// [`DataError::UnsupportedExtension`] if no handler is registered.
    pub fn handler_for(&self, file: &DataFile) -> Result<Rc<dyn ExtensionHandler>> {
        let extension = file.extension();
        self.handlers
            .get(&extension)
            .cloned()
            .ok_or_else(|| DataError::UnsupportedExtension {
                extension,
                path: file.path().to_path_buf(),
            })
    }

    /// Runs the matching handler and resolves the storage key.
    pub fn load(&self, file: &DataFile) -> Result<LoadedData> {
        let handler = self.handler_for(file)?;
        let value = handler.load(file)?;
        let (key, value) = resolve_storage(file, value)?;
        Ok(LoadedData { key, value })
    }

    /// Loads `file` into `target`, overwriting any value under the same key.
    ///
    /// Returns the key the data was stored under.
    pub fn load_into(&self, file: &DataFile, target: &mut Map<String, Value>) -> Result<String> {
        let LoadedData { key, value } = self.load(file)?;
        if target.insert(key.clone(), value).is_some() {
            tracing::debug!(%key, path = %file.path().display(), "data key overwritten");
        }
        Ok(key)
    }

    /// Loads every file under `dir` (recursively) into `target`.
    ///
    /// Files are visited in sorted path order, so overwrite conflicts resolve
    /// the same way on every run. Hidden files (leading `.`) are skipped; any
    /// other file without a registered handler fails the load.
    ///
    /// Returns the number of files loaded.
    pub fn load_dir(&self, dir: impl AsRef<Path>, target: &mut Map<String, Value>) -> Result<usize> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(DataError::DirectoryNotFound {
                path: dir.to_path_buf(),
            });
        }

        let files = walk_data_dir(dir)?;
        for path in &files {
            self.load_into(&DataFile::from_path(path), target)?;
        }
        tracing::debug!(dir = %dir.display(), files = files.len(), "loaded data directory");
        Ok(files.len())
    }
}

impl fmt::Debug for DataRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

/// Collects every non-hidden file under `root`, sorted.
pub fn walk_data_dir(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_recursive(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let io_err = |source| DataError::Io {
        path: dir.to_path_buf(),
        source,
    };

    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let hidden = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'));
        if hidden {
            continue;
        }
        if path.is_dir() {
            walk_recursive(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}
