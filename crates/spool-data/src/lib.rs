//! # Spool Data - Extension-Keyed Data Loading
//!
//! Loads structured data files into render context data. Each file extension
//! maps to an [`ExtensionHandler`]; the [`DataRegistry`] picks the handler,
//! runs it over a [`DataFile`], and stores the result under a key derived
//! from the file name (or the handler's `$storeAs` choice).
//!
//! Plugins extend the registry by registering handlers for new extensions or
//! overriding the built-in JSON/YAML ones.

mod error;
mod file;
pub mod handler;
pub mod registry;

pub use error::{DataError, Result};
pub use file::DataFile;
pub use handler::{ExtensionHandler, JsonHandler, YamlHandler, STORE_AS_KEY};
pub use registry::{normalize_extension, walk_data_dir, DataRegistry, LoadedData};
