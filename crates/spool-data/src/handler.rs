//! Extension handlers and the built-in JSON/YAML handlers.

use serde_json::Value;

use crate::error::{DataError, Result};
use crate::file::DataFile;

/// Reserved key naming an explicit storage key in a handler's result.
pub const STORE_AS_KEY: &str = "$storeAs";

/// Parses a data file into a context value.
///
/// The returned value is stored under the file's base name. A handler can
/// pick the key itself by returning an object with a [`STORE_AS_KEY`] entry;
/// the remaining entries of that object become the stored value.
///
/// Closures `Fn(&DataFile) -> Result<Value, DataError>` implement this trait.
pub trait ExtensionHandler {
    fn load(&self, file: &DataFile) -> Result<Value>;
}

impl<F> ExtensionHandler for F
where
    F: Fn(&DataFile) -> Result<Value>,
{
    fn load(&self, file: &DataFile) -> Result<Value> {
        (self)(file)
    }
}

/// Parses `.json` files with `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHandler;

impl ExtensionHandler for JsonHandler {
    fn load(&self, file: &DataFile) -> Result<Value> {
        let content = file.read_to_string()?;
        serde_json::from_str(&content).map_err(|e| DataError::parse(file.path(), e))
    }
}

/// Parses `.yaml`/`.yml` files with `serde_yaml`. Empty files load as `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlHandler;

impl ExtensionHandler for YamlHandler {
    fn load(&self, file: &DataFile) -> Result<Value> {
        let content = file.read_to_string()?;
        if content.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_yaml::from_str(&content).map_err(|e| DataError::parse(file.path(), e))
    }
}

/// Splits a handler result into its storage key and stored value.
pub(crate) fn resolve_storage(file: &DataFile, value: Value) -> Result<(String, Value)> {
    match value {
        Value::Object(mut map) if map.contains_key(STORE_AS_KEY) => {
            match map.remove(STORE_AS_KEY) {
                Some(Value::String(key)) if !key.is_empty() => Ok((key, Value::Object(map))),
                _ => Err(DataError::InvalidStoreAs {
                    path: file.path().to_path_buf(),
                }),
            }
        }
        other => Ok((file.stem(), other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_handler_parses() {
        let file = DataFile::in_memory("site.json", r#"{"title": "Docs"}"#);
        assert_eq!(JsonHandler.load(&file).unwrap(), json!({"title": "Docs"}));
    }

    #[test]
    fn json_handler_reports_parse_errors() {
        let file = DataFile::in_memory("site.json", "{broken");
        assert!(matches!(JsonHandler.load(&file), Err(DataError::Parse { .. })));
    }

    #[test]
    fn yaml_handler_parses_and_tolerates_empty() {
        let file = DataFile::in_memory("nav.yaml", "items:\n  - home\n  - about\n");
        assert_eq!(
            YamlHandler.load(&file).unwrap(),
            json!({"items": ["home", "about"]})
        );
        let empty = DataFile::in_memory("empty.yml", "\n");
        assert_eq!(YamlHandler.load(&empty).unwrap(), Value::Null);
    }

    #[test]
    fn closure_handlers() {
        let handler = |file: &DataFile| -> Result<Value> {
            Ok(Value::String(file.read_to_string()?.trim().to_string()))
        };
        let file = DataFile::in_memory("motd.txt", " hello \n");
        assert_eq!(handler.load(&file).unwrap(), json!("hello"));
    }

    #[test]
    fn storage_defaults_to_stem() {
        let file = DataFile::in_memory("people.json", "");
        let (key, value) = resolve_storage(&file, json!([1, 2])).unwrap();
        assert_eq!(key, "people");
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn store_as_names_the_key_and_is_stripped() {
        let file = DataFile::in_memory("people.json", "");
        let (key, value) =
            resolve_storage(&file, json!({"$storeAs": "team", "lead": "ada"})).unwrap();
        assert_eq!(key, "team");
        assert_eq!(value, json!({"lead": "ada"}));
    }

    #[test]
    fn store_as_must_be_a_string() {
        let file = DataFile::in_memory("people.json", "");
        let err = resolve_storage(&file, json!({"$storeAs": 3})).unwrap_err();
        assert!(matches!(err, DataError::InvalidStoreAs { .. }));
    }
}
