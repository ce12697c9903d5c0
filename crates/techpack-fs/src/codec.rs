//! Format-agnostic structured-document reading and writing
//!
//! Dispatches on file extension (`.yaml`/`.yml`/`.json`) and guards YAML
//! input against ambiguous numeric-looking scalars: a value such as an
//! unquoted `1.0` parses as a float, but the metadata schema types fields
//! like `version` as strings. Accepting the float would silently corrupt
//! version strings, so the codec rejects it before typed deserialization
//! and reports the structural path to the offending field.

use serde::{Serialize, de::DeserializeOwned};
use serde_yaml::Value;

use crate::{Error, NormalizedPath, Result, io};

/// Keys the metadata schema types as strings. A numeric scalar under any
/// of these keys is an ambiguity, not a number.
const STRING_TYPED_KEYS: &[&str] = &[
    "version",
    "baseTag",
    "image",
    "iconPath",
    "script",
    "id",
    "label",
];

/// Format-agnostic document store.
///
/// Unknown fields are tolerated on parse (schema types carry flattened
/// passthrough maps) and null-valued fields are omitted on write. YAML
/// output has no leading `---` marker and keeps mapping key order.
#[derive(Debug, Default)]
pub struct DocumentStore;

impl DocumentStore {
    pub fn new() -> Self {
        Self
    }

    /// Load a document from a file.
    ///
    /// Format is detected from file extension:
    /// - `.yaml`, `.yml` -> YAML (ambiguous-scalar guard applies)
    /// - `.json` -> JSON
    pub fn load<T: DeserializeOwned>(&self, path: &NormalizedPath) -> Result<T> {
        let content = io::read_text(path)?;
        let extension = path.extension().unwrap_or("");

        match extension.to_lowercase().as_str() {
            "yaml" | "yml" => self.parse_yaml(&content, path),
            "json" => serde_json::from_str(&content).map_err(|e| Error::Parse {
                path: path.to_native(),
                format: "JSON".into(),
                message: e.to_string(),
            }),
            _ => Err(Error::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    /// Parse a YAML document from text, applying the ambiguous-scalar guard.
    pub fn parse_yaml<T: DeserializeOwned>(&self, content: &str, path: &NormalizedPath) -> Result<T> {
        let value: Value = serde_yaml::from_str(content).map_err(|e| Error::Parse {
            path: path.to_native(),
            format: "YAML".into(),
            message: e.to_string(),
        })?;

        guard_ambiguous_scalars(&value, &mut Vec::new())?;

        serde_yaml::from_value(value).map_err(|e| Error::Parse {
            path: path.to_native(),
            format: "YAML".into(),
            message: e.to_string(),
        })
    }

    /// Save a document to a file.
    ///
    /// Format is determined from file extension. Uses atomic write.
    pub fn save<T: Serialize>(&self, path: &NormalizedPath, value: &T) -> Result<()> {
        let extension = path.extension().unwrap_or("");

        let content = match extension.to_lowercase().as_str() {
            "yaml" | "yml" => serde_yaml::to_string(value).map_err(|e| Error::Serialize {
                path: path.to_native(),
                format: "YAML".into(),
                message: e.to_string(),
            })?,
            "json" => serde_json::to_string_pretty(value).map_err(|e| Error::Serialize {
                path: path.to_native(),
                format: "JSON".into(),
                message: e.to_string(),
            })?,
            _ => {
                return Err(Error::UnsupportedFormat {
                    extension: extension.to_string(),
                });
            }
        };

        io::write_atomic(path, content.as_bytes())
    }
}

/// Walk a raw YAML value and reject numeric scalars under string-typed keys.
///
/// `trail` accumulates the structural path; sequence indices are appended
/// to the owning key (`contexts[0]`).
fn guard_ambiguous_scalars(value: &Value, trail: &mut Vec<String>) -> Result<()> {
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                let key_str = key.as_str().unwrap_or_default().to_string();
                if STRING_TYPED_KEYS.contains(&key_str.as_str())
                    && let Value::Number(n) = child
                {
                    trail.push(key_str);
                    return Err(Error::AmbiguousScalar {
                        path: trail.join("."),
                        token: n.to_string(),
                    });
                }
                trail.push(key_str);
                guard_ambiguous_scalars(child, trail)?;
                trail.pop();
            }
        }
        Value::Sequence(seq) => {
            let owner = trail.pop();
            for (index, item) in seq.iter().enumerate() {
                match &owner {
                    Some(seg) => trail.push(format!("{seg}[{index}]")),
                    None => trail.push(format!("[{index}]")),
                }
                guard_ambiguous_scalars(item, trail)?;
                trail.pop();
            }
            if let Some(seg) = owner {
                trail.push(seg);
            }
        }
        _ => {}
    }
    Ok(())
}
