//! Deterministic artifact serialization
//!
//! Materialized artifacts must be byte-stable across runs: YAML output
//! orders mapping keys by a fixed priority list (unlisted keys sort after
//! listed ones, alphabetically), JSON output uses 2-space indentation with
//! serde_json's default (sorted) key order. Both are deterministic for the
//! same input document.

use crate::content_type::ContentType;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

/// Fixed key ordering for YAML artifacts. Keys appear in this order;
/// anything not listed sorts after, alphabetically.
const KEY_PRIORITY: &[&str] = &[
    "title",
    "description",
    "$id",
    "$schema",
    "type",
    "additionalProperties",
    "required",
    "properties",
    "allOf",
    "oneOf",
    "items",
    "enum",
    "format",
    "minimum",
    "maximum",
    "examples",
];

/// Serialization failure
#[derive(Debug, Error)]
pub enum SerializeError {
    /// The path's extension maps to no known content type
    #[error("unknown content type for '{0}'")]
    UnknownExtension(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sort key for a mapping key under the fixed priority ordering
fn key_rank(key: &str) -> (usize, &str) {
    match KEY_PRIORITY.iter().position(|k| *k == key) {
        Some(idx) => (idx, ""),
        None => (KEY_PRIORITY.len(), key),
    }
}

/// Rebuild a JSON value as a YAML value whose mappings carry keys in
/// priority order. serde_yaml mappings preserve insertion order, so the
/// emitted text follows it.
fn ordered_yaml(value: &Value) -> serde_yaml::Value {
    match value {
        Value::Null => serde_yaml::Value::Null,
        Value::Bool(b) => serde_yaml::Value::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_yaml::Value::Number(serde_yaml::Number::from(i))
            } else if let Some(u) = n.as_u64() {
                serde_yaml::Value::Number(serde_yaml::Number::from(u))
            } else {
                serde_yaml::Value::Number(serde_yaml::Number::from(n.as_f64().unwrap_or(0.0)))
            }
        }
        Value::String(s) => serde_yaml::Value::String(s.clone()),
        Value::Array(items) => {
            serde_yaml::Value::Sequence(items.iter().map(ordered_yaml).collect())
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| key_rank(a).cmp(&key_rank(b)));

            let mut mapping = serde_yaml::Mapping::new();
            for key in keys {
                mapping.insert(
                    serde_yaml::Value::String(key.clone()),
                    ordered_yaml(&map[key]),
                );
            }
            serde_yaml::Value::Mapping(mapping)
        }
    }
}

/// Serialize a schema document in the given content type
pub fn serialize(doc: &Value, content_type: ContentType) -> Result<String, SerializeError> {
    match content_type {
        ContentType::Yaml => Ok(serde_yaml::to_string(&ordered_yaml(doc))?),
        ContentType::Json => {
            let mut out = serde_json::to_string_pretty(doc)?;
            out.push('\n');
            Ok(out)
        }
    }
}

/// Parse a document from text in the given content type
pub fn parse_str(text: &str, content_type: ContentType) -> Result<Value, SerializeError> {
    match content_type {
        ContentType::Yaml => Ok(serde_yaml::from_str(text)?),
        ContentType::Json => Ok(serde_json::from_str(text)?),
    }
}

/// Read and parse a schema document, choosing the format by extension
pub fn load_document(path: &Path) -> Result<Value, SerializeError> {
    let content_type = ContentType::from_path(path)
        .ok_or_else(|| SerializeError::UnknownExtension(path.display().to_string()))?;
    let text = std::fs::read_to_string(path)?;
    parse_str(&text, content_type)
}
