//! Schema document helpers
//!
//! Schema documents are plain `serde_json::Value` trees; everything in the
//! pipeline reads, transforms and re-serializes them as values. This module
//! holds the small lookup helpers shared across the engine.

use serde_json::Value;

/// Look up a value at a dotted, optionally indexed path (`"meta.tags.0"`).
///
/// A single-segment path like `"$id"` is a plain key lookup. Numeric
/// segments index into arrays.
pub fn dotted_get<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = doc;
    for segment in path.split('.') {
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}

/// The `type` keyword of a schema node, when it is a single string
pub fn type_str(node: &Value) -> Option<&str> {
    node.get("type").and_then(Value::as_str)
}

/// The `$id` of a schema document, when present
pub fn schema_id(doc: &Value) -> Option<&str> {
    doc.get("$id").and_then(Value::as_str)
}

/// `$id` for diagnostics: falls back to a placeholder so messages always
/// carry an identity
pub fn schema_id_or_unknown(doc: &Value) -> &str {
    schema_id(doc).unwrap_or("<no $id>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dotted_lookup() {
        let doc = json!({
            "$id": "/basic/1.0.0",
            "meta": { "tags": ["a", "b"] }
        });

        assert_eq!(dotted_get(&doc, "$id"), Some(&json!("/basic/1.0.0")));
        assert_eq!(dotted_get(&doc, "meta.tags.1"), Some(&json!("b")));
        assert_eq!(dotted_get(&doc, "meta.missing"), None);
        assert_eq!(dotted_get(&doc, "meta.tags.x"), None);
    }

    #[test]
    fn type_lookup_ignores_unions() {
        assert_eq!(type_str(&json!({"type": "object"})), Some("object"));
        assert_eq!(type_str(&json!({"type": ["object", "null"]})), None);
        assert_eq!(type_str(&json!({})), None);
    }

    #[test]
    fn id_fallback() {
        assert_eq!(schema_id_or_unknown(&json!({})), "<no $id>");
        assert_eq!(schema_id_or_unknown(&json!({"$id": "/x/1.0.0"})), "/x/1.0.0");
    }
}
