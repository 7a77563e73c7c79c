//! Numeric bounds enforcement
//!
//! Injects a configured inclusive `[min, max]` onto every numeric-typed
//! node that does not already declare the bound. A bound key that is
//! present is preserved verbatim, even when its value is `0` — presence
//! is what matters, not truthiness.

use schemavault_core::document;
use serde_json::{json, Map, Value};

/// Return a copy of `schema` with `minimum`/`maximum` injected on every
/// `number`/`integer` node lacking them. Pure: the input is never mutated.
pub fn enforce_bounds(schema: &Value, bounds: (i64, i64)) -> Value {
    match schema {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, value) in map {
                out.insert(key.clone(), enforce_bounds(value, bounds));
            }

            if matches!(document::type_str(schema), Some("number") | Some("integer")) {
                out.entry("minimum").or_insert_with(|| json!(bounds.0));
                out.entry("maximum").or_insert_with(|| json!(bounds.1));
            }

            Value::Object(out)
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| enforce_bounds(item, bounds)).collect())
        }
        other => other.clone(),
    }
}
