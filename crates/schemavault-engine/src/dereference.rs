//! `$ref` expansion and `allOf` merging
//!
//! Dereferencing runs in two passes over the document tree: first every
//! `$ref` node is replaced by its resolved content (recursively, so
//! transitively referenced schemas expand too), then every `allOf`
//! composition is folded into its parent node bottom-up. The output
//! contains no `$ref` and no `allOf` at any depth.

use crate::resolver::{ResolveError, Resolver};
use schemavault_core::document;
use serde_json::{Map, Value};
use thiserror::Error;

/// Reference chains deeper than this are treated as circular.
const MAX_REF_DEPTH: usize = 64;

/// Dereference failure, tagged with the originating schema's `$id`
#[derive(Debug, Error)]
pub enum DereferenceError {
    #[error("failed to dereference schema '{id}': {source}")]
    Resolve {
        id: String,
        #[source]
        source: ResolveError,
    },

    #[error("failed to merge allOf in schema '{id}': {reason}")]
    Merge { id: String, reason: String },

    #[error("reference chain too deep in schema '{id}'")]
    TooDeep { id: String },
}

/// Expands `$ref` pointers and merges `allOf` compositions
pub struct Dereferencer<'a> {
    resolver: &'a Resolver,
}

impl<'a> Dereferencer<'a> {
    pub fn new(resolver: &'a Resolver) -> Self {
        Self { resolver }
    }

    /// Fully dereference a schema document.
    ///
    /// Returns a new tree; the input is never mutated.
    pub fn dereference(&self, schema: &Value) -> Result<Value, DereferenceError> {
        let id = document::schema_id_or_unknown(schema).to_string();
        let expanded = self.expand(schema, &id, 0)?;
        merge_all_of(expanded, &id)
    }

    /// Replace every `$ref` node with its resolved, recursively expanded
    /// content. `depth` counts ref hops, not tree depth.
    fn expand(&self, node: &Value, id: &str, depth: usize) -> Result<Value, DereferenceError> {
        match node {
            Value::Object(map) => {
                if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                    if depth >= MAX_REF_DEPTH {
                        return Err(DereferenceError::TooDeep { id: id.to_string() });
                    }
                    let resolved =
                        self.resolver
                            .resolve(reference)
                            .map_err(|source| DereferenceError::Resolve {
                                id: id.to_string(),
                                source,
                            })?;
                    return self.expand(&resolved, id, depth + 1);
                }

                let mut out = Map::new();
                for (key, value) in map {
                    out.insert(key.clone(), self.expand(value, id, depth)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => {
                let expanded: Result<Vec<Value>, DereferenceError> = items
                    .iter()
                    .map(|item| self.expand(item, id, depth))
                    .collect();
                Ok(Value::Array(expanded?))
            }
            other => Ok(other.clone()),
        }
    }
}

/// Fold every `allOf` array into its parent node, bottom-up, so no nested
/// `allOf` survives
fn merge_all_of(node: Value, id: &str) -> Result<Value, DereferenceError> {
    match node {
        Value::Object(map) => {
            let mut merged = Map::new();
            let mut all_of = None;
            for (key, value) in map {
                let value = merge_all_of(value, id)?;
                if key == "allOf" {
                    all_of = Some(value);
                } else {
                    merged.insert(key, value);
                }
            }

            if let Some(compositions) = all_of {
                let Value::Array(subs) = compositions else {
                    return Err(DereferenceError::Merge {
                        id: id.to_string(),
                        reason: "allOf is not an array".to_string(),
                    });
                };

                // Keys declared directly on the parent win over merged
                // ones; among sub-schemas, the last listed wins.
                let own_properties: Vec<String> = merged
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|p| p.keys().cloned().collect())
                    .unwrap_or_default();

                for sub in subs {
                    merge_sub_schema(&mut merged, sub, &own_properties, id)?;
                }
            }

            Ok(Value::Object(merged))
        }
        Value::Array(items) => {
            let merged: Result<Vec<Value>, DereferenceError> = items
                .into_iter()
                .map(|item| merge_all_of(item, id))
                .collect();
            Ok(Value::Array(merged?))
        }
        other => Ok(other),
    }
}

/// Merge one `allOf` entry into its parent node
fn merge_sub_schema(
    parent: &mut Map<String, Value>,
    sub: Value,
    own_properties: &[String],
    id: &str,
) -> Result<(), DereferenceError> {
    let Value::Object(sub_map) = sub else {
        return Err(DereferenceError::Merge {
            id: id.to_string(),
            reason: "allOf entry is not an object".to_string(),
        });
    };

    for (key, value) in sub_map {
        match key.as_str() {
            "properties" => {
                let Value::Object(sub_props) = value else {
                    return Err(DereferenceError::Merge {
                        id: id.to_string(),
                        reason: "allOf entry has non-object properties".to_string(),
                    });
                };

                let props = parent
                    .entry("properties")
                    .or_insert_with(|| Value::Object(Map::new()));
                let Value::Object(props) = props else {
                    return Err(DereferenceError::Merge {
                        id: id.to_string(),
                        reason: "properties is not an object".to_string(),
                    });
                };

                for (name, prop) in sub_props {
                    if own_properties.contains(&name) {
                        continue;
                    }
                    props.insert(name, prop);
                }
            }
            "required" => {
                let existing = parent
                    .entry("required")
                    .or_insert_with(|| Value::Array(Vec::new()));
                let Value::Array(required) = existing else {
                    return Err(DereferenceError::Merge {
                        id: id.to_string(),
                        reason: "required is not an array".to_string(),
                    });
                };

                if let Value::Array(names) = value {
                    for name in names {
                        if !required.contains(&name) {
                            required.push(name);
                        }
                    }
                }
            }
            // additionalProperties conflicts are tolerated: first value
            // encountered is kept, never an error.
            "additionalProperties" => {
                parent.entry("additionalProperties").or_insert(value);
            }
            _ => {
                parent.entry(key).or_insert(value);
            }
        }
    }

    Ok(())
}
