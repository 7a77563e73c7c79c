//! JSON Schema validation capability
//!
//! Wraps the `jsonschema` crate behind three narrow checks: structural
//! validity (the schema compiles), security hardening (every declared
//! regex compiles under the `regex` crate, whose engine guarantees
//! linear-time matching and rejects backreferences), and instance
//! validation for schema examples.

use serde_json::Value;

/// Structural validity: the document must compile as a JSON Schema.
///
/// Returns one message per problem; empty means valid.
pub fn check_valid(schema: &Value) -> Vec<String> {
    if !matches!(schema, Value::Object(_) | Value::Bool(_)) {
        return vec!["schema is not an object".to_string()];
    }

    match jsonschema::options().build(&compilable(schema)) {
        Ok(_) => Vec::new(),
        Err(e) => vec![e.to_string()],
    }
}

/// Repository `$id`s are repo-relative URIs, which cannot serve as a
/// compilation base. Dereferenced artifacts carry no `$ref`, so identity
/// plays no part in validation; drop it before compiling.
fn compilable(schema: &Value) -> Value {
    let mut doc = schema.clone();
    if let Value::Object(map) = &mut doc {
        map.remove("$id");
    }
    doc
}

/// Security hardening: every `pattern` and `patternProperties` regex in
/// the tree must compile under the `regex` crate.
pub fn check_secure(schema: &Value) -> Vec<String> {
    let mut violations = Vec::new();
    walk_patterns(schema, "", &mut violations);
    violations
}

/// Validate an instance against a schema.
///
/// Returns one `path: message` string per violation; empty means valid.
pub fn validate_instance(schema: &Value, instance: &Value) -> Vec<String> {
    let validator = match jsonschema::options().build(&compilable(schema)) {
        Ok(v) => v,
        Err(e) => return vec![format!("schema does not compile: {e}")],
    };

    validator
        .iter_errors(instance)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                format!("(root): {e}")
            } else {
                format!("{path}: {e}")
            }
        })
        .collect()
}

fn walk_patterns(node: &Value, pointer: &str, violations: &mut Vec<String>) {
    match node {
        Value::Object(map) => {
            if let Some(pattern) = map.get("pattern").and_then(Value::as_str) {
                if let Err(e) = regex::Regex::new(pattern) {
                    violations.push(format!("{pointer}/pattern: unsupported or unsafe regex: {e}"));
                }
            }

            if let Some(Value::Object(patterns)) = map.get("patternProperties") {
                for key in patterns.keys() {
                    if let Err(e) = regex::Regex::new(key) {
                        violations.push(format!(
                            "{pointer}/patternProperties/{key}: unsupported or unsafe regex: {e}"
                        ));
                    }
                }
            }

            for (key, value) in map {
                walk_patterns(value, &format!("{pointer}/{key}"), violations);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                walk_patterns(item, &format!("{pointer}/{index}"), violations);
            }
        }
        _ => {}
    }
}
