//! Robustness rules
//!
//! Schema hygiene for materialized versions: structural validity,
//! pattern hardening, snake_case property keys, deterministic types,
//! typed array items, shaped objects, coherent oneOf branches, declared
//! required properties, enforced numeric bounds and self-describing
//! examples.

use super::push_unless_skipped;
use crate::scanner::{SchemaInfo, VersionGroups};
use crate::validator;
use schemavault_core::config::Config;
use schemavault_core::diagnostic::{Diagnostic, DiagnosticCode, Location};
use schemavault_core::document;
use serde_json::Value;
use std::collections::BTreeSet;

pub fn check(groups: &VersionGroups, config: &Config) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    for majors in groups.values() {
        for info in majors.values().flatten() {
            if info.current {
                continue;
            }
            check_schema(info, config, &mut out);
        }
    }

    out
}

fn check_schema(info: &SchemaInfo, config: &Config, out: &mut Vec<Diagnostic>) {
    let id = info.schema_id().to_string();
    let file = info.path.display().to_string();

    let validity = validator::check_valid(&info.schema);
    if !validity.is_empty() {
        push_unless_skipped(
            out,
            config,
            &id,
            Diagnostic::error(
                DiagnosticCode::RobustnessInvalidSchema,
                format!("'{id}' is not a valid JSON Schema: {}", validity.join("; ")),
            )
            .with_location(Location::new(file.clone())),
        );
    }

    for violation in validator::check_secure(&info.schema) {
        push_unless_skipped(
            out,
            config,
            &id,
            Diagnostic::error(DiagnosticCode::RobustnessInsecurePattern, violation)
                .with_location(Location::new(file.clone())),
        );
    }

    walk(&info.schema, "", info, config, out);

    check_examples(info, config, out);
}

/// Recursive descent through schema positions only (property values,
/// items, additionalProperties, oneOf/allOf branches) - example data and
/// other literal values are never visited.
fn walk(node: &Value, pointer: &str, info: &SchemaInfo, config: &Config, out: &mut Vec<Diagnostic>) {
    let Value::Object(map) = node else {
        return;
    };
    let id = info.schema_id().to_string();
    let file = info.path.display().to_string();

    // type must be a single string, never a union.
    if let Some(Value::Array(_)) = map.get("type") {
        push_unless_skipped(
            out,
            config,
            &id,
            Diagnostic::error(
                DiagnosticCode::RobustnessUnionType,
                format!("'{id}' declares a union type at {}", pointer_or_root(pointer)),
            )
            .with_location(Location::with_pointer(file.clone(), join(pointer, "type"))),
        );
    }

    let node_type = document::type_str(node);

    // Arrays must say what their items are.
    if node_type == Some("array") {
        let items_typed = map
            .get("items")
            .map(|items| document::type_str(items).is_some())
            .unwrap_or(false);
        if !items_typed {
            push_unless_skipped(
                out,
                config,
                &id,
                Diagnostic::error(
                    DiagnosticCode::RobustnessArrayItemsUntyped,
                    format!(
                        "array at {} in '{id}' does not declare items.type",
                        pointer_or_root(pointer)
                    ),
                )
                .with_location(Location::with_pointer(file.clone(), join(pointer, "items"))),
            );
        }
    }

    // Objects must declare some shape.
    if node_type == Some("object") {
        let shaped = ["properties", "oneOf", "allOf", "additionalProperties"]
            .iter()
            .any(|key| map.contains_key(*key));
        if !shaped {
            push_unless_skipped(
                out,
                config,
                &id,
                Diagnostic::error(
                    DiagnosticCode::RobustnessObjectShapeless,
                    format!(
                        "object at {} in '{id}' declares no properties, oneOf, allOf or additionalProperties",
                        pointer_or_root(pointer)
                    ),
                )
                .with_location(Location::with_pointer(file.clone(), pointer_or_root(pointer))),
            );
        }
    }

    // additionalProperties sub-schemas need a deterministic type.
    if let Some(additional) = map.get("additionalProperties") {
        if additional.is_object() && document::type_str(additional).is_none() {
            push_unless_skipped(
                out,
                config,
                &id,
                Diagnostic::error(
                    DiagnosticCode::RobustnessAdditionalPropsUntyped,
                    format!(
                        "additionalProperties at {} in '{id}' has no deterministic type",
                        pointer_or_root(pointer)
                    ),
                )
                .with_location(Location::with_pointer(
                    file.clone(),
                    join(pointer, "additionalProperties"),
                )),
            );
        }
    }

    // oneOf branches must agree on type (and required sets for objects).
    if let Some(Value::Array(branches)) = map.get("oneOf") {
        check_one_of(branches, pointer, info, config, out);
    }

    // Every required property must be declared.
    if let Some(Value::Array(required)) = map.get("required") {
        let declared: BTreeSet<&str> = map
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().map(String::as_str).collect())
            .unwrap_or_default();

        for name in required.iter().filter_map(Value::as_str) {
            if !declared.contains(name) {
                push_unless_skipped(
                    out,
                    config,
                    &id,
                    Diagnostic::error(
                        DiagnosticCode::RobustnessRequiredUndeclared,
                        format!(
                            "required property '{name}' at {} in '{id}' is not declared in properties",
                            pointer_or_root(pointer)
                        ),
                    )
                    .with_location(Location::with_pointer(file.clone(), join(pointer, "required"))),
                );
            }
        }
    }

    // Numeric nodes must carry enforced bounds when configured.
    if let Some((min, max)) = config.enforced_numeric_bounds {
        if matches!(node_type, Some("number") | Some("integer")) {
            let within = |key: &str, low: f64, high: f64| {
                map.get(key)
                    .and_then(Value::as_f64)
                    .map(|v| v >= low && v <= high)
                    .unwrap_or(false)
            };
            let ok = within("minimum", min as f64, max as f64)
                && within("maximum", min as f64, max as f64);
            if !ok {
                push_unless_skipped(
                    out,
                    config,
                    &id,
                    Diagnostic::error(
                        DiagnosticCode::RobustnessMissingNumericBounds,
                        format!(
                            "numeric node at {} in '{id}' lacks minimum/maximum within [{min}, {max}]",
                            pointer_or_root(pointer)
                        ),
                    )
                    .with_location(Location::with_pointer(file.clone(), pointer_or_root(pointer))),
                );
            }
        }
    }

    // Property keys must be snake_case; then recurse into sub-schemas.
    if let Some(Value::Object(properties)) = map.get("properties") {
        for (name, sub) in properties {
            if !is_snake_case(name) {
                push_unless_skipped(
                    out,
                    config,
                    &id,
                    Diagnostic::error(
                        DiagnosticCode::RobustnessPropertyNotSnakeCase,
                        format!("property '{name}' in '{id}' is not snake_case"),
                    )
                    .with_location(Location::with_pointer(
                        file.clone(),
                        join(&join(pointer, "properties"), name),
                    )),
                );
            }
            walk(sub, &join(&join(pointer, "properties"), name), info, config, out);
        }
    }

    if let Some(items) = map.get("items") {
        walk(items, &join(pointer, "items"), info, config, out);
    }

    if let Some(additional) = map.get("additionalProperties") {
        if additional.is_object() {
            walk(additional, &join(pointer, "additionalProperties"), info, config, out);
        }
    }

    for keyword in ["oneOf", "allOf"] {
        if let Some(Value::Array(branches)) = map.get(keyword) {
            for (index, branch) in branches.iter().enumerate() {
                walk(branch, &join(&join(pointer, keyword), &index.to_string()), info, config, out);
            }
        }
    }
}

fn check_one_of(
    branches: &[Value],
    pointer: &str,
    info: &SchemaInfo,
    config: &Config,
    out: &mut Vec<Diagnostic>,
) {
    let id = info.schema_id().to_string();
    let file = info.path.display().to_string();

    let types: BTreeSet<Option<&str>> = branches.iter().map(document::type_str).collect();
    if types.len() > 1 {
        push_unless_skipped(
            out,
            config,
            &id,
            Diagnostic::error(
                DiagnosticCode::RobustnessOneOfTypeDivergent,
                format!(
                    "oneOf branches at {} in '{id}' declare diverging types",
                    pointer_or_root(pointer)
                ),
            )
            .with_location(Location::with_pointer(file.clone(), join(pointer, "oneOf"))),
        );
        return;
    }

    if types.into_iter().next().flatten() == Some("object") {
        let required_sets: BTreeSet<BTreeSet<&str>> = branches
            .iter()
            .map(|branch| {
                branch
                    .get("required")
                    .and_then(Value::as_array)
                    .map(|names| names.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default()
            })
            .collect();

        if required_sets.len() > 1 {
            push_unless_skipped(
                out,
                config,
                &id,
                Diagnostic::error(
                    DiagnosticCode::RobustnessOneOfRequiredDivergent,
                    format!(
                        "oneOf object branches at {} in '{id}' declare diverging required sets",
                        pointer_or_root(pointer)
                    ),
                )
                .with_location(Location::with_pointer(file, join(pointer, "oneOf"))),
            );
        }
    }
}

/// Examples must validate against their schema and reference it via
/// `$schema`.
fn check_examples(info: &SchemaInfo, config: &Config, out: &mut Vec<Diagnostic>) {
    let id = info.schema_id().to_string();
    let file = info.path.display().to_string();

    let Some(Value::Array(examples)) = info.schema.get("examples") else {
        return;
    };

    for (index, example) in examples.iter().enumerate() {
        let errors = validator::validate_instance(&info.schema, example);
        if !errors.is_empty() {
            push_unless_skipped(
                out,
                config,
                &id,
                Diagnostic::error(
                    DiagnosticCode::RobustnessExampleInvalid,
                    format!("example {index} of '{id}' fails validation: {}", errors.join("; ")),
                )
                .with_location(Location::with_pointer(file.clone(), format!("examples/{index}"))),
            );
        }

        let example_schema = example.get("$schema").and_then(Value::as_str);
        if example_schema != Some(id.as_str()) {
            push_unless_skipped(
                out,
                config,
                &id,
                Diagnostic::error(
                    DiagnosticCode::RobustnessExampleSchemaMismatch,
                    format!("example {index} of '{id}' does not reference its schema via $schema"),
                )
                .with_comparison(id.clone(), example_schema.unwrap_or("<missing>"))
                .with_location(Location::with_pointer(file.clone(), format!("examples/{index}"))),
            );
        }
    }
}

fn is_snake_case(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c == '$' || c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn join(pointer: &str, segment: &str) -> String {
    if pointer.is_empty() {
        segment.to_string()
    } else {
        format!("{pointer}/{segment}")
    }
}

fn pointer_or_root(pointer: &str) -> String {
    if pointer.is_empty() {
        "(root)".to_string()
    } else {
        pointer.to_string()
    }
}
