//! Backward-compatibility rules
//!
//! Within each title + major-version group, every consecutive pair of
//! materialized versions (primary content type only, ascending order) is
//! compared old-to-new: old keys must survive with recursively equal
//! values except the allow-list (`$id`, `description`, `examples`),
//! required sets must be exactly equal, and enums may only grow.

use super::push_unless_skipped;
use crate::scanner::{SchemaInfo, VersionGroups};
use schemavault_core::config::Config;
use schemavault_core::diagnostic::{Diagnostic, DiagnosticCode, Location};
use serde_json::Value;
use std::collections::BTreeSet;

/// Keys allowed to change freely between versions
const ALLOWED_CHANGES: &[&str] = &["$id", "description", "examples"];

pub fn check(groups: &VersionGroups, config: &Config) -> Vec<Diagnostic> {
    let primary = config.primary_content_type();
    let mut out = Vec::new();

    for majors in groups.values() {
        for infos in majors.values() {
            let versions: Vec<&SchemaInfo> = infos
                .iter()
                .filter(|i| !i.current && i.content_type == primary)
                .collect();

            // The scanner orders ascending by version already.
            for pair in versions.windows(2) {
                check_pair(pair[0], pair[1], config, &mut out);
            }
        }
    }

    out
}

fn check_pair(old: &SchemaInfo, new: &SchemaInfo, config: &Config, out: &mut Vec<Diagnostic>) {
    let pair = VersionPair {
        id: new.schema_id().to_string(),
        file: new.path.display().to_string(),
        label: format!("{} -> {}", old.version, new.version),
    };

    compare(&old.schema, &new.schema, "", &pair, config, out);
}

/// Shared context for one old/new comparison
struct VersionPair {
    id: String,
    file: String,
    label: String,
}

impl VersionPair {
    fn diagnostic(&self, code: DiagnosticCode, pointer: &str, detail: String) -> Diagnostic {
        Diagnostic::error(code, format!("'{}' ({}): {detail}", self.id, self.label))
            .with_location(Location::with_pointer(self.file.clone(), pointer.to_string()))
    }
}

fn compare(
    old: &Value,
    new: &Value,
    pointer: &str,
    pair: &VersionPair,
    config: &Config,
    out: &mut Vec<Diagnostic>,
) {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            check_required_sets(old_map, new_map, pointer, pair, config, out);
            check_enum_superset(old_map, new_map, pointer, pair, config, out);

            for (key, old_value) in old_map {
                if ALLOWED_CHANGES.contains(&key.as_str()) || key == "required" || key == "enum" {
                    continue;
                }

                match new_map.get(key) {
                    Some(new_value) => {
                        compare(old_value, new_value, &join(pointer, key), pair, config, out);
                    }
                    None => {
                        push_unless_skipped(
                            out,
                            config,
                            &pair.id,
                            pair.diagnostic(
                                DiagnosticCode::CompatKeyRemoved,
                                &join(pointer, key),
                                format!("key '{}' was removed", join(pointer, key)),
                            ),
                        );
                    }
                }
            }
        }
        (Value::Array(old_items), Value::Array(new_items)) => {
            if old_items.len() != new_items.len() {
                push_unless_skipped(
                    out,
                    config,
                    &pair.id,
                    pair.diagnostic(
                        DiagnosticCode::CompatValueChanged,
                        &pointer_or_root(pointer),
                        format!("array at {} changed length", pointer_or_root(pointer)),
                    )
                    .with_comparison(old_items.len().to_string(), new_items.len().to_string()),
                );
                return;
            }

            for (index, (old_item, new_item)) in old_items.iter().zip(new_items).enumerate() {
                compare(
                    old_item,
                    new_item,
                    &join(pointer, &index.to_string()),
                    pair,
                    config,
                    out,
                );
            }
        }
        (old_value, new_value) => {
            if old_value != new_value {
                push_unless_skipped(
                    out,
                    config,
                    &pair.id,
                    pair.diagnostic(
                        DiagnosticCode::CompatValueChanged,
                        &pointer_or_root(pointer),
                        format!("value at {} changed", pointer_or_root(pointer)),
                    )
                    .with_comparison(old_value.to_string(), new_value.to_string()),
                );
            }
        }
    }
}

/// `required` must be set-equal between versions; adding or removing a
/// required property breaks consumers either way.
fn check_required_sets(
    old_map: &serde_json::Map<String, Value>,
    new_map: &serde_json::Map<String, Value>,
    pointer: &str,
    pair: &VersionPair,
    config: &Config,
    out: &mut Vec<Diagnostic>,
) {
    let old_required = string_set(old_map.get("required"));
    let new_required = string_set(new_map.get("required"));

    if old_required != new_required {
        push_unless_skipped(
            out,
            config,
            &pair.id,
            pair.diagnostic(
                DiagnosticCode::CompatRequiredChanged,
                &join(pointer, "required"),
                format!("required set at {} changed", pointer_or_root(pointer)),
            )
            .with_comparison(format!("{old_required:?}"), format!("{new_required:?}")),
        );
    }
}

/// The newer enum must contain every value the older one had.
fn check_enum_superset(
    old_map: &serde_json::Map<String, Value>,
    new_map: &serde_json::Map<String, Value>,
    pointer: &str,
    pair: &VersionPair,
    config: &Config,
    out: &mut Vec<Diagnostic>,
) {
    let Some(Value::Array(old_enum)) = old_map.get("enum") else {
        return;
    };

    let missing: Vec<&Value> = match new_map.get("enum") {
        Some(Value::Array(new_enum)) => old_enum
            .iter()
            .filter(|value| !new_enum.contains(value))
            .collect(),
        _ => old_enum.iter().collect(),
    };

    if !missing.is_empty() {
        let lost: Vec<String> = missing.iter().map(|v| v.to_string()).collect();
        push_unless_skipped(
            out,
            config,
            &pair.id,
            pair.diagnostic(
                DiagnosticCode::CompatEnumShrunk,
                &join(pointer, "enum"),
                format!(
                    "enum at {} lost values: {}",
                    pointer_or_root(pointer),
                    lost.join(", ")
                ),
            ),
        );
    }
}

fn string_set(value: Option<&Value>) -> BTreeSet<&str> {
    value
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
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

#[cfg(test)]
mod tests {
    use super::*;
    use schemavault_core::{ContentType, SemVer};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn info(version: SemVer, schema: Value) -> SchemaInfo {
        SchemaInfo {
            title: "basic".to_string(),
            path: PathBuf::from(format!("schemas/basic/{version}.yaml")),
            version,
            current: false,
            content_type: ContentType::Yaml,
            schema,
        }
    }

    fn run(old: Value, new: Value) -> Vec<Diagnostic> {
        run_with_config(old, new, &Config::default())
    }

    fn run_with_config(old: Value, new: Value, config: &Config) -> Vec<Diagnostic> {
        let mut majors = BTreeMap::new();
        majors.insert(
            1u64,
            vec![info(SemVer::new(1, 0, 0), old), info(SemVer::new(1, 1, 0), new)],
        );
        let mut groups: VersionGroups = BTreeMap::new();
        groups.insert("basic".to_string(), majors);

        check(&groups, config)
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<DiagnosticCode> {
        diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn identical_versions_are_compatible() {
        let schema = json!({
            "$id": "/basic/1.0.0",
            "title": "basic",
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"]
        });

        let diagnostics = run(schema.clone(), schema);
        assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
    }

    #[test]
    fn allow_listed_fields_may_change() {
        let old = json!({
            "$id": "/basic/1.0.0",
            "description": "old words",
            "title": "basic",
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "examples": [ { "name": "a" } ]
        });
        let new = json!({
            "$id": "/basic/1.1.0",
            "description": "new words",
            "title": "basic",
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "examples": [ { "name": "b" }, { "name": "c" } ]
        });

        assert!(run(old, new).is_empty());
    }

    #[test]
    fn adding_an_optional_property_is_compatible() {
        let old = json!({
            "$id": "/basic/1.0.0",
            "title": "basic",
            "type": "object",
            "properties": { "name": { "type": "string" } }
        });
        let new = json!({
            "$id": "/basic/1.1.0",
            "title": "basic",
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "added": { "type": "integer" }
            }
        });

        assert!(run(old, new).is_empty());
    }

    #[test]
    fn removed_property_fails_with_path() {
        let old = json!({
            "$id": "/basic/1.0.0",
            "title": "basic",
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "gone": { "type": "integer" }
            }
        });
        let new = json!({
            "$id": "/basic/1.1.0",
            "title": "basic",
            "type": "object",
            "properties": { "name": { "type": "string" } }
        });

        let diagnostics = run(old, new);
        let diag = diagnostics
            .iter()
            .find(|d| d.code == DiagnosticCode::CompatKeyRemoved)
            .unwrap();
        assert_eq!(
            diag.location.as_ref().unwrap().pointer.as_deref(),
            Some("properties/gone")
        );
    }

    #[test]
    fn type_change_fails() {
        let old = json!({
            "$id": "/basic/1.0.0",
            "title": "basic",
            "type": "object",
            "properties": { "name": { "type": "string" } }
        });
        let new = json!({
            "$id": "/basic/1.1.0",
            "title": "basic",
            "type": "object",
            "properties": { "name": { "type": "integer" } }
        });

        let diagnostics = run(old, new);
        assert!(codes(&diagnostics).contains(&DiagnosticCode::CompatValueChanged));
    }

    #[test]
    fn required_change_fails_both_directions() {
        let base = json!({
            "$id": "/basic/1.0.0",
            "title": "basic",
            "type": "object",
            "properties": {
                "a": { "type": "string" },
                "b": { "type": "string" }
            },
            "required": ["a"]
        });

        let mut grown = base.clone();
        grown["required"] = json!(["a", "b"]);
        let diagnostics = run(base.clone(), grown);
        assert!(codes(&diagnostics).contains(&DiagnosticCode::CompatRequiredChanged));

        let mut shrunk = base.clone();
        shrunk["required"] = json!([]);
        let diagnostics = run(base, shrunk);
        assert!(codes(&diagnostics).contains(&DiagnosticCode::CompatRequiredChanged));
    }

    #[test]
    fn required_reorder_is_compatible() {
        let old = json!({
            "$id": "/basic/1.0.0",
            "title": "basic",
            "type": "object",
            "properties": {
                "a": { "type": "string" },
                "b": { "type": "string" }
            },
            "required": ["a", "b"]
        });
        let mut new = old.clone();
        new["required"] = json!(["b", "a"]);

        assert!(run(old, new).is_empty());
    }

    #[test]
    fn enum_superset_passes_and_shrink_fails() {
        let old = json!({
            "$id": "/basic/1.0.0",
            "title": "basic",
            "type": "object",
            "properties": {
                "state": { "type": "string", "enum": ["val1", "val2"] }
            }
        });

        let mut grown = old.clone();
        grown["properties"]["state"]["enum"] = json!(["val2", "val1", "val3"]);
        assert!(run(old.clone(), grown).is_empty());

        let mut shrunk = old.clone();
        shrunk["properties"]["state"]["enum"] = json!(["val1"]);
        let diagnostics = run(old, shrunk);
        let diag = diagnostics
            .iter()
            .find(|d| d.code == DiagnosticCode::CompatEnumShrunk)
            .unwrap();
        assert!(diag.message.contains("val2"));
    }

    #[test]
    fn removing_the_whole_enum_fails() {
        let old = json!({
            "$id": "/basic/1.0.0",
            "title": "basic",
            "type": "object",
            "properties": {
                "state": { "type": "string", "enum": ["val1"] }
            }
        });
        let mut new = old.clone();
        new["properties"]["state"]
            .as_object_mut()
            .unwrap()
            .remove("enum");

        let diagnostics = run(old, new);
        assert!(codes(&diagnostics).contains(&DiagnosticCode::CompatEnumShrunk));
    }

    #[test]
    fn shape_mismatch_fails() {
        let old = json!({
            "$id": "/basic/1.0.0",
            "title": "basic",
            "type": "object",
            "properties": { "thing": { "type": "object", "properties": { "x": { "type": "string" } } } }
        });
        let new = json!({
            "$id": "/basic/1.1.0",
            "title": "basic",
            "type": "object",
            "properties": { "thing": { "type": "string" } }
        });

        let diagnostics = run(old, new);
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn current_sources_are_not_compared() {
        let old = json!({
            "$id": "/basic/1.0.0",
            "title": "basic",
            "type": "object",
            "properties": { "gone": { "type": "string" } }
        });
        let new = json!({
            "$id": "/basic/1.1.0",
            "title": "basic",
            "type": "object",
            "properties": {}
        });

        let mut majors = BTreeMap::new();
        let mut incompatible_current = info(SemVer::new(1, 1, 0), new);
        incompatible_current.current = true;
        majors.insert(1u64, vec![info(SemVer::new(1, 0, 0), old), incompatible_current]);
        let mut groups: VersionGroups = BTreeMap::new();
        groups.insert("basic".to_string(), majors);

        assert!(check(&groups, &Config::default()).is_empty());
    }

    #[test]
    fn skip_list_suppresses_compat_rules() {
        let old = json!({
            "$id": "/basic/1.0.0",
            "title": "basic",
            "type": "object",
            "properties": { "gone": { "type": "string" } }
        });
        let new = json!({
            "$id": "/basic/1.1.0",
            "title": "basic",
            "type": "object",
            "properties": {}
        });

        let mut config = Config::default();
        config
            .skip_checks
            .insert("^/basic/".to_string(), vec!["COMPAT_KEY_REMOVED".to_string()]);

        assert!(run_with_config(old, new, &config).is_empty());
    }
}
