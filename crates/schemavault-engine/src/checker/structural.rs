//! Structural rules
//!
//! Per title group: all files share one directory, a current source
//! exists, no stray extensionless current symlink, the current source's
//! version is materialized and round-trips through dereferencing, the
//! latest symlinks point at the highest version, every materialized
//! version carries every content type with matching symlinks and
//! deep-equal variants.

use super::push_unless_skipped;
use crate::bounds::enforce_bounds;
use crate::dereference::Dereferencer;
use crate::resolver::Resolver;
use crate::scanner::{SchemaInfo, VersionGroups};
use schemavault_core::config::Config;
use schemavault_core::diagnostic::{Diagnostic, DiagnosticCode, Location, Severity};
use schemavault_core::version::SemVer;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub fn check(groups: &VersionGroups, config: &Config) -> Vec<Diagnostic> {
    let resolver = Resolver::new(config.schema_base_uris.clone(), config.root.clone());
    let mut out = Vec::new();

    for (title, majors) in groups {
        let infos: Vec<&SchemaInfo> = majors.values().flatten().collect();
        check_title(title, &infos, config, &resolver, &mut out);
    }

    out
}

fn check_title(
    title: &str,
    infos: &[&SchemaInfo],
    config: &Config,
    resolver: &Resolver,
    out: &mut Vec<Diagnostic>,
) {
    let Some(first) = infos.first() else {
        return;
    };
    let group_id = first.schema_id().to_string();
    let directory = first.directory().to_path_buf();
    let primary = config.primary_content_type();

    // All files for one title live in the same directory.
    let directories: BTreeSet<&Path> = infos.iter().map(|i| i.directory()).collect();
    if directories.len() > 1 {
        push_unless_skipped(
            out,
            config,
            &group_id,
            Diagnostic::error(
                DiagnosticCode::StructureSplitDirectory,
                format!("schema '{title}' is spread over {} directories", directories.len()),
            )
            .with_location(Location::new(first.path.display().to_string())),
        );
    }

    // A current source must exist.
    let current = infos.iter().find(|i| i.current);
    match current {
        None => {
            push_unless_skipped(
                out,
                config,
                &group_id,
                Diagnostic::error(
                    DiagnosticCode::StructureMissingCurrent,
                    format!("schema '{title}' has no {} source", config.current_name),
                )
                .with_location(Location::new(directory.display().to_string())),
            );
        }
        Some(current) => {
            check_current(title, current, infos, config, resolver, out);
        }
    }

    // No stray extensionless "current" symlink.
    let stray = directory.join(config.current_stem());
    if std::fs::symlink_metadata(&stray).is_ok() {
        push_unless_skipped(
            out,
            config,
            &group_id,
            Diagnostic::error(
                DiagnosticCode::StructureStrayCurrentSymlink,
                format!("stray extensionless symlink '{}'", stray.display()),
            )
            .with_location(Location::new(stray.display().to_string())),
        );
    }

    let materialized: Vec<&&SchemaInfo> = infos.iter().filter(|i| !i.current).collect();

    // Latest symlinks resolve to the highest materialized version.
    if config.should_symlink_latest {
        if let Some(highest) = materialized.iter().map(|i| i.version).max() {
            check_latest(&group_id, &directory, highest, config, out);
        }
    }

    // Per materialized version: every content type, correct extensionless
    // symlink, deep-equal variants.
    let mut by_version: BTreeMap<SemVer, Vec<&SchemaInfo>> = BTreeMap::new();
    for info in &materialized {
        by_version.entry(info.version).or_default().push(**info);
    }

    for (version, variants) in &by_version {
        let version_id = variants[0].schema_id().to_string();

        for content_type in &config.content_types {
            if !variants.iter().any(|v| v.content_type == *content_type) {
                push_unless_skipped(
                    out,
                    config,
                    &version_id,
                    Diagnostic::error(
                        DiagnosticCode::StructureMissingContentType,
                        format!(
                            "version {version} of '{title}' is missing or unreadable as {content_type}"
                        ),
                    )
                    .with_location(Location::new(
                        directory.join(format!("{version}.{content_type}")).display().to_string(),
                    )),
                );
            }
        }

        if config.should_symlink_extensionless {
            let link = directory.join(version.to_string());
            let expected = format!("{version}.{primary}");
            if !symlink_targets(&link, &expected) {
                push_unless_skipped(
                    out,
                    config,
                    &version_id,
                    Diagnostic::error(
                        DiagnosticCode::StructureBadVersionSymlink,
                        format!("symlink '{}' does not target '{expected}'", link.display()),
                    )
                    .with_location(Location::new(link.display().to_string())),
                );
            }
        }

        if let Some(reference) = variants.iter().find(|v| v.content_type == primary) {
            for variant in variants {
                if variant.content_type != primary && variant.schema != reference.schema {
                    push_unless_skipped(
                        out,
                        config,
                        &version_id,
                        Diagnostic::error(
                            DiagnosticCode::StructureVariantMismatch,
                            format!(
                                "'{}' is not deep-equal to '{}'",
                                variant.path.display(),
                                reference.path.display()
                            ),
                        )
                        .with_location(Location::new(variant.path.display().to_string())),
                    );
                }
            }
        }
    }
}

/// The current source's extracted version must be materialized and, after
/// both sides go through the dereference pipeline, deep-equal to it.
fn check_current(
    title: &str,
    current: &SchemaInfo,
    infos: &[&SchemaInfo],
    config: &Config,
    resolver: &Resolver,
    out: &mut Vec<Diagnostic>,
) {
    let id = current.schema_id().to_string();
    let primary = config.primary_content_type();

    let Some(artifact) = infos
        .iter()
        .find(|i| !i.current && i.version == current.version && i.content_type == primary)
    else {
        push_unless_skipped(
            out,
            config,
            &id,
            Diagnostic::error(
                DiagnosticCode::StructureCurrentNotMaterialized,
                format!(
                    "current version {} of '{title}' has no materialized {primary} artifact",
                    current.version
                ),
            )
            .with_location(Location::new(current.path.display().to_string())),
        );
        return;
    };

    let expected = match pipeline(&current.schema, config, resolver) {
        Ok(doc) => doc,
        Err(reason) => {
            out.push(
                Diagnostic::new(
                    DiagnosticCode::Warning,
                    Severity::Warn,
                    format!("cannot verify round-trip for '{title}': {reason}"),
                )
                .with_location(Location::new(current.path.display().to_string())),
            );
            return;
        }
    };
    let actual = match pipeline(&artifact.schema, config, resolver) {
        Ok(doc) => doc,
        Err(reason) => {
            out.push(
                Diagnostic::new(
                    DiagnosticCode::Warning,
                    Severity::Warn,
                    format!("cannot verify round-trip for '{title}': {reason}"),
                )
                .with_location(Location::new(artifact.path.display().to_string())),
            );
            return;
        }
    };

    if expected != actual {
        push_unless_skipped(
            out,
            config,
            &id,
            Diagnostic::error(
                DiagnosticCode::StructureCurrentDiverged,
                format!(
                    "dereferenced '{}' differs from materialized '{}'; re-materialization needed",
                    current.path.display(),
                    artifact.path.display()
                ),
            )
            .with_location(Location::new(artifact.path.display().to_string())),
        );
    }
}

/// Apply the same transformation materialization applies
fn pipeline(schema: &Value, config: &Config, resolver: &Resolver) -> Result<Value, String> {
    let mut doc = if config.should_dereference {
        Dereferencer::new(resolver)
            .dereference(schema)
            .map_err(|e| e.to_string())?
    } else {
        schema.clone()
    };
    if let Some(bounds) = config.enforced_numeric_bounds {
        doc = enforce_bounds(&doc, bounds);
    }
    Ok(doc)
}

fn check_latest(
    group_id: &str,
    directory: &Path,
    highest: SemVer,
    config: &Config,
    out: &mut Vec<Diagnostic>,
) {
    for content_type in &config.content_types {
        let link = directory.join(format!("latest.{content_type}"));
        let expected = format!("{highest}.{content_type}");
        if !symlink_targets(&link, &expected) {
            push_unless_skipped(
                out,
                config,
                group_id,
                Diagnostic::error(
                    DiagnosticCode::StructureLatestOutdated,
                    format!("'{}' does not resolve to '{expected}'", link.display()),
                )
                .with_location(Location::new(link.display().to_string())),
            );
        }
    }

    if config.should_symlink_extensionless {
        let link = directory.join("latest");
        let expected = format!("latest.{}", config.primary_content_type());
        if !symlink_targets(&link, &expected) {
            push_unless_skipped(
                out,
                config,
                group_id,
                Diagnostic::error(
                    DiagnosticCode::StructureLatestOutdated,
                    format!("'{}' does not resolve to '{expected}'", link.display()),
                )
                .with_location(Location::new(link.display().to_string())),
            );
        }
    }
}

/// Whether `link` is a symlink whose target is exactly `expected`
fn symlink_targets(link: &Path, expected: &str) -> bool {
    std::fs::read_link(link)
        .map(|target| target == Path::new(expected))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materialize::Materializer;
    use schemavault_core::serialize;
    use serde_json::json;
    use tempfile::TempDir;

    fn config_for(root: &Path) -> Config {
        Config {
            should_dereference: false,
            root: root.to_path_buf(),
            ..Default::default()
        }
    }

    fn write_current(dir: &Path, doc: &Value) {
        std::fs::create_dir_all(dir).unwrap();
        let text = serialize::serialize(doc, schemavault_core::ContentType::Yaml).unwrap();
        std::fs::write(dir.join("current.yaml"), text).unwrap();
    }

    fn doc(title: &str, version: &str) -> Value {
        json!({
            "$id": format!("/{title}/{version}"),
            "title": title,
            "type": "object",
            "properties": { "name": { "type": "string" } }
        })
    }

    fn scan(root: &Path, config: &Config) -> VersionGroups {
        let infos = crate::scanner::find_all_schemas_info(root, config).unwrap();
        crate::scanner::find_schemas_by_title_and_major(infos)
    }

    #[test]
    fn clean_materialized_repository_passes() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("basic");
        let config = config_for(tmp.path());

        write_current(&dir, &doc("basic", "1.0.0"));
        Materializer::new(&config)
            .materialize_current(&dir.join("current.yaml"))
            .unwrap();

        let diagnostics = check(&scan(tmp.path(), &config), &config);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
    }

    #[test]
    fn missing_current_source_is_flagged() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("basic");
        std::fs::create_dir_all(&dir).unwrap();
        let config = config_for(tmp.path());

        let text = serialize::serialize(&doc("basic", "1.0.0"), schemavault_core::ContentType::Yaml).unwrap();
        std::fs::write(dir.join("1.0.0.yaml"), &text).unwrap();
        let json_text = serialize::serialize(&doc("basic", "1.0.0"), schemavault_core::ContentType::Json).unwrap();
        std::fs::write(dir.join("1.0.0.json"), json_text).unwrap();

        let diagnostics = check(&scan(tmp.path(), &config), &config);
        assert!(diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::StructureMissingCurrent));
    }

    #[test]
    fn unmaterialized_current_is_flagged() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("basic");
        let config = config_for(tmp.path());
        write_current(&dir, &doc("basic", "1.1.0"));

        let diagnostics = check(&scan(tmp.path(), &config), &config);
        assert!(diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::StructureCurrentNotMaterialized));
    }

    #[test]
    fn diverged_current_is_flagged() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("basic");
        let config = config_for(tmp.path());

        write_current(&dir, &doc("basic", "1.0.0"));
        Materializer::new(&config)
            .materialize_current(&dir.join("current.yaml"))
            .unwrap();

        // Edit current without re-materializing.
        let mut edited = doc("basic", "1.0.0");
        edited["properties"]["extra"] = json!({ "type": "string" });
        write_current(&dir, &edited);

        let diagnostics = check(&scan(tmp.path(), &config), &config);
        assert!(diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::StructureCurrentDiverged));
    }

    #[test]
    fn missing_content_type_is_flagged() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("basic");
        let config = config_for(tmp.path());

        write_current(&dir, &doc("basic", "1.0.0"));
        Materializer::new(&config)
            .materialize_current(&dir.join("current.yaml"))
            .unwrap();
        std::fs::remove_file(dir.join("1.0.0.json")).unwrap();

        let diagnostics = check(&scan(tmp.path(), &config), &config);
        assert!(diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::StructureMissingContentType));
    }

    #[test]
    fn outdated_latest_is_flagged() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("basic");
        let config = config_for(tmp.path());

        write_current(&dir, &doc("basic", "1.0.0"));
        Materializer::new(&config)
            .materialize_current(&dir.join("current.yaml"))
            .unwrap();

        write_current(&dir, &doc("basic", "1.1.0"));
        Materializer::new(&config)
            .materialize_current(&dir.join("current.yaml"))
            .unwrap();

        // Rewind latest.yaml to the older version behind the tool's back.
        std::fs::remove_file(dir.join("latest.yaml")).unwrap();
        std::os::unix::fs::symlink("1.0.0.yaml", dir.join("latest.yaml")).unwrap();

        let diagnostics = check(&scan(tmp.path(), &config), &config);
        assert!(diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::StructureLatestOutdated));
    }

    #[test]
    fn stray_current_symlink_is_flagged() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("basic");
        let config = config_for(tmp.path());

        write_current(&dir, &doc("basic", "1.0.0"));
        Materializer::new(&config)
            .materialize_current(&dir.join("current.yaml"))
            .unwrap();
        std::os::unix::fs::symlink("current.yaml", dir.join("current")).unwrap();

        let diagnostics = check(&scan(tmp.path(), &config), &config);
        assert!(diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::StructureStrayCurrentSymlink));
    }

    #[test]
    fn variant_mismatch_is_flagged() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("basic");
        let config = config_for(tmp.path());

        write_current(&dir, &doc("basic", "1.0.0"));
        Materializer::new(&config)
            .materialize_current(&dir.join("current.yaml"))
            .unwrap();

        // Corrupt the json variant.
        let mut edited = doc("basic", "1.0.0");
        edited["properties"]["sneaky"] = json!({ "type": "integer" });
        let text = serialize::serialize(&edited, schemavault_core::ContentType::Json).unwrap();
        std::fs::write(dir.join("1.0.0.json"), text).unwrap();

        let diagnostics = check(&scan(tmp.path(), &config), &config);
        assert!(diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::StructureVariantMismatch));
    }

    #[test]
    fn skip_list_suppresses_rules() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("basic");
        let mut config = config_for(tmp.path());
        config.skip_checks.insert(
            "^/basic/".to_string(),
            vec!["STRUCTURE_CURRENT_NOT_MATERIALIZED".to_string()],
        );

        write_current(&dir, &doc("basic", "1.1.0"));

        let diagnostics = check(&scan(tmp.path(), &config), &config);
        assert!(!diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::StructureCurrentNotMaterialized));
    }
}
