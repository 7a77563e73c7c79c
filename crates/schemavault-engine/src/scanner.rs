//! Repository scanning and grouping
//!
//! Walks a directory tree, classifies files as materialized artifacts or
//! "current" sources, and orders them with the dependency heuristic:
//! dependency-like titles (e.g. "common") first, then shallower paths,
//! then ascending versions, with current sources after materialized ones.
//! The ordering is best-effort for `$ref` resolution, not a topological
//! sort.

use crate::version_field::{extract_title, extract_version};
use schemavault_core::config::Config;
use schemavault_core::content_type::ContentType;
use schemavault_core::document;
use schemavault_core::serialize;
use schemavault_core::version::SemVer;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Derived metadata about one schema file on disk.
///
/// Recomputed on every scan; never persisted.
#[derive(Debug, Clone)]
pub struct SchemaInfo {
    /// Grouping title
    pub title: String,

    /// Filesystem location
    pub path: PathBuf,

    /// Semantic version of this file
    pub version: SemVer,

    /// Whether this is the mutable current source, not an artifact
    pub current: bool,

    /// Serialization format of this file
    pub content_type: ContentType,

    /// Parsed document
    pub schema: Value,
}

impl SchemaInfo {
    /// `$id` of the parsed document, or a placeholder
    pub fn schema_id(&self) -> &str {
        document::schema_id_or_unknown(&self.schema)
    }

    /// Directory containing this file
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }
}

/// Scan failure
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("schema base path '{0}' does not exist")]
    MissingBase(String),
}

/// Schemas grouped by title, then by major version
pub type VersionGroups = BTreeMap<String, BTreeMap<u64, Vec<SchemaInfo>>>;

/// Discover every schema file under `base_path`.
///
/// A file qualifies when its extension is a configured content type and
/// its stem is either the configured current name or a bare `X.Y.Z`
/// version. Unreadable or unidentifiable files are skipped with a
/// warning; schemas whose `$id` matches an ignore pattern are dropped.
pub fn find_all_schemas_info(
    base_path: &Path,
    config: &Config,
) -> Result<Vec<SchemaInfo>, ScanError> {
    if !base_path.exists() {
        return Err(ScanError::MissingBase(base_path.display().to_string()));
    }

    let mut infos = Vec::new();

    for entry in WalkDir::new(base_path).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }

        match classify(entry.path(), config) {
            Ok(Some(info)) => {
                if config.is_ignored(info.schema_id()) {
                    tracing::debug!(path = %info.path.display(), "ignored by $id pattern");
                    continue;
                }
                infos.push(info);
            }
            Ok(None) => {}
            Err(reason) => {
                tracing::warn!(path = %entry.path().display(), %reason, "skipping unreadable schema file");
            }
        }
    }

    infos.sort_by(|a, b| heuristic_key(a, config).cmp(&heuristic_key(b, config)));

    Ok(infos)
}

/// Group scan results by title, then by semantic-version major number
pub fn find_schemas_by_title_and_major(infos: Vec<SchemaInfo>) -> VersionGroups {
    let mut groups: VersionGroups = BTreeMap::new();

    for info in infos {
        groups
            .entry(info.title.clone())
            .or_default()
            .entry(info.version.major)
            .or_default()
            .push(info);
    }

    groups
}

/// Decide whether a path is a schema file and read its metadata.
///
/// `Ok(None)` means the file is simply not a schema artifact; `Err`
/// means it should have been one but could not be read.
fn classify(path: &Path, config: &Config) -> Result<Option<SchemaInfo>, String> {
    let Some(content_type) = ContentType::from_path(path) else {
        return Ok(None);
    };
    if !config.content_types.contains(&content_type) {
        return Ok(None);
    }

    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return Ok(None);
    };

    let current = stem == config.current_stem();
    let file_version = if current { None } else { SemVer::parse(stem).ok() };
    if !current && file_version.is_none() {
        return Ok(None);
    }

    let schema = serialize::load_document(path).map_err(|e| e.to_string())?;

    let title = extract_title(&schema, &config.schema_title_field)
        .ok_or_else(|| format!("missing title field '{}'", config.schema_title_field))?;

    // Artifacts take their version from the file name (the on-disk
    // source of truth); current sources from the configured field.
    let version = match file_version {
        Some(v) => v,
        None => extract_version(&schema, &config.schema_version_field)
            .map_err(|e| e.to_string())?,
    };

    Ok(Some(SchemaInfo {
        title,
        path: path.to_path_buf(),
        version,
        current,
        content_type,
        schema,
    }))
}

/// Sort key for the dependency heuristic
fn heuristic_key(info: &SchemaInfo, config: &Config) -> (u8, usize, String, SemVer, u8) {
    let dependency_rank = if config
        .dependency_markers
        .iter()
        .any(|marker| info.title.contains(marker.as_str()))
    {
        0
    } else {
        1
    };

    (
        dependency_rank,
        info.path.components().count(),
        info.title.clone(),
        info.version,
        u8::from(info.current),
    )
}
