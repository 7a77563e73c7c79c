//! Configuration schema (schemavault.toml)

use crate::content_type::ContentType;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Content types to materialize, in order. The first entry is the
    /// primary type: extensionless symlinks point at its artifact.
    #[serde(default = "default_content_types")]
    pub content_types: Vec<ContentType>,

    /// Dotted path to the version-bearing schema field
    #[serde(default = "default_version_field")]
    pub schema_version_field: String,

    /// Dotted path to the grouping title field
    #[serde(default = "default_title_field")]
    pub schema_title_field: String,

    /// Expand `$ref` pointers and merge `allOf` during materialization
    #[serde(default = "default_true")]
    pub should_dereference: bool,

    /// Maintain the extensionless `<version>` symlink
    #[serde(default = "default_true")]
    pub should_symlink_extensionless: bool,

    /// Maintain the `latest` symlinks
    #[serde(default = "default_true")]
    pub should_symlink_latest: bool,

    /// Inclusive `[min, max]` injected on numeric nodes lacking explicit
    /// bounds. Disabled when absent.
    #[serde(default)]
    pub enforced_numeric_bounds: Option<(i64, i64)>,

    /// Schemas whose `$id` matches any of these regexes are dropped
    /// during scanning
    #[serde(default)]
    pub ignore_schemas: Vec<String>,

    /// Ordered base URIs tried when resolving a `$ref`
    #[serde(default)]
    pub schema_base_uris: Vec<String>,

    /// File name of the mutable "current" schema source
    #[serde(default = "default_current_name")]
    pub current_name: String,

    /// Title substrings that mark a schema as dependency-like; the
    /// scanner orders those first
    #[serde(default = "default_dependency_markers")]
    pub dependency_markers: Vec<String>,

    /// Consistency rules to skip, keyed by `$id` regex. Values are
    /// diagnostic code names (e.g. `ROBUSTNESS_PROPERTY_NOT_SNAKE_CASE`).
    /// Kept last: TOML tables must follow plain values.
    #[serde(default)]
    pub skip_checks: HashMap<String, Vec<String>>,

    /// Repository root (for resolving relative paths)
    #[serde(skip)]
    pub root: PathBuf,
}

fn default_content_types() -> Vec<ContentType> {
    vec![ContentType::Yaml, ContentType::Json]
}

fn default_version_field() -> String {
    "$id".to_string()
}

fn default_title_field() -> String {
    "title".to_string()
}

fn default_current_name() -> String {
    "current.yaml".to_string()
}

fn default_dependency_markers() -> Vec<String> {
    vec!["common".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_types: default_content_types(),
            schema_version_field: default_version_field(),
            schema_title_field: default_title_field(),
            should_dereference: true,
            should_symlink_extensionless: true,
            should_symlink_latest: true,
            enforced_numeric_bounds: None,
            ignore_schemas: Vec::new(),
            skip_checks: HashMap::new(),
            schema_base_uris: Vec::new(),
            current_name: default_current_name(),
            dependency_markers: default_dependency_markers(),
            root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        // Root defaults to the config file's directory
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                config.root = parent.to_path_buf();
            }
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// The primary content type (first configured)
    pub fn primary_content_type(&self) -> ContentType {
        self.content_types.first().copied().unwrap_or(ContentType::Yaml)
    }

    /// Base name of the current source without its extension ("current")
    pub fn current_stem(&self) -> &str {
        Path::new(&self.current_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.current_name)
    }

    /// Whether a schema `$id` matches the ignore list
    pub fn is_ignored(&self, schema_id: &str) -> bool {
        matches_any(schema_id, &self.ignore_schemas)
    }

    /// Whether a consistency rule is skipped for a schema `$id`
    pub fn is_check_skipped(&self, schema_id: &str, rule: &str) -> bool {
        self.skip_checks.iter().any(|(pattern, rules)| {
            rules.iter().any(|r| r == rule) && matches_any(schema_id, std::slice::from_ref(pattern))
        })
    }
}

/// Match a string against a list of regexes; unparsable patterns never match
fn matches_any(text: &str, patterns: &[impl AsRef<str>]) -> bool {
    patterns.iter().any(|pattern| {
        Regex::new(pattern.as_ref())
            .map(|re| re.is_match(text))
            .unwrap_or(false)
    })
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
