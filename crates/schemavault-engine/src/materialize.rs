//! Materialization of immutable versioned artifacts
//!
//! Turns a "current" schema source into one artifact file per configured
//! content type plus the convenience symlinks (`<version>` and `latest`).
//! Re-running with unchanged input is idempotent: the same bytes are
//! written to the same paths.

use crate::bounds::enforce_bounds;
use crate::dereference::{Dereferencer, DereferenceError};
use crate::resolver::Resolver;
use crate::version_field::extract_version;
use schemavault_core::config::Config;
use schemavault_core::serialize::{self, SerializeError};
use schemavault_core::version::{SemVer, VersionError};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Materialization failure; aborts the schema being processed
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Dereference(#[from] DereferenceError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error("failed to write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to update symlink '{path}': {source}")]
    Symlink {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Writes versioned artifacts and maintains convenience symlinks
pub struct Materializer<'a> {
    config: &'a Config,
    resolver: Resolver,
    dry_run: bool,
}

impl<'a> Materializer<'a> {
    pub fn new(config: &'a Config) -> Self {
        let resolver = Resolver::new(config.schema_base_uris.clone(), config.root.clone());
        Self {
            config,
            resolver,
            dry_run: false,
        }
    }

    /// Replace the resolver (tests inject in-memory fetchers)
    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Compute everything but skip all filesystem writes
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Materialize a current source file into its own directory
    pub fn materialize_current(&self, current_path: &Path) -> Result<Vec<PathBuf>, MaterializeError> {
        let schema = serialize::load_document(current_path)?;
        let directory = current_path.parent().unwrap_or(Path::new("."));
        self.materialize_to_path(directory, &schema)
    }

    /// Materialize a schema's current version into `directory`.
    ///
    /// Returns every path written or symlinked, in write order. If one
    /// content type fails, later ones are not attempted; files already
    /// written in this call stay on disk.
    pub fn materialize_to_path(
        &self,
        directory: &Path,
        schema: &Value,
    ) -> Result<Vec<PathBuf>, MaterializeError> {
        let version = extract_version(schema, &self.config.schema_version_field)?;

        let mut doc = if self.config.should_dereference {
            Dereferencer::new(&self.resolver).dereference(schema)?
        } else {
            schema.clone()
        };
        if let Some(bounds) = self.config.enforced_numeric_bounds {
            doc = enforce_bounds(&doc, bounds);
        }

        let primary = self.config.primary_content_type();
        let mut written = Vec::new();

        for content_type in &self.config.content_types {
            let text = serialize::serialize(&doc, *content_type)?;
            let path = directory.join(format!("{version}.{content_type}"));
            tracing::debug!(path = %path.display(), dry_run = self.dry_run, "writing artifact");
            if !self.dry_run {
                std::fs::write(&path, text).map_err(|source| MaterializeError::Write {
                    path: path.display().to_string(),
                    source,
                })?;
            }
            written.push(path);
        }

        if self.config.should_symlink_extensionless {
            let link = directory.join(version.to_string());
            self.replace_symlink(&link, &format!("{version}.{primary}"))?;
            written.push(link);
        }

        if self.config.should_symlink_latest && self.should_update_latest(directory, version) {
            for content_type in &self.config.content_types {
                let link = directory.join(format!("latest.{content_type}"));
                self.replace_symlink(&link, &format!("{version}.{content_type}"))?;
                written.push(link);
            }

            if self.config.should_symlink_extensionless {
                let link = directory.join("latest");
                self.replace_symlink(&link, &format!("latest.{primary}"))?;
                written.push(link);
            }
        }

        Ok(written)
    }

    /// `latest` is replaced when no usable latest symlink exists or when
    /// this version is greater-or-equal to the one it resolves to. A
    /// dangling symlink counts as "no latest exists yet".
    fn should_update_latest(&self, directory: &Path, version: SemVer) -> bool {
        let primary = self.config.primary_content_type();
        let link = directory.join(format!("latest.{primary}"));

        let Ok(target) = std::fs::read_link(&link) else {
            return true;
        };
        if !directory.join(&target).exists() {
            return true;
        }

        let existing = target
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|stem| SemVer::parse_lenient(stem).ok());

        match existing {
            Some(existing) => version >= existing,
            None => true,
        }
    }

    /// Remove-then-create symlink update; a relative target keeps the
    /// repository relocatable
    fn replace_symlink(&self, link: &Path, target: &str) -> Result<(), MaterializeError> {
        tracing::debug!(link = %link.display(), target, dry_run = self.dry_run, "updating symlink");
        if self.dry_run {
            return Ok(());
        }

        if std::fs::symlink_metadata(link).is_ok() {
            std::fs::remove_file(link).map_err(|source| MaterializeError::Symlink {
                path: link.display().to_string(),
                source,
            })?;
        }

        std::os::unix::fs::symlink(target, link).map_err(|source| MaterializeError::Symlink {
            path: link.display().to_string(),
            source,
        })
    }
}
