//! SchemaVault Core
//!
//! Stable domain model for the schema repository tool: content types,
//! semantic versions, deterministic serialization, diagnostic codes,
//! check reports and configuration.
//! Never rename diagnostic codes - they are part of the public API.

pub mod config;
pub mod content_type;
pub mod diagnostic;
pub mod document;
pub mod report;
pub mod serialize;
pub mod version;

pub use config::{Config, ConfigError};
pub use content_type::ContentType;
pub use diagnostic::{Diagnostic, DiagnosticCode, Location, Severity};
pub use report::{Report, ReportSummary, ReportVersion};
pub use serialize::SerializeError;
pub use version::{SemVer, VersionError};
