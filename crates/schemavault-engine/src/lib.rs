//! SchemaVault engine - Core business logic
//!
//! This crate implements the schema materialization pipeline and the
//! repository consistency checker:
//! - Reference resolution and dereferencing
//! - Numeric bounds enforcement
//! - Artifact materialization and symlink maintenance
//! - Repository scanning and version grouping
//! - Structural / robustness / compatibility checking

pub mod bounds;
pub mod checker;
pub mod dereference;
pub mod materialize;
pub mod resolver;
pub mod scanner;
pub mod validator;
pub mod version_field;

pub use checker::ConsistencyChecker;
pub use dereference::{Dereferencer, DereferenceError};
pub use materialize::{Materializer, MaterializeError};
pub use resolver::{Resolver, ResolveError, SchemaFetcher};
pub use scanner::{SchemaInfo, ScanError, VersionGroups};
