//! Diagnostic codes and check findings
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.
//!
//! The code names double as rule names in the config skip list.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Structural rules (1xx)
    /// Files for one schema title are spread over multiple directories
    StructureSplitDirectory,

    /// No current source file exists for a schema title
    StructureMissingCurrent,

    /// A stray extensionless "current" symlink exists
    StructureStrayCurrentSymlink,

    /// The current source's version has not been materialized
    StructureCurrentNotMaterialized,

    /// Dereferenced current source differs from its materialized artifact
    StructureCurrentDiverged,

    /// A "latest" symlink does not resolve to the highest version
    StructureLatestOutdated,

    /// A materialized version is missing a configured content type
    StructureMissingContentType,

    /// An extensionless version symlink targets the wrong file
    StructureBadVersionSymlink,

    /// Content-type variants of one version are not deep-equal
    StructureVariantMismatch,

    // Robustness rules (2xx)
    /// Schema fails structural JSON Schema validation
    RobustnessInvalidSchema,

    /// Schema fails the security-hardening check
    RobustnessInsecurePattern,

    /// A property key is not snake_case
    RobustnessPropertyNotSnakeCase,

    /// A type declaration is a union (array of types)
    RobustnessUnionType,

    /// An array schema lacks items.type
    RobustnessArrayItemsUntyped,

    /// An object schema declares no properties, oneOf, allOf or
    /// additionalProperties
    RobustnessObjectShapeless,

    /// additionalProperties sub-schema has no deterministic type
    RobustnessAdditionalPropsUntyped,

    /// oneOf branches declare diverging types
    RobustnessOneOfTypeDivergent,

    /// oneOf object branches declare diverging required sets
    RobustnessOneOfRequiredDivergent,

    /// A required property is not declared in properties
    RobustnessRequiredUndeclared,

    /// A numeric node lacks enforced minimum/maximum bounds
    RobustnessMissingNumericBounds,

    /// An example does not validate against its schema
    RobustnessExampleInvalid,

    /// An example's $schema does not equal the schema's $id
    RobustnessExampleSchemaMismatch,

    // Compatibility rules (3xx)
    /// A key present in the older version is gone from the newer one
    CompatKeyRemoved,

    /// A key's value changed between consecutive versions
    CompatValueChanged,

    /// required sets differ between consecutive versions
    CompatRequiredChanged,

    /// The newer enum is not a superset of the older enum
    CompatEnumShrunk,

    // General (9xx)
    /// General informational message
    Info,

    /// General warning message
    Warning,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StructureSplitDirectory => "STRUCTURE_SPLIT_DIRECTORY",
            Self::StructureMissingCurrent => "STRUCTURE_MISSING_CURRENT",
            Self::StructureStrayCurrentSymlink => "STRUCTURE_STRAY_CURRENT_SYMLINK",
            Self::StructureCurrentNotMaterialized => "STRUCTURE_CURRENT_NOT_MATERIALIZED",
            Self::StructureCurrentDiverged => "STRUCTURE_CURRENT_DIVERGED",
            Self::StructureLatestOutdated => "STRUCTURE_LATEST_OUTDATED",
            Self::StructureMissingContentType => "STRUCTURE_MISSING_CONTENT_TYPE",
            Self::StructureBadVersionSymlink => "STRUCTURE_BAD_VERSION_SYMLINK",
            Self::StructureVariantMismatch => "STRUCTURE_VARIANT_MISMATCH",
            Self::RobustnessInvalidSchema => "ROBUSTNESS_INVALID_SCHEMA",
            Self::RobustnessInsecurePattern => "ROBUSTNESS_INSECURE_PATTERN",
            Self::RobustnessPropertyNotSnakeCase => "ROBUSTNESS_PROPERTY_NOT_SNAKE_CASE",
            Self::RobustnessUnionType => "ROBUSTNESS_UNION_TYPE",
            Self::RobustnessArrayItemsUntyped => "ROBUSTNESS_ARRAY_ITEMS_UNTYPED",
            Self::RobustnessObjectShapeless => "ROBUSTNESS_OBJECT_SHAPELESS",
            Self::RobustnessAdditionalPropsUntyped => "ROBUSTNESS_ADDITIONAL_PROPS_UNTYPED",
            Self::RobustnessOneOfTypeDivergent => "ROBUSTNESS_ONE_OF_TYPE_DIVERGENT",
            Self::RobustnessOneOfRequiredDivergent => "ROBUSTNESS_ONE_OF_REQUIRED_DIVERGENT",
            Self::RobustnessRequiredUndeclared => "ROBUSTNESS_REQUIRED_UNDECLARED",
            Self::RobustnessMissingNumericBounds => "ROBUSTNESS_MISSING_NUMERIC_BOUNDS",
            Self::RobustnessExampleInvalid => "ROBUSTNESS_EXAMPLE_INVALID",
            Self::RobustnessExampleSchemaMismatch => "ROBUSTNESS_EXAMPLE_SCHEMA_MISMATCH",
            Self::CompatKeyRemoved => "COMPAT_KEY_REMOVED",
            Self::CompatValueChanged => "COMPAT_VALUE_CHANGED",
            Self::CompatRequiredChanged => "COMPAT_REQUIRED_CHANGED",
            Self::CompatEnumShrunk => "COMPAT_ENUM_SHRUNK",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - should be reviewed but not blocking
    Warn,

    /// Error - blocking issue that should fail CI
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Where a finding points: a file, optionally a path inside the schema tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File path relative to the repository root
    pub file: String,

    /// Slash-separated path into the schema tree
    /// (e.g. `properties/user_id/minimum`)
    pub pointer: Option<String>,
}

impl Location {
    /// Create a new location with just a file path
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            pointer: None,
        }
    }

    /// Create a location with file and schema pointer
    pub fn with_pointer(file: impl Into<String>, pointer: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            pointer: Some(pointer.into()),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.pointer {
            Some(pointer) => write!(f, "{}#{}", self.file, pointer),
            None => write!(f, "{}", self.file),
        }
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Source location (best-effort)
    pub location: Option<Location>,

    /// Expected value (for comparison diagnostics)
    pub expected: Option<String>,

    /// Actual value (for comparison diagnostics)
    pub actual: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            location: None,
            expected: None,
            actual: None,
        }
    }

    /// Shorthand for an error-severity diagnostic
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, message)
    }

    /// Set the location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Set expected/actual values
    pub fn with_comparison(
        mut self,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_code_stability() {
        // Ensure codes are stable strings
        assert_eq!(
            DiagnosticCode::StructureMissingCurrent.as_str(),
            "STRUCTURE_MISSING_CURRENT"
        );
        assert_eq!(DiagnosticCode::CompatEnumShrunk.as_str(), "COMPAT_ENUM_SHRUNK");
        assert_eq!(
            DiagnosticCode::RobustnessPropertyNotSnakeCase.as_str(),
            "ROBUSTNESS_PROPERTY_NOT_SNAKE_CASE"
        );
    }

    #[test]
    fn diagnostic_serialization() {
        let diag = Diagnostic::error(
            DiagnosticCode::RobustnessPropertyNotSnakeCase,
            "Property 'testEnum' is not snake_case",
        )
        .with_location(Location::with_pointer(
            "schemas/basic/1.0.0.yaml",
            "properties/testEnum",
        ));

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("ROBUSTNESS_PROPERTY_NOT_SNAKE_CASE"));
        assert!(json.contains("error"));
        assert!(json.contains("properties/testEnum"));
    }

    #[test]
    fn location_display() {
        let loc = Location::with_pointer("schemas/basic/1.0.0.yaml", "properties/dt");
        assert_eq!(loc.to_string(), "schemas/basic/1.0.0.yaml#properties/dt");

        let bare = Location::new("schemas/basic/current.yaml");
        assert_eq!(bare.to_string(), "schemas/basic/current.yaml");
    }
}
