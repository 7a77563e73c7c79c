//! Version and title extraction from schema fields

use schemavault_core::document;
use schemavault_core::version::{SemVer, VersionError};
use serde_json::Value;

/// Derive a semantic version from a configured schema field.
///
/// The field is read at a dotted path (usually `$id`). URI-path values
/// contribute only their final segment; the remainder goes through
/// lenient semver coercion.
pub fn extract_version(schema: &Value, field_path: &str) -> Result<SemVer, VersionError> {
    let value = document::dotted_get(schema, field_path)
        .and_then(Value::as_str)
        .ok_or_else(|| VersionError::MissingField(field_path.to_string()))?;

    let candidate = if value.contains('/') {
        value.trim_end_matches('/').rsplit('/').next().unwrap_or(value)
    } else {
        value
    };

    SemVer::parse_lenient(candidate)
}

/// Read the grouping title from a configured schema field
pub fn extract_title(schema: &Value, field_path: &str) -> Option<String> {
    document::dotted_get(schema, field_path)
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn version_from_id_uri() {
        let schema = json!({ "$id": "/basic/1.2.0" });
        assert_eq!(extract_version(&schema, "$id").unwrap(), SemVer::new(1, 2, 0));
    }

    #[test]
    fn version_from_plain_field() {
        let schema = json!({ "meta": { "version": "2.1" } });
        assert_eq!(
            extract_version(&schema, "meta.version").unwrap(),
            SemVer::new(2, 1, 0)
        );
    }

    #[test]
    fn trailing_slash_tolerated() {
        let schema = json!({ "$id": "/basic/1.2.0/" });
        assert_eq!(extract_version(&schema, "$id").unwrap(), SemVer::new(1, 2, 0));
    }

    #[test]
    fn missing_field_is_an_error() {
        let schema = json!({ "title": "basic" });
        assert!(matches!(
            extract_version(&schema, "$id"),
            Err(VersionError::MissingField(_))
        ));
    }

    #[test]
    fn unparsable_value_is_an_error() {
        let schema = json!({ "$id": "/basic/current" });
        assert!(matches!(
            extract_version(&schema, "$id"),
            Err(VersionError::NotFound(_))
        ));
    }

    #[test]
    fn title_lookup() {
        let schema = json!({ "title": "basic" });
        assert_eq!(extract_title(&schema, "title"), Some("basic".to_string()));
        assert_eq!(extract_title(&schema, "missing"), None);
    }
}
