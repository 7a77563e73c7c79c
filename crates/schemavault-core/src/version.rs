//! Semantic version value type
//!
//! Versions in a schema repository come from two places: artifact file
//! names (`1.2.0.yaml`) and version-bearing schema fields (`$id`). File
//! names parse strictly; field values go through [`SemVer::parse_lenient`],
//! which tolerates URI prefixes and partial versions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A `major.minor.patch` semantic version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemVer {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }

    /// Parse a strict `X.Y.Z` version string
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::NotFound(s.to_string()));
        }

        let mut nums = [0u64; 3];
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionError::NotFound(s.to_string()));
            }
            nums[i] = part
                .parse()
                .map_err(|_| VersionError::NotFound(s.to_string()))?;
        }

        Ok(Self::new(nums[0], nums[1], nums[2]))
    }

    /// Coerce a version-like string into a semantic version.
    ///
    /// Leading non-numeric characters are stripped, then the first
    /// `X[.Y[.Z]]` numeric run is taken with missing components
    /// zero-padded. `"v1.2"` parses as `1.2.0`; `"1.0.0-rc.1"` parses
    /// as `1.0.0` (the run stops at the first non-digit, non-dot byte).
    pub fn parse_lenient(s: &str) -> Result<Self, VersionError> {
        let start = s
            .bytes()
            .position(|b| b.is_ascii_digit())
            .ok_or_else(|| VersionError::NotFound(s.to_string()))?;

        let run: String = s[start..]
            .bytes()
            .take_while(|b| b.is_ascii_digit() || *b == b'.')
            .map(char::from)
            .collect();

        let mut nums = [0u64; 3];
        let mut count = 0;
        for part in run.split('.').take(3) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                break;
            }
            nums[count] = part
                .parse()
                .map_err(|_| VersionError::NotFound(s.to_string()))?;
            count += 1;
        }

        if count == 0 {
            return Err(VersionError::NotFound(s.to_string()));
        }

        Ok(Self::new(nums[0], nums[1], nums[2]))
    }
}

impl std::fmt::Display for SemVer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Version extraction failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// No numeric version-like substring could be found
    #[error("no semantic version found in '{0}'")]
    NotFound(String),

    /// The configured version field is missing or not a string
    #[error("version field '{0}' is missing or not a string")]
    MissingField(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_parse() {
        assert_eq!(SemVer::parse("1.2.0").unwrap(), SemVer::new(1, 2, 0));
        assert!(SemVer::parse("1.2").is_err());
        assert!(SemVer::parse("1.2.x").is_err());
        assert!(SemVer::parse("").is_err());
    }

    #[test]
    fn lenient_parse_strips_prefix() {
        assert_eq!(SemVer::parse_lenient("v1.2.3").unwrap(), SemVer::new(1, 2, 3));
        assert_eq!(SemVer::parse_lenient("schema-2.0.1").unwrap(), SemVer::new(2, 0, 1));
    }

    #[test]
    fn lenient_parse_pads_partial() {
        assert_eq!(SemVer::parse_lenient("1").unwrap(), SemVer::new(1, 0, 0));
        assert_eq!(SemVer::parse_lenient("1.2").unwrap(), SemVer::new(1, 2, 0));
    }

    #[test]
    fn lenient_parse_stops_at_suffix() {
        assert_eq!(SemVer::parse_lenient("1.0.0-rc.1").unwrap(), SemVer::new(1, 0, 0));
    }

    #[test]
    fn lenient_parse_rejects_no_digits() {
        assert!(matches!(
            SemVer::parse_lenient("current"),
            Err(VersionError::NotFound(_))
        ));
    }

    #[test]
    fn ordering() {
        assert!(SemVer::new(1, 2, 0) < SemVer::new(1, 10, 0));
        assert!(SemVer::new(2, 0, 0) > SemVer::new(1, 99, 99));
        assert!(SemVer::new(1, 0, 0) == SemVer::new(1, 0, 0));
    }

    #[test]
    fn display_roundtrip() {
        let v = SemVer::new(3, 4, 5);
        assert_eq!(SemVer::parse(&v.to_string()).unwrap(), v);
    }
}
