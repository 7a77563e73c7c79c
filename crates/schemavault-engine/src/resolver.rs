//! Reference resolution against ordered base URIs
//!
//! A `$ref` is tried against each configured base URI in order; the first
//! candidate that fetches successfully wins. There is no retry and no
//! parallel race: one attempt per base, fold-with-fallback.

use schemavault_core::content_type::ContentType;
use schemavault_core::serialize::{self, SerializeError};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A single failed fetch attempt
#[derive(Debug, Error)]
#[error("{uri}: {reason}")]
pub struct FetchError {
    pub uri: String,
    pub reason: String,
}

impl FetchError {
    pub fn new(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            reason: reason.into(),
        }
    }
}

/// Supplies raw schema text for an absolute URI or filesystem path.
///
/// The default implementation reads local files and performs blocking
/// http(s) GETs; tests inject an in-memory map instead.
pub trait SchemaFetcher {
    fn fetch(&self, uri: &str) -> Result<String, FetchError>;
}

/// Filesystem + http(s) fetcher
#[derive(Debug, Default)]
pub struct DefaultFetcher;

impl SchemaFetcher for DefaultFetcher {
    fn fetch(&self, uri: &str) -> Result<String, FetchError> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            let response = reqwest::blocking::get(uri)
                .map_err(|e| FetchError::new(uri, e.to_string()))?;
            if !response.status().is_success() {
                return Err(FetchError::new(uri, format!("HTTP {}", response.status())));
            }
            return response.text().map_err(|e| FetchError::new(uri, e.to_string()));
        }

        let path = uri.strip_prefix("file://").unwrap_or(uri);
        std::fs::read_to_string(path).map_err(|e| FetchError::new(uri, e.to_string()))
    }
}

/// Resolution failure
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Every base URI failed; carries each attempted candidate for
    /// diagnostics
    #[error("could not resolve '{reference}' (attempted: {})", .attempted.join(", "))]
    AllCandidatesFailed {
        reference: String,
        attempted: Vec<String>,
    },

    /// A candidate fetched but its content did not parse
    #[error("failed to parse content of '{uri}': {source}")]
    Parse {
        uri: String,
        #[source]
        source: SerializeError,
    },
}

/// Resolves `$ref` URIs against a prioritized list of base URIs
pub struct Resolver {
    base_uris: Vec<String>,
    /// Root for making scheme-less candidates absolute
    root: PathBuf,
    fetcher: Box<dyn SchemaFetcher>,
}

impl Resolver {
    pub fn new(base_uris: Vec<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            base_uris,
            root: root.into(),
            fetcher: Box::new(DefaultFetcher),
        }
    }

    /// Replace the fetcher (tests use an in-memory map)
    pub fn with_fetcher(mut self, fetcher: Box<dyn SchemaFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Resolve a `$ref` to a parsed schema document.
    ///
    /// Absolute references (with a scheme) are fetched directly. Relative
    /// references are prefixed with each base URI in order; a candidate
    /// that still lacks a scheme is read from the local filesystem with
    /// the path resolved against the resolver root.
    pub fn resolve(&self, reference: &str) -> Result<Value, ResolveError> {
        let mut attempted = Vec::new();

        for candidate in self.candidates(reference) {
            tracing::debug!(reference, candidate = %candidate, "trying ref candidate");
            match self.fetcher.fetch(&candidate) {
                Ok(text) => {
                    let content_type =
                        ContentType::from_path(Path::new(&candidate)).unwrap_or(ContentType::Yaml);
                    return serialize::parse_str(&text, content_type).map_err(|source| {
                        ResolveError::Parse {
                            uri: candidate,
                            source,
                        }
                    });
                }
                Err(err) => {
                    tracing::debug!(candidate = %err.uri, reason = %err.reason, "candidate failed");
                    attempted.push(candidate);
                }
            }
        }

        Err(ResolveError::AllCandidatesFailed {
            reference: reference.to_string(),
            attempted,
        })
    }

    /// Candidate URIs for a reference, in resolution order
    fn candidates(&self, reference: &str) -> Vec<String> {
        if has_scheme(reference) {
            return vec![reference.to_string()];
        }

        if self.base_uris.is_empty() {
            return vec![self.absolutize(reference)];
        }

        self.base_uris
            .iter()
            .map(|base| {
                let joined = join_uri(base, reference);
                if has_scheme(&joined) {
                    joined
                } else {
                    self.absolutize(&joined)
                }
            })
            .collect()
    }

    /// Make a scheme-less path absolute relative to the resolver root
    fn absolutize(&self, path: &str) -> String {
        let p = Path::new(path);
        if p.is_absolute() {
            path.to_string()
        } else {
            self.root.join(p).display().to_string()
        }
    }
}

/// Whether a URI carries a scheme (`https://...`)
fn has_scheme(uri: &str) -> bool {
    match uri.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Join a base URI and a reference without doubling separators
fn join_uri(base: &str, reference: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        reference.trim_start_matches('/')
    )
}

/// In-memory fetcher for unit tests across the crate
#[cfg(test)]
pub(crate) mod testing {
    use super::{FetchError, SchemaFetcher};
    use std::collections::HashMap;

    /// In-memory fetcher keyed by exact URI
    pub(crate) struct MapFetcher {
        entries: HashMap<String, String>,
    }

    impl MapFetcher {
        pub(crate) fn new(entries: &[(&str, &str)]) -> Self {
            Self {
                entries: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }
    }

    impl SchemaFetcher for MapFetcher {
        fn fetch(&self, uri: &str) -> Result<String, FetchError> {
            self.entries
                .get(uri)
                .cloned()
                .ok_or_else(|| FetchError::new(uri, "not found"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MapFetcher;
    use super::*;

    fn resolver(bases: &[&str], entries: &[(&str, &str)]) -> Resolver {
        Resolver::new(bases.iter().map(|s| s.to_string()).collect(), "/repo")
            .with_fetcher(Box::new(MapFetcher::new(entries)))
    }

    #[test]
    fn first_base_wins() {
        let r = resolver(
            &["/repo/schemas", "https://example.org/schemas"],
            &[
                ("/repo/schemas/common/1.0.0", "title: common-local"),
                ("https://example.org/schemas/common/1.0.0", "title: common-remote"),
            ],
        );

        let doc = r.resolve("/common/1.0.0").unwrap();
        assert_eq!(doc["title"], "common-local");
    }

    #[test]
    fn falls_back_to_later_base() {
        let r = resolver(
            &["/repo/missing", "https://example.org/schemas"],
            &[("https://example.org/schemas/common/1.0.0", "title: common-remote")],
        );

        let doc = r.resolve("common/1.0.0").unwrap();
        assert_eq!(doc["title"], "common-remote");
    }

    #[test]
    fn absolute_reference_bypasses_bases() {
        let r = resolver(
            &["/repo/schemas"],
            &[("https://example.org/direct/2.0.0", "{\"title\": \"direct\"}")],
        );

        let doc = r.resolve("https://example.org/direct/2.0.0").unwrap();
        assert_eq!(doc["title"], "direct");
    }

    #[test]
    fn all_failures_carry_attempts() {
        let r = resolver(&["/a", "/b"], &[]);

        let err = r.resolve("/common/1.0.0").unwrap_err();
        match err {
            ResolveError::AllCandidatesFailed { attempted, .. } => {
                assert_eq!(attempted, vec!["/a/common/1.0.0", "/b/common/1.0.0"]);
            }
            other => panic!("expected AllCandidatesFailed, got {other}"),
        }
    }

    #[test]
    fn relative_path_resolved_against_root() {
        let r = resolver(&[], &[("/repo/common/1.0.0", "title: c")]);
        let doc = r.resolve("common/1.0.0").unwrap();
        assert_eq!(doc["title"], "c");
    }

    #[test]
    fn scheme_detection() {
        assert!(has_scheme("https://example.org/x"));
        assert!(has_scheme("file:///tmp/x"));
        assert!(!has_scheme("/common/1.0.0"));
        assert!(!has_scheme("common/1.0.0"));
    }

    #[test]
    fn json_candidates_parse_as_json() {
        let r = resolver(
            &["/repo/schemas"],
            &[("/repo/schemas/common/1.0.0.json", "{\"title\": \"c\"}")],
        );
        let doc = r.resolve("/common/1.0.0.json").unwrap();
        assert_eq!(doc["title"], "c");
    }
}
