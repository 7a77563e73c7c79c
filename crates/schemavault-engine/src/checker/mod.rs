//! Repository consistency checking
//!
//! Three independent rule sets walk the grouped scan results: structural
//! (files, symlinks, round-trip), robustness (schema hygiene) and
//! compatibility (between consecutive versions). Every rule reports in
//! isolation; one failure never stops the others. Rules can be skipped
//! per schema via the config skip list, keyed by `$id` regex and
//! diagnostic code name.

pub mod compatibility;
pub mod robustness;
pub mod structural;

use crate::scanner::{self, ScanError, VersionGroups};
use schemavault_core::config::Config;
use schemavault_core::diagnostic::Diagnostic;
use schemavault_core::report::Report;
use std::collections::BTreeSet;
use std::path::Path;

/// Runs all rule sets over a materialized repository
pub struct ConsistencyChecker<'a> {
    config: &'a Config,
}

impl<'a> ConsistencyChecker<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Scan `base_path` and run every rule set, producing one report
    pub fn check_all(&self, base_path: &Path) -> Result<Report, ScanError> {
        let infos = scanner::find_all_schemas_info(base_path, self.config)?;
        let groups = scanner::find_schemas_by_title_and_major(infos);
        Ok(self.check_groups(&groups))
    }

    /// Run every rule set over already-grouped scan results
    pub fn check_groups(&self, groups: &VersionGroups) -> Report {
        let mut diagnostics = Vec::new();
        diagnostics.extend(structural::check(groups, self.config));
        diagnostics.extend(robustness::check(groups, self.config));
        diagnostics.extend(compatibility::check(groups, self.config));

        let versions: BTreeSet<(String, String)> = groups
            .values()
            .flat_map(|majors| majors.values().flatten())
            .filter(|info| !info.current)
            .map(|info| (info.title.clone(), info.version.to_string()))
            .collect();

        let mut report = Report::from_diagnostics(diagnostics);
        report.set_coverage(groups.len(), versions.len());
        report
    }
}

/// Push a diagnostic unless the schema's skip list names its rule
pub(crate) fn push_unless_skipped(
    out: &mut Vec<Diagnostic>,
    config: &Config,
    schema_id: &str,
    diagnostic: Diagnostic,
) {
    if config.is_check_skipped(schema_id, diagnostic.code.as_str()) {
        tracing::debug!(
            schema_id,
            rule = diagnostic.code.as_str(),
            "rule skipped by config"
        );
        return;
    }
    out.push(diagnostic);
}
