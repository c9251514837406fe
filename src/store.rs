//! Findings persistence contract and an in-memory implementation.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::Serialize;

use crate::error::Result;
use crate::model::{Analyzer, Finding, Severity};

/// Where the runner writes findings.
///
/// Every call must be atomic: a reader never observes half of a replacement.
/// Backend failures are reported as
/// [`Error::Store`](crate::error::Error::Store); the runner records them as a
/// failed run and the key keeps its previous findings.
///
/// Calls are made from blocking threads and may block.
pub trait FindingsStore: Send + Sync {
    /// Replace every finding of `analyzer`.
    fn replace_findings_for_analyzer(&self, analyzer: Analyzer, findings: Vec<Finding>) -> Result<()>;

    /// Replace the findings of `analyzer` for one file.
    fn replace_findings_for_analyzer_and_file(
        &self,
        analyzer: Analyzer,
        file_path: &str,
        findings: Vec<Finding>,
    ) -> Result<()>;

    fn stats(&self, filter: &StatsFilter) -> Result<FindingStats>;

    /// Findings matching `filter`, ordered by file, line and analyzer.
    fn findings(&self, filter: &StatsFilter) -> Result<Vec<Finding>>;
}

/// Narrows [`FindingsStore::stats`] and [`FindingsStore::findings`].
#[derive(Debug, Clone, Default)]
pub struct StatsFilter {
    pub analyzer: Option<Analyzer>,
    pub file_path: Option<String>,
    pub min_severity: Option<Severity>,
    /// `Some(false)` hides accepted findings, `Some(true)` shows only them.
    pub accepted: Option<bool>,
}

impl StatsFilter {
    pub fn matches(&self, finding: &Finding) -> bool {
        self.analyzer.map_or(true, |a| finding.analyzer == a)
            && self
                .file_path
                .as_deref()
                .map_or(true, |p| finding.file_path == p)
            && self.min_severity.map_or(true, |s| finding.severity >= s)
            && self.accepted.map_or(true, |a| finding.accepted == a)
    }
}

/// Aggregate counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FindingStats {
    pub total: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_analyzer: BTreeMap<Analyzer, usize>,
}

impl FindingStats {
    pub fn count(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }
}

#[derive(Default)]
struct StoreState {
    findings: BTreeMap<Analyzer, Vec<Finding>>,
    writes: u64,
}

/// Process-local store. One mutex guards everything, so each call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful replace calls so far.
    pub fn write_count(&self) -> u64 {
        self.state.lock().writes
    }
}

impl FindingsStore for MemoryStore {
    fn replace_findings_for_analyzer(&self, analyzer: Analyzer, findings: Vec<Finding>) -> Result<()> {
        let mut state = self.state.lock();
        state.findings.insert(analyzer, findings);
        state.writes += 1;
        Ok(())
    }

    fn replace_findings_for_analyzer_and_file(
        &self,
        analyzer: Analyzer,
        file_path: &str,
        findings: Vec<Finding>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let entry = state.findings.entry(analyzer).or_default();
        entry.retain(|f| f.file_path != file_path);
        entry.extend(findings);
        state.writes += 1;
        Ok(())
    }

    fn stats(&self, filter: &StatsFilter) -> Result<FindingStats> {
        let state = self.state.lock();
        let mut stats = FindingStats::default();
        for finding in state.findings.values().flatten().filter(|f| filter.matches(f)) {
            stats.total += 1;
            *stats.by_severity.entry(finding.severity).or_default() += 1;
            *stats.by_analyzer.entry(finding.analyzer).or_default() += 1;
        }
        Ok(stats)
    }

    fn findings(&self, filter: &StatsFilter) -> Result<Vec<Finding>> {
        let mut findings: Vec<Finding> = {
            let state = self.state.lock();
            state
                .findings
                .values()
                .flatten()
                .filter(|f| filter.matches(f))
                .cloned()
                .collect()
        };
        findings.sort_by(|a, b| {
            a.file_path
                .cmp(&b.file_path)
                .then(a.line.cmp(&b.line))
                .then(a.analyzer.cmp(&b.analyzer))
                .then_with(|| a.title.cmp(&b.title))
        });
        Ok(findings)
    }
}
