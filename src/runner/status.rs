//! Per-analyzer status exposed for health displays.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::Analyzer;

use super::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Error,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Error => "error",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzerStatus {
    pub analyzer: Analyzer,
    pub state: RunState,
    /// Scope of the most recently started run.
    pub scope: Option<Scope>,
    pub last_run: Option<DateTime<Utc>>,
    pub last_duration_ms: Option<u64>,
    /// Findings currently stored for this analyzer.
    pub finding_count: usize,
    pub last_error: Option<String>,
    /// Runs registered and not yet finished.
    pub active: usize,
}

impl AnalyzerStatus {
    pub(crate) fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer,
            state: RunState::Idle,
            scope: None,
            last_run: None,
            last_duration_ms: None,
            finding_count: 0,
            last_error: None,
            active: 0,
        }
    }

    pub fn last_duration(&self) -> Option<Duration> {
        self.last_duration_ms.map(Duration::from_millis)
    }

    pub(crate) fn started(&mut self, scope: &Scope) {
        self.active += 1;
        self.state = RunState::Running;
        self.scope = Some(scope.clone());
    }

    pub(crate) fn finished(&mut self, outcome: &Outcome, elapsed: Option<Duration>) {
        self.active = self.active.saturating_sub(1);
        let settled = if self.active > 0 {
            RunState::Running
        } else {
            RunState::Idle
        };

        match outcome {
            Outcome::Written { stored } => {
                self.state = settled;
                self.finding_count = *stored;
                self.record_run(elapsed);
            }
            Outcome::Failed(message) => {
                self.state = RunState::Error;
                self.last_error = Some(message.clone());
                self.record_run(elapsed);
            }
            Outcome::Cancelled => {
                if self.state == RunState::Running {
                    self.state = settled;
                }
            }
        }
    }

    fn record_run(&mut self, elapsed: Option<Duration>) {
        self.last_run = Some(Utc::now());
        if let Some(elapsed) = elapsed {
            self.last_duration_ms = Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Findings were written; `stored` is the analyzer's total afterwards.
    Written { stored: usize },
    Failed(String),
    Cancelled,
}
