//! Per-run outcome bookkeeping.
//!
//! The ledger is created fresh for every run, mutated only while the
//! orchestrator owns it, and handed to the caller afterwards.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single step invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Success,
    Failed { exit_code: i32 },
    Skipped { reason: String },
}

impl StepOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        StepOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepOutcome::Success => "success",
            StepOutcome::Failed { .. } => "failed",
            StepOutcome::Skipped { .. } => "skipped",
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Success => f.write_str("success"),
            StepOutcome::Failed { exit_code } => write!(f, "failed (exit {exit_code})"),
            StepOutcome::Skipped { reason } => write!(f, "skipped ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub name: String,
    pub exit_code: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipEntry {
    pub name: String,
    pub reason: String,
}

/// Ordered record of every step outcome in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLedger {
    pub results: Vec<StepResult>,
    pub failures: Vec<FailureEntry>,
    pub skipped: Vec<SkipEntry>,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an outcome, routing it to the failure or skip list as well.
    pub fn record(&mut self, name: &str, outcome: StepOutcome) {
        match &outcome {
            StepOutcome::Success => {}
            StepOutcome::Failed { exit_code } => self.failures.push(FailureEntry {
                name: name.to_string(),
                exit_code: *exit_code,
            }),
            StepOutcome::Skipped { reason } => self.skipped.push(SkipEntry {
                name: name.to_string(),
                reason: reason.clone(),
            }),
        }
        self.results.push(StepResult {
            name: name.to_string(),
            outcome,
        });
    }

    pub fn record_success(&mut self, name: &str) {
        self.record(name, StepOutcome::Success);
    }

    /// Every call appends; repeated names are kept as separate entries.
    pub fn record_failure(&mut self, name: &str, exit_code: i32) {
        self.record(name, StepOutcome::Failed { exit_code });
    }

    pub fn record_skip(&mut self, name: &str, reason: &str) {
        self.record(name, StepOutcome::skipped(reason));
    }

    /// True iff no failure entry carries exactly this name.
    pub fn step_succeeded(&self, name: &str) -> bool {
        !self.failures.iter().any(|entry| entry.name == name)
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn outcome_of(&self, name: &str) -> Option<&StepOutcome> {
        self.results
            .iter()
            .find(|result| result.name == name)
            .map(|result| &result.outcome)
    }

    pub fn success_count(&self) -> usize {
        self.results
            .iter()
            .filter(|result| result.outcome == StepOutcome::Success)
            .count()
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
