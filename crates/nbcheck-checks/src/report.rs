//! Pass/fail/skip aggregation for suites and whole runs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use nbcheck_common::error::{HarnessError, Result};
use nbcheck_common::types::{ImageRef, RunPhase};

use crate::suites::SuiteKind;

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// Every expectation held.
    Passed,
    /// An expectation did not hold, or the check could not be evaluated.
    Failed,
    /// The check was not executed.
    Skipped,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// What one check expected and what it observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckRecord {
    /// Check name.
    pub name: String,
    /// Outcome.
    pub status: CheckStatus,
    /// Rendered expectations, or the violated one for failures.
    pub expected: String,
    /// Captured output, status or error message.
    pub actual: String,
    /// Wall time spent evaluating the check.
    pub elapsed_ms: u64,
}

impl CheckRecord {
    /// A check that was not executed.
    #[must_use]
    pub fn skipped(name: &str, expected: String, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Skipped,
            expected,
            actual: reason.to_string(),
            elapsed_ms: 0,
        }
    }
}

/// How a suite run ended at the harness level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuiteOutcome {
    /// Checks were executed; individual results are in the records.
    Completed,
    /// A required capability was missing; nothing was executed.
    Skipped {
        /// Why the suite was skipped.
        reason: String,
    },
    /// The container never came up.
    StartupFailed {
        /// Rendered harness error, including captured logs.
        error: String,
    },
}

/// Counts of check outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    /// Checks that passed.
    pub passed: usize,
    /// Checks that failed.
    pub failed: usize,
    /// Checks that were skipped.
    pub skipped: usize,
}

impl Tally {
    fn add(&mut self, status: CheckStatus) {
        match status {
            CheckStatus::Passed => self.passed += 1,
            CheckStatus::Failed => self.failed += 1,
            CheckStatus::Skipped => self.skipped += 1,
        }
    }

    /// Checks that were actually executed.
    #[must_use]
    pub const fn executed(&self) -> usize {
        self.passed + self.failed
    }
}

/// Result of running one suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    /// Which suite.
    pub suite: SuiteKind,
    /// Harness-level outcome.
    pub outcome: SuiteOutcome,
    /// Lifecycle phases visited, in order.
    pub phases: Vec<RunPhase>,
    /// Per-check records.
    pub checks: Vec<CheckRecord>,
}

impl SuiteReport {
    /// Counts check outcomes.
    #[must_use]
    pub fn tally(&self) -> Tally {
        let mut tally = Tally::default();
        for record in &self.checks {
            tally.add(record.status);
        }
        tally
    }

    /// True unless a check failed or the container never started.
    #[must_use]
    pub fn passed(&self) -> bool {
        !matches!(self.outcome, SuiteOutcome::StartupFailed { .. })
            && self.checks.iter().all(|c| c.status != CheckStatus::Failed)
    }

    /// Records of the failed checks.
    pub fn failures(&self) -> impl Iterator<Item = &CheckRecord> {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Failed)
    }
}

/// Result of an `nbcheck run` invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Image under test.
    pub image: ImageRef,
    /// Suites in execution order.
    pub suites: Vec<SuiteReport>,
}

impl RunReport {
    /// Starts an empty report for `image`.
    #[must_use]
    pub fn new(image: ImageRef) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            image,
            suites: Vec::new(),
        }
    }

    /// Appends a suite result.
    pub fn push(&mut self, suite: SuiteReport) {
        self.suites.push(suite);
    }

    /// Counts over every suite.
    #[must_use]
    pub fn tally(&self) -> Tally {
        let mut total = Tally::default();
        for suite in &self.suites {
            let t = suite.tally();
            total.passed += t.passed;
            total.failed += t.failed;
            total.skipped += t.skipped;
        }
        total
    }

    /// True if every suite passed. Skipped suites do not count as failures.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.suites.iter().all(SuiteReport::passed)
    }

    /// Finalises the run.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::CheckFailure`] naming every failed check and
    /// every suite whose container never came up.
    pub fn ensure_passed(&self) -> Result<()> {
        let mut names: Vec<String> = Vec::new();
        for suite in &self.suites {
            if matches!(suite.outcome, SuiteOutcome::StartupFailed { .. }) {
                names.push(format!("{} startup", suite.suite));
            }
            names.extend(suite.failures().map(|c| c.name.clone()));
        }
        if names.is_empty() {
            return Ok(());
        }
        Err(HarnessError::CheckFailure {
            failed: names.len(),
            total: self.tally().executed().max(names.len()),
            names,
        })
    }
}
