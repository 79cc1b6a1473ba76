// crates/statecheck-core/src/core/report.rs
// ============================================================================
// Module: Statecheck Reports
// Description: Ordered outcomes with summary counts and an overall verdict.
// Purpose: Provide the serializable and human-readable run report.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Report`] is the ordered sequence of outcomes for one run plus per-status
//! counts and a [`Verdict`]. The verdict is a success iff no outcome failed;
//! warnings downgrade it to [`Verdict::SuccessWithWarnings`].
//!
//! ## Invariants
//! - `summary` always matches the statuses in `outcomes`.
//! - Outcome order is the execution plan order, independent of scheduling.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::RunId;
use crate::core::outcome::Outcome;
use crate::core::outcome::OutcomeStatus;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Overall run verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// No failures and no warnings.
    Success,
    /// No failures, at least one warning.
    SuccessWithWarnings,
    /// At least one failure.
    Failure,
}

impl Verdict {
    /// Returns true for both success verdicts.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::SuccessWithWarnings)
    }

    /// Returns the upper-case verdict label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::SuccessWithWarnings => "SUCCESS (with warnings)",
            Self::Failure => "FAILURE",
        }
    }
}

/// Per-status outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Total recorded outcomes.
    pub total: usize,
    /// Passing outcomes.
    pub pass: usize,
    /// Failing outcomes.
    pub fail: usize,
    /// Warning outcomes.
    pub warn: usize,
    /// Skipped outcomes.
    pub skip: usize,
}

impl ReportSummary {
    /// Adds one status to the counts.
    pub const fn record(&mut self, status: OutcomeStatus) {
        self.total += 1;
        match status {
            OutcomeStatus::Pass => self.pass += 1,
            OutcomeStatus::Fail => self.fail += 1,
            OutcomeStatus::Warn => self.warn += 1,
            OutcomeStatus::Skip => self.skip += 1,
        }
    }

    /// Derives the verdict from the counts.
    #[must_use]
    pub const fn verdict(&self) -> Verdict {
        if self.fail > 0 {
            Verdict::Failure
        } else if self.warn > 0 {
            Verdict::SuccessWithWarnings
        } else {
            Verdict::Success
        }
    }
}

/// Ordered outcomes for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Run identifier.
    pub run_id: RunId,
    /// Subset label the run was restricted to.
    pub subset: String,
    /// RFC 3339 start time.
    pub started_at: String,
    /// RFC 3339 finish time.
    pub finished_at: String,
    /// Outcomes in execution plan order.
    pub outcomes: Vec<Outcome>,
    /// Per-status counts.
    pub summary: ReportSummary,
    /// Overall verdict.
    pub verdict: Verdict,
}

impl Report {
    /// Returns the statuses in report order.
    #[must_use]
    pub fn statuses(&self) -> Vec<OutcomeStatus> {
        self.outcomes.iter().map(|outcome| outcome.status).collect()
    }

    /// Returns the outcome recorded for an expectation id.
    #[must_use]
    pub fn outcome(&self, expectation_id: &str) -> Option<&Outcome> {
        self.outcomes.iter().find(|outcome| outcome.expectation_id.as_str() == expectation_id)
    }

    /// Renders the human-readable report.
    ///
    /// Each line carries the status glyph and label, the description, and the
    /// message; remediation follows on an indented line when present.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Verification report {} (subset: {})", self.run_id, self.subset);
        for outcome in &self.outcomes {
            let _ = writeln!(
                out,
                "{} {:<4} {}: {}",
                outcome.status.glyph(),
                outcome.status.label(),
                outcome.description,
                outcome.message
            );
            if let Some(remediation) = &outcome.remediation {
                let _ = writeln!(out, "      remediation: {remediation}");
            }
        }
        let _ = writeln!(
            out,
            "Summary: {} total, {} pass, {} fail, {} warn, {} skip",
            self.summary.total,
            self.summary.pass,
            self.summary.fail,
            self.summary.warn,
            self.summary.skip
        );
        let _ = writeln!(out, "Overall: {}", self.verdict.label());
        out
    }
}
