// crates/statecheck-core/src/runtime/aggregator.rs
// ============================================================================
// Module: Statecheck Report Aggregator
// Description: Append-only outcome collection and report assembly.
// Purpose: Accumulate graded outcomes and produce the final ordered report.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The aggregator accepts each outcome exactly once, tagged with its plan
//! position. Outcomes may arrive out of order under parallel execution; the
//! finished [`Report`] lists them in plan order regardless.
//!
//! ## Invariants
//! - Recorded outcomes are never revised or removed.
//! - Summary counts always match the recorded outcomes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::ExpectationId;
use crate::core::Outcome;
use crate::core::Report;
use crate::core::ReportSummary;
use crate::core::RunId;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Rejected appends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    /// A plan position was recorded twice.
    #[error("outcome for `{expectation_id}` at position {position} already recorded")]
    AlreadyRecorded {
        /// Plan position.
        position: usize,
        /// Expectation of the rejected outcome.
        expectation_id: ExpectationId,
    },
}

// ============================================================================
// SECTION: Aggregator
// ============================================================================

/// Append-only collector of outcomes for one run.
#[derive(Debug)]
pub struct ReportAggregator {
    /// Run identifier.
    run_id: RunId,
    /// Subset label.
    subset: String,
    /// RFC 3339 start time.
    started_at: String,
    /// Outcomes keyed by plan position.
    outcomes: BTreeMap<usize, Outcome>,
    /// Running counts.
    summary: ReportSummary,
}

impl ReportAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new(run_id: RunId, subset: impl Into<String>, started_at: impl Into<String>) -> Self {
        Self {
            run_id,
            subset: subset.into(),
            started_at: started_at.into(),
            outcomes: BTreeMap::new(),
            summary: ReportSummary::default(),
        }
    }

    /// Appends the outcome for a plan position.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::AlreadyRecorded`] when the position already
    /// holds an outcome; the recorded outcome is kept.
    pub fn record(&mut self, position: usize, outcome: Outcome) -> Result<(), AggregationError> {
        if self.outcomes.contains_key(&position) {
            return Err(AggregationError::AlreadyRecorded {
                position,
                expectation_id: outcome.expectation_id,
            });
        }
        self.summary.record(outcome.status);
        self.outcomes.insert(position, outcome);
        Ok(())
    }

    /// Assembles the report in plan order.
    #[must_use]
    pub fn finish(self, finished_at: impl Into<String>) -> Report {
        let verdict = self.summary.verdict();
        Report {
            run_id: self.run_id,
            subset: self.subset,
            started_at: self.started_at,
            finished_at: finished_at.into(),
            outcomes: self.outcomes.into_values().collect(),
            summary: self.summary,
            verdict,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
