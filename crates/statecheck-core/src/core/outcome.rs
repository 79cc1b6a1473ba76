// crates/statecheck-core/src/core/outcome.rs
// ============================================================================
// Module: Statecheck Outcomes
// Description: Normalized probe results and graded expectation outcomes.
// Purpose: Carry probe output into the evaluator and graded results into reports.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`ProbeResult`] is the tagged union the evaluator consumes: a structured
//! value, an empty result, or a probe error. [`Outcome`] is the graded result
//! for one expectation in one run and is never revised once recorded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ExpectationId;
use crate::interfaces::ProbeError;

// ============================================================================
// SECTION: Probe Results
// ============================================================================

/// Normalized output of one probe query.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeResult {
    /// Non-empty structured value.
    Value(Value),
    /// Query succeeded but matched nothing.
    Empty,
    /// Query failed after retries.
    Error(ProbeError),
}

impl ProbeResult {
    /// Normalizes raw probe output. Null, empty arrays, and empty objects are empty.
    #[must_use]
    pub fn from_value(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Empty,
            Some(Value::Array(items)) if items.is_empty() => Self::Empty,
            Some(Value::Object(map)) if map.is_empty() => Self::Empty,
            Some(value) => Self::Value(value),
        }
    }

    /// Returns the structured value when present.
    #[must_use]
    pub const fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Empty | Self::Error(_) => None,
        }
    }
}

impl From<Result<Option<Value>, ProbeError>> for ProbeResult {
    fn from(result: Result<Option<Value>, ProbeError>) -> Self {
        match result {
            Ok(value) => Self::from_value(value),
            Err(err) => Self::Error(err),
        }
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Graded status of one expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Expectation held.
    Pass,
    /// Expectation did not hold with fail severity.
    Fail,
    /// Expectation did not hold with warn severity.
    Warn,
    /// Expectation was not evaluated.
    Skip,
}

impl OutcomeStatus {
    /// Returns the upper-case report label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Warn => "WARN",
            Self::Skip => "SKIP",
        }
    }

    /// Returns the glyph used by the human-readable report.
    #[must_use]
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Pass => "[+]",
            Self::Fail => "[x]",
            Self::Warn => "[!]",
            Self::Skip => "[-]",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Graded result of evaluating one expectation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Expectation that produced this outcome.
    pub expectation_id: ExpectationId,
    /// Expectation description, copied for rendering.
    pub description: String,
    /// Graded status.
    pub status: OutcomeStatus,
    /// Rendered human message.
    pub message: String,
    /// Advisory remediation, present only for FAIL and WARN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    /// Raw probe output retained for the report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Value>,
    /// Probe attempts made, zero when skipped.
    #[serde(default)]
    pub attempts: u32,
}
