// crates/statecheck-core/src/runtime/evaluator.rs
// ============================================================================
// Module: Statecheck Expectation Evaluator
// Description: Grades probe results against expectation predicates.
// Purpose: Produce deterministic outcomes from declared rules and probe output.
// Dependencies: crate::core, jsonpath_lib, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The evaluator is a pure function of an [`Expectation`] and a
//! [`ProbeResult`]. Probe errors short-circuit to the expectation's failure
//! severity with the error as the message. Predicates that reference data the
//! probe did not return are evaluation errors and always grade as FAIL.
//!
//! ## Invariants
//! - The same expectation and probe result always yield the same outcome.
//! - `all_ready` never passes when the total is zero.
//! - Remediation is attached only to FAIL and WARN outcomes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::collections::HashMap;

use jsonpath_lib::select;
use serde_json::Value;
use thiserror::Error;

use crate::core::Expectation;
use crate::core::ExpectationId;
use crate::core::Outcome;
use crate::core::OutcomeStatus;
use crate::core::Predicate;
use crate::core::ProbeResult;
use crate::core::Severity;
use crate::core::expectation::absolute_path;
use crate::core::expectation::compile_pattern;
use crate::runtime::comparator::compare;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Predicate could not be applied to a non-error probe result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// Field path matched nothing.
    #[error("field `{0}` not found in probe result")]
    MissingField(String),
    /// Field path is not valid JSONPath.
    #[error("field path `{0}` is not valid")]
    InvalidPath(String),
    /// Field is an object or array where a scalar was required.
    #[error("field `{0}` is not a scalar")]
    NotScalar(String),
    /// Field is not an integer count.
    #[error("field `{path}` is not a non-negative integer: {value}")]
    NotACount {
        /// Field path.
        path: String,
        /// Rendered field value.
        value: String,
    },
    /// Comparator is undefined for the operand types.
    #[error("cannot compare `{path}` ({actual}) with {expected}")]
    Incomparable {
        /// Field path.
        path: String,
        /// Rendered field value.
        actual: String,
        /// Rendered expected operand.
        expected: String,
    },
    /// Match pattern failed to compile.
    #[error("{0}")]
    InvalidPattern(String),
}

/// Result of applying a predicate.
struct Check {
    /// Whether the predicate held.
    held: bool,
    /// Rendered detail.
    detail: String,
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Grades a probe result against an expectation.
#[must_use]
pub fn evaluate(expectation: &Expectation, result: &ProbeResult) -> Outcome {
    let failure = failure_status(expectation.severity_on_failure);
    match result {
        ProbeResult::Error(err) => graded(expectation, failure, err.to_string(), None),
        ProbeResult::Empty | ProbeResult::Value(_) => {
            let value = result.value();
            let evidence = value.cloned();
            match apply(&expectation.predicate, value) {
                Ok(check) if check.held => {
                    graded(expectation, OutcomeStatus::Pass, check.detail, evidence)
                }
                Ok(check) => graded(expectation, failure, check.detail, evidence),
                Err(err) => graded(expectation, OutcomeStatus::Fail, err.to_string(), evidence),
            }
        }
    }
}

/// Records an expectation as skipped without evaluating it.
#[must_use]
pub fn skipped(expectation: &Expectation, reason: impl Into<String>) -> Outcome {
    graded(expectation, OutcomeStatus::Skip, reason.into(), None)
}

/// Returns a SKIP outcome when any dependency did not pass.
#[must_use]
pub fn dependency_gate(
    expectation: &Expectation,
    statuses: &HashMap<ExpectationId, OutcomeStatus>,
) -> Option<Outcome> {
    for dependency in &expectation.depends_on {
        match statuses.get(dependency) {
            Some(OutcomeStatus::Pass) => {}
            Some(status) => {
                return Some(skipped(
                    expectation,
                    format!("dependency `{dependency}` did not pass ({status})"),
                ));
            }
            None => {
                return Some(skipped(
                    expectation,
                    format!("dependency `{dependency}` was not evaluated"),
                ));
            }
        }
    }
    None
}

/// Maps a failure severity to an outcome status.
const fn failure_status(severity: Severity) -> OutcomeStatus {
    match severity {
        Severity::Fail => OutcomeStatus::Fail,
        Severity::Warn => OutcomeStatus::Warn,
    }
}

/// Builds an outcome, attaching remediation only to FAIL and WARN.
fn graded(
    expectation: &Expectation,
    status: OutcomeStatus,
    message: String,
    evidence: Option<Value>,
) -> Outcome {
    let remediation = match status {
        OutcomeStatus::Fail | OutcomeStatus::Warn => expectation.remediation.clone(),
        OutcomeStatus::Pass | OutcomeStatus::Skip => None,
    };
    Outcome {
        expectation_id: expectation.id.clone(),
        description: expectation.description.clone(),
        status,
        message,
        remediation,
        evidence,
        attempts: 0,
    }
}

// ============================================================================
// SECTION: Predicates
// ============================================================================

/// Applies a predicate to a probe value (`None` means empty).
fn apply(predicate: &Predicate, value: Option<&Value>) -> Result<Check, EvaluationError> {
    match predicate {
        Predicate::Exists => Ok(Check {
            held: value.is_some(),
            detail: presence_detail(value),
        }),
        Predicate::Absent => Ok(Check {
            held: value.is_none(),
            detail: presence_detail(value),
        }),
        Predicate::CountAtLeast {
            count,
            path,
            identity_key,
        } => {
            let found = count_elements(value, path.as_deref(), identity_key.as_deref())?;
            Ok(Check {
                held: found >= *count,
                detail: format!("found {found} (expected at least {count})"),
            })
        }
        Predicate::CountEquals {
            count,
            path,
            identity_key,
        } => {
            let found = count_elements(value, path.as_deref(), identity_key.as_deref())?;
            Ok(Check {
                held: found == *count,
                detail: format!("found {found} (expected exactly {count})"),
            })
        }
        Predicate::FieldEquals {
            path,
            expected,
            case_insensitive,
        } => {
            let actual = extract_required(value, path)?;
            let held = match (&actual, expected) {
                (Value::String(left), Value::String(right)) if *case_insensitive => {
                    left.to_lowercase() == right.to_lowercase()
                }
                _ => actual == *expected,
            };
            Ok(Check {
                held,
                detail: format!("`{path}` is {actual} (expected {expected})"),
            })
        }
        Predicate::FieldMatches {
            path,
            pattern,
            mode,
        } => {
            let actual = extract_required(value, path)?;
            let text = scalar_text(&actual, path)?;
            let regex = compile_pattern(pattern, *mode)
                .map_err(|err| EvaluationError::InvalidPattern(err.to_string()))?;
            Ok(Check {
                held: regex.is_match(&text),
                detail: format!("`{path}` is {actual} (pattern /{pattern}/)"),
            })
        }
        Predicate::FieldCompare {
            path,
            comparator,
            expected,
        } => {
            let actual = extract_required(value, path)?;
            let held = compare(*comparator, &actual, expected).ok_or_else(|| {
                EvaluationError::Incomparable {
                    path: path.clone(),
                    actual: actual.to_string(),
                    expected: expected.to_string(),
                }
            })?;
            Ok(Check {
                held,
                detail: format!("`{path}` is {actual} (expected {} {expected})", comparator.symbol()),
            })
        }
        Predicate::AllReady {
            path,
            total_path,
        } => {
            let ready = extract_count(value, path)?;
            let total = extract_count(value, total_path)?;
            let detail = if total == 0 {
                format!("{ready}/{total} ready (no instances declared)")
            } else {
                format!("{ready}/{total} ready")
            };
            Ok(Check {
                held: total > 0 && ready == total,
                detail,
            })
        }
    }
}

/// Renders presence for `exists` and `absent`.
fn presence_detail(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(items)) => format!("probe returned {} item(s)", items.len()),
        Some(_) => "probe returned data".to_string(),
        None => "probe returned no data".to_string(),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Selects a path; `Ok(None)` when nothing matched.
fn extract(value: &Value, path: &str) -> Result<Option<Value>, EvaluationError> {
    let matches = select(value, &absolute_path(path))
        .map_err(|_| EvaluationError::InvalidPath(path.to_string()))?;
    match matches.as_slice() {
        [] => Ok(None),
        [single] => Ok(Some((*single).clone())),
        many => Ok(Some(Value::Array(many.iter().map(|item| (*item).clone()).collect()))),
    }
}

/// Selects a path that must be present.
fn extract_required(value: Option<&Value>, path: &str) -> Result<Value, EvaluationError> {
    let Some(value) = value else {
        return Err(EvaluationError::MissingField(path.to_string()));
    };
    extract(value, path)?.ok_or_else(|| EvaluationError::MissingField(path.to_string()))
}

/// Selects a non-negative integer count. Integer strings are accepted.
fn extract_count(value: Option<&Value>, path: &str) -> Result<u64, EvaluationError> {
    let actual = extract_required(value, path)?;
    let count = match &actual {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    };
    count.ok_or_else(|| EvaluationError::NotACount {
        path: path.to_string(),
        value: actual.to_string(),
    })
}

/// Renders a scalar for pattern matching.
fn scalar_text(value: &Value, path: &str) -> Result<String, EvaluationError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => {
            Err(EvaluationError::NotScalar(path.to_string()))
        }
    }
}

/// Counts elements after deduplicating by identity.
///
/// Arrays count their elements, empty results count zero, and any other value
/// counts as one. Elements without the identity key are identified by their
/// whole value.
fn count_elements(
    value: Option<&Value>,
    path: Option<&str>,
    identity_key: Option<&str>,
) -> Result<u64, EvaluationError> {
    let target = match (value, path) {
        (None, _) => return Ok(0),
        (Some(value), None) => Some(value.clone()),
        (Some(value), Some(path)) => Some(
            extract(value, path)?.ok_or_else(|| EvaluationError::MissingField(path.to_string()))?,
        ),
    };
    let elements = match target {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => vec![other],
    };
    let mut identities = BTreeSet::new();
    for element in &elements {
        let identity = match identity_key {
            Some(key) => extract(element, key)?.unwrap_or_else(|| element.clone()),
            None => element.clone(),
        };
        identities.insert(identity.to_string());
    }
    Ok(u64::try_from(identities.len()).unwrap_or(u64::MAX))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
