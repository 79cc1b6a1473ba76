// crates/statecheck-core/src/core/expectation.rs
// ============================================================================
// Module: Statecheck Expectations
// Description: Declarative expectations, probe references, and predicates.
// Purpose: Describe what correct state looks like and how to grade it.
// Dependencies: jsonpath_lib, regex, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! An [`Expectation`] binds a probe reference to a [`Predicate`], a failure
//! severity, optional dependencies, and an advisory remediation hint.
//! Expectations are immutable for the duration of a run.
//!
//! ## Invariants
//! - Predicate paths are JSONPath expressions; a path without a leading `$` is
//!   resolved relative to the document root.
//! - Predicate patterns and paths are validated at load time so evaluation never
//!   encounters a malformed rule.

// ============================================================================
// SECTION: Imports
// ============================================================================

use jsonpath_lib::select;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::ExpectationId;
use crate::core::identifiers::ProbeId;

// ============================================================================
// SECTION: Expectation
// ============================================================================

/// Declared rule describing correct state for one dimension of the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectation {
    /// Unique expectation identifier.
    pub id: ExpectationId,
    /// Human-readable label rendered in reports.
    pub description: String,
    /// Probe to run and its parameters.
    pub probe: ProbeSpec,
    /// Comparison rule applied to the probe result.
    pub predicate: Predicate,
    /// Status recorded when the predicate does not hold or the probe errors.
    #[serde(default, alias = "severity")]
    pub severity_on_failure: Severity,
    /// Expectations that must pass before this one is evaluated.
    #[serde(default)]
    pub depends_on: Vec<ExpectationId>,
    /// Subset tags (for example `quick`).
    #[serde(default)]
    pub tags: Vec<String>,
    /// Advisory corrective action shown on failure. Never executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl Expectation {
    /// Returns true when the expectation carries the given tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
    }
}

/// Probe reference: which probe kind to run and with which parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeSpec {
    /// Registered probe kind (for example `kubernetes`).
    pub probe: ProbeId,
    /// Probe-specific query name (for example `get`).
    pub query: String,
    /// Probe-specific parameters (selectors, namespaces, paths).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl ProbeSpec {
    /// Returns a string parameter by key when present.
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.as_ref().and_then(|params| params.get(key)).and_then(Value::as_str)
    }
}

/// Severity recorded when an expectation is not met.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Unmet expectation fails the run.
    #[default]
    #[serde(alias = "FAIL")]
    Fail,
    /// Unmet expectation is reported but does not fail the run.
    #[serde(alias = "WARN")]
    Warn,
}

// ============================================================================
// SECTION: Predicates
// ============================================================================

/// Comparison rule applied to a probe result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum Predicate {
    /// Passes when the probe result is non-empty.
    Exists,
    /// Passes when the probe result is empty.
    Absent,
    /// Passes when the deduplicated element count is at least `count`.
    CountAtLeast {
        /// Minimum element count.
        count: u64,
        /// Optional path selecting the collection to count.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        /// Optional identity path used to deduplicate elements.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identity_key: Option<String>,
    },
    /// Passes when the deduplicated element count equals `count`.
    CountEquals {
        /// Exact element count.
        count: u64,
        /// Optional path selecting the collection to count.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        /// Optional identity path used to deduplicate elements.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identity_key: Option<String>,
    },
    /// Passes when the extracted field equals `expected`.
    FieldEquals {
        /// Field path.
        path: String,
        /// Expected value.
        expected: Value,
        /// Compares strings ignoring ASCII and Unicode case.
        #[serde(default)]
        case_insensitive: bool,
    },
    /// Passes when the extracted field matches `pattern`.
    FieldMatches {
        /// Field path.
        path: String,
        /// Regular expression.
        pattern: String,
        /// Full or substring match.
        #[serde(default)]
        mode: MatchMode,
    },
    /// Passes when the extracted field satisfies `comparator` against `expected`.
    FieldCompare {
        /// Field path.
        path: String,
        /// Comparison operator.
        comparator: Comparator,
        /// Right-hand operand.
        expected: Value,
    },
    /// Passes when the ready count equals the total count and the total is positive.
    AllReady {
        /// Path to the ready count.
        path: String,
        /// Path to the total count.
        total_path: String,
    },
}

/// Regex matching mode for [`Predicate::FieldMatches`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// The whole field must match.
    #[default]
    Full,
    /// Any substring of the field may match.
    Substring,
}

/// Comparison operators for [`Predicate::FieldCompare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    /// JSON equality.
    Equals,
    /// JSON inequality.
    NotEquals,
    /// Integer greater-than.
    GreaterThan,
    /// Integer greater-than-or-equal.
    GreaterThanOrEqual,
    /// Integer less-than.
    LessThan,
    /// Integer less-than-or-equal.
    LessThanOrEqual,
    /// Substring or array containment.
    Contains,
    /// Membership in an expected array.
    InSet,
}

impl Comparator {
    /// Returns the operator symbol used in rendered messages.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::Contains => "to contain",
            Self::InSet => "in",
        }
    }
}

/// Load-time predicate validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    /// Path is empty.
    #[error("predicate path must not be empty")]
    EmptyPath,
    /// Path is not a valid JSONPath expression.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// Pattern failed to compile.
    #[error("invalid pattern {pattern}: {error}")]
    InvalidPattern {
        /// Offending pattern.
        pattern: String,
        /// Compiler error.
        error: String,
    },
}

impl Predicate {
    /// Returns the stable predicate kind label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Exists => "exists",
            Self::Absent => "absent",
            Self::CountAtLeast {
                ..
            } => "count_at_least",
            Self::CountEquals {
                ..
            } => "count_equals",
            Self::FieldEquals {
                ..
            } => "field_equals",
            Self::FieldMatches {
                ..
            } => "field_matches",
            Self::FieldCompare {
                ..
            } => "field_compare",
            Self::AllReady {
                ..
            } => "all_ready",
        }
    }

    /// Validates paths and patterns.
    ///
    /// # Errors
    ///
    /// Returns [`PredicateError`] when a path or pattern is malformed.
    pub fn validate(&self) -> Result<(), PredicateError> {
        match self {
            Self::Exists | Self::Absent => Ok(()),
            Self::CountAtLeast {
                path,
                identity_key,
                ..
            }
            | Self::CountEquals {
                path,
                identity_key,
                ..
            } => {
                if let Some(path) = path {
                    validate_path(path)?;
                }
                if let Some(identity_key) = identity_key {
                    validate_path(identity_key)?;
                }
                Ok(())
            }
            Self::FieldEquals {
                path,
                ..
            }
            | Self::FieldCompare {
                path,
                ..
            } => validate_path(path),
            Self::FieldMatches {
                path,
                pattern,
                mode,
            } => {
                validate_path(path)?;
                compile_pattern(pattern, *mode).map(|_| ())
            }
            Self::AllReady {
                path,
                total_path,
            } => {
                validate_path(path)?;
                validate_path(total_path)
            }
        }
    }
}

// ============================================================================
// SECTION: Path and Pattern Helpers
// ============================================================================

/// Normalizes a field path into an absolute JSONPath expression.
#[must_use]
pub fn absolute_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('$') {
        path.to_string()
    } else if path.starts_with('[') {
        format!("${path}")
    } else {
        format!("$.{path}")
    }
}

/// Compiles a match pattern, anchoring it for [`MatchMode::Full`].
///
/// # Errors
///
/// Returns [`PredicateError::InvalidPattern`] when the pattern does not compile.
pub fn compile_pattern(pattern: &str, mode: MatchMode) -> Result<Regex, PredicateError> {
    let source = match mode {
        MatchMode::Full => format!("^(?:{pattern})$"),
        MatchMode::Substring => pattern.to_string(),
    };
    Regex::new(&source).map_err(|err| PredicateError::InvalidPattern {
        pattern: pattern.to_string(),
        error: err.to_string(),
    })
}

/// Rejects empty or unparsable paths.
fn validate_path(path: &str) -> Result<(), PredicateError> {
    if path.trim().is_empty() {
        return Err(PredicateError::EmptyPath);
    }
    let probe_document = Value::Object(serde_json::Map::new());
    select(&probe_document, &absolute_path(path))
        .map(|_| ())
        .map_err(|_| PredicateError::InvalidPath(path.to_string()))
}
