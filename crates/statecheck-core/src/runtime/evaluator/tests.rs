// crates/statecheck-core/src/runtime/evaluator/tests.rs
// ============================================================================
// Module: Evaluator Unit Tests
// Description: Unit tests for predicate grading and dependency gating.
// Purpose: Pin grading semantics for each predicate kind and error path.
// Dependencies: statecheck-core
// ============================================================================

//! ## Overview
//! Exercises every predicate against representative probe output, including
//! the zero-of-zero readiness boundary and identity-key deduplication.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use serde_json::Value;
use serde_json::json;

use super::dependency_gate;
use super::evaluate;
use crate::core::Comparator;
use crate::core::Expectation;
use crate::core::ExpectationId;
use crate::core::MatchMode;
use crate::core::OutcomeStatus;
use crate::core::Predicate;
use crate::core::ProbeResult;
use crate::core::ProbeSpec;
use crate::core::Severity;
use crate::interfaces::ProbeError;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn expectation(predicate: Predicate) -> Expectation {
    Expectation {
        id: ExpectationId::new("check"),
        description: "check".to_string(),
        probe: ProbeSpec {
            probe: "kubernetes".into(),
            query: "get".to_string(),
            params: None,
        },
        predicate,
        severity_on_failure: Severity::Fail,
        depends_on: Vec::new(),
        tags: Vec::new(),
        remediation: Some("kubectl describe deployment grafana".to_string()),
    }
}

fn value(json: Value) -> ProbeResult {
    ProbeResult::from_value(Some(json))
}

fn status_of(predicate: Predicate, result: &ProbeResult) -> OutcomeStatus {
    evaluate(&expectation(predicate), result).status
}

// ============================================================================
// SECTION: Presence
// ============================================================================

#[test]
fn exists_passes_on_data_and_fails_on_empty() {
    assert_eq!(status_of(Predicate::Exists, &value(json!({"name": "grafana"}))), OutcomeStatus::Pass);
    assert_eq!(status_of(Predicate::Exists, &ProbeResult::Empty), OutcomeStatus::Fail);
    assert_eq!(status_of(Predicate::Exists, &value(json!([]))), OutcomeStatus::Fail);
    assert_eq!(status_of(Predicate::Absent, &ProbeResult::Empty), OutcomeStatus::Pass);
}

#[test]
fn probe_error_grades_at_declared_severity_with_cause() {
    let mut warn = expectation(Predicate::Exists);
    warn.severity_on_failure = Severity::Warn;
    let result = ProbeResult::Error(ProbeError::Unreachable("connection refused".to_string()));
    let outcome = evaluate(&warn, &result);
    assert_eq!(outcome.status, OutcomeStatus::Warn);
    assert!(outcome.message.contains("connection refused"));
    assert!(outcome.remediation.is_some());
    assert!(outcome.evidence.is_none());

    let outcome = evaluate(&expectation(Predicate::Absent), &result);
    assert_eq!(outcome.status, OutcomeStatus::Fail, "errors never read as absent");
}

#[test]
fn pass_outcomes_carry_no_remediation() {
    let outcome = evaluate(&expectation(Predicate::Exists), &value(json!({"a": 1})));
    assert_eq!(outcome.status, OutcomeStatus::Pass);
    assert!(outcome.remediation.is_none());
    assert_eq!(outcome.evidence, Some(json!({"a": 1})));
}

// ============================================================================
// SECTION: Counting
// ============================================================================

#[test]
fn count_deduplicates_by_identity_key() {
    let pods = json!([
        {"metadata": {"name": "grafana-0"}, "phase": "Running"},
        {"metadata": {"name": "grafana-0"}, "phase": "Pending"},
        {"metadata": {"name": "grafana-1"}, "phase": "Running"},
    ]);
    let deduped = Predicate::CountEquals {
        count: 2,
        path: None,
        identity_key: Some("metadata.name".to_string()),
    };
    assert_eq!(status_of(deduped, &value(pods.clone())), OutcomeStatus::Pass);
    let raw = Predicate::CountEquals {
        count: 3,
        path: None,
        identity_key: None,
    };
    assert_eq!(status_of(raw, &value(pods)), OutcomeStatus::Pass);
}

#[test]
fn count_at_least_treats_empty_as_zero() {
    let predicate = Predicate::CountAtLeast {
        count: 1,
        path: None,
        identity_key: None,
    };
    let outcome = evaluate(&expectation(predicate), &ProbeResult::Empty);
    assert_eq!(outcome.status, OutcomeStatus::Fail);
    assert_eq!(outcome.message, "found 0 (expected at least 1)");
}

#[test]
fn count_with_path_counts_the_selected_collection() {
    let predicate = Predicate::CountAtLeast {
        count: 2,
        path: Some("spec.rules".to_string()),
        identity_key: Some("host".to_string()),
    };
    let ingress = json!({"spec": {"rules": [{"host": "a"}, {"host": "b"}, {"host": "a"}]}});
    assert_eq!(status_of(predicate, &value(ingress)), OutcomeStatus::Pass);
}

// ============================================================================
// SECTION: Field Predicates
// ============================================================================

#[test]
fn field_equals_respects_case_sensitivity() {
    let doc = value(json!({"database": {"type": "Postgres"}}));
    let strict = Predicate::FieldEquals {
        path: "database.type".to_string(),
        expected: json!("postgres"),
        case_insensitive: false,
    };
    assert_eq!(status_of(strict, &doc), OutcomeStatus::Fail);
    let relaxed = Predicate::FieldEquals {
        path: "$.database.type".to_string(),
        expected: json!("postgres"),
        case_insensitive: true,
    };
    assert_eq!(status_of(relaxed, &doc), OutcomeStatus::Pass);
}

#[test]
fn missing_field_is_a_fail_naming_the_field_even_for_warn_severity() {
    let mut warn = expectation(Predicate::FieldEquals {
        path: "ingress.enabled".to_string(),
        expected: json!(true),
        case_insensitive: false,
    });
    warn.severity_on_failure = Severity::Warn;
    let outcome = evaluate(&warn, &value(json!({"service": {}})));
    assert_eq!(outcome.status, OutcomeStatus::Fail);
    assert!(outcome.message.contains("ingress.enabled"));
}

#[test]
fn field_matches_full_versus_substring() {
    let doc = value(json!({"host": "grafana.example.local"}));
    let full = Predicate::FieldMatches {
        path: "host".to_string(),
        pattern: "grafana".to_string(),
        mode: MatchMode::Full,
    };
    assert_eq!(status_of(full, &doc), OutcomeStatus::Fail);
    let substring = Predicate::FieldMatches {
        path: "host".to_string(),
        pattern: "grafana".to_string(),
        mode: MatchMode::Substring,
    };
    assert_eq!(status_of(substring, &doc), OutcomeStatus::Pass);
    let anchored = Predicate::FieldMatches {
        path: "host".to_string(),
        pattern: r"grafana\.[a-z.]+".to_string(),
        mode: MatchMode::Full,
    };
    assert_eq!(status_of(anchored, &doc), OutcomeStatus::Pass);
}

#[test]
fn field_compare_thresholds_and_incomparable_operands() {
    let doc = value(json!({"replicas": 3, "class": "nginx"}));
    let threshold = Predicate::FieldCompare {
        path: "replicas".to_string(),
        comparator: Comparator::GreaterThanOrEqual,
        expected: json!(2),
    };
    assert_eq!(status_of(threshold, &doc), OutcomeStatus::Pass);
    let undefined = Predicate::FieldCompare {
        path: "class".to_string(),
        comparator: Comparator::GreaterThan,
        expected: json!(1),
    };
    let outcome = evaluate(&expectation(undefined), &doc);
    assert_eq!(outcome.status, OutcomeStatus::Fail);
    assert!(outcome.message.starts_with("cannot compare"));
}

// ============================================================================
// SECTION: Readiness
// ============================================================================

#[test]
fn all_ready_requires_equal_positive_counts() {
    let predicate = || Predicate::AllReady {
        path: "status.readyReplicas".to_string(),
        total_path: "status.replicas".to_string(),
    };
    let ready = value(json!({"status": {"readyReplicas": 2, "replicas": 2}}));
    assert_eq!(status_of(predicate(), &ready), OutcomeStatus::Pass);
    let partial = value(json!({"status": {"readyReplicas": 1, "replicas": 2}}));
    let outcome = evaluate(&expectation(predicate()), &partial);
    assert_eq!(outcome.status, OutcomeStatus::Fail);
    assert_eq!(outcome.message, "1/2 ready");
}

#[test]
fn all_ready_zero_of_zero_never_passes() {
    let mut warn = expectation(Predicate::AllReady {
        path: "ready".to_string(),
        total_path: "total".to_string(),
    });
    warn.severity_on_failure = Severity::Warn;
    let outcome = evaluate(&warn, &value(json!({"ready": 0, "total": 0})));
    assert_eq!(outcome.status, OutcomeStatus::Warn);
    assert!(outcome.message.starts_with("0/0 ready"));
}

// ============================================================================
// SECTION: Dependency Gating
// ============================================================================

#[test]
fn dependency_gate_skips_unless_every_dependency_passed() {
    let mut dependent = expectation(Predicate::Exists);
    dependent.depends_on = vec![ExpectationId::new("ingress-enabled")];
    let mut statuses = HashMap::new();
    statuses.insert(ExpectationId::new("ingress-enabled"), OutcomeStatus::Warn);
    let skipped = dependency_gate(&dependent, &statuses).expect("should skip");
    assert_eq!(skipped.status, OutcomeStatus::Skip);
    assert!(skipped.message.contains("ingress-enabled"));
    assert!(skipped.remediation.is_none());

    statuses.insert(ExpectationId::new("ingress-enabled"), OutcomeStatus::Pass);
    assert!(dependency_gate(&dependent, &statuses).is_none());
}
