//! Evaluator property-based tests.
//!
//! ## Purpose
//! These tests exercise predicate grading with randomized probe output to
//! prove that grading is a pure function and that readiness never passes
//! vacuously.
//!
//! ## What is covered
//! - Repeated grading of the same input yields the same outcome.
//! - `all_ready` passes only when at least one instance is declared and all are ready.
//! - `count_at_least` agrees with the array length.
// crates/statecheck-core/tests/proptest_evaluator.rs
// ============================================================================
// Module: Evaluator Property-Based Tests
// Description: Randomized checks for grading determinism and boundaries.
// Purpose: Ensure grading is pure and readiness boundaries hold for all inputs.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;
use statecheck_core::Expectation;
use statecheck_core::ExpectationId;
use statecheck_core::OutcomeStatus;
use statecheck_core::Predicate;
use statecheck_core::ProbeResult;
use statecheck_core::ProbeSpec;
use statecheck_core::Severity;
use statecheck_core::runtime::evaluate;

fn expectation(predicate: Predicate) -> Expectation {
    Expectation {
        id: ExpectationId::new("prop"),
        description: "property".to_string(),
        probe: ProbeSpec {
            probe: "kubernetes".into(),
            query: "get".to_string(),
            params: None,
        },
        predicate,
        severity_on_failure: Severity::Fail,
        depends_on: Vec::new(),
        tags: Vec::new(),
        remediation: None,
    }
}

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0 .. 4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0 .. 4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn grading_is_deterministic(value in arb_json(), count in 0u64 .. 5) {
        let predicates = [
            Predicate::Exists,
            Predicate::Absent,
            Predicate::CountAtLeast { count, path: None, identity_key: None },
            Predicate::FieldEquals { path: "a".to_string(), expected: json!("x"), case_insensitive: true },
        ];
        let result = ProbeResult::from_value(Some(value));
        for predicate in predicates {
            let check = expectation(predicate);
            prop_assert_eq!(evaluate(&check, &result), evaluate(&check, &result));
        }
    }

    #[test]
    fn readiness_never_passes_without_instances(ready in 0u64 .. 10, total in 0u64 .. 10) {
        let check = expectation(Predicate::AllReady {
            path: "status.readyReplicas".to_string(),
            total_path: "status.replicas".to_string(),
        });
        let result = ProbeResult::from_value(Some(json!({
            "status": {"readyReplicas": ready, "replicas": total}
        })));
        let outcome = evaluate(&check, &result);
        let expected_pass = total > 0 && ready == total;
        prop_assert_eq!(outcome.status == OutcomeStatus::Pass, expected_pass);
    }

    #[test]
    fn count_at_least_agrees_with_length(len in 0usize .. 8, count in 0u64 .. 8) {
        let items: Vec<Value> = (0 .. len).map(|index| json!({"index": index})).collect();
        let check = expectation(Predicate::CountAtLeast { count, path: None, identity_key: None });
        let outcome = evaluate(&check, &ProbeResult::from_value(Some(Value::Array(items))));
        let found = u64::try_from(len).unwrap();
        prop_assert_eq!(outcome.status == OutcomeStatus::Pass, found >= count);
    }
}
