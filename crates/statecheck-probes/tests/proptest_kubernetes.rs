//! Kubernetes probe property-based tests.
//!
//! ## Purpose
//! These tests exercise parameter validation with randomized inputs to prove
//! that no parameter value can be turned into a kubectl flag.
//!
//! ## What is covered
//! - Values starting with `-` are rejected for every argument slot.
//! - Validation never invokes the command runner.
// crates/statecheck-probes/tests/proptest_kubernetes.rs
// ============================================================================
// Module: Kubernetes Probe Property-Based Tests
// Description: Randomized checks for argument validation.
// Purpose: Ensure parameter values cannot inject command-line flags.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;
use statecheck_core::Probe;
use statecheck_probes::CommandOutput;
use statecheck_probes::KubernetesProbe;
use statecheck_probes::KubernetesProbeConfig;

use crate::common::RecordingRunner;
use crate::common::spec;

proptest! {
    #[test]
    fn flag_like_values_are_rejected(
        slot in prop_oneof![Just("resource"), Just("name"), Just("namespace"), Just("selector")],
        suffix in "[a-z=/-]{0,16}",
    ) {
        let runner = Arc::new(RecordingRunner::new(CommandOutput::ok("{}")));
        let probe = KubernetesProbe::new(
            KubernetesProbeConfig::default(),
            Arc::clone(&runner) as Arc<dyn statecheck_probes::CommandRunner>,
        )
        .unwrap();
        let mut params = json!({"resource": "pods"});
        params[slot] = json!(format!("-{suffix}"));
        prop_assert!(probe.validate(&spec("kubernetes", "get", params)).is_err());
        prop_assert!(runner.calls().is_empty());
    }
}
