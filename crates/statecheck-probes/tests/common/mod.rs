// crates/statecheck-probes/tests/common/mod.rs
// ============================================================================
// Module: Common Probe Test Fixtures
// Description: Recording command runner and shared probe context.
// Purpose: Exercise cluster probes without kubectl or helm installed.
// Dependencies: statecheck-core, statecheck-probes
// ============================================================================

//! ## Overview
//! [`RecordingRunner`] answers every invocation with a canned
//! [`CommandOutput`] and records the program and arguments it was given.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use serde_json::Value;
use statecheck_core::ProbeContext;
use statecheck_core::ProbeError;
use statecheck_core::ProbeSpec;
use statecheck_core::RunId;
use statecheck_probes::CommandOutput;
use statecheck_probes::CommandRunner;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Runner returning one canned output and recording invocations.
pub struct RecordingRunner {
    /// Output returned for every invocation.
    output: CommandOutput,
    /// Recorded `(program, args)` pairs.
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingRunner {
    /// Creates a runner answering with `output`.
    #[must_use]
    pub fn new(output: CommandOutput) -> Self {
        Self {
            output,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Recorded invocations.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// The single recorded command line, joined with spaces.
    #[must_use]
    pub fn command_line(&self) -> String {
        let calls = self.calls();
        assert_eq!(calls.len(), 1, "expected exactly one invocation");
        let (program, args) = &calls[0];
        std::iter::once(program.clone()).chain(args.iter().cloned()).collect::<Vec<_>>().join(" ")
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ProbeError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((program.to_string(), args.to_vec()));
        }
        Ok(self.output.clone())
    }
}

/// Probe context for the `observability` namespace.
#[must_use]
pub fn sample_context() -> ProbeContext {
    ProbeContext {
        run_id: RunId::new("run-probes"),
        namespace: "observability".to_string(),
    }
}

/// Probe reference with params.
#[must_use]
pub fn spec(probe: &str, query: &str, params: Value) -> ProbeSpec {
    ProbeSpec {
        probe: probe.into(),
        query: query.to_string(),
        params: Some(params),
    }
}
