// crates/statecheck-core/src/lib.rs
// ============================================================================
// Module: Statecheck Core Library
// Description: Public API surface for the Statecheck verifier core.
// Purpose: Expose the expectation model, probe interfaces, and run engine.
// Dependencies: crate::{core, interfaces, runtime, run_log}
// ============================================================================

//! ## Overview
//! Statecheck core checks a live system against declared expectations. Probes
//! fetch read-only state through the [`Probe`] interface, the evaluator grades
//! each probe result, and the orchestrator aggregates graded outcomes into a
//! severity-ranked [`Report`]. The core never talks to a concrete client; all
//! target access goes through injected interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod run_log;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::*;

pub use interfaces::Clock;
pub use interfaces::Probe;
pub use interfaces::ProbeContext;
pub use interfaces::ProbeError;
pub use interfaces::SystemClock;
pub use run_log::FileRunLogSink;
pub use run_log::MemoryRunLogSink;
pub use run_log::NoopRunLogSink;
pub use run_log::RunLogEvent;
pub use run_log::RunLogSink;
pub use run_log::StderrRunLogSink;
pub use runtime::ExecutionPlan;
pub use runtime::ExitStatus;
pub use runtime::FatalError;
pub use runtime::Orchestrator;
pub use runtime::RegistryError;
pub use runtime::ReportAggregator;
pub use runtime::RuleRegistry;
pub use runtime::RunPhase;
