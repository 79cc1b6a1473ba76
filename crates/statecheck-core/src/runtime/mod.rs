// crates/statecheck-core/src/runtime/mod.rs
// ============================================================================
// Module: Statecheck Runtime
// Description: Evaluation engine, rule registry, probe executor, and orchestrator.
// Purpose: Execute verification runs against injected probes.
// Dependencies: crate::{core, interfaces, run_log}
// ============================================================================

//! ## Overview
//! Runtime modules turn declared expectations into a report: the registry
//! validates and orders them, the executor invokes probes under timeouts and
//! retries, the evaluator grades results, and the aggregator assembles the
//! ordered report. The orchestrator ties these together as a state machine.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod aggregator;
pub mod comparator;
pub mod evaluator;
pub mod executor;
pub mod orchestrator;
pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use aggregator::AggregationError;
pub use aggregator::ReportAggregator;
pub use evaluator::EvaluationError;
pub use evaluator::dependency_gate;
pub use evaluator::evaluate;
pub use evaluator::skipped;
pub use executor::Execution;
pub use executor::ProbeExecutor;
pub use orchestrator::ExitStatus;
pub use orchestrator::FatalError;
pub use orchestrator::Orchestrator;
pub use orchestrator::RUN_TIMED_OUT;
pub use orchestrator::RunPhase;
pub use registry::ExecutionPlan;
pub use registry::RegistryError;
pub use registry::RuleRegistry;
