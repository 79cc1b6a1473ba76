// crates/statecheck-core/src/runtime/orchestrator.rs
// ============================================================================
// Module: Statecheck Orchestrator
// Description: Run state machine driving registry, executor, and aggregator.
// Purpose: Execute one verification run and map it to an exit status.
// Dependencies: crate::{core, interfaces, run_log, runtime}, serde, thiserror, time
// ============================================================================

//! ## Overview
//! A run moves through `INIT -> LOADING_RULES -> RUNNING -> REPORTING -> DONE`.
//! Configuration problems found in `INIT` or `LOADING_RULES` end the run in
//! `FATAL` before any probe is invoked. Once running, every failure mode is
//! graded into an outcome, so a run that reaches `RUNNING` always produces a
//! complete report.
//!
//! ## Invariants
//! - Skipped checks (unmet dependency or expired run deadline) never invoke a probe.
//! - The main thread is the only writer to the aggregator, including in
//!   parallel mode where workers hand outcomes over a channel.
//! - Report order is plan order regardless of parallelism.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;

use crate::core::Expectation;
use crate::core::ExpectationId;
use crate::core::Outcome;
use crate::core::OutcomeStatus;
use crate::core::Report;
use crate::core::RunConfig;
use crate::core::RunId;
use crate::core::RunSettings;
use crate::core::SettingsError;
use crate::interfaces::Clock;
use crate::interfaces::Probe;
use crate::interfaces::ProbeContext;
use crate::interfaces::SystemClock;
use crate::run_log::NoopRunLogSink;
use crate::run_log::RunLogEvent;
use crate::run_log::RunLogSink;
use crate::runtime::aggregator::ReportAggregator;
use crate::runtime::evaluator;
use crate::runtime::executor::Execution;
use crate::runtime::executor::ProbeExecutor;
use crate::runtime::registry::ExecutionPlan;
use crate::runtime::registry::RegistryError;
use crate::runtime::registry::RuleRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Skip reason recorded once the run deadline expires.
pub const RUN_TIMED_OUT: &str = "run timed out";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Run lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Resolving run configuration.
    Init,
    /// Validating and ordering expectations.
    LoadingRules,
    /// Probing and grading.
    Running,
    /// Assembling the report.
    Reporting,
    /// Report produced.
    Done,
    /// Configuration error; nothing was probed.
    Fatal,
}

/// Process exit status contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// No failures (warnings allowed).
    Success,
    /// At least one FAIL outcome.
    CheckFailure,
    /// Fatal configuration error.
    ConfigError,
    /// The report could not be written.
    SinkError,
}

impl ExitStatus {
    /// Numeric process exit code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::CheckFailure => 1,
            Self::ConfigError => 2,
            Self::SinkError => 3,
        }
    }

    /// Exit status implied by a report verdict.
    #[must_use]
    pub const fn from_report(report: &Report) -> Self {
        if report.verdict.is_success() { Self::Success } else { Self::CheckFailure }
    }
}

/// Errors that abort a run before probing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalError {
    /// Run settings are missing or malformed.
    #[error("configuration error: {0}")]
    Settings(#[from] SettingsError),
    /// Expectations failed validation or subset planning.
    #[error("configuration error: {0}")]
    Registry(#[from] RegistryError),
}

impl FatalError {
    /// Exit status for fatal errors.
    #[must_use]
    pub const fn exit_status(&self) -> ExitStatus {
        ExitStatus::ConfigError
    }
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Drives one verification run.
pub struct Orchestrator {
    /// Probe routing every reference.
    probe: Arc<dyn Probe>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Run log sink.
    log: Arc<dyn RunLogSink>,
    /// Phases entered by the latest run.
    phases: Vec<RunPhase>,
}

impl Orchestrator {
    /// Creates an orchestrator with the system clock and no run log.
    #[must_use]
    pub fn new(probe: Arc<dyn Probe>) -> Self {
        Self {
            probe,
            clock: Arc::new(SystemClock),
            log: Arc::new(NoopRunLogSink),
            phases: Vec::new(),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the run log sink.
    #[must_use]
    pub fn with_log_sink(mut self, log: Arc<dyn RunLogSink>) -> Self {
        self.log = log;
        self
    }

    /// Phases entered by the latest run, in order.
    #[must_use]
    pub fn phases(&self) -> &[RunPhase] {
        &self.phases
    }

    /// Resolves configuration and builds the execution plan without probing.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError`] when settings or expectations are invalid.
    pub fn prepare(
        &mut self,
        settings: &RunSettings,
        expectations: Vec<Expectation>,
    ) -> Result<(RunConfig, ExecutionPlan), FatalError> {
        self.phases.clear();
        self.enter(RunPhase::Init, None);
        let config = match RunConfig::from_settings(settings) {
            Ok(config) => config,
            Err(err) => return Err(self.fatal(err.into(), None)),
        };
        self.enter(RunPhase::LoadingRules, Some(&config.run_id));
        let plan = RuleRegistry::load(expectations, &config, self.probe.as_ref())
            .and_then(|registry| registry.plan(&config.subset));
        match plan {
            Ok(plan) => Ok((config, plan)),
            Err(err) => Err(self.fatal(err.into(), Some(&config.run_id))),
        }
    }

    /// Executes a full run and returns its report.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError`] when settings or expectations are invalid; no
    /// probe is invoked in that case.
    pub fn run(
        &mut self,
        settings: &RunSettings,
        expectations: Vec<Expectation>,
    ) -> Result<Report, FatalError> {
        let (config, plan) = self.prepare(settings, expectations)?;
        self.enter(RunPhase::Running, Some(&config.run_id));
        let started = self.clock.now();
        let deadline = config.run_timeout.map(|timeout| started + timeout);
        let mut aggregator =
            ReportAggregator::new(config.run_id.clone(), plan.subset.clone(), self.timestamp());
        let executor = ProbeExecutor::new(
            Arc::clone(&self.probe),
            Arc::clone(&self.clock),
            Arc::clone(&self.log),
            config.retry,
            config.probe_timeout,
        );
        let mut run = RunState {
            config: &config,
            ctx: ProbeContext::from_config(&config),
            executor: &executor,
            clock: self.clock.as_ref(),
            log: self.log.as_ref(),
            deadline,
            statuses: HashMap::new(),
            aggregator: &mut aggregator,
            deadline_logged: false,
        };
        if config.parallelism <= 1 {
            for (position, check) in plan.checks.iter().enumerate() {
                let outcome = run
                    .gate(check)
                    .unwrap_or_else(|| probe_check(run.executor, check, &run.ctx, deadline));
                run.accept(position, outcome);
            }
        } else {
            for wave in plan.waves() {
                run.run_wave(&plan, &wave);
            }
        }

        self.enter(RunPhase::Reporting, Some(&config.run_id));
        let report = aggregator.finish(self.timestamp());
        self.log.record(
            &RunLogEvent::new("run_completed", Some(&config.run_id), self.clock.now_utc())
                .message(report.verdict.label()),
        );
        self.enter(RunPhase::Done, Some(&config.run_id));
        Ok(report)
    }

    /// Records a phase transition.
    fn enter(&mut self, phase: RunPhase, run_id: Option<&RunId>) {
        self.phases.push(phase);
        self.log.record(&RunLogEvent::new("phase", run_id, self.clock.now_utc()).phase(phase));
    }

    /// Enters FATAL and returns the error.
    fn fatal(&mut self, err: FatalError, run_id: Option<&RunId>) -> FatalError {
        self.enter(RunPhase::Fatal, run_id);
        self.log.record(
            &RunLogEvent::new("run_fatal", run_id, self.clock.now_utc()).message(err.to_string()),
        );
        err
    }

    /// Formats the clock's wall time as RFC 3339.
    fn timestamp(&self) -> String {
        self.clock.now_utc().format(&Rfc3339).unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Run State
// ============================================================================

/// Mutable state for one run in the RUNNING phase.
struct RunState<'a> {
    /// Immutable run configuration.
    config: &'a RunConfig,
    /// Context handed to probes.
    ctx: ProbeContext,
    /// Probe executor.
    executor: &'a ProbeExecutor,
    /// Time source.
    clock: &'a dyn Clock,
    /// Run log sink.
    log: &'a dyn RunLogSink,
    /// Global run deadline.
    deadline: Option<Instant>,
    /// Statuses recorded so far, for dependency gating.
    statuses: HashMap<ExpectationId, OutcomeStatus>,
    /// Sole owner of outcome appends.
    aggregator: &'a mut ReportAggregator,
    /// Whether the deadline expiry was logged.
    deadline_logged: bool,
}

impl RunState<'_> {
    /// Returns a SKIP outcome when the check must not be probed.
    fn gate(&mut self, check: &Expectation) -> Option<Outcome> {
        if self.deadline.is_some_and(|deadline| self.clock.now() >= deadline) {
            if !self.deadline_logged {
                self.deadline_logged = true;
                self.log.record(&RunLogEvent::new(
                    "run_timed_out",
                    Some(&self.config.run_id),
                    self.clock.now_utc(),
                ));
            }
            return Some(evaluator::skipped(check, RUN_TIMED_OUT));
        }
        evaluator::dependency_gate(check, &self.statuses)
    }

    /// Runs one dependency wave on bounded scoped workers.
    fn run_wave(&mut self, plan: &ExecutionPlan, wave: &[usize]) {
        let mut pending = Vec::with_capacity(wave.len());
        for &position in wave {
            match self.gate(&plan.checks[position]) {
                Some(outcome) => self.accept(position, outcome),
                None => pending.push(position),
            }
        }
        if pending.is_empty() {
            return;
        }
        let workers = self.config.parallelism.min(pending.len());
        let next = AtomicUsize::new(0);
        let (sender, receiver) = mpsc::channel::<(usize, Outcome)>();
        let executor = self.executor;
        let ctx = self.ctx.clone();
        let ctx = &ctx;
        let deadline = self.deadline;
        thread::scope(|scope| {
            for _ in 0 .. workers {
                let sender = sender.clone();
                let next = &next;
                let pending = &pending;
                scope.spawn(move || {
                    while let Some(&position) = pending.get(next.fetch_add(1, Ordering::SeqCst)) {
                        let outcome = probe_check(executor, &plan.checks[position], ctx, deadline);
                        if sender.send((position, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(sender);
            for (position, outcome) in receiver {
                self.accept(position, outcome);
            }
        });
    }

    /// Appends an outcome and records its status for later gating.
    fn accept(&mut self, position: usize, outcome: Outcome) {
        let mut event = RunLogEvent::new(
            if outcome.status == OutcomeStatus::Skip { "check_skipped" } else { "check_completed" },
            Some(&self.config.run_id),
            self.clock.now_utc(),
        )
        .expectation(&outcome.expectation_id)
        .status(outcome.status)
        .message(outcome.message.clone());
        if outcome.attempts > 0 {
            event = event.attempt(outcome.attempts);
        }
        self.log.record(&event);
        let id = outcome.expectation_id.clone();
        let status = outcome.status;
        match self.aggregator.record(position, outcome) {
            Ok(()) => {
                self.statuses.insert(id, status);
            }
            Err(err) => {
                self.log.record(
                    &RunLogEvent::new(
                        "outcome_rejected",
                        Some(&self.config.run_id),
                        self.clock.now_utc(),
                    )
                        .expectation(&id)
                        .message(err.to_string()),
                );
            }
        }
    }
}

/// Probes and grades one check.
fn probe_check(
    executor: &ProbeExecutor,
    check: &Expectation,
    ctx: &ProbeContext,
    deadline: Option<Instant>,
) -> Outcome {
    match executor.execute(&check.id, &check.probe, ctx, deadline) {
        Execution::Completed {
            result,
            attempts,
        } => Outcome {
            attempts,
            ..evaluator::evaluate(check, &result)
        },
        Execution::RunTimedOut {
            attempts,
        } => Outcome {
            attempts,
            ..evaluator::skipped(check, RUN_TIMED_OUT)
        },
    }
}
