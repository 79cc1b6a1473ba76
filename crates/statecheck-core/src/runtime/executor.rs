// crates/statecheck-core/src/runtime/executor.rs
// ============================================================================
// Module: Statecheck Probe Executor
// Description: Timeout-bounded, retrying probe invocation.
// Purpose: Turn one probe reference into one ProbeResult without hanging a run.
// Dependencies: crate::{core, interfaces, run_log}
// ============================================================================

//! ## Overview
//! Each probe attempt runs on a detached worker thread and is awaited for at
//! most the per-probe timeout. An attempt that does not answer in time is
//! abandoned and reported as [`ProbeError::TimedOut`]. Transient errors are
//! retried under the [`RetryPolicy`], sleeping through the injected [`Clock`].
//!
//! ## Invariants
//! - Total attempts never exceed `retry.max_attempts()`.
//! - Non-transient errors are never retried.
//! - Only an attempt cut short by the run deadline, or one that would start
//!   after it, reports [`Execution::RunTimedOut`].
//! - A backoff that would cross the run deadline ends the retries and keeps
//!   the last probe error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::mpsc;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use serde_json::Value;

use crate::core::ExpectationId;
use crate::core::ProbeResult;
use crate::core::ProbeSpec;
use crate::core::RetryPolicy;
use crate::interfaces::Clock;
use crate::interfaces::Probe;
use crate::interfaces::ProbeContext;
use crate::interfaces::ProbeError;
use crate::run_log::RunLogEvent;
use crate::run_log::RunLogSink;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of executing one probe reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    /// Probe answered, errored, or exhausted its retries.
    Completed {
        /// Normalized result.
        result: ProbeResult,
        /// Attempts made.
        attempts: u32,
    },
    /// The run deadline expired before the probe could finish.
    RunTimedOut {
        /// Attempts started.
        attempts: u32,
    },
}

/// Outcome of one attempt.
enum Attempt {
    /// Probe answered within the wait.
    Answered(Result<Option<Value>, ProbeError>),
    /// Wait elapsed first.
    Expired,
}

/// Retrying, timeout-bounded probe invoker.
pub struct ProbeExecutor {
    /// Probe routing every reference.
    probe: Arc<dyn Probe>,
    /// Time source for backoff and deadlines.
    clock: Arc<dyn Clock>,
    /// Run log sink.
    log: Arc<dyn RunLogSink>,
    /// Retry policy for transient errors.
    retry: RetryPolicy,
    /// Per-attempt timeout.
    timeout: Duration,
}

// ============================================================================
// SECTION: Executor
// ============================================================================

impl ProbeExecutor {
    /// Creates an executor.
    #[must_use]
    pub fn new(
        probe: Arc<dyn Probe>,
        clock: Arc<dyn Clock>,
        log: Arc<dyn RunLogSink>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            probe,
            clock,
            log,
            retry,
            timeout,
        }
    }

    /// Executes one probe reference with retries.
    #[must_use]
    pub fn execute(
        &self,
        expectation_id: &ExpectationId,
        spec: &ProbeSpec,
        ctx: &ProbeContext,
        deadline: Option<Instant>,
    ) -> Execution {
        let max_attempts = self.retry.max_attempts();
        let mut attempts = 0;
        loop {
            let remaining = match deadline {
                Some(deadline) => match deadline.checked_duration_since(self.clock.now()) {
                    Some(remaining) if !remaining.is_zero() => Some(remaining),
                    _ => {
                        return Execution::RunTimedOut {
                            attempts,
                        };
                    }
                },
                None => None,
            };
            let cut_short = remaining.is_some_and(|remaining| remaining < self.timeout);
            let wait = remaining.map_or(self.timeout, |remaining| remaining.min(self.timeout));
            attempts += 1;

            let result = match self.attempt(spec, ctx, wait) {
                Attempt::Answered(result) => result,
                Attempt::Expired if cut_short => {
                    return Execution::RunTimedOut {
                        attempts,
                    };
                }
                Attempt::Expired => Err(ProbeError::TimedOut(duration_millis(self.timeout))),
            };

            match result {
                Err(err) if err.is_transient() && attempts < max_attempts => {
                    let delay = self.retry.delay_for(attempts);
                    if let Some(deadline) = deadline
                        && self.clock.now() + delay >= deadline
                    {
                        return Execution::Completed {
                            result: ProbeResult::from(Err(err)),
                            attempts,
                        };
                    }
                    self.log.record(
                        &RunLogEvent::new("probe_retry", Some(&ctx.run_id), self.clock.now_utc())
                            .expectation(expectation_id)
                            .attempt(attempts)
                            .message(err.to_string()),
                    );
                    self.clock.sleep(delay);
                }
                other => {
                    return Execution::Completed {
                        result: ProbeResult::from(other),
                        attempts,
                    };
                }
            }
        }
    }

    /// Runs one attempt on a detached worker, waiting at most `wait`.
    fn attempt(&self, spec: &ProbeSpec, ctx: &ProbeContext, wait: Duration) -> Attempt {
        let (sender, receiver) = mpsc::channel();
        let probe = Arc::clone(&self.probe);
        let worker_spec = spec.clone();
        let worker_ctx = ctx.clone();
        let spawned = thread::Builder::new()
            .name(format!("statecheck-probe-{}", spec.probe))
            .spawn(move || {
                let _ = sender.send(probe.query(&worker_spec, &worker_ctx));
            });
        if let Err(err) = spawned {
            return Attempt::Answered(Err(ProbeError::Failed(format!(
                "unable to start probe worker: {err}"
            ))));
        }
        match receiver.recv_timeout(wait) {
            Ok(result) => Attempt::Answered(result),
            Err(RecvTimeoutError::Timeout) => Attempt::Expired,
            Err(RecvTimeoutError::Disconnected) => {
                Attempt::Answered(Err(ProbeError::Failed("probe worker panicked".to_string())))
            }
        }
    }
}

/// Converts a duration to whole milliseconds, saturating.
fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
