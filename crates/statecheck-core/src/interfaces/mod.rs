// crates/statecheck-core/src/interfaces/mod.rs
// ============================================================================
// Module: Statecheck Interfaces
// Description: Probe and clock interfaces consumed by the run engine.
// Purpose: Decouple the verifier core from concrete clients and wall time.
// Dependencies: crate::core, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! The core depends on two narrow capabilities. A [`Probe`] fetches read-only
//! state for a probe reference and returns structured data or a typed
//! [`ProbeError`]. A [`Clock`] supplies monotonic time, sleeping, and wall
//! time so retry backoff and run deadlines can be driven by a fake clock.
//!
//! ## Invariants
//! - Probes never create, update, or delete target state.
//! - Probe errors are values; a probe must not panic on malformed target output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;
use std::time::Duration;
use std::time::Instant;

use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

use crate::core::ProbeSpec;
use crate::core::RunConfig;
use crate::core::RunId;

// ============================================================================
// SECTION: Probe Errors
// ============================================================================

/// Probe failures surfaced to the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// Attempt exceeded the per-probe timeout.
    #[error("probe timed out after {0} ms")]
    TimedOut(u64),
    /// Target system could not be reached.
    #[error("target unreachable: {0}")]
    Unreachable(String),
    /// Probe reference names an unregistered probe kind or query.
    #[error("unknown probe kind: {0}")]
    UnknownKind(String),
    /// Probe parameters are missing or malformed.
    #[error("invalid probe parameters: {0}")]
    InvalidParams(String),
    /// Target returned output the probe could not parse.
    #[error("malformed probe response: {0}")]
    Malformed(String),
    /// Query failed for any other reason.
    #[error("probe failed: {0}")]
    Failed(String),
}

impl ProbeError {
    /// Returns true for errors worth retrying (timeouts and unreachable targets).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::TimedOut(_) | Self::Unreachable(_))
    }
}

// ============================================================================
// SECTION: Probe Interface
// ============================================================================

/// Per-run context handed to every probe query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeContext {
    /// Run identifier.
    pub run_id: RunId,
    /// Default namespace when a probe reference does not name one.
    pub namespace: String,
}

impl ProbeContext {
    /// Derives the probe context from the run configuration.
    #[must_use]
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            run_id: config.run_id.clone(),
            namespace: config.namespace.clone(),
        }
    }
}

/// Read-only query capability against the target system.
pub trait Probe: Send + Sync {
    /// Executes one read-only query. `Ok(None)` means the query matched nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] when the target is unreachable, the query times
    /// out, or the response is unusable.
    fn query(&self, spec: &ProbeSpec, ctx: &ProbeContext) -> Result<Option<Value>, ProbeError>;

    /// Validates a probe reference at load time without touching the target.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::UnknownKind`] or [`ProbeError::InvalidParams`].
    fn validate(&self, spec: &ProbeSpec) -> Result<(), ProbeError> {
        let _ = spec;
        Ok(())
    }
}

// ============================================================================
// SECTION: Clock Interface
// ============================================================================

/// Time source for retry backoff, deadlines, and report timestamps.
pub trait Clock: Send + Sync {
    /// Monotonic now.
    fn now(&self) -> Instant;

    /// Blocks for `duration`.
    fn sleep(&self, duration: Duration);

    /// Wall-clock now in UTC.
    fn now_utc(&self) -> OffsetDateTime;
}

/// Production clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }

    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
