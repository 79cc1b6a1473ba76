// crates/statecheck-core/src/run_log.rs
// ============================================================================
// Module: Statecheck Run Log
// Description: Structured run log events and JSON-lines sinks.
// Purpose: Record phase transitions, retries, and graded checks for operators.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The run engine reports what it is doing through a [`RunLogSink`]. Events are
//! flat JSON objects with an `event` name and a millisecond timestamp. Sinks
//! must never fail a run: serialization or write errors are dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;
use time::OffsetDateTime;

use crate::core::ExpectationId;
use crate::core::OutcomeStatus;
use crate::core::RunId;
use crate::runtime::RunPhase;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Structured run log event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunLogEvent {
    /// Event name (`phase`, `probe_retry`, `check_completed`, ...).
    pub event: &'static str,
    /// Unix timestamp in milliseconds.
    pub timestamp_ms: u128,
    /// Run identifier, absent before configuration resolves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    /// Expectation the event concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expectation_id: Option<ExpectationId>,
    /// Phase entered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<RunPhase>,
    /// Graded status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OutcomeStatus>,
    /// Probe attempt number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    /// Free-form detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RunLogEvent {
    /// Creates an event stamped at `at`, normally the run clock's wall time.
    #[must_use]
    pub fn new(event: &'static str, run_id: Option<&RunId>, at: OffsetDateTime) -> Self {
        Self {
            event,
            timestamp_ms: u128::try_from(at.unix_timestamp_nanos() / 1_000_000).unwrap_or_default(),
            run_id: run_id.cloned(),
            expectation_id: None,
            phase: None,
            status: None,
            attempt: None,
            message: None,
        }
    }

    /// Attaches an expectation id.
    #[must_use]
    pub fn expectation(mut self, id: &ExpectationId) -> Self {
        self.expectation_id = Some(id.clone());
        self
    }

    /// Attaches a phase.
    #[must_use]
    pub fn phase(mut self, phase: RunPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attaches a status.
    #[must_use]
    pub fn status(mut self, status: OutcomeStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches an attempt number.
    #[must_use]
    pub fn attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    /// Attaches a message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Run log sink interface.
pub trait RunLogSink: Send + Sync {
    /// Records one event.
    fn record(&self, event: &RunLogEvent);
}

/// Sink that writes JSON lines to stderr.
pub struct StderrRunLogSink;

impl RunLogSink for StderrRunLogSink {
    fn record(&self, event: &RunLogEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileRunLogSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileRunLogSink {
    /// Opens the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl RunLogSink for FileRunLogSink {
    fn record(&self, event: &RunLogEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Sink that drops every event.
pub struct NoopRunLogSink;

impl RunLogSink for NoopRunLogSink {
    fn record(&self, _event: &RunLogEvent) {}
}

/// Sink that keeps events in memory for inspection.
#[derive(Default)]
pub struct MemoryRunLogSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<RunLogEvent>>,
}

impl MemoryRunLogSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<RunLogEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the names of recorded events.
    #[must_use]
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events().iter().map(|event| event.event).collect()
    }
}

impl RunLogSink for MemoryRunLogSink {
    fn record(&self, event: &RunLogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
