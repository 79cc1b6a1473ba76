// crates/statecheck-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Scripted probes, fake clock, and expectation builders.
// Purpose: Provide deterministic infrastructure for run engine tests.
// Dependencies: statecheck-core
// ============================================================================

//! ## Overview
//! Shared fixtures for core integration tests. [`ScriptedProbe`] answers from
//! a script keyed by the `key` parameter and counts invocations per key so
//! tests can assert that skipped checks never reach the target. [`FakeClock`]
//! advances only when slept through, making backoff observable.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use serde_json::Value;
use serde_json::json;
use statecheck_core::Clock;
use statecheck_core::Expectation;
use statecheck_core::ExpectationId;
use statecheck_core::Predicate;
use statecheck_core::Probe;
use statecheck_core::ProbeContext;
use statecheck_core::ProbeError;
use statecheck_core::ProbeSpec;
use statecheck_core::RunSettings;
use statecheck_core::Severity;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Scripted Probe
// ============================================================================

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Return a value.
    Value(Value),
    /// Return no data.
    Empty,
    /// Return an error.
    Error(ProbeError),
    /// Block for the duration, then return the value.
    Delay(Duration, Value),
    /// Never answer within any reasonable test timeout.
    Hang,
}

/// Probe answering from a per-key script.
///
/// The last reply for a key repeats once the script is exhausted. Keys with
/// no script answer with [`ProbeError::Failed`].
#[derive(Default)]
pub struct ScriptedProbe {
    /// Remaining replies per key.
    script: Mutex<HashMap<String, VecDeque<Reply>>>,
    /// Invocations per key.
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedProbe {
    /// Creates an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts replies for a key.
    #[must_use]
    pub fn on(self, key: &str, replies: Vec<Reply>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.insert(key.to_string(), replies.into());
        }
        self
    }

    /// Invocations for a key.
    #[must_use]
    pub fn calls(&self, key: &str) -> usize {
        self.calls.lock().map(|calls| calls.get(key).copied().unwrap_or(0)).unwrap_or(0)
    }

    /// Total invocations.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.lock().map(|calls| calls.values().sum()).unwrap_or(0)
    }

    /// Pops the next reply for a key.
    fn next_reply(&self, key: &str) -> Option<Reply> {
        let mut script = self.script.lock().ok()?;
        let replies = script.get_mut(key)?;
        if replies.len() > 1 { replies.pop_front() } else { replies.front().cloned() }
    }
}

impl Probe for ScriptedProbe {
    fn query(&self, spec: &ProbeSpec, _ctx: &ProbeContext) -> Result<Option<Value>, ProbeError> {
        let key = spec.param_str("key").unwrap_or_default().to_string();
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(key.clone()).or_insert(0) += 1;
        }
        match self.next_reply(&key) {
            Some(Reply::Value(value)) => Ok(Some(value)),
            Some(Reply::Empty) => Ok(None),
            Some(Reply::Error(err)) => Err(err),
            Some(Reply::Delay(delay, value)) => {
                thread::sleep(delay);
                Ok(Some(value))
            }
            Some(Reply::Hang) => {
                thread::sleep(Duration::from_secs(3600));
                Ok(None)
            }
            None => Err(ProbeError::Failed(format!("no script for {key}"))),
        }
    }

    fn validate(&self, spec: &ProbeSpec) -> Result<(), ProbeError> {
        if spec.probe.as_str() == "scripted" {
            Ok(())
        } else {
            Err(ProbeError::UnknownKind(spec.probe.to_string()))
        }
    }
}

// ============================================================================
// SECTION: Fake Clock
// ============================================================================

/// Clock that advances only through `sleep`.
pub struct FakeClock {
    /// Fixed monotonic origin.
    origin: Instant,
    /// Elapsed fake time.
    elapsed: Mutex<Duration>,
    /// Recorded sleeps.
    sleeps: Mutex<Vec<Duration>>,
}

impl FakeClock {
    /// Creates a clock at its origin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Sleeps requested so far.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|sleeps| sleeps.clone()).unwrap_or_default()
    }

    /// Elapsed fake time.
    fn elapsed(&self) -> Duration {
        self.elapsed.lock().map(|elapsed| *elapsed).unwrap_or_default()
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        if let Ok(mut elapsed) = self.elapsed.lock() {
            *elapsed += duration;
        }
    }

    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH + self.elapsed()
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Settings with a namespace, fixed run id, and no backoff.
#[must_use]
pub fn settings() -> RunSettings {
    RunSettings::new()
        .with("target.namespace", "observability")
        .with("run.id", "run-test")
        .with("probe.backoff_ms", "0")
}

/// Expectation probing `key` on the scripted probe.
#[must_use]
pub fn expect(id: &str, key: &str, predicate: Predicate) -> Expectation {
    Expectation {
        id: ExpectationId::new(id),
        description: format!("{id} holds"),
        probe: ProbeSpec {
            probe: "scripted".into(),
            query: "get".to_string(),
            params: Some(json!({"key": key})),
        },
        predicate,
        severity_on_failure: Severity::Fail,
        depends_on: Vec::new(),
        tags: Vec::new(),
        remediation: Some(format!("inspect {id}")),
    }
}

/// Adds dependencies to an expectation.
#[must_use]
pub fn depends(mut expectation: Expectation, ids: &[&str]) -> Expectation {
    expectation.depends_on = ids.iter().map(|id| ExpectationId::new(*id)).collect();
    expectation
}

/// Adds tags to an expectation.
#[must_use]
pub fn tagged(mut expectation: Expectation, tags: &[&str]) -> Expectation {
    expectation.tags = tags.iter().map(|tag| (*tag).to_string()).collect();
    expectation
}

/// `field_equals` on `path` against `expected`.
#[must_use]
pub fn field_equals(path: &str, expected: Value) -> Predicate {
    Predicate::FieldEquals {
        path: path.to_string(),
        expected,
        case_insensitive: false,
    }
}
