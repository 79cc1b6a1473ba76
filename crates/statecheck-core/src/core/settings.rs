// crates/statecheck-core/src/core/settings.rs
// ============================================================================
// Module: Statecheck Run Settings
// Description: Flat key-value run settings and the resolved run configuration.
// Purpose: Turn loader-supplied settings into one immutable RunConfig per run.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Configuration loaders hand the core a flat [`RunSettings`] map. The core
//! resolves it once into a [`RunConfig`] that is passed by reference to the
//! registry, executor, and probes; nothing reads ambient process state after
//! that point.
//!
//! ## Invariants
//! - `target.namespace` is required; a missing value is a fatal configuration error.
//! - Every settings key doubles as a `${key}` interpolation variable for string
//!   probe parameters.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

use crate::core::expectation::Expectation;
use crate::core::identifiers::ExpectationId;
use crate::core::identifiers::RunId;
use crate::core::retry::RetryPolicy;

// ============================================================================
// SECTION: Keys and Limits
// ============================================================================

/// Target namespace key (required).
pub const KEY_NAMESPACE: &str = "target.namespace";
/// Run identifier key.
pub const KEY_RUN_ID: &str = "run.id";
/// Subset name key.
pub const KEY_SUBSET: &str = "run.subset";
/// Explicit id list key (comma separated).
pub const KEY_ONLY: &str = "run.only";
/// Global run timeout key in milliseconds.
pub const KEY_RUN_TIMEOUT_MS: &str = "run.timeout_ms";
/// Worker count key.
pub const KEY_PARALLELISM: &str = "run.parallelism";
/// Per-probe timeout key in milliseconds.
pub const KEY_PROBE_TIMEOUT_MS: &str = "probe.timeout_ms";
/// Retry count key.
pub const KEY_PROBE_RETRIES: &str = "probe.retries";
/// Initial backoff key in milliseconds.
pub const KEY_PROBE_BACKOFF_MS: &str = "probe.backoff_ms";
/// Backoff multiplier key.
pub const KEY_PROBE_BACKOFF_MULTIPLIER: &str = "probe.backoff_multiplier";
/// Backoff ceiling key in milliseconds.
pub const KEY_PROBE_MAX_BACKOFF_MS: &str = "probe.max_backoff_ms";

/// Default per-probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Upper bound on the per-probe timeout.
pub const MAX_PROBE_TIMEOUT: Duration = Duration::from_secs(600);
/// Upper bound on retries.
pub const MAX_PROBE_RETRIES: u32 = 10;
/// Upper bound on worker threads.
pub const MAX_PARALLELISM: usize = 64;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Settings resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// Required key is absent or blank.
    #[error("missing required setting: {0}")]
    Missing(String),
    /// Key holds an unusable value.
    #[error("invalid setting {key}={value}: {reason}")]
    Invalid {
        /// Settings key.
        key: String,
        /// Offending value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// Interpolation referenced an unknown key.
    #[error("unknown variable ${{{0}}}")]
    UnknownVariable(String),
    /// Interpolation syntax is malformed.
    #[error("unterminated variable reference in `{0}`")]
    UnterminatedVariable(String),
}

// ============================================================================
// SECTION: Run Settings
// ============================================================================

/// Flat key-value run settings supplied by a configuration loader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSettings {
    /// Ordered entries.
    entries: BTreeMap<String, String>,
}

impl RunSettings {
    /// Creates an empty settings map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a key, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder form of [`RunSettings::set`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Returns the value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Applies every entry of `overrides` on top of this map.
    pub fn overlay(&mut self, overrides: &Self) {
        for (key, value) in &overrides.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Substitutes `${key}` references in a string.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UnknownVariable`] or
    /// [`SettingsError::UnterminatedVariable`] for bad references.
    pub fn interpolate(&self, input: &str) -> Result<String, SettingsError> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[.. start]);
            let after = &rest[start + 2 ..];
            let Some(end) = after.find('}') else {
                return Err(SettingsError::UnterminatedVariable(input.to_string()));
            };
            let key = after[.. end].trim();
            let value =
                self.get(key).ok_or_else(|| SettingsError::UnknownVariable(key.to_string()))?;
            out.push_str(value);
            rest = &after[end + 1 ..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Substitutes `${key}` references in every string inside a JSON value.
    ///
    /// # Errors
    ///
    /// Returns the first interpolation error encountered.
    pub fn interpolate_value(&self, value: &Value) -> Result<Value, SettingsError> {
        match value {
            Value::String(text) => Ok(Value::String(self.interpolate(text)?)),
            Value::Array(items) => {
                items.iter().map(|item| self.interpolate_value(item)).collect::<Result<_, _>>().map(Value::Array)
            }
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (key, item) in map {
                    out.insert(key.clone(), self.interpolate_value(item)?);
                }
                Ok(Value::Object(out))
            }
            other => Ok(other.clone()),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RunSettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut settings = Self::new();
        for (key, value) in iter {
            settings.set(key, value);
        }
        settings
    }
}

// ============================================================================
// SECTION: Subset Selection
// ============================================================================

/// Restriction on which expectations run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubsetSelection {
    /// Every expectation.
    Full,
    /// Expectations carrying a tag.
    Tag(String),
    /// An explicit id list.
    Ids(Vec<ExpectationId>),
}

impl SubsetSelection {
    /// Parses a subset name; `full` and `all` select everything.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("full") || value.eq_ignore_ascii_case("all")
        {
            Self::Full
        } else {
            Self::Tag(value.to_string())
        }
    }

    /// Parses a comma-separated id list.
    #[must_use]
    pub fn ids(value: &str) -> Self {
        Self::Ids(
            value
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(ExpectationId::new)
                .collect(),
        )
    }

    /// Returns true when the expectation is part of the subset.
    #[must_use]
    pub fn includes(&self, expectation: &Expectation) -> bool {
        match self {
            Self::Full => true,
            Self::Tag(tag) => expectation.has_tag(tag),
            Self::Ids(ids) => ids.contains(&expectation.id),
        }
    }

    /// Returns the label recorded on reports.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Full => "full".to_string(),
            Self::Tag(tag) => tag.clone(),
            Self::Ids(ids) => {
                let ids: Vec<&str> = ids.iter().map(ExpectationId::as_str).collect();
                format!("ids:{}", ids.join(","))
            }
        }
    }
}

// ============================================================================
// SECTION: Run Configuration
// ============================================================================

/// Immutable configuration for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Run identifier.
    pub run_id: RunId,
    /// Default target namespace handed to probes.
    pub namespace: String,
    /// Expectation subset.
    pub subset: SubsetSelection,
    /// Per-probe attempt timeout.
    pub probe_timeout: Duration,
    /// Retry policy for transient probe errors.
    pub retry: RetryPolicy,
    /// Optional global run timeout.
    pub run_timeout: Option<Duration>,
    /// Worker threads; 1 runs sequentially.
    pub parallelism: usize,
    /// Settings used for `${key}` interpolation.
    pub variables: RunSettings,
}

impl RunConfig {
    /// Resolves run configuration from flat settings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when a required key is missing or a value is
    /// malformed or out of range.
    pub fn from_settings(settings: &RunSettings) -> Result<Self, SettingsError> {
        let namespace = settings
            .get(KEY_NAMESPACE)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| SettingsError::Missing(KEY_NAMESPACE.to_string()))?
            .to_string();
        let run_id = settings
            .get(KEY_RUN_ID)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map_or_else(default_run_id, RunId::new);
        let subset = match settings.get(KEY_ONLY).filter(|value| !value.trim().is_empty()) {
            Some(ids) => SubsetSelection::ids(ids),
            None => SubsetSelection::parse(settings.get(KEY_SUBSET).unwrap_or("full")),
        };

        let probe_timeout = parse_millis(settings, KEY_PROBE_TIMEOUT_MS)?
            .unwrap_or(DEFAULT_PROBE_TIMEOUT);
        if probe_timeout.is_zero() || probe_timeout > MAX_PROBE_TIMEOUT {
            return Err(invalid(
                settings,
                KEY_PROBE_TIMEOUT_MS,
                format!("must be between 1 and {} ms", MAX_PROBE_TIMEOUT.as_millis()),
            ));
        }

        let defaults = RetryPolicy::default();
        let max_retries = parse_u64(settings, KEY_PROBE_RETRIES)?
            .map_or(Ok(defaults.max_retries), u32::try_from)
            .map_err(|_| invalid(settings, KEY_PROBE_RETRIES, "out of range".to_string()))?;
        if max_retries > MAX_PROBE_RETRIES {
            return Err(invalid(
                settings,
                KEY_PROBE_RETRIES,
                format!("must be at most {MAX_PROBE_RETRIES}"),
            ));
        }
        let multiplier = parse_u64(settings, KEY_PROBE_BACKOFF_MULTIPLIER)?
            .map_or(Ok(defaults.multiplier), u32::try_from)
            .map_err(|_| {
                invalid(settings, KEY_PROBE_BACKOFF_MULTIPLIER, "out of range".to_string())
            })?;
        if multiplier == 0 {
            return Err(invalid(
                settings,
                KEY_PROBE_BACKOFF_MULTIPLIER,
                "must be at least 1".to_string(),
            ));
        }
        let retry = RetryPolicy {
            max_retries,
            backoff: parse_millis(settings, KEY_PROBE_BACKOFF_MS)?.unwrap_or(defaults.backoff),
            multiplier,
            max_backoff: parse_millis(settings, KEY_PROBE_MAX_BACKOFF_MS)?
                .unwrap_or(defaults.max_backoff),
        };

        let run_timeout = parse_millis(settings, KEY_RUN_TIMEOUT_MS)?;
        if run_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(invalid(settings, KEY_RUN_TIMEOUT_MS, "must be greater than zero".to_string()));
        }

        let parallelism = parse_u64(settings, KEY_PARALLELISM)?
            .map_or(Ok(1), usize::try_from)
            .map_err(|_| invalid(settings, KEY_PARALLELISM, "out of range".to_string()))?;
        if parallelism == 0 || parallelism > MAX_PARALLELISM {
            return Err(invalid(
                settings,
                KEY_PARALLELISM,
                format!("must be between 1 and {MAX_PARALLELISM}"),
            ));
        }

        Ok(Self {
            run_id,
            namespace,
            subset,
            probe_timeout,
            retry,
            run_timeout,
            parallelism,
            variables: settings.clone(),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds an invalid-setting error for `key`.
fn invalid(settings: &RunSettings, key: &str, reason: String) -> SettingsError {
    SettingsError::Invalid {
        key: key.to_string(),
        value: settings.get(key).unwrap_or_default().to_string(),
        reason,
    }
}

/// Parses an optional unsigned integer setting.
fn parse_u64(settings: &RunSettings, key: &str) -> Result<Option<u64>, SettingsError> {
    let Some(raw) = settings.get(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| invalid(settings, key, "expected a non-negative integer".to_string()))
}

/// Parses an optional millisecond duration setting.
fn parse_millis(settings: &RunSettings, key: &str) -> Result<Option<Duration>, SettingsError> {
    Ok(parse_u64(settings, key)?.map(Duration::from_millis))
}

/// Generates a run id from the current UTC time in unix milliseconds.
fn default_run_id() -> RunId {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    RunId::new(format!("run-{millis}"))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
