// crates/statecheck-probes/src/env.rs
// ============================================================================
// Module: Environment Probe
// Description: Probe for environment variable lookups.
// Purpose: Check the verifier's own environment, such as KUBECONFIG, before probing.
// Dependencies: statecheck-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The environment probe resolves values from the process environment. It
//! enforces allowlist and denylist rules plus size limits. `overrides` replace
//! the process environment entirely, which keeps lookups deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::Value;
use statecheck_core::Probe;
use statecheck_core::ProbeContext;
use statecheck_core::ProbeError;
use statecheck_core::ProbeSpec;

use crate::params;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the environment probe.
///
/// # Invariants
/// - `denylist` overrides `allowlist` when both are present.
/// - `overrides`, when set, are the only source of values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvProbeConfig {
    /// Optional allowlist of variable names.
    pub allowlist: Option<BTreeSet<String>>,
    /// Explicit denylist of variable names.
    pub denylist: BTreeSet<String>,
    /// Maximum bytes allowed for a single value.
    pub max_value_bytes: usize,
    /// Optional override map used instead of the process environment.
    pub overrides: Option<BTreeMap<String, String>>,
}

impl Default for EnvProbeConfig {
    fn default() -> Self {
        Self {
            allowlist: None,
            denylist: BTreeSet::new(),
            max_value_bytes: 64 * 1024,
            overrides: None,
        }
    }
}

// ============================================================================
// SECTION: Probe Implementation
// ============================================================================

/// Probe for environment variables.
///
/// # Params
/// - `key` (required): variable name.
pub struct EnvProbe {
    /// Probe configuration.
    config: EnvProbeConfig,
}

impl EnvProbe {
    /// Creates an environment probe.
    #[must_use]
    pub const fn new(config: EnvProbeConfig) -> Self {
        Self {
            config,
        }
    }

    /// Validates the query and returns the requested key.
    fn key<'a>(&self, spec: &'a ProbeSpec) -> Result<&'a str, ProbeError> {
        if spec.query != "get" {
            return Err(params::unsupported_query(spec));
        }
        let key = params::required_str(spec, "key")?;
        if !is_key_allowed(&self.config, key) {
            return Err(ProbeError::InvalidParams(format!("env key `{key}` is blocked by policy")));
        }
        Ok(key)
    }
}

impl Probe for EnvProbe {
    fn query(&self, spec: &ProbeSpec, _ctx: &ProbeContext) -> Result<Option<Value>, ProbeError> {
        let key = self.key(spec)?;
        let value = match &self.config.overrides {
            Some(overrides) => overrides.get(key).cloned(),
            None => std::env::var(key).ok(),
        };
        match value {
            Some(value) if value.len() > self.config.max_value_bytes => {
                Err(ProbeError::Malformed(format!("env value for `{key}` exceeds limit")))
            }
            Some(value) => Ok(Some(Value::String(value))),
            None => Ok(None),
        }
    }

    fn validate(&self, spec: &ProbeSpec) -> Result<(), ProbeError> {
        self.key(spec).map(|_| ())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates the key against allowlist and denylist policy.
fn is_key_allowed(config: &EnvProbeConfig, key: &str) -> bool {
    if config.denylist.contains(key) {
        return false;
    }
    if let Some(allowlist) = &config.allowlist {
        return allowlist.contains(key);
    }
    true
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use serde_json::json;
    use statecheck_core::RunId;

    use super::*;

    fn spec(key: &str) -> ProbeSpec {
        ProbeSpec {
            probe: "env".into(),
            query: "get".to_string(),
            params: Some(json!({"key": key})),
        }
    }

    fn ctx() -> ProbeContext {
        ProbeContext {
            run_id: RunId::new("run"),
            namespace: "observability".to_string(),
        }
    }

    fn probe() -> EnvProbe {
        EnvProbe::new(EnvProbeConfig {
            denylist: BTreeSet::from(["SECRET".to_string()]),
            max_value_bytes: 8,
            overrides: Some(BTreeMap::from([
                ("KUBECONFIG".to_string(), "/k".to_string()),
                ("LONG".to_string(), "0123456789".to_string()),
            ])),
            ..EnvProbeConfig::default()
        })
    }

    #[test]
    fn overrides_answer_lookups() {
        let probe = probe();
        assert_eq!(probe.query(&spec("KUBECONFIG"), &ctx()).unwrap(), Some(json!("/k")));
        assert_eq!(probe.query(&spec("HOME"), &ctx()).unwrap(), None);
    }

    #[test]
    fn denied_keys_fail_validation_and_limits_hold() {
        let probe = probe();
        assert!(matches!(probe.validate(&spec("SECRET")), Err(ProbeError::InvalidParams(_))));
        assert!(matches!(probe.query(&spec("LONG"), &ctx()), Err(ProbeError::Malformed(_))));
    }
}
