// crates/statecheck-probes/src/helm.rs
// ============================================================================
// Module: Helm Probe
// Description: Read-only Helm release queries.
// Purpose: Expose release status, values, and listings as structured data.
// Dependencies: statecheck-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The helm probe supports three queries:
//! - `status`: `helm status <release> -n <ns> -o json`
//! - `values`: `helm get values <release> -n <ns> -o json [--all]`
//! - `list`: `helm list -n <ns> -o json [--filter <regex>]`
//!
//! A release that does not exist yields no data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use statecheck_core::Probe;
use statecheck_core::ProbeContext;
use statecheck_core::ProbeError;
use statecheck_core::ProbeSpec;

use crate::command::CommandRunner;
use crate::command::run_json;
use crate::command::split_command;
use crate::params;
use crate::registry::ProbeSetupError;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the helm probe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HelmProbeConfig {
    /// Program and leading arguments, e.g. `["microk8s", "helm3"]`.
    pub command: Vec<String>,
    /// Optional kubeconfig path.
    pub kubeconfig: Option<PathBuf>,
    /// Optional kubeconfig context.
    pub context: Option<String>,
}

impl Default for HelmProbeConfig {
    fn default() -> Self {
        Self {
            command: vec!["helm".to_string()],
            kubeconfig: None,
            context: None,
        }
    }
}

// ============================================================================
// SECTION: Probe Implementation
// ============================================================================

/// Probe for Helm releases.
pub struct HelmProbe {
    /// Probe configuration.
    config: HelmProbeConfig,
    /// Command runner.
    runner: Arc<dyn CommandRunner>,
}

impl HelmProbe {
    /// Creates a helm probe.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeSetupError`] when the configured command is empty.
    pub fn new(config: HelmProbeConfig, runner: Arc<dyn CommandRunner>) -> Result<Self, ProbeSetupError> {
        split_command("helm", &config.command)?;
        Ok(Self {
            config,
            runner,
        })
    }

    /// Builds the program and argument vector for a probe reference.
    fn command_line(
        &self,
        spec: &ProbeSpec,
        namespace: &str,
    ) -> Result<(&str, Vec<String>), ProbeError> {
        let (program, prefix) = split_command("helm", &self.config.command)
            .map_err(|err| ProbeError::Failed(err.to_string()))?;
        let namespace = params::optional_str(spec, "namespace")?.unwrap_or(namespace);
        let namespace = params::argument("namespace", namespace)?;

        let mut args = prefix.to_vec();
        match spec.query.as_str() {
            "status" => {
                let release = params::argument("release", params::required_str(spec, "release")?)?;
                args.extend(["status".to_string(), release.to_string()]);
            }
            "values" => {
                let release = params::argument("release", params::required_str(spec, "release")?)?;
                args.extend(["get".to_string(), "values".to_string(), release.to_string()]);
                if params::flag(spec, "all")? {
                    args.push("--all".to_string());
                }
            }
            "list" => {
                args.push("list".to_string());
                if let Some(filter) = params::optional_str(spec, "filter")? {
                    args.push("--filter".to_string());
                    args.push(params::argument("filter", filter)?.to_string());
                }
            }
            _ => return Err(params::unsupported_query(spec)),
        }
        args.push("-n".to_string());
        args.push(namespace.to_string());
        if let Some(kubeconfig) = &self.config.kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(kubeconfig.display().to_string());
        }
        if let Some(context) = &self.config.context {
            args.push("--kube-context".to_string());
            args.push(context.clone());
        }
        args.push("-o".to_string());
        args.push("json".to_string());
        Ok((program, args))
    }
}

impl Probe for HelmProbe {
    fn query(&self, spec: &ProbeSpec, ctx: &ProbeContext) -> Result<Option<Value>, ProbeError> {
        let (program, args) = self.command_line(spec, &ctx.namespace)?;
        run_json(self.runner.as_ref(), program, &args)
    }

    fn validate(&self, spec: &ProbeSpec) -> Result<(), ProbeError> {
        self.command_line(spec, "default").map(|_| ())
    }
}
