// crates/statecheck-probes/src/kubernetes.rs
// ============================================================================
// Module: Kubernetes Probe
// Description: Read-only Kubernetes object queries through kubectl.
// Purpose: Expose namespaces, workloads, pods, and ingresses as structured data.
// Dependencies: statecheck-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The kubernetes probe runs `<command> get <resource> [name] ... -o json`
//! through a [`CommandRunner`]. The command is configurable so that
//! distribution wrappers such as `microk8s kubectl` work unchanged.
//! List responses are normalized to their `items` array, and a "not found"
//! answer is reported as no data rather than as an error.
//!
//! ## Invariants
//! - Only the `get` verb is issued.
//! - Parameter values never begin with `-`, so they cannot inject flags.

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

/// Configuration for the kubernetes probe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KubernetesProbeConfig {
    /// Program and leading arguments, e.g. `["microk8s", "kubectl"]`.
    pub command: Vec<String>,
    /// Optional kubeconfig path.
    pub kubeconfig: Option<PathBuf>,
    /// Optional kubeconfig context.
    pub context: Option<String>,
    /// Optional server-side request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
}

impl Default for KubernetesProbeConfig {
    fn default() -> Self {
        Self {
            command: vec!["kubectl".to_string()],
            kubeconfig: None,
            context: None,
            request_timeout_secs: None,
        }
    }
}

// ============================================================================
// SECTION: Probe Implementation
// ============================================================================

/// Probe for Kubernetes objects.
///
/// # Params
/// - `resource` (required): resource type, e.g. `pods` or `deployment`.
/// - `name`: object name; omit to list.
/// - `namespace`: overrides the run namespace.
/// - `all_namespaces`: list across namespaces (`-A`).
/// - `cluster_scoped`: omit the namespace flag entirely.
/// - `selector`, `field_selector`: label and field selectors.
pub struct KubernetesProbe {
    /// Probe configuration.
    config: KubernetesProbeConfig,
    /// Command runner.
    runner: Arc<dyn CommandRunner>,
}

impl KubernetesProbe {
    /// Creates a kubernetes probe.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeSetupError`] when the configured command is empty.
    pub fn new(
        config: KubernetesProbeConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, ProbeSetupError> {
        split_command("kubernetes", &config.command)?;
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
        if spec.query != "get" {
            return Err(params::unsupported_query(spec));
        }
        let (program, prefix) = split_command("kubernetes", &self.config.command)
            .map_err(|err| ProbeError::Failed(err.to_string()))?;
        let resource = params::argument("resource", params::required_str(spec, "resource")?)?;
        let name = params::optional_str(spec, "name")?;
        let all_namespaces = params::flag(spec, "all_namespaces")?;
        let cluster_scoped = params::flag(spec, "cluster_scoped")?;
        if all_namespaces && name.is_some() {
            return Err(ProbeError::InvalidParams(
                "`name` cannot be combined with `all_namespaces`".to_string(),
            ));
        }

        let mut args = prefix.to_vec();
        args.push("get".to_string());
        args.push(resource.to_string());
        if let Some(name) = name {
            args.push(params::argument("name", name)?.to_string());
        }
        if all_namespaces {
            args.push("-A".to_string());
        } else if !cluster_scoped {
            let namespace = params::optional_str(spec, "namespace")?.unwrap_or(namespace);
            args.push("-n".to_string());
            args.push(params::argument("namespace", namespace)?.to_string());
        }
        if let Some(selector) = params::optional_str(spec, "selector")? {
            args.push("-l".to_string());
            args.push(params::argument("selector", selector)?.to_string());
        }
        if let Some(selector) = params::optional_str(spec, "field_selector")? {
            args.push("--field-selector".to_string());
            args.push(params::argument("field_selector", selector)?.to_string());
        }
        if let Some(kubeconfig) = &self.config.kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(kubeconfig.display().to_string());
        }
        if let Some(context) = &self.config.context {
            args.push("--context".to_string());
            args.push(context.clone());
        }
        if let Some(seconds) = self.config.request_timeout_secs {
            args.push(format!("--request-timeout={seconds}s"));
        }
        args.push("-o".to_string());
        args.push("json".to_string());
        Ok((program, args))
    }
}

impl Probe for KubernetesProbe {
    fn query(&self, spec: &ProbeSpec, ctx: &ProbeContext) -> Result<Option<Value>, ProbeError> {
        let (program, args) = self.command_line(spec, &ctx.namespace)?;
        let value = run_json(self.runner.as_ref(), program, &args)?;
        Ok(value.map(list_items))
    }

    fn validate(&self, spec: &ProbeSpec) -> Result<(), ProbeError> {
        self.command_line(spec, "default").map(|_| ())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Replaces `*List` documents with their `items` array.
fn list_items(value: Value) -> Value {
    match value {
        Value::Object(mut map)
            if map.get("kind").and_then(Value::as_str).is_some_and(|kind| kind.ends_with("List")) =>
        {
            map.remove("items").unwrap_or_else(|| Value::Array(Vec::new()))
        }
        other => other,
    }
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

    use super::*;

    #[test]
    fn list_documents_become_item_arrays() {
        let list = json!({"kind": "PodList", "items": [{"metadata": {"name": "a"}}]});
        assert_eq!(list_items(list), json!([{"metadata": {"name": "a"}}]));
        let single = json!({"kind": "Pod", "items": "kept"});
        assert_eq!(list_items(single.clone()), single);
    }
}
