// crates/statecheck-probes/tests/cluster_probes.rs
// ============================================================================
// Module: Cluster Probe Tests
// Description: Command construction and output handling for kubectl and helm.
// Purpose: Pin the read-only command lines and failure classification.
// Dependencies: statecheck-core, statecheck-probes, serde_json
// ============================================================================

//! ## Overview
//! Drives [`KubernetesProbe`] and [`HelmProbe`] through a recording runner so
//! the exact argument vectors and result normalization can be asserted.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use statecheck_core::Probe;
use statecheck_core::ProbeError;
use statecheck_probes::CommandOutput;
use statecheck_probes::HelmProbe;
use statecheck_probes::HelmProbeConfig;
use statecheck_probes::KubernetesProbe;
use statecheck_probes::KubernetesProbeConfig;

use crate::common::RecordingRunner;
use crate::common::sample_context;
use crate::common::spec;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn microk8s(runner: &Arc<RecordingRunner>) -> KubernetesProbe {
    KubernetesProbe::new(
        KubernetesProbeConfig {
            command: vec!["microk8s".to_string(), "kubectl".to_string()],
            ..KubernetesProbeConfig::default()
        },
        Arc::clone(runner) as Arc<dyn statecheck_probes::CommandRunner>,
    )
    .unwrap()
}

fn helm(runner: &Arc<RecordingRunner>) -> HelmProbe {
    HelmProbe::new(
        HelmProbeConfig {
            kubeconfig: Some(PathBuf::from("/var/snap/microk8s/current/credentials/client.config")),
            ..HelmProbeConfig::default()
        },
        Arc::clone(runner) as Arc<dyn statecheck_probes::CommandRunner>,
    )
    .unwrap()
}

// ============================================================================
// SECTION: Kubernetes
// ============================================================================

#[test]
fn kubernetes_get_uses_run_namespace_and_json_output() {
    let runner = Arc::new(RecordingRunner::new(CommandOutput::ok(
        r#"{"kind": "Deployment", "status": {"readyReplicas": 1}}"#,
    )));
    let value = microk8s(&runner)
        .query(&spec("kubernetes", "get", json!({"resource": "deployment", "name": "grafana"})), &sample_context())
        .unwrap();
    assert_eq!(value, Some(json!({"kind": "Deployment", "status": {"readyReplicas": 1}})));
    assert_eq!(
        runner.command_line(),
        "microk8s kubectl get deployment grafana -n observability -o json"
    );
}

#[test]
fn kubernetes_lists_are_normalized_to_items() {
    let runner = Arc::new(RecordingRunner::new(CommandOutput::ok(
        r#"{"apiVersion": "v1", "kind": "List", "items": [{"metadata": {"name": "grafana-0"}}]}"#,
    )));
    let value = microk8s(&runner)
        .query(
            &spec(
                "kubernetes",
                "get",
                json!({"resource": "pods", "selector": "app.kubernetes.io/name=grafana", "field_selector": "status.phase=Running"}),
            ),
            &sample_context(),
        )
        .unwrap();
    assert_eq!(value, Some(json!([{"metadata": {"name": "grafana-0"}}])));
    assert_eq!(
        runner.command_line(),
        "microk8s kubectl get pods -n observability -l app.kubernetes.io/name=grafana \
         --field-selector status.phase=Running -o json"
    );
}

#[test]
fn kubernetes_cluster_scoped_and_all_namespace_queries() {
    let runner = Arc::new(RecordingRunner::new(CommandOutput::ok("{}")));
    microk8s(&runner)
        .query(
            &spec("kubernetes", "get", json!({"resource": "namespace", "name": "observability", "cluster_scoped": true})),
            &sample_context(),
        )
        .unwrap();
    assert_eq!(runner.command_line(), "microk8s kubectl get namespace observability -o json");

    let runner = Arc::new(RecordingRunner::new(CommandOutput::ok("{}")));
    microk8s(&runner)
        .query(
            &spec("kubernetes", "get", json!({"resource": "pods", "all_namespaces": true, "selector": "app=ingress"})),
            &sample_context(),
        )
        .unwrap();
    assert_eq!(runner.command_line(), "microk8s kubectl get pods -A -l app=ingress -o json");
}

#[test]
fn kubernetes_not_found_is_no_data_and_connection_failure_is_unreachable() {
    let runner = Arc::new(RecordingRunner::new(CommandOutput::failed(
        "Error from server (NotFound): ingresses.networking.k8s.io \"grafana\" not found",
    )));
    let value = microk8s(&runner)
        .query(&spec("kubernetes", "get", json!({"resource": "ingress", "name": "grafana"})), &sample_context())
        .unwrap();
    assert_eq!(value, None);

    let runner = Arc::new(RecordingRunner::new(CommandOutput::failed(
        "Unable to connect to the server: dial tcp 127.0.0.1:16443: connect: connection refused",
    )));
    let err = microk8s(&runner)
        .query(&spec("kubernetes", "get", json!({"resource": "pods"})), &sample_context())
        .unwrap_err();
    assert!(matches!(err, ProbeError::Unreachable(_)));
    assert!(err.is_transient());
}

#[test]
fn kubernetes_missing_resource_type_is_an_error_not_no_data() {
    let stderr = "Error from server (NotFound): the server could not find the requested resource";
    let runner = Arc::new(RecordingRunner::new(CommandOutput::failed(stderr)));
    let err = microk8s(&runner)
        .query(&spec("kubernetes", "get", json!({"resource": "grafanadashboards"})), &sample_context())
        .unwrap_err();
    assert_eq!(err, ProbeError::Failed(stderr.to_string()));
    assert!(!err.is_transient());
}

#[test]
fn kubernetes_set_based_selectors_pass_through_as_one_argument() {
    let runner = Arc::new(RecordingRunner::new(CommandOutput::ok(r#"{"kind": "List", "items": []}"#)));
    microk8s(&runner)
        .query(
            &spec("kubernetes", "get", json!({"resource": "pods", "selector": "app in (grafana, loki)"})),
            &sample_context(),
        )
        .unwrap();
    let calls = runner.calls();
    let (_, args) = &calls[0];
    let position = args.iter().position(|arg| arg == "-l").unwrap();
    assert_eq!(args[position + 1], "app in (grafana, loki)");

    let kubectl = microk8s(&runner);
    let control = spec("kubernetes", "get", json!({"resource": "pods", "selector": "app=grafana\n-A"}));
    assert!(matches!(kubectl.validate(&control), Err(ProbeError::InvalidParams(_))));
    let option = spec("kubernetes", "get", json!({"resource": "pods", "selector": "-lapp"}));
    assert!(matches!(kubectl.validate(&option), Err(ProbeError::InvalidParams(_))));
}

#[test]
fn kubernetes_rejects_flag_injection_and_other_verbs() {
    let runner = Arc::new(RecordingRunner::new(CommandOutput::ok("{}")));
    let probe = microk8s(&runner);
    let injected = spec("kubernetes", "get", json!({"resource": "pods", "name": "--raw=/"}));
    assert!(matches!(probe.validate(&injected), Err(ProbeError::InvalidParams(_))));
    let delete = spec("kubernetes", "delete", json!({"resource": "pods"}));
    assert!(matches!(probe.validate(&delete), Err(ProbeError::InvalidParams(_))));
    let missing = spec("kubernetes", "get", json!({}));
    assert!(matches!(probe.validate(&missing), Err(ProbeError::InvalidParams(_))));
    assert!(runner.calls().is_empty());
}

#[test]
fn kubernetes_malformed_output_is_reported() {
    let runner = Arc::new(RecordingRunner::new(CommandOutput::ok("not json")));
    let err = microk8s(&runner)
        .query(&spec("kubernetes", "get", json!({"resource": "pods"})), &sample_context())
        .unwrap_err();
    assert!(matches!(err, ProbeError::Malformed(_)));
}

// ============================================================================
// SECTION: Helm
// ============================================================================

#[test]
fn helm_status_and_values_command_lines() {
    let runner = Arc::new(RecordingRunner::new(CommandOutput::ok(
        r#"{"name": "grafana", "info": {"status": "deployed"}}"#,
    )));
    let value = helm(&runner)
        .query(&spec("helm", "status", json!({"release": "grafana"})), &sample_context())
        .unwrap();
    assert_eq!(value.unwrap()["info"]["status"], json!("deployed"));
    assert_eq!(
        runner.command_line(),
        "helm status grafana -n observability --kubeconfig \
         /var/snap/microk8s/current/credentials/client.config -o json"
    );

    let runner = Arc::new(RecordingRunner::new(CommandOutput::ok("null\n")));
    let value = helm(&runner)
        .query(&spec("helm", "values", json!({"release": "grafana", "all": true})), &sample_context())
        .unwrap();
    assert_eq!(value, Some(json!(null)));
    assert!(runner.command_line().starts_with("helm get values grafana --all -n observability"));
}

#[test]
fn helm_missing_release_is_no_data() {
    let runner = Arc::new(RecordingRunner::new(CommandOutput::failed("Error: release: not found")));
    let value = helm(&runner)
        .query(&spec("helm", "status", json!({"release": "grafana"})), &sample_context())
        .unwrap();
    assert_eq!(value, None);
}

#[test]
fn helm_list_accepts_filter_and_rejects_unknown_queries() {
    let runner = Arc::new(RecordingRunner::new(CommandOutput::ok("[]")));
    let probe = helm(&runner);
    probe
        .query(&spec("helm", "list", json!({"filter": "^grafana$", "namespace": "monitoring"})), &sample_context())
        .unwrap();
    assert!(runner.command_line().starts_with("helm list --filter ^grafana$ -n monitoring"));
    assert!(matches!(
        probe.validate(&spec("helm", "uninstall", json!({"release": "grafana"}))),
        Err(ProbeError::InvalidParams(_))
    ));
    assert!(matches!(
        probe.validate(&spec("helm", "status", json!({}))),
        Err(ProbeError::InvalidParams(_))
    ));
}
