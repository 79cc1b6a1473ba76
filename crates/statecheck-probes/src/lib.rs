// crates/statecheck-probes/src/lib.rs
// ============================================================================
// Module: Statecheck Probes
// Description: Built-in read-only probes and the probe registry.
// Purpose: Provide cluster, Helm, HTTP, file, and environment queries for checks.
// Dependencies: statecheck-core, reqwest, serde, serde_json, serde_yaml, jsonpath_lib
// ============================================================================

//! ## Overview
//! This crate ships the built-in probes (kubernetes, helm, http, file, env)
//! and a registry that routes probe references by probe identifier.
//! Invariants:
//! - Probes are read-only. Cluster probes only ever issue `get`, `status`,
//!   `list`, and `get values` verbs.
//! - Parameters are validated when expectations load, before any probe runs.
//! - Responses are bounded in size and fail closed when limits are exceeded.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod command;
pub mod env;
pub mod file;
pub mod helm;
pub mod http;
pub mod kubernetes;
mod params;
pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use command::CommandOutput;
pub use command::CommandRunner;
pub use command::SystemCommandRunner;
pub use env::EnvProbe;
pub use env::EnvProbeConfig;
pub use file::FileProbe;
pub use file::FileProbeConfig;
pub use helm::HelmProbe;
pub use helm::HelmProbeConfig;
pub use http::HttpProbe;
pub use http::HttpProbeConfig;
pub use kubernetes::KubernetesProbe;
pub use kubernetes::KubernetesProbeConfig;
pub use registry::BuiltinProbeConfigs;
pub use registry::ProbeRegistry;
pub use registry::ProbeSetupError;
