// crates/statecheck-probes/src/registry.rs
// ============================================================================
// Module: Probe Registry
// Description: Registry for built-in and custom probes.
// Purpose: Route probe references by probe identifier.
// Dependencies: statecheck-core, thiserror
// ============================================================================

//! ## Overview
//! The probe registry resolves probe references by probe identifier. It
//! implements the core [`statecheck_core::Probe`] interface so the run engine
//! sees a single probe, and it rejects unknown probe kinds at load time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use statecheck_core::Probe;
use statecheck_core::ProbeContext;
use statecheck_core::ProbeError;
use statecheck_core::ProbeSpec;
use thiserror::Error;

use crate::CommandRunner;
use crate::EnvProbe;
use crate::EnvProbeConfig;
use crate::FileProbe;
use crate::FileProbeConfig;
use crate::HelmProbe;
use crate::HelmProbeConfig;
use crate::HttpProbe;
use crate::HttpProbeConfig;
use crate::KubernetesProbe;
use crate::KubernetesProbeConfig;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while constructing probes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeSetupError {
    /// A probe identifier was registered twice.
    #[error("probe already registered: {0}")]
    Duplicate(String),
    /// A probe configuration is unusable.
    #[error("invalid {probe} probe configuration: {reason}")]
    InvalidConfig {
        /// Probe identifier.
        probe: String,
        /// Failure detail.
        reason: String,
    },
}

// ============================================================================
// SECTION: Built-in Config
// ============================================================================

/// Configuration bundle for built-in probes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuiltinProbeConfigs {
    /// Configuration for the kubernetes probe.
    pub kubernetes: KubernetesProbeConfig,
    /// Configuration for the helm probe.
    pub helm: HelmProbeConfig,
    /// Configuration for the http probe.
    pub http: HttpProbeConfig,
    /// Configuration for the file probe.
    pub file: FileProbeConfig,
    /// Configuration for the env probe.
    pub env: EnvProbeConfig,
}

// ============================================================================
// SECTION: Probe Registry
// ============================================================================

/// Probe registry keyed by probe identifier.
///
/// # Invariants
/// - Probe identifiers are unique within the registry.
pub struct ProbeRegistry {
    /// Probe implementations keyed by identifier.
    probes: BTreeMap<String, Box<dyn Probe>>,
}

impl ProbeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            probes: BTreeMap::new(),
        }
    }

    /// Creates a registry with the built-in probes registered.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeSetupError`] when a probe configuration is invalid.
    pub fn with_builtin_probes(
        configs: BuiltinProbeConfigs,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, ProbeSetupError> {
        let mut registry = Self::new();
        registry.register_probe(
            "kubernetes",
            KubernetesProbe::new(configs.kubernetes, Arc::clone(&runner))?,
        )?;
        registry.register_probe("helm", HelmProbe::new(configs.helm, runner)?)?;
        registry.register_probe("http", HttpProbe::new(configs.http)?)?;
        registry.register_probe("file", FileProbe::new(configs.file))?;
        registry.register_probe("env", EnvProbe::new(configs.env))?;
        Ok(registry)
    }

    /// Registers a probe under the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeSetupError::Duplicate`] when the identifier is taken.
    pub fn register_probe(
        &mut self,
        probe_id: impl Into<String>,
        probe: impl Probe + 'static,
    ) -> Result<(), ProbeSetupError> {
        let probe_id = probe_id.into();
        if self.probes.contains_key(&probe_id) {
            return Err(ProbeSetupError::Duplicate(probe_id));
        }
        self.probes.insert(probe_id, Box::new(probe));
        Ok(())
    }

    /// Returns the registered probe identifiers in sorted order.
    #[must_use]
    pub fn probe_ids(&self) -> Vec<&str> {
        self.probes.keys().map(String::as_str).collect()
    }

    /// Resolves the probe for a reference.
    fn resolve(&self, spec: &ProbeSpec) -> Result<&dyn Probe, ProbeError> {
        self.probes
            .get(spec.probe.as_str())
            .map(|probe| probe.as_ref())
            .ok_or_else(|| ProbeError::UnknownKind(spec.probe.to_string()))
    }
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for ProbeRegistry {
    fn query(&self, spec: &ProbeSpec, ctx: &ProbeContext) -> Result<Option<Value>, ProbeError> {
        self.resolve(spec)?.query(spec, ctx)
    }

    fn validate(&self, spec: &ProbeSpec) -> Result<(), ProbeError> {
        self.resolve(spec)?.validate(spec)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
