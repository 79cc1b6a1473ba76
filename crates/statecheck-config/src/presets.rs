// crates/statecheck-config/src/presets.rs
// ============================================================================
// Module: Bundled Presets
// Description: Ready-made verification configurations compiled into the binary.
// Purpose: Provide base layers that a local statecheck.toml can extend.
// Dependencies: toml
// ============================================================================

//! ## Overview
//! Presets are ordinary `statecheck.toml` documents embedded at build time.
//! They parse and validate through the same path as user files, so a preset
//! can never carry settings a user file could not.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::config::ConfigError;
use crate::config::VerifierConfig;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Names of the bundled presets.
pub const PRESET_NAMES: &[&str] = &["grafana-microk8s"];

/// Grafana on MicroK8s preset source.
const GRAFANA_MICROK8S: &str = include_str!("../presets/grafana-microk8s.toml");

/// Returns the TOML source of a bundled preset.
#[must_use]
pub fn preset_source(name: &str) -> Option<&'static str> {
    match name {
        "grafana-microk8s" => Some(GRAFANA_MICROK8S),
        _ => None,
    }
}

/// Parses a bundled preset.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for unknown preset names.
pub fn preset(name: &str) -> Result<VerifierConfig, ConfigError> {
    let source =
        preset_source(name).ok_or_else(|| ConfigError::Invalid(format!("unknown preset: {name}")))?;
    VerifierConfig::from_toml_str(source)
}
