// crates/statecheck-config/src/lib.rs
// ============================================================================
// Module: Statecheck Config Library
// Description: Configuration file model, validation, and bundled presets.
// Purpose: Single source of truth for statecheck.toml semantics.
// Dependencies: statecheck-core, statecheck-probes, serde, toml
// ============================================================================

//! ## Overview
//! `statecheck-config` loads `statecheck.toml`, validates it fail-closed, and
//! flattens it into the [`statecheck_core::RunSettings`] map the core
//! consumes. Bundled presets provide ready-made expectation sets that a local
//! file can extend or override.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod presets;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use presets::PRESET_NAMES;
pub use presets::preset;
pub use presets::preset_source;
