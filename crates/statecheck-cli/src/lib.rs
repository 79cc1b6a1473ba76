// crates/statecheck-cli/src/lib.rs
// ============================================================================
// Module: Statecheck CLI Library
// Description: Shared helpers for the verify command-line interface.
// Purpose: Provide reusable components (i18n, output) for the binary and tests.
// Dependencies: statecheck-core, serde, serde_jcs
// ============================================================================

//! ## Overview
//! This library houses the CLI message catalog and the report and plan
//! renderers. The binary entry point (`src/main.rs`) imports these helpers to
//! keep all user-facing output consistent.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Message catalog and the `t!` macro.
pub mod i18n;
/// Report and plan rendering.
pub mod output;
