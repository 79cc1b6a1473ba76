// crates/statecheck-core/src/core/mod.rs
// ============================================================================
// Module: Statecheck Core Types
// Description: Canonical expectation, outcome, report, and settings structures.
// Purpose: Provide stable, serializable types shared by every verifier layer.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! Core types describe what a run checks ([`Expectation`]), what a probe
//! returned ([`ProbeResult`]), how each check was graded ([`Outcome`]), and
//! what the run produced ([`Report`]). Run parameters arrive as a flat
//! [`RunSettings`] map and are resolved once into an immutable [`RunConfig`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod expectation;
pub mod identifiers;
pub mod outcome;
pub mod report;
pub mod retry;
pub mod settings;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use expectation::Comparator;
pub use expectation::Expectation;
pub use expectation::MatchMode;
pub use expectation::Predicate;
pub use expectation::PredicateError;
pub use expectation::ProbeSpec;
pub use expectation::Severity;
pub use identifiers::ExpectationId;
pub use identifiers::ProbeId;
pub use identifiers::RunId;
pub use outcome::Outcome;
pub use outcome::OutcomeStatus;
pub use outcome::ProbeResult;
pub use report::Report;
pub use report::ReportSummary;
pub use report::Verdict;
pub use retry::RetryPolicy;
pub use settings::RunConfig;
pub use settings::RunSettings;
pub use settings::SettingsError;
pub use settings::SubsetSelection;
