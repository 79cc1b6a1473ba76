// crates/statecheck-cli/src/output.rs
// ============================================================================
// Module: CLI Output Rendering
// Description: Text and canonical JSON renderers for reports and plans.
// Purpose: Keep report sinks separate from the run so sink failures stay distinct.
// Dependencies: statecheck-core, serde, serde_jcs, thiserror
// ============================================================================

//! ## Overview
//! Reports and execution plans render either as human-readable text or as
//! canonical JSON (RFC 8785), which keeps machine output byte-stable across
//! runs with identical outcomes. Writing a rendered report is the only
//! fallible sink step and maps to its own exit status in the binary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::Serialize;
use statecheck_core::ExecutionPlan;
use statecheck_core::ExpectationId;
use statecheck_core::Report;
use statecheck_core::RunConfig;
use statecheck_core::Severity;
use thiserror::Error;

use crate::t;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Output format for reports and plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    /// Human-readable text.
    Text,
    /// Canonical JSON.
    Json,
}

/// Output failures.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The value could not be serialized.
    #[error("{0}")]
    Serialize(String),
    /// The rendered bytes could not be written.
    #[error("{0}")]
    Write(String),
}

/// Serializable view of an execution plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanOutput {
    /// Run identifier.
    pub run_id: String,
    /// Subset label.
    pub subset: String,
    /// Default namespace handed to probes.
    pub namespace: String,
    /// Checks in execution order.
    pub checks: Vec<PlannedCheck>,
}

/// One planned check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCheck {
    /// Expectation identifier.
    pub id: ExpectationId,
    /// Interpolated description.
    pub description: String,
    /// Probe kind.
    pub probe: String,
    /// Probe query.
    pub query: String,
    /// Status recorded on failure.
    pub severity_on_failure: Severity,
    /// Dependencies.
    pub depends_on: Vec<ExpectationId>,
    /// Subset tags.
    pub tags: Vec<String>,
}

impl PlanOutput {
    /// Builds the plan view from a resolved run configuration and plan.
    #[must_use]
    pub fn new(config: &RunConfig, plan: &ExecutionPlan) -> Self {
        Self {
            run_id: config.run_id.to_string(),
            subset: plan.subset.clone(),
            namespace: config.namespace.clone(),
            checks: plan
                .checks
                .iter()
                .map(|check| PlannedCheck {
                    id: check.id.clone(),
                    description: check.description.clone(),
                    probe: check.probe.probe.to_string(),
                    query: check.probe.query.clone(),
                    severity_on_failure: check.severity_on_failure,
                    depends_on: check.depends_on.clone(),
                    tags: check.tags.clone(),
                })
                .collect(),
        }
    }

    /// Renders the plan as text.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}",
            t!(
                "plan.header",
                run_id = self.run_id,
                subset = self.subset,
                namespace = self.namespace
            )
        );
        for (index, check) in self.checks.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}",
                t!(
                    "plan.entry",
                    index = index + 1,
                    id = check.id,
                    probe = check.probe,
                    query = check.query,
                    description = check.description
                )
            );
            if !check.depends_on.is_empty() {
                let ids: Vec<&str> = check.depends_on.iter().map(ExpectationId::as_str).collect();
                let _ = writeln!(out, "{}", t!("plan.entry.depends", ids = ids.join(", ")));
            }
            if check.severity_on_failure == Severity::Warn {
                let _ = writeln!(out, "{}", t!("plan.entry.severity", severity = "WARN"));
            }
        }
        let _ = writeln!(out, "{}", t!("plan.summary", count = self.checks.len()));
        out
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Serializes a value as canonical JSON followed by a newline.
///
/// # Errors
///
/// Returns [`OutputError::Serialize`] when serialization fails.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, OutputError> {
    let mut bytes = serde_jcs::to_vec(value)
        .map_err(|err| OutputError::Serialize(t!("report.serialize_failed", error = err)))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Renders a report in the requested format.
///
/// # Errors
///
/// Returns [`OutputError::Serialize`] when JSON serialization fails.
pub fn render_report(report: &Report, format: RenderFormat) -> Result<Vec<u8>, OutputError> {
    match format {
        RenderFormat::Text => Ok(report.render_text().into_bytes()),
        RenderFormat::Json => canonical_json(report),
    }
}

/// Renders a plan in the requested format.
///
/// # Errors
///
/// Returns [`OutputError::Serialize`] when JSON serialization fails.
pub fn render_plan(plan: &PlanOutput, format: RenderFormat) -> Result<Vec<u8>, OutputError> {
    match format {
        RenderFormat::Text => Ok(plan.render_text().into_bytes()),
        RenderFormat::Json => canonical_json(plan),
    }
}

/// Writes rendered bytes to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns [`OutputError::Write`] when the file cannot be written.
pub fn write_report(path: &Path, bytes: &[u8]) -> Result<(), OutputError> {
    fs::write(path, bytes).map_err(|err| {
        OutputError::Write(t!("report.write_failed", path = path.display(), error = err))
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
