// crates/statecheck-cli/src/i18n.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: English message templates and `{placeholder}` substitution.
// Purpose: Keep CLI wording in one table.
// Dependencies: Standard library collections.
// ============================================================================

//! ## Overview
//! Every line the `verify` binary prints, other than rendered reports and
//! plans, is a template in [`MESSAGES`] rendered through [`t!`](crate::t).
//!
//! Unknown keys render as the key itself so a missing entry is visible in
//! output instead of failing the command.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Named substitution for one `{placeholder}` in a catalog template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageArg {
    /// Placeholder name without braces.
    pub key: &'static str,
    /// Rendered value.
    pub value: String,
}

impl MessageArg {
    /// Pairs a placeholder name with its rendered value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Message templates keyed by dotted message id.
const MESSAGES: &[(&str, &str)] = &[
    ("main.version", "verify {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.env_failed", "Failed to apply environment overrides: {error}"),
    ("config.probes_failed", "Invalid probe configuration: {error}"),
    ("config.validate.ok", "Config valid: {count} expectations ({preset})"),
    ("config.validate.no_preset", "no preset"),
    ("args.set_invalid", "Invalid --set value (expected KEY=VALUE): {value}"),
    ("args.only_empty", "--only must name at least one expectation id"),
    ("args.timeout_invalid", "--timeout must be greater than zero"),
    ("log.open_failed", "Failed to open run log {path}: {error}"),
    ("log.path_missing", "logging.path is required for the file sink"),
    (
        "run.no_expectations",
        "No expectations configured. Pass --config with [[expectations]] or --preset.",
    ),
    ("run.fatal", "Run aborted before probing: {error}"),
    ("report.serialize_failed", "Failed to serialize report: {error}"),
    ("report.write_failed", "Failed to write report to {path}: {error}"),
    ("report.written", "Report written to {path} ({verdict})"),
    (
        "plan.header",
        "Execution plan for run {run_id} (subset: {subset}, namespace: {namespace})",
    ),
    ("plan.entry", "{index}. {id} [{probe}/{query}] {description}"),
    ("plan.entry.depends", "   depends on: {ids}"),
    ("plan.entry.severity", "   on failure: {severity}"),
    ("plan.summary", "{count} checks planned"),
];

/// Lazily indexed view of [`MESSAGES`].
fn messages() -> &'static BTreeMap<&'static str, &'static str> {
    /// Index built on first lookup.
    static INDEX: OnceLock<BTreeMap<&'static str, &'static str>> = OnceLock::new();
    INDEX.get_or_init(|| MESSAGES.iter().copied().collect())
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Looks up `key` and fills its placeholders from `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = messages().get(key).copied().unwrap_or(key);
    args.into_iter().fold(template.to_string(), |message, arg| {
        message.replace(&["{", arg.key, "}"].concat(), &arg.value)
    })
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Renders a catalog message, for example
/// `t!("report.written", path = path.display(), verdict = "FAILURE")`.
///
/// Every named argument is converted with `to_string` before substitution.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        $crate::i18n::translate(
            $key,
            ::std::vec![$($crate::i18n::MessageArg::new(::std::stringify!($name), $value.to_string())),*],
        )
    }};
}
