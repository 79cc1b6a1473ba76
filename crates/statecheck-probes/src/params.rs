// crates/statecheck-probes/src/params.rs
// ============================================================================
// Module: Probe Parameter Helpers
// Description: Typed accessors over probe reference parameters.
// Purpose: Keep parameter validation messages consistent across probes.
// Dependencies: statecheck-core, serde_json
// ============================================================================

//! ## Overview
//! Accessors shared by the built-in probes for reading `params` values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use statecheck_core::ProbeError;
use statecheck_core::ProbeSpec;

// ============================================================================
// SECTION: Accessors
// ============================================================================

/// Returns the parameter object, or an empty view when none was given.
pub fn object(spec: &ProbeSpec) -> Result<Option<&Map<String, Value>>, ProbeError> {
    match &spec.params {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(ProbeError::InvalidParams(format!("{} params must be an object", spec.probe))),
    }
}

/// Returns an optional string parameter.
pub fn optional_str<'a>(spec: &'a ProbeSpec, key: &str) -> Result<Option<&'a str>, ProbeError> {
    match object(spec)?.and_then(|map| map.get(key)) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.as_str())),
        Some(_) => Err(ProbeError::InvalidParams(format!("`{key}` must be a string"))),
    }
}

/// Returns a required, non-empty string parameter.
pub fn required_str<'a>(spec: &'a ProbeSpec, key: &str) -> Result<&'a str, ProbeError> {
    match optional_str(spec, key)? {
        Some(value) if !value.trim().is_empty() => Ok(value),
        Some(_) => Err(ProbeError::InvalidParams(format!("`{key}` must not be empty"))),
        None => Err(ProbeError::InvalidParams(format!("missing `{key}` param"))),
    }
}

/// Returns an optional boolean parameter, defaulting to false.
pub fn flag(spec: &ProbeSpec, key: &str) -> Result<bool, ProbeError> {
    match object(spec)?.and_then(|map| map.get(key)) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(value)) => Ok(*value),
        Some(_) => Err(ProbeError::InvalidParams(format!("`{key}` must be a boolean"))),
    }
}

/// Rejects values that a command line would read as an option or that carry
/// control characters. Spaces pass through since arguments never reach a shell.
pub fn argument<'a>(key: &str, value: &'a str) -> Result<&'a str, ProbeError> {
    if value.starts_with('-') {
        return Err(ProbeError::InvalidParams(format!("`{key}` must not start with `-`")));
    }
    if value.chars().any(char::is_control) {
        return Err(ProbeError::InvalidParams(format!("`{key}` must not contain control characters")));
    }
    Ok(value)
}

/// Rejects unsupported query names.
pub fn unsupported_query(spec: &ProbeSpec) -> ProbeError {
    ProbeError::InvalidParams(format!("unsupported {} query `{}`", spec.probe, spec.query))
}
