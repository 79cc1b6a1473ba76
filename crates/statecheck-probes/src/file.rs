// crates/statecheck-probes/src/file.rs
// ============================================================================
// Module: File Probe
// Description: Probe for local JSON and YAML documents.
// Purpose: Check rendered manifests and values files alongside live state.
// Dependencies: statecheck-core, jsonpath_lib, serde, serde_json, serde_yaml
// ============================================================================

//! ## Overview
//! The file probe loads a JSON or YAML document and optionally narrows it
//! with a `JSONPath` expression. Paths resolve under an optional root and
//! may not escape it. A file that does not exist yields no data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::ErrorKind;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use jsonpath_lib::select;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use statecheck_core::Probe;
use statecheck_core::ProbeContext;
use statecheck_core::ProbeError;
use statecheck_core::ProbeSpec;
use statecheck_core::core::expectation::absolute_path;

use crate::params;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the file probe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileProbeConfig {
    /// Optional root directory for resolving file paths.
    pub root: Option<PathBuf>,
    /// Maximum file size allowed, in bytes.
    pub max_bytes: usize,
    /// Allow YAML parsing when the extension is `.yaml` or `.yml`.
    pub allow_yaml: bool,
}

impl Default for FileProbeConfig {
    fn default() -> Self {
        Self {
            root: None,
            max_bytes: 1024 * 1024,
            allow_yaml: true,
        }
    }
}

// ============================================================================
// SECTION: Probe Implementation
// ============================================================================

/// Probe for JSON and YAML documents.
///
/// # Params
/// - `file` (required): document path.
/// - `jsonpath`: selection applied to the document.
pub struct FileProbe {
    /// Probe configuration.
    config: FileProbeConfig,
}

impl FileProbe {
    /// Creates a file probe.
    #[must_use]
    pub const fn new(config: FileProbeConfig) -> Self {
        Self {
            config,
        }
    }
}

impl Probe for FileProbe {
    fn query(&self, spec: &ProbeSpec, _ctx: &ProbeContext) -> Result<Option<Value>, ProbeError> {
        self.validate(spec)?;
        let file = params::required_str(spec, "file")?;
        let Some(resolved) = resolve_path(&self.config, file)? else {
            return Ok(None);
        };
        let content = read_file_limited(&resolved, self.config.max_bytes)?;
        let document = parse_document(&resolved, &content, self.config.allow_yaml)?;
        match params::optional_str(spec, "jsonpath")? {
            Some(path) => select_jsonpath(&document, path),
            None => Ok(Some(document)),
        }
    }

    fn validate(&self, spec: &ProbeSpec) -> Result<(), ProbeError> {
        if spec.query != "document" {
            return Err(params::unsupported_query(spec));
        }
        params::required_str(spec, "file")?;
        if let Some(path) = params::optional_str(spec, "jsonpath")? {
            select(&Value::Object(Map::new()), &absolute_path(path))
                .map_err(|_| ProbeError::InvalidParams(format!("invalid jsonpath `{path}`")))?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves a file path against the root policy; `None` when it does not exist.
fn resolve_path(config: &FileProbeConfig, file: &str) -> Result<Option<PathBuf>, ProbeError> {
    let candidate = PathBuf::from(file);
    let joined = match &config.root {
        Some(root) if candidate.is_relative() => root.join(candidate),
        _ => candidate,
    };
    let resolved = match joined.canonicalize() {
        Ok(resolved) => resolved,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(ProbeError::Failed(format!("unable to resolve {file}: {err}"))),
    };
    if let Some(root) = &config.root {
        let root = root
            .canonicalize()
            .map_err(|err| ProbeError::Failed(format!("invalid file root: {err}")))?;
        if !resolved.starts_with(&root) {
            return Err(ProbeError::InvalidParams(format!("file `{file}` escapes root")));
        }
    }
    Ok(Some(resolved))
}

/// Reads a file while enforcing a maximum byte limit.
fn read_file_limited(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ProbeError> {
    let file = File::open(path)
        .map_err(|err| ProbeError::Failed(format!("unable to open {}: {err}", path.display())))?;
    let limit = u64::try_from(max_bytes.saturating_add(1))
        .map_err(|_| ProbeError::Failed("file size limit exceeds u64".to_string()))?;
    let mut buf = Vec::new();
    file.take(limit)
        .read_to_end(&mut buf)
        .map_err(|err| ProbeError::Failed(format!("unable to read {}: {err}", path.display())))?;
    if buf.len() > max_bytes {
        return Err(ProbeError::Malformed(format!("{} exceeds size limit", path.display())));
    }
    Ok(buf)
}

/// Parses a JSON or YAML document by extension.
fn parse_document(path: &Path, content: &[u8], allow_yaml: bool) -> Result<Value, ProbeError> {
    let ext = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default().to_ascii_lowercase();
    if ext == "yaml" || ext == "yml" {
        if !allow_yaml {
            return Err(ProbeError::InvalidParams("yaml parsing is disabled".to_string()));
        }
        return serde_yaml::from_slice(content)
            .map_err(|err| ProbeError::Malformed(format!("invalid yaml: {err}")));
    }
    serde_json::from_slice(content).map_err(|err| ProbeError::Malformed(format!("invalid json: {err}")))
}

/// Selects values with a `JSONPath` expression; several matches become an array.
fn select_jsonpath(document: &Value, path: &str) -> Result<Option<Value>, ProbeError> {
    let matches = select(document, &absolute_path(path))
        .map_err(|_| ProbeError::InvalidParams(format!("invalid jsonpath `{path}`")))?;
    match matches.as_slice() {
        [] => Ok(None),
        [single] => Ok(Some((*single).clone())),
        many => Ok(Some(Value::Array(many.iter().map(|value| (*value).clone()).collect()))),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
