// crates/statecheck-config/src/config.rs
// ============================================================================
// Module: Statecheck Configuration
// Description: Configuration loading and validation for statecheck.toml.
// Purpose: Provide strict, fail-closed config parsing with env and preset layers.
// Dependencies: statecheck-core, statecheck-probes, serde, toml
// ============================================================================

//! ## Overview
//! This module defines the configuration model for the verifier. The loader
//! applies strict size and path limits, parses TOML with unknown fields
//! rejected, and validates every section before the core sees it.
//!
//! Layering, lowest to highest precedence:
//! 1. a bundled preset (`run.preset` or `--preset`),
//! 2. the config file,
//! 3. `STATECHECK_<SECTION>_<KEY>` environment overrides,
//! 4. command-line flags.
//!
//! Layers 3 and 4 are flat [`RunSettings`] overlays applied on top of
//! [`VerifierConfig::settings`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use statecheck_core::Expectation;
use statecheck_core::RunSettings;
use statecheck_core::core::settings::KEY_NAMESPACE;
use statecheck_core::core::settings::KEY_ONLY;
use statecheck_core::core::settings::KEY_PARALLELISM;
use statecheck_core::core::settings::KEY_PROBE_BACKOFF_MS;
use statecheck_core::core::settings::KEY_PROBE_BACKOFF_MULTIPLIER;
use statecheck_core::core::settings::KEY_PROBE_MAX_BACKOFF_MS;
use statecheck_core::core::settings::KEY_PROBE_RETRIES;
use statecheck_core::core::settings::KEY_PROBE_TIMEOUT_MS;
use statecheck_core::core::settings::KEY_RUN_ID;
use statecheck_core::core::settings::KEY_RUN_TIMEOUT_MS;
use statecheck_core::core::settings::KEY_SUBSET;
use statecheck_core::core::settings::MAX_PARALLELISM;
use statecheck_core::core::settings::MAX_PROBE_RETRIES;
use statecheck_core::core::settings::MAX_PROBE_TIMEOUT;
use statecheck_probes::BuiltinProbeConfigs;
use statecheck_probes::EnvProbeConfig;
use statecheck_probes::FileProbeConfig;
use statecheck_probes::HelmProbeConfig;
use statecheck_probes::HttpProbeConfig;
use statecheck_probes::KubernetesProbeConfig;
use thiserror::Error;

use crate::presets;

// ============================================================================
// SECTION: Limits and Defaults
// ============================================================================

/// Default config file name.
pub const DEFAULT_CONFIG_NAME: &str = "statecheck.toml";
/// Environment variable for config path override.
pub const CONFIG_ENV_VAR: &str = "STATECHECK_CONFIG";
/// Prefix shared by environment overrides.
pub const ENV_OVERRIDE_PREFIX: &str = "STATECHECK_";
/// Maximum size of a config file in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of declared expectations.
pub const MAX_EXPECTATIONS: usize = 1024;
/// Maximum length of a `[vars]` name.
pub const MAX_VAR_NAME_LENGTH: usize = 64;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Verifier configuration loaded from `statecheck.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifierConfig {
    /// Run selection and limits.
    #[serde(default)]
    pub run: RunSection,
    /// Target identity.
    #[serde(default)]
    pub target: TargetSection,
    /// Probe timeout and retry policy.
    #[serde(default)]
    pub probe: ProbeSection,
    /// Free-form interpolation variables, exposed as `${vars.<name>}`.
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    /// Run log configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Built-in probe configuration.
    #[serde(default)]
    pub probes: ProbesSection,
    /// Declared expectations in declaration order.
    #[serde(default)]
    pub expectations: Vec<Expectation>,
}

/// `[run]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    /// Explicit run identifier; generated when absent.
    pub id: Option<String>,
    /// Bundled preset used as the base layer.
    pub preset: Option<String>,
    /// Subset tag (`full` selects everything).
    pub subset: Option<String>,
    /// Explicit expectation ids; overrides `subset`.
    pub only: Option<Vec<String>>,
    /// Global run timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Worker count for independent expectations.
    pub parallelism: Option<usize>,
}

/// `[target]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetSection {
    /// Default namespace handed to probes.
    pub namespace: Option<String>,
}

/// `[probe]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeSection {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Retries after the first attempt for transient errors.
    pub retries: Option<u32>,
    /// Initial backoff in milliseconds.
    pub backoff_ms: Option<u64>,
    /// Backoff growth factor.
    pub backoff_multiplier: Option<u32>,
    /// Backoff ceiling in milliseconds.
    pub max_backoff_ms: Option<u64>,
}

/// Run log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSinkKind {
    /// No run log.
    #[default]
    #[serde(rename = "none")]
    Disabled,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to `logging.path`.
    File,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Sink kind.
    pub sink: LogSinkKind,
    /// Log file path for the `file` sink.
    pub path: Option<PathBuf>,
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (LogSinkKind::File, None) => {
                Err(ConfigError::Invalid("logging.path is required for the file sink".to_string()))
            }
            (LogSinkKind::File, Some(path)) => {
                validate_path_string("logging.path", &path.to_string_lossy())
            }
            (_, Some(_)) => Err(ConfigError::Invalid(
                "logging.path is only valid for the file sink".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }
}

/// `[probes.<kind>]` sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbesSection {
    /// Kubernetes probe configuration.
    pub kubernetes: Option<KubernetesProbeConfig>,
    /// Helm probe configuration.
    pub helm: Option<HelmProbeConfig>,
    /// HTTP probe configuration.
    pub http: Option<HttpProbeConfig>,
    /// File probe configuration.
    pub file: Option<FileProbeConfig>,
    /// Environment probe configuration.
    pub env: Option<EnvProbeConfig>,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl VerifierConfig {
    /// Loads configuration using the default resolution rules.
    ///
    /// An explicit `path` or `STATECHECK_CONFIG` must point at an existing
    /// file. Without either, `statecheck.toml` in the working directory is
    /// used when present and an empty configuration otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, required) = resolve_path(path, env::var(CONFIG_ENV_VAR).ok())?;
        validate_path(&resolved)?;
        if !required && !resolved.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.run.validate()?;
        if let Some(namespace) = &self.target.namespace {
            validate_non_empty("target.namespace", namespace)?;
        }
        self.probe.validate()?;
        for name in self.vars.keys() {
            validate_var_name(name)?;
        }
        self.logging.validate()?;
        if self.expectations.len() > MAX_EXPECTATIONS {
            return Err(ConfigError::Invalid(format!(
                "expectations exceed limit of {MAX_EXPECTATIONS}"
            )));
        }
        Ok(())
    }

    /// Applies the bundled preset named by `preset` or `run.preset`.
    ///
    /// The preset is the base layer; this configuration is merged over it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unknown presets or when the merged
    /// configuration fails validation.
    pub fn with_preset(self, preset: Option<&str>) -> Result<Self, ConfigError> {
        let Some(name) = preset.map(str::to_string).or_else(|| self.run.preset.clone()) else {
            return Ok(self);
        };
        let mut base = presets::preset(&name)?;
        base.merge(self);
        base.run.preset = Some(name);
        base.validate()?;
        Ok(base)
    }

    /// Merges `overlay` into this configuration.
    ///
    /// Scalar settings present in the overlay win. `[vars]` entries are
    /// extended. Expectations with an id already declared replace the earlier
    /// declaration in place; new ids are appended.
    pub fn merge(&mut self, overlay: Self) {
        let Self {
            run,
            target,
            probe,
            vars,
            logging,
            probes,
            expectations,
        } = overlay;

        merge_option(&mut self.run.id, run.id);
        merge_option(&mut self.run.preset, run.preset);
        merge_option(&mut self.run.subset, run.subset);
        merge_option(&mut self.run.only, run.only);
        merge_option(&mut self.run.timeout_secs, run.timeout_secs);
        merge_option(&mut self.run.parallelism, run.parallelism);
        merge_option(&mut self.target.namespace, target.namespace);
        merge_option(&mut self.probe.timeout_ms, probe.timeout_ms);
        merge_option(&mut self.probe.retries, probe.retries);
        merge_option(&mut self.probe.backoff_ms, probe.backoff_ms);
        merge_option(&mut self.probe.backoff_multiplier, probe.backoff_multiplier);
        merge_option(&mut self.probe.max_backoff_ms, probe.max_backoff_ms);
        self.vars.extend(vars);
        if logging != LoggingConfig::default() {
            self.logging = logging;
        }
        merge_option(&mut self.probes.kubernetes, probes.kubernetes);
        merge_option(&mut self.probes.helm, probes.helm);
        merge_option(&mut self.probes.http, probes.http);
        merge_option(&mut self.probes.file, probes.file);
        merge_option(&mut self.probes.env, probes.env);

        for expectation in expectations {
            match self.expectations.iter_mut().find(|existing| existing.id == expectation.id) {
                Some(existing) => *existing = expectation,
                None => self.expectations.push(expectation),
            }
        }
    }

    /// Flattens the run, target, probe, and vars sections into run settings.
    #[must_use]
    pub fn settings(&self) -> RunSettings {
        let mut settings = RunSettings::new();
        if let Some(namespace) = &self.target.namespace {
            settings.set(KEY_NAMESPACE, namespace.as_str());
        }
        if let Some(id) = &self.run.id {
            settings.set(KEY_RUN_ID, id.as_str());
        }
        if let Some(subset) = &self.run.subset {
            settings.set(KEY_SUBSET, subset.as_str());
        }
        if let Some(only) = &self.run.only {
            settings.set(KEY_ONLY, only.join(","));
        }
        if let Some(timeout_secs) = self.run.timeout_secs {
            settings.set(KEY_RUN_TIMEOUT_MS, timeout_secs.saturating_mul(1000).to_string());
        }
        if let Some(parallelism) = self.run.parallelism {
            settings.set(KEY_PARALLELISM, parallelism.to_string());
        }
        let probe = [
            (KEY_PROBE_TIMEOUT_MS, self.probe.timeout_ms),
            (KEY_PROBE_RETRIES, self.probe.retries.map(u64::from)),
            (KEY_PROBE_BACKOFF_MS, self.probe.backoff_ms),
            (KEY_PROBE_BACKOFF_MULTIPLIER, self.probe.backoff_multiplier.map(u64::from)),
            (KEY_PROBE_MAX_BACKOFF_MS, self.probe.max_backoff_ms),
        ];
        for (key, value) in probe {
            if let Some(value) = value {
                settings.set(key, value.to_string());
            }
        }
        for (name, value) in &self.vars {
            settings.set(format!("vars.{name}"), value.as_str());
        }
        settings
    }

    /// Returns the built-in probe configuration, defaulting absent sections.
    #[must_use]
    pub fn probe_configs(&self) -> BuiltinProbeConfigs {
        BuiltinProbeConfigs {
            kubernetes: self.probes.kubernetes.clone().unwrap_or_default(),
            helm: self.probes.helm.clone().unwrap_or_default(),
            http: self.probes.http.clone().unwrap_or_default(),
            file: self.probes.file.clone().unwrap_or_default(),
            env: self.probes.env.clone().unwrap_or_default(),
        }
    }
}

impl RunSection {
    /// Validates run selection and limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(id) = &self.id {
            validate_non_empty("run.id", id)?;
        }
        if let Some(preset) = &self.preset
            && !presets::PRESET_NAMES.contains(&preset.as_str())
        {
            return Err(ConfigError::Invalid(format!("unknown preset: {preset}")));
        }
        if let Some(subset) = &self.subset {
            validate_non_empty("run.subset", subset)?;
        }
        if let Some(only) = &self.only {
            if only.is_empty() {
                return Err(ConfigError::Invalid("run.only must list at least one id".to_string()));
            }
            for id in only {
                validate_non_empty("run.only", id)?;
                if id.contains(',') {
                    return Err(ConfigError::Invalid(format!(
                        "run.only id must not contain commas: {id}"
                    )));
                }
            }
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::Invalid("run.timeout_secs must be greater than zero".to_string()));
        }
        if let Some(parallelism) = self.parallelism
            && (parallelism == 0 || parallelism > MAX_PARALLELISM)
        {
            return Err(ConfigError::Invalid(format!(
                "run.parallelism must be between 1 and {MAX_PARALLELISM}"
            )));
        }
        Ok(())
    }
}

impl ProbeSection {
    /// Validates probe timeout and retry policy.
    fn validate(&self) -> Result<(), ConfigError> {
        let max_timeout_ms = u64::try_from(MAX_PROBE_TIMEOUT.as_millis()).unwrap_or(u64::MAX);
        if let Some(timeout_ms) = self.timeout_ms
            && (timeout_ms == 0 || timeout_ms > max_timeout_ms)
        {
            return Err(ConfigError::Invalid(format!(
                "probe.timeout_ms must be between 1 and {max_timeout_ms}"
            )));
        }
        if self.retries.is_some_and(|retries| retries > MAX_PROBE_RETRIES) {
            return Err(ConfigError::Invalid(format!(
                "probe.retries must be at most {MAX_PROBE_RETRIES}"
            )));
        }
        if self.backoff_multiplier == Some(0) {
            return Err(ConfigError::Invalid(
                "probe.backoff_multiplier must be at least 1".to_string(),
            ));
        }
        if let (Some(backoff), Some(max_backoff)) = (self.backoff_ms, self.max_backoff_ms)
            && backoff > max_backoff
        {
            return Err(ConfigError::Invalid(
                "probe.backoff_ms must not exceed probe.max_backoff_ms".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Environment Overrides
// ============================================================================

/// Collects `STATECHECK_<SECTION>_<KEY>` overrides from the process environment.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for malformed overrides.
pub fn env_overrides_from_process() -> Result<RunSettings, ConfigError> {
    env_overrides(env::vars())
}

/// Maps `STATECHECK_<SECTION>_<KEY>` variables onto run settings keys.
///
/// Sections are `RUN`, `TARGET`, `PROBE`, and `VARS`; keys are lowercased.
/// `STATECHECK_RUN_TIMEOUT_SECS` is converted to `run.timeout_ms`. Other
/// variables are ignored, including `STATECHECK_CONFIG`.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when a run, target, or probe key is not a
/// known setting, or a timeout in seconds is not an integer.
pub fn env_overrides<I, K, V>(vars: I) -> Result<RunSettings, ConfigError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut settings = RunSettings::new();
    for (name, value) in vars {
        let name = name.as_ref();
        let value = value.as_ref();
        let Some(rest) = name.strip_prefix(ENV_OVERRIDE_PREFIX) else {
            continue;
        };
        let Some((section, key)) = rest.split_once('_') else {
            continue;
        };
        let key = key.to_ascii_lowercase();
        match section {
            "VARS" => {
                validate_var_name(&key)?;
                settings.set(format!("vars.{key}"), value);
            }
            "RUN" if key == "timeout_secs" => {
                let secs = value.trim().parse::<u64>().map_err(|_| {
                    ConfigError::Invalid(format!("{name} must be a non-negative integer"))
                })?;
                settings.set(KEY_RUN_TIMEOUT_MS, secs.saturating_mul(1000).to_string());
            }
            "RUN" | "TARGET" | "PROBE" => {
                let full_key = format!("{}.{key}", section.to_ascii_lowercase());
                if !OVERRIDABLE_KEYS.contains(&full_key.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "unknown environment override: {name}"
                    )));
                }
                settings.set(full_key, value);
            }
            _ => {}
        }
    }
    Ok(settings)
}

/// Settings keys reachable through run, target, and probe overrides.
const OVERRIDABLE_KEYS: &[&str] = &[
    KEY_NAMESPACE,
    KEY_RUN_ID,
    KEY_SUBSET,
    KEY_ONLY,
    KEY_RUN_TIMEOUT_MS,
    KEY_PARALLELISM,
    KEY_PROBE_TIMEOUT_MS,
    KEY_PROBE_RETRIES,
    KEY_PROBE_BACKOFF_MS,
    KEY_PROBE_BACKOFF_MULTIPLIER,
    KEY_PROBE_MAX_BACKOFF_MS,
];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path and whether the file must exist.
fn resolve_path(
    path: Option<&Path>,
    env_path: Option<String>,
) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Some(env_path) = env_path {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    validate_non_empty(field, trimmed)?;
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Rejects blank values.
fn validate_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    Ok(())
}

/// Validates a `[vars]` name.
fn validate_var_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() || name.len() > MAX_VAR_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "vars name must be 1-{MAX_VAR_NAME_LENGTH} characters: `{name}`"
        )));
    }
    if !name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-') {
        return Err(ConfigError::Invalid(format!("vars name has invalid characters: {name}")));
    }
    Ok(())
}

/// Replaces `base` when the overlay carries a value.
fn merge_option<T>(base: &mut Option<T>, overlay: Option<T>) {
    if overlay.is_some() {
        *base = overlay;
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
