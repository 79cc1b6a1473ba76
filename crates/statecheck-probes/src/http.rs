// crates/statecheck-probes/src/http.rs
// ============================================================================
// Module: HTTP Probe
// Description: Read-only HTTP GET probe for health and ingress endpoints.
// Purpose: Return status, content type, and body of an endpoint with strict limits.
// Dependencies: statecheck-core, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! The HTTP probe issues bounded GET requests and returns
//! `{status, content_type, body}`. JSON bodies are parsed; other bodies are
//! returned as text. It enforces scheme restrictions, an optional host
//! allowlist, disabled redirects, and a response size limit.
//!
//! A `host_header` parameter overrides the `Host` header so ingress rules can
//! be exercised against a node address before DNS exists for the host.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::io::Read;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HOST;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use statecheck_core::Probe;
use statecheck_core::ProbeContext;
use statecheck_core::ProbeError;
use statecheck_core::ProbeSpec;

use crate::params;
use crate::registry::ProbeSetupError;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the HTTP probe.
///
/// # Invariants
/// - `allow_http = false` blocks cleartext `http://` URLs.
/// - `max_response_bytes` is a hard upper bound on response bodies.
/// - If `allowed_hosts` is set, only listed hosts are permitted.
/// - URLs with embedded credentials are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpProbeConfig {
    /// Base URL that relative `url` params resolve against.
    pub base_url: Option<String>,
    /// Allow cleartext HTTP.
    pub allow_http: bool,
    /// Optional host allowlist.
    pub allowed_hosts: Option<BTreeSet<String>>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// Skip TLS certificate verification (self-signed cluster certificates).
    pub insecure_tls: bool,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for HttpProbeConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            allow_http: false,
            allowed_hosts: None,
            timeout_ms: 5_000,
            max_response_bytes: 1024 * 1024,
            insecure_tls: false,
            user_agent: "statecheck/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Probe Implementation
// ============================================================================

/// Probe for HTTP endpoints.
///
/// # Params
/// - `url` (required): absolute URL, or a path relative to `base_url`.
/// - `host_header`: value sent as the `Host` header.
pub struct HttpProbe {
    /// Probe configuration.
    config: HttpProbeConfig,
    /// Parsed base URL.
    base_url: Option<Url>,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl HttpProbe {
    /// Creates an HTTP probe.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeSetupError`] when the base URL is invalid or the client
    /// cannot be built.
    pub fn new(config: HttpProbeConfig) -> Result<Self, ProbeSetupError> {
        let invalid = |reason: String| ProbeSetupError::InvalidConfig {
            probe: "http".to_string(),
            reason,
        };
        let base_url = config
            .base_url
            .as_deref()
            .map(|base| Url::parse(base).map_err(|err| invalid(format!("invalid base_url: {err}"))))
            .transpose()?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .danger_accept_invalid_certs(config.insecure_tls)
            .build()
            .map_err(|err| invalid(format!("http client build failed: {err}")))?;
        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    /// Resolves and validates the request URL.
    fn request_url(&self, spec: &ProbeSpec) -> Result<Url, ProbeError> {
        if spec.query != "get" {
            return Err(params::unsupported_query(spec));
        }
        let raw = params::required_str(spec, "url")?;
        let url = if raw.contains("://") {
            Url::parse(raw)
        } else if let Some(base) = &self.base_url {
            base.join(raw)
        } else {
            return Err(ProbeError::InvalidParams(format!(
                "relative url `{raw}` requires a base_url"
            )));
        };
        let url = url.map_err(|err| ProbeError::InvalidParams(format!("invalid url: {err}")))?;
        validate_url(&url, &self.config)?;
        if let Some(host) = params::optional_str(spec, "host_header")? {
            params::argument("host_header", host)?;
        }
        Ok(url)
    }
}

impl Probe for HttpProbe {
    fn query(&self, spec: &ProbeSpec, _ctx: &ProbeContext) -> Result<Option<Value>, ProbeError> {
        let url = self.request_url(spec)?;
        let mut request = self.client.get(url.clone());
        if let Some(host) = params::optional_str(spec, "host_header")? {
            request = request.header(HOST, host);
        }
        let mut response = request.send().map_err(|err| classify_error(&err, self.config.timeout_ms))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = read_response_limited(&mut response, self.config.max_response_bytes)?;
        let body = decode_body(content_type.as_deref(), &body);
        Ok(Some(json!({
            "url": url.as_str(),
            "status": status,
            "content_type": content_type,
            "body": body,
        })))
    }

    fn validate(&self, spec: &ProbeSpec) -> Result<(), ProbeError> {
        self.request_url(spec).map(|_| ())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates URL scheme and allowlist policy.
fn validate_url(url: &Url, config: &HttpProbeConfig) -> Result<(), ProbeError> {
    match url.scheme() {
        "https" => {}
        "http" if config.allow_http => {}
        scheme => {
            return Err(ProbeError::InvalidParams(format!("url scheme `{scheme}` is not allowed")));
        }
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(ProbeError::InvalidParams("url credentials are not allowed".to_string()));
    }
    let host = url
        .host_str()
        .ok_or_else(|| ProbeError::InvalidParams("url host required".to_string()))?;
    if let Some(allowlist) = &config.allowed_hosts {
        let host = normalize_host_label(host);
        if !allowlist.iter().any(|entry| normalize_host_label(entry) == host) {
            return Err(ProbeError::InvalidParams(format!("url host `{host}` is not allowed")));
        }
    }
    Ok(())
}

/// Normalizes host labels for allowlist comparisons.
fn normalize_host_label(host: &str) -> String {
    let trimmed = host.trim_end_matches('.');
    let trimmed =
        trimmed.strip_prefix('[').and_then(|inner| inner.strip_suffix(']')).unwrap_or(trimmed);
    trimmed.to_ascii_lowercase()
}

/// Maps transport errors to probe errors.
fn classify_error(err: &reqwest::Error, timeout_ms: u64) -> ProbeError {
    if err.is_timeout() {
        ProbeError::TimedOut(timeout_ms)
    } else if err.is_connect() {
        ProbeError::Unreachable(format!("http connection failed: {err}"))
    } else {
        ProbeError::Failed(format!("http request failed: {err}"))
    }
}

/// Parses JSON bodies; everything else is returned as text.
fn decode_body(content_type: Option<&str>, body: &[u8]) -> Value {
    let is_json = content_type.is_some_and(|value| value.to_ascii_lowercase().contains("json"));
    if is_json && let Ok(value) = serde_json::from_slice::<Value>(body) {
        return value;
    }
    Value::String(String::from_utf8_lossy(body).into_owned())
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(response: &mut Response, max_bytes: usize) -> Result<Vec<u8>, ProbeError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| ProbeError::Failed("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(ProbeError::Malformed("http response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|err| ProbeError::Failed(format!("failed to read response: {err}")))?;
    if buf.len() > max_bytes {
        return Err(ProbeError::Malformed("http response exceeds size limit".to_string()));
    }
    Ok(buf)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
