// crates/statecheck-probes/src/command.rs
// ============================================================================
// Module: Command Runner
// Description: Seam for invoking cluster CLIs and classifying their failures.
// Purpose: Let cluster probes run `kubectl` and `helm` without binding tests to them.
// Dependencies: statecheck-core
// ============================================================================

//! ## Overview
//! Cluster probes shell out through [`CommandRunner`]. The system runner uses
//! [`std::process::Command`] with arguments passed as a vector, never through
//! a shell. Captured output is bounded; failures are classified from stderr
//! into "not found", "unreachable", and generic failures.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::ErrorKind;
use std::process::Command;
use std::process::Stdio;

use serde_json::Value;
use statecheck_core::ProbeError;

use crate::registry::ProbeSetupError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Captured result of one command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Whether the command exited with status zero.
    pub success: bool,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given stderr.
    #[must_use]
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }
}

/// Invokes an external program with an argument vector.
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args` and captures its output.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] when the program cannot be started or its
    /// output exceeds the configured limit.
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ProbeError>;
}

/// Runner backed by [`std::process::Command`].
#[derive(Debug, Clone, Copy)]
pub struct SystemCommandRunner {
    /// Maximum stdout bytes accepted.
    max_output_bytes: usize,
}

impl SystemCommandRunner {
    /// Creates a runner with an output limit.
    #[must_use]
    pub const fn new(max_output_bytes: usize) -> Self {
        Self {
            max_output_bytes,
        }
    }
}

impl Default for SystemCommandRunner {
    fn default() -> Self {
        Self::new(8 * 1024 * 1024)
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ProbeError> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => ProbeError::Failed(format!("command not found: {program}")),
                _ => ProbeError::Failed(format!("unable to run {program}: {err}")),
            })?;
        if output.stdout.len() > self.max_output_bytes {
            return Err(ProbeError::Malformed(format!("{program} output exceeds size limit")));
        }
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

// ============================================================================
// SECTION: Failure Classification
// ============================================================================

/// Stderr markers of an API server that cannot be reached.
const UNREACHABLE_MARKERS: &[&str] = &[
    "unable to connect to the server",
    "connection refused",
    "i/o timeout",
    "no such host",
    "tls handshake timeout",
    "kubernetes cluster unreachable",
    "the server is currently unable to handle the request",
];

/// Classified command failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The queried object does not exist.
    NotFound,
    /// Any other failure.
    Error(ProbeError),
}

/// Classifies a failed invocation from its stderr.
#[must_use]
pub fn classify_failure(program: &str, stderr: &str) -> Failure {
    let lowered = stderr.to_ascii_lowercase();
    if UNREACHABLE_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return Failure::Error(ProbeError::Unreachable(first_line(stderr)));
    }
    if lowered.lines().any(names_missing_object) {
        return Failure::NotFound;
    }
    let detail = first_line(stderr);
    if detail.is_empty() {
        Failure::Error(ProbeError::Failed(format!("{program} exited with an error")))
    } else {
        Failure::Error(ProbeError::Failed(detail))
    }
}

/// Matches a lowercased stderr line reporting a missing named object.
///
/// Kubectl reports `(NotFound): <kind> "<name>" not found`; helm reports
/// `release: not found`. A missing resource type or API group
/// (`could not find the requested resource`) is not a missing object.
fn names_missing_object(line: &str) -> bool {
    let line = line.trim_end();
    (line.contains("(notfound)") && line.ends_with("\" not found")) || line.ends_with("release: not found")
}

/// Parses command stdout as JSON; blank output means no data.
///
/// # Errors
///
/// Returns [`ProbeError::Malformed`] when stdout is not valid JSON.
pub fn parse_json_output(program: &str, stdout: &[u8]) -> Result<Option<Value>, ProbeError> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(stdout)
        .map(Some)
        .map_err(|err| ProbeError::Malformed(format!("{program} returned invalid json: {err}")))
}

/// Runs a command and parses its JSON output; "not found" failures mean no data.
///
/// # Errors
///
/// Returns [`ProbeError`] when the command cannot run, fails for any other
/// reason, or prints invalid JSON.
pub fn run_json(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[String],
) -> Result<Option<Value>, ProbeError> {
    let output = runner.run(program, args)?;
    if output.success {
        return parse_json_output(program, &output.stdout);
    }
    match classify_failure(program, &output.stderr) {
        Failure::NotFound => Ok(None),
        Failure::Error(err) => Err(err),
    }
}

/// Splits a configured command into its program and leading arguments.
///
/// # Errors
///
/// Returns [`ProbeSetupError::InvalidConfig`] when the command is empty.
pub fn split_command<'a>(
    probe: &str,
    command: &'a [String],
) -> Result<(&'a str, &'a [String]), ProbeSetupError> {
    match command.split_first() {
        Some((program, prefix)) if !program.trim().is_empty() => Ok((program.as_str(), prefix)),
        _ => Err(ProbeSetupError::InvalidConfig {
            probe: probe.to_string(),
            reason: "command must not be empty".to_string(),
        }),
    }
}

/// First non-empty line of a message, trimmed.
fn first_line(message: &str) -> String {
    message.lines().map(str::trim).find(|line| !line.is_empty()).unwrap_or_default().to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::*;

    #[test]
    fn not_found_is_classified_as_missing() {
        let stderr = "Error from server (NotFound): namespaces \"observability\" not found\n";
        assert_eq!(classify_failure("kubectl", stderr), Failure::NotFound);
        assert_eq!(classify_failure("helm", "Error: release: not found"), Failure::NotFound);
    }

    #[test]
    fn missing_resource_types_are_failures() {
        for stderr in [
            "Error from server (NotFound): the server could not find the requested resource",
            "error: the server doesn't have a resource type \"grafanadashboards\"",
            "Error: plugin \"diff\" not found",
        ] {
            match classify_failure("kubectl", stderr) {
                Failure::Error(ProbeError::Failed(detail)) => assert_eq!(detail, stderr),
                other => panic!("unexpected classification: {other:?}"),
            }
        }
    }

    #[test]
    fn connection_failures_are_unreachable() {
        let stderr = "The connection to the server 127.0.0.1:16443 was refused - did you \
                      specify the right host or port?\nUnable to connect to the server: dial tcp";
        match classify_failure("kubectl", stderr) {
            Failure::Error(ProbeError::Unreachable(detail)) => {
                assert!(detail.starts_with("The connection"));
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn other_failures_keep_their_first_line() {
        let failure = classify_failure("kubectl", "\n error: forbidden\nmore detail");
        assert_eq!(failure, Failure::Error(ProbeError::Failed("error: forbidden".to_string())));
        let failure = classify_failure("helm", "");
        assert_eq!(
            failure,
            Failure::Error(ProbeError::Failed("helm exited with an error".to_string()))
        );
    }

    #[test]
    fn blank_output_means_no_data() {
        assert_eq!(parse_json_output("kubectl", b"  \n").unwrap(), None);
        assert!(matches!(parse_json_output("kubectl", b"{"), Err(ProbeError::Malformed(_))));
    }

    #[test]
    fn command_prefix_is_split_from_program() {
        let command = vec!["microk8s".to_string(), "kubectl".to_string()];
        let (program, prefix) = split_command("kubernetes", &command).unwrap();
        assert_eq!(program, "microk8s");
        assert_eq!(prefix, ["kubectl".to_string()]);
        assert!(split_command("kubernetes", &[]).is_err());
    }
}
