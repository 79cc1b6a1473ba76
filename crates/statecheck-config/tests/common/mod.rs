// crates/statecheck-config/tests/common/mod.rs
// ============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config integration tests.
// Purpose: Reduce duplication across statecheck-config suites.
// ============================================================================

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::io::Write;

use statecheck_config::ConfigError;
use statecheck_config::VerifierConfig;
use tempfile::NamedTempFile;

pub type TestResult = Result<(), String>;

/// Asserts that a load result failed with a message containing `needle`.
pub fn assert_invalid(result: Result<VerifierConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

/// Writes `content` to a temporary config file.
pub fn config_file(content: &[u8]) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(content).map_err(|err| err.to_string())?;
    Ok(file)
}
