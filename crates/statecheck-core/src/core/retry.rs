// crates/statecheck-core/src/core/retry.rs
// ============================================================================
// Module: Statecheck Retry Policy
// Description: Bounded retry and exponential backoff parameters for probes.
// Purpose: Replace ad hoc sleep loops with an explicit, testable policy object.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! A [`RetryPolicy`] bounds how often a transient probe error is retried and
//! how long the executor waits in between. Delays are computed here and slept
//! through the injected clock so tests can observe them without waiting.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 1;
/// Default delay before the first retry.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(250);
/// Default multiplier applied per retry.
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;
/// Default ceiling on any single delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(5);

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Bounded retry policy for transient probe errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub backoff: Duration,
    /// Multiplier applied to the delay for each later retry.
    pub multiplier: u32,
    /// Ceiling on any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: DEFAULT_BACKOFF,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
            multiplier: 1,
            max_backoff: Duration::ZERO,
        }
    }

    /// Total attempts allowed, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = self.multiplier.max(1).checked_pow(retry - 1).unwrap_or(u32::MAX);
        self.backoff.checked_mul(factor).unwrap_or(self.max_backoff).min(self.max_backoff)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
