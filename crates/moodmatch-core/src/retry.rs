//! Reconnection budget and backoff calculation.
//!
//! Sync-only building blocks; the async loop that uses them lives in
//! `moodmatch-realtime`.
//!
//! - [`RetryPolicy`]: attempt budget and backoff parameters
//! - [`backoff_delay_ms`]: linear backoff, capped

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Default attempt budget per supervisor run.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default per-attempt backoff step in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
/// Default backoff ceiling in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

/// Retry budget and backoff for the reconnection supervisor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Attempts allowed before giving up (default: 5).
    pub max_attempts: u32,
    /// Delay added per failed attempt in ms (default: 1000).
    pub base_delay_ms: u64,
    /// Maximum delay between attempts in ms (default: 10000).
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// Whether `attempt` (0-based count of failures so far) is past the budget.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }

    /// Delay to wait after the `attempt`-th failure (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(backoff_delay_ms(
            attempt,
            self.base_delay_ms,
            self.max_delay_ms,
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backoff calculation
// ─────────────────────────────────────────────────────────────────────────────

/// Linear backoff: `min(base_delay_ms * attempt, max_delay_ms)`.
///
/// `attempt` is 1-based (the number of failures so far). Saturates instead of
/// overflowing for large attempt counts.
#[must_use]
pub fn backoff_delay_ms(attempt: u32, base_delay_ms: u64, max_delay_ms: u64) -> u64 {
    base_delay_ms
        .saturating_mul(u64::from(attempt))
        .min(max_delay_ms)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay_ms, 1000);
        assert_eq!(policy.max_delay_ms, 10_000);
    }

    #[test]
    fn policy_serde_defaults() {
        let policy: RetryPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy, RetryPolicy::default());
        let partial: RetryPolicy = serde_json::from_str(r#"{"maxAttempts":2}"#).unwrap();
        assert_eq!(partial.max_attempts, 2);
        assert_eq!(partial.base_delay_ms, 1000);
    }

    #[test]
    fn backoff_is_linear_then_capped() {
        let delays: Vec<u64> = (1..=12)
            .map(|n| backoff_delay_ms(n, 1000, 10_000))
            .collect();
        assert_eq!(
            delays,
            vec![
                1000, 2000, 3000, 4000, 5000, 6000, 7000, 8000, 9000, 10_000, 10_000, 10_000
            ]
        );
    }

    #[test]
    fn backoff_zero_attempt_is_zero() {
        assert_eq!(backoff_delay_ms(0, 1000, 10_000), 0);
    }

    #[test]
    fn backoff_high_attempt_no_overflow() {
        assert_eq!(backoff_delay_ms(u32::MAX, u64::MAX / 2, 10_000), 10_000);
    }

    #[test]
    fn exhaustion_boundary() {
        let policy = RetryPolicy::default();
        assert!(!policy.is_exhausted(4));
        assert!(policy.is_exhausted(5));
        assert!(policy.is_exhausted(6));
    }

    #[test]
    fn delay_for_matches_formula() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(3), Duration::from_millis(3000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(10_000));
    }

    proptest! {
        #[test]
        fn backoff_never_exceeds_cap(attempt in 0u32..10_000, base in 0u64..100_000, cap in 0u64..1_000_000) {
            prop_assert!(backoff_delay_ms(attempt, base, cap) <= cap);
        }

        #[test]
        fn backoff_is_monotonic(attempt in 1u32..1000, base in 0u64..100_000, cap in 0u64..1_000_000) {
            prop_assert!(backoff_delay_ms(attempt, base, cap) <= backoff_delay_ms(attempt + 1, base, cap));
        }
    }
}
