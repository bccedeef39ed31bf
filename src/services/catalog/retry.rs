//! Retry policy for catalog GET requests.
//!
//! The policy is built once when the client is created and never mutated, so
//! one instance is shared freely across concurrent requests.

use std::collections::BTreeSet;
use std::time::Duration;

/// Statuses that indicate a transient upstream condition
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Configuration for upstream retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included. Never below 1.
    pub max_attempts: u32,
    /// HTTP statuses that trigger another attempt
    pub retryable_statuses: BTreeSet<u16>,
    /// Wait before the first retry; doubles on each subsequent retry
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.into_iter().collect(),
            backoff_base,
        }
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Delay after the given failed attempt (1-based): `base * 2^(attempt-1)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(multiplier)
    }

    /// Whether another attempt is allowed after `attempt` failed
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Longest one call can take when every attempt runs into `timeout`
    pub fn worst_case(&self, timeout: Duration) -> Duration {
        let attempts = self.max_attempts.max(1);
        (1..attempts).fold(timeout.saturating_mul(attempts), |total, attempt| {
            total.saturating_add(self.delay_for(attempt))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff_base, Duration::from_secs(1));
        for status in [429, 500, 502, 503, 504] {
            assert!(policy.is_retryable_status(status), "{} should retry", status);
        }
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        let policy = RetryPolicy::default();
        for status in [400, 401, 403, 404, 422, 501] {
            assert!(!policy.is_retryable_status(status));
        }
    }

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert_eq!(policy.delay_for(64), Duration::from_secs(1).saturating_mul(u32::MAX));
    }

    #[test]
    fn test_attempt_budget() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        assert!(policy.allows_retry_after(1));
        assert!(policy.allows_retry_after(2));
        assert!(!policy.allows_retry_after(3));
    }

    #[test]
    fn test_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[test]
    fn test_worst_case_adds_timeouts_and_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.worst_case(Duration::from_secs(10)), Duration::from_secs(33));

        let single = RetryPolicy::new(1, Duration::from_secs(1));
        assert_eq!(single.worst_case(Duration::from_secs(10)), Duration::from_secs(10));
    }
}
