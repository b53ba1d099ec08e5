//! Retry budget and backoff schedule

use std::time::Duration;

use serde::Deserialize;

/// How many times and how long to wait before retrying transient failures.
///
/// The delay before the k-th retry (k starting at 1) is
/// `min(base_delay_ms * 2^k, max_delay_ms)`: with the defaults 2s, 4s, 5s, 5s.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries allowed when the request does not override it.
    pub max_retry_count: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry_count: 3,
            base_delay_ms: 1000,
            max_delay_ms: 5000,
        }
    }
}

impl RetryPolicy {
    /// Retry budget for a request, honouring its override.
    pub fn effective_max(&self, request_override: Option<u32>) -> u32 {
        request_override.unwrap_or(self.max_retry_count)
    }

    /// Delay before retry number `retry` (1-based, counted after increment).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u64.checked_pow(retry).unwrap_or(u64::MAX);
        let delay_ms = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_starts_at_two_seconds_and_caps_at_five() {
        let policy = RetryPolicy::default();
        let delays: Vec<u128> = (1..=5).map(|k| policy.backoff(k).as_millis()).collect();
        assert_eq!(delays, vec![2000, 4000, 5000, 5000, 5000]);
    }

    #[test]
    fn backoff_matches_formula() {
        let policy = RetryPolicy::default();
        for k in 0..10u32 {
            let expected = (1000u64 * 2u64.pow(k)).min(5000);
            assert_eq!(policy.backoff(k), Duration::from_millis(expected), "retry {k}");
        }
    }

    #[test]
    fn huge_retry_numbers_saturate() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(200), Duration::from_millis(5000));
    }

    #[test]
    fn request_override_wins() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.effective_max(None), 3);
        assert_eq!(policy.effective_max(Some(0)), 0);
        assert_eq!(policy.effective_max(Some(7)), 7);
    }

    #[test]
    fn deserializes_with_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"max_retry_count": 5}"#).unwrap();
        assert_eq!(policy.max_retry_count, 5);
        assert_eq!(policy.base_delay_ms, 1000);
        assert_eq!(policy.max_delay_ms, 5000);
    }
}
