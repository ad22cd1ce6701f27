use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upload retry and last-question wait policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts (including the first) before an upload is abandoned
    pub max_attempts: u32,

    /// Backoff before the first retry
    pub base_delay_ms: u64,

    /// Backoff ceiling
    pub max_delay_ms: u64,

    /// How long the last question's upload is awaited before falling back to the retry queue
    pub last_upload_timeout_ms: u64,

    /// How long completion waits for the retry queue to empty
    pub last_question_wait_ms: u64,

    /// Retry queue polling interval during that wait
    pub poll_interval_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 5000,
            last_upload_timeout_ms: 5000,
            last_question_wait_ms: 10_000,
            poll_interval_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying a task that has failed `attempts` times (1-indexed)
    ///
    /// `min(base * 2^(attempts-1), max)`
    pub fn backoff_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(32);
        let ms = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    pub fn exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }

    pub fn last_upload_timeout(&self) -> Duration {
        Duration::from_millis(self.last_upload_timeout_ms)
    }

    pub fn last_question_wait(&self) -> Duration {
        Duration::from_millis(self.last_question_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(2000));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(4000));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(5000));
        assert_eq!(policy.backoff_delay(40), Duration::from_millis(5000));
    }

    #[test]
    fn third_attempt_exhausts() {
        let policy = RetryPolicy::default();
        assert!(!policy.exhausted(2));
        assert!(policy.exhausted(3));
    }
}
