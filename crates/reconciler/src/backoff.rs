//! Exponential backoff for transient failures.

use std::time::Duration;

/// Bounded exponential backoff: `min(base * 2^attempt, max)`.
///
/// `attempt` is the number of failures already recorded before the current
/// one, so the first failure waits `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(300))
    }
}

impl BackoffPolicy {
    #[must_use]
    pub const fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    #[must_use]
    pub const fn base(&self) -> Duration {
        self.base
    }

    #[must_use]
    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Delay before the retry following `attempt` earlier failures.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        2_u32
            .checked_pow(attempt)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_until_cap() {
        let policy = BackoffPolicy::default();
        let delays: Vec<u64> = (0..8).map(|n| policy.delay_for(n).as_secs()).collect();
        assert_eq!(delays, vec![5, 10, 20, 40, 80, 160, 300, 300]);
    }

    #[test]
    fn test_huge_attempt_saturates_to_cap() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(40), Duration::from_secs(300));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(300));
    }

    #[test]
    fn test_never_exceeds_cap() {
        let policy = BackoffPolicy::new(Duration::from_millis(700), Duration::from_secs(3));
        for attempt in 0..64 {
            assert!(policy.delay_for(attempt) <= Duration::from_secs(3));
        }
    }
}
