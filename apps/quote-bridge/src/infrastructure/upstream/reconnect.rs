//! Reconnect Backoff Policy
//!
//! Linear backoff for the upstream connection loop: each failed
//! connect/read cycle increases the wait by one base step, capped at a
//! configurable ceiling. The attempt counter lives in
//! [`ConnectionStats`](super::stats::ConnectionStats) so the wait always
//! reflects consecutive failures since the last successful connect.

use std::time::Duration;

/// Linear backoff schedule: `min(base * attempts, max)`.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    base: Duration,
    max: Duration,
}

impl ReconnectPolicy {
    /// Create a policy with the given base step and ceiling.
    #[must_use]
    pub const fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay to wait before the next connect attempt.
    ///
    /// `attempts` is the number of consecutive failed cycles, starting at 1
    /// for the first failure. Zero attempts yields no delay.
    #[must_use]
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let scaled = self.base.saturating_mul(attempts);
        scaled.min(self.max)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_linearly() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(2), Duration::from_secs(10));
        assert_eq!(policy.delay_for(7), Duration::from_secs(35));
    }

    #[test]
    fn delay_caps_at_max() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(12), Duration::from_secs(60));
        assert_eq!(policy.delay_for(1000), Duration::from_secs(60));
    }

    #[test]
    fn zero_attempts_waits_nothing() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::ZERO);
    }

    #[test]
    fn custom_base_and_ceiling() {
        let policy = ReconnectPolicy::new(Duration::from_millis(250), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_millis(750));
        assert_eq!(policy.delay_for(9), Duration::from_secs(2));
    }

    #[test]
    fn overflow_saturates_to_ceiling() {
        let policy = ReconnectPolicy::new(Duration::from_secs(u64::MAX / 2), Duration::from_secs(60));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(60));
    }
}
