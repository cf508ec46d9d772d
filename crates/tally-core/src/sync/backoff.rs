//! Exponential backoff after rejected outbox items

use std::time::Duration;

/// `min(base * 2^retry_count, max)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
}

impl BackoffPolicy {
    pub const fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    pub const fn base(&self) -> Duration {
        self.base
    }

    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Delay to wait once an item has failed `retry_count` times
    pub fn delay(&self, retry_count: u32) -> Duration {
        let factor = 1u32.checked_shl(retry_count).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_millis(8_000))
    }
}
