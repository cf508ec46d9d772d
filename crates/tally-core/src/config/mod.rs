//! Sync engine settings shared by every client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sync::BackoffPolicy;

const DEFAULT_BACKOFF_BASE_MS: u64 = 500;
const DEFAULT_BACKOFF_MAX_MS: u64 = 8_000;
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;

/// Tunables of the outbox drain.
///
/// Every field has a default so partial JSON config files stay valid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncSettings {
    /// Backoff after the first rejected item, doubled per retry
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Upper bound of the backoff delay
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    /// Periodic drain interval for background workers; `None` disables the timer
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: Option<u64>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            sync_interval_secs: default_sync_interval_secs(),
        }
    }
}

impl SyncSettings {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.backoff_max_ms.max(self.backoff_base_ms)),
        )
    }

    /// Interval of the periodic drain, `None` when disabled or zero
    pub fn sync_interval(&self) -> Option<Duration> {
        self.sync_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

const fn default_backoff_base_ms() -> u64 {
    DEFAULT_BACKOFF_BASE_MS
}

const fn default_backoff_max_ms() -> u64 {
    DEFAULT_BACKOFF_MAX_MS
}

#[allow(clippy::unnecessary_wraps)]
const fn default_sync_interval_secs() -> Option<u64> {
    Some(DEFAULT_SYNC_INTERVAL_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_backoff() {
        let settings = SyncSettings::default();
        let backoff = settings.backoff();
        assert_eq!(backoff.base(), Duration::from_millis(500));
        assert_eq!(backoff.max(), Duration::from_millis(8_000));
        assert_eq!(settings.sync_interval(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings: SyncSettings = serde_json::from_str(r#"{"backoff_base_ms": 100}"#).unwrap();
        assert_eq!(settings.backoff_base_ms, 100);
        assert_eq!(settings.backoff_max_ms, 8_000);
        assert_eq!(settings.sync_interval_secs, Some(60));
    }

    #[test]
    fn zero_or_null_interval_disables_timer() {
        let settings: SyncSettings =
            serde_json::from_str(r#"{"sync_interval_secs": null}"#).unwrap();
        assert_eq!(settings.sync_interval(), None);

        let settings = SyncSettings {
            sync_interval_secs: Some(0),
            ..SyncSettings::default()
        };
        assert_eq!(settings.sync_interval(), None);
    }

    #[test]
    fn max_never_below_base() {
        let settings = SyncSettings {
            backoff_base_ms: 2_000,
            backoff_max_ms: 10,
            ..SyncSettings::default()
        };
        assert_eq!(settings.backoff().max(), Duration::from_millis(2_000));
    }
}
