//! Sync state published to clients.

use serde::Serialize;

/// Where a user's outbox stands, as shown by status indicators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// The connectivity port reports no network
    Offline,
    /// A drain pass is running
    Syncing,
    /// The last pass emptied the queue
    Synced,
    /// The last pass left a failed item behind or hit a storage error
    Error,
}

impl SyncState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
