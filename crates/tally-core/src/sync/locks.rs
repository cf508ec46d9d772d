//! Per-user async locks
//!
//! The outbox and record collections are rewritten whole on every change, so
//! two tasks touching the same user at once can lose writes. Everything that
//! mutates a user's collections takes that user's lock first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry handing out one async mutex per user id
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`'s collections
    pub async fn lock(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(user_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
