//! Durable key-value storage for per-user collections
//!
//! Every collection Tally persists (the materialized transaction list and the
//! outbox) is a single JSON value under a per-user key. Backends only need to
//! get, set and delete whole values.

mod fallback;
mod json_file;
mod memory;
mod migrations;
mod sqlite;

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;

pub use fallback::FallbackStore;
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// File name of the primary `SQLite` store inside the data directory
pub const DATABASE_FILE_NAME: &str = "tally.db";
/// Directory of the JSON-file fallback store inside the data directory
pub const FALLBACK_DIR_NAME: &str = "kv";

/// Trait for whole-value key-value storage
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` if it was never written
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the value stored under `key`
    fn set(&self, key: &str, value: &Value) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    fn delete(&self, key: &str) -> Result<()>;
}

/// Per-user key layout.
pub mod keys {
    /// Key of the materialized transaction list for `user_id`
    pub fn transactions(user_id: &str) -> String {
        format!("transactions:{user_id}")
    }

    /// Key of the pending-mutation outbox for `user_id`
    pub fn outbox(user_id: &str) -> String {
        format!("outbox:{user_id}")
    }
}

/// Open the standard local store for a data directory.
///
/// Tries the `SQLite` database first. If it cannot be opened the JSON-file
/// store under the same directory takes over for the whole session; either
/// way per-operation failures of the primary still fall back.
pub fn open_local_store(data_dir: impl AsRef<Path>) -> Result<FallbackStore> {
    let data_dir = data_dir.as_ref();
    let secondary: Arc<dyn KeyValueStore> =
        Arc::new(JsonFileStore::open(data_dir.join(FALLBACK_DIR_NAME))?);

    let primary: Option<Arc<dyn KeyValueStore>> =
        match SqliteStore::open(data_dir.join(DATABASE_FILE_NAME)) {
            Ok(store) => Some(Arc::new(store)),
            Err(error) => {
                tracing::warn!(
                    "Primary store at {} unavailable, using JSON files: {}",
                    data_dir.display(),
                    error
                );
                None
            }
        };

    Ok(FallbackStore::new(primary, secondary))
}
