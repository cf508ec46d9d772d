//! Per-user outbox of mutations waiting for the remote store
//!
//! The queue is stored as one JSON array per user. Every operation reads the
//! whole list, changes it and writes it back, so callers must hold the user's
//! [`UserLocks`](crate::sync::UserLocks) guard when more than one task can
//! touch the same queue.

use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::models::{NewOutboxItem, OutboxItem, OutboxItemPatch};
use crate::store::{keys, KeyValueStore};

/// FIFO queue of pending mutations built on a [`KeyValueStore`]
#[derive(Clone)]
pub struct OutboxQueue {
    store: Arc<dyn KeyValueStore>,
}

impl OutboxQueue {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Append a mutation and return the stored entry
    pub fn enqueue(&self, user_id: &str, new_item: NewOutboxItem) -> Result<OutboxItem> {
        let item = OutboxItem::from_new(new_item);
        let mut items = self.list(user_id)?;
        items.push(item.clone());
        self.write(user_id, &items)?;

        tracing::debug!(
            "Queued {} for {} ({} pending)",
            item.kind.as_str(),
            item.entity_id,
            items.len()
        );
        Ok(item)
    }

    /// All pending entries in insertion order
    pub fn list(&self, user_id: &str) -> Result<Vec<OutboxItem>> {
        match self.store.get(&keys::outbox(user_id))? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn size(&self, user_id: &str) -> Result<usize> {
        Ok(self.list(user_id)?.len())
    }

    /// Merge `patch` into the entry with `item_id`; missing entries are ignored
    pub fn update(&self, user_id: &str, item_id: &str, patch: OutboxItemPatch) -> Result<()> {
        let mut items = self.list(user_id)?;
        let Some(item) = items.iter_mut().find(|item| item.id == item_id) else {
            return Ok(());
        };
        item.apply_patch(&patch);
        self.write(user_id, &items)
    }

    /// Drop the entry with `item_id`; missing entries are ignored
    pub fn remove(&self, user_id: &str, item_id: &str) -> Result<()> {
        let mut items = self.list(user_id)?;
        let before = items.len();
        items.retain(|item| item.id != item_id);
        if items.len() == before {
            return Ok(());
        }
        self.write(user_id, &items)
    }

    /// Empty the queue (logout, data reset)
    pub fn clear(&self, user_id: &str) -> Result<()> {
        self.write(user_id, &[])
    }

    fn write(&self, user_id: &str, items: &[OutboxItem]) -> Result<()> {
        let value: Value = serde_json::to_value(items)?;
        self.store.set(&keys::outbox(user_id), &value)
    }
}
