//! Materialized local transaction set

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{MutationKind, NewOutboxItem, Transaction};
use crate::store::{keys, KeyValueStore};

/// The per-user transaction list the UI reads from
#[derive(Clone)]
pub struct LocalRecords {
    store: Arc<dyn KeyValueStore>,
}

impl LocalRecords {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored records, empty when nothing was written yet
    pub fn load(&self, user_id: &str) -> Result<Vec<Transaction>> {
        match self.store.get(&keys::transactions(user_id))? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn save(&self, user_id: &str, records: &[Transaction]) -> Result<()> {
        let value = serde_json::to_value(records)?;
        self.store.set(&keys::transactions(user_id), &value)
    }

    /// Apply a mutation to the local view without waiting for the remote
    pub fn apply(&self, user_id: &str, mutation: &NewOutboxItem) -> Result<()> {
        let mut records = self.load(user_id)?;

        match mutation.kind {
            MutationKind::Create | MutationKind::Update => {
                let record = Transaction::from_payload(&mutation.payload).map_err(|error| {
                    Error::InvalidInput(format!(
                        "{} payload for {} is not a transaction: {error}",
                        mutation.kind.as_str(),
                        mutation.entity_id
                    ))
                })?;
                match records.iter_mut().find(|existing| existing.id == record.id) {
                    Some(existing) => *existing = record,
                    None => records.push(record),
                }
            }
            MutationKind::Delete => {
                records.retain(|existing| existing.id != mutation.entity_id);
            }
        }

        self.save(user_id, &records)
    }

    pub fn clear(&self, user_id: &str) -> Result<()> {
        self.store.delete(&keys::transactions(user_id))
    }
}
