//! Outbox item model

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::util::now_rfc3339;

use super::Transaction;

/// Kind of mutation carried by an outbox item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// A mutation waiting to be applied to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxItem {
    /// Identifier of the queue entry itself
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MutationKind,
    /// Id of the record this mutation targets
    pub entity_id: String,
    /// Record fields to apply; only `id` is needed for deletes
    pub payload: Value,
    /// Enqueue time (RFC 3339)
    pub created_at: String,
    /// Failed application attempts so far
    #[serde(default)]
    pub retry_count: u32,
}

impl OutboxItem {
    /// Materialize a queue entry with a fresh id and `retry_count = 0`.
    #[must_use]
    pub fn from_new(new: NewOutboxItem) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            kind: new.kind,
            entity_id: new.entity_id,
            payload: new.payload,
            created_at: now_rfc3339(),
            retry_count: 0,
        }
    }

    /// Merge patch fields into this item.
    pub fn apply_patch(&mut self, patch: &OutboxItemPatch) {
        if let Some(retry_count) = patch.retry_count {
            self.retry_count = retry_count;
        }
    }
}

/// Fields supplied by the caller when enqueueing a mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOutboxItem {
    pub kind: MutationKind,
    pub entity_id: String,
    pub payload: Value,
}

impl NewOutboxItem {
    pub fn create(record: &Transaction) -> serde_json::Result<Self> {
        Ok(Self {
            kind: MutationKind::Create,
            entity_id: record.id.clone(),
            payload: record.to_payload()?,
        })
    }

    pub fn update(record: &Transaction) -> serde_json::Result<Self> {
        Ok(Self {
            kind: MutationKind::Update,
            entity_id: record.id.clone(),
            payload: record.to_payload()?,
        })
    }

    pub fn delete(entity_id: impl Into<String>) -> Self {
        let entity_id = entity_id.into();
        Self {
            kind: MutationKind::Delete,
            payload: json!({ "id": entity_id }),
            entity_id,
        }
    }
}

/// Partial update for an outbox item. `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutboxItemPatch {
    pub retry_count: Option<u32>,
}

impl OutboxItemPatch {
    pub const fn retry_count(retry_count: u32) -> Self {
        Self {
            retry_count: Some(retry_count),
        }
    }
}
