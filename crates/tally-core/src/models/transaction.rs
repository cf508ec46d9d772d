//! Transaction model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::util::{now_rfc3339, parse_timestamp_millis};

/// A unique identifier for a transaction, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Create a new unique transaction ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A financial transaction, the versioned record kept in sync.
///
/// Only `id`, `created_at` and `updated_at` matter to the sync machinery; the
/// remaining fields are domain payload. Fields this version does not know
/// about are kept in `extra` so records written by newer clients survive a
/// round-trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Stable identifier, never reassigned
    pub id: String,
    /// Booking date (`YYYY-MM-DD`), used for display ordering
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Creation timestamp (ISO-8601)
    pub created_at: String,
    /// Last update timestamp (ISO-8601), the version marker when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Transaction {
    /// The timestamp that versions this record: `updated_at`, else `created_at`.
    pub fn version_stamp(&self) -> &str {
        self.updated_at.as_deref().unwrap_or(&self.created_at)
    }

    /// Numeric version in Unix milliseconds.
    ///
    /// Unparsable or pre-epoch stamps resolve to `0`, the oldest possible
    /// version. Never fails.
    pub fn version(&self) -> i64 {
        parse_timestamp_millis(self.version_stamp()).map_or(0, |millis| millis.max(0))
    }

    /// Booking date in Unix milliseconds, `None` when unparsable.
    pub fn date_millis(&self) -> Option<i64> {
        parse_timestamp_millis(&self.date)
    }

    /// Mark the record as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Some(now_rfc3339());
    }

    /// Serialize into the JSON payload carried by an outbox item.
    pub fn to_payload(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Decode a record from an outbox payload.
    pub fn from_payload(payload: &Value) -> serde_json::Result<Self> {
        Self::deserialize(payload)
    }
}

/// Input for a transaction that does not exist yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub date: String,
    pub description: String,
    pub amount: f64,
    pub category: Option<String>,
}

impl NewTransaction {
    /// Assign an id and creation time.
    #[must_use]
    pub fn into_transaction(self) -> Transaction {
        Transaction {
            id: TransactionId::new().to_string(),
            date: self.date,
            description: self.description,
            amount: self.amount,
            category: self.category,
            created_at: now_rfc3339(),
            updated_at: None,
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(created_at: &str, updated_at: Option<&str>) -> Transaction {
        Transaction {
            id: "t-1".to_string(),
            date: "2024-01-01".to_string(),
            description: "Coffee".to_string(),
            amount: -3.5,
            category: None,
            created_at: created_at.to_string(),
            updated_at: updated_at.map(str::to_string),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_transaction_id_unique() {
        assert_ne!(TransactionId::new(), TransactionId::new());
    }

    #[test]
    fn test_transaction_id_parse() {
        let id = TransactionId::new();
        let parsed: TransactionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_version_prefers_updated_at() {
        let tx = record("1970-01-01T00:00:01Z", Some("1970-01-01T00:00:02Z"));
        assert_eq!(tx.version(), 2_000);

        let tx = record("1970-01-01T00:00:01Z", None);
        assert_eq!(tx.version(), 1_000);
    }

    #[test]
    fn test_version_unparsable_is_oldest() {
        assert_eq!(record("not a date", None).version(), 0);
        assert_eq!(record("1970-01-01T00:00:01Z", Some("garbage")).version(), 0);
        assert_eq!(record("1969-12-31T00:00:00Z", None).version(), 0);
    }

    #[test]
    fn test_serde_uses_camel_case_and_keeps_unknown_fields() {
        let raw = json!({
            "id": "abc",
            "date": "2024-02-03",
            "description": "Rent",
            "amount": -1200.0,
            "category": "housing",
            "createdAt": "2024-02-03T08:00:00Z",
            "updatedAt": "2024-02-04T08:00:00Z",
            "accountId": "checking"
        });

        let tx: Transaction = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(tx.updated_at.as_deref(), Some("2024-02-04T08:00:00Z"));
        assert_eq!(tx.extra.get("accountId"), Some(&json!("checking")));
        assert_eq!(serde_json::to_value(&tx).unwrap(), raw);
    }

    #[test]
    fn test_new_transaction_assigns_identity() {
        let tx = NewTransaction {
            date: "2024-05-01".to_string(),
            description: "Salary".to_string(),
            amount: 3000.0,
            category: Some("income".to_string()),
        }
        .into_transaction();

        assert!(tx.id.parse::<TransactionId>().is_ok());
        assert!(tx.updated_at.is_none());
        assert!(tx.version() > 0);
    }

    #[test]
    fn test_touch_advances_version() {
        let mut tx = record("2000-01-01T00:00:00Z", None);
        let before = tx.version();
        tx.touch();
        assert!(tx.version() > before);
    }
}
