//! Test doubles shared by the unit tests of several modules.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::Transaction;
use crate::remote::{RemoteError, RemoteRecordApi, RemoteResult};
use crate::store::{KeyValueStore, MemoryStore};

/// Store whose every operation fails.
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<Value>> {
        Err(Error::Storage("backend unavailable".to_string()))
    }

    fn set(&self, _key: &str, _value: &Value) -> Result<()> {
        Err(Error::Storage("backend unavailable".to_string()))
    }

    fn delete(&self, _key: &str) -> Result<()> {
        Err(Error::Storage("backend unavailable".to_string()))
    }
}

/// Memory store that fails some writes and then behaves normally.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing_sets: AtomicUsize,
    failing_prefix: Option<String>,
}

impl FlakyStore {
    /// Fail the first `count` writes, whatever the key.
    pub fn failing_first_sets(count: usize) -> Self {
        Self {
            failing_sets: AtomicUsize::new(count),
            ..Self::default()
        }
    }

    /// Fail every write to a key starting with `prefix`.
    pub fn failing_keys(prefix: &str) -> Self {
        Self {
            failing_prefix: Some(prefix.to_string()),
            ..Self::default()
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn should_fail(&self, key: &str) -> bool {
        if self
            .failing_prefix
            .as_deref()
            .is_some_and(|prefix| key.starts_with(prefix))
        {
            return true;
        }
        self.failing_sets
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        if self.should_fail(key) {
            return Err(Error::Storage("write failed".to_string()));
        }
        self.inner.set(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Upsert(String),
    Delete(String),
    FetchAll(String),
}

/// In-memory remote that records every call and can be told to fail.
#[derive(Default)]
pub struct RecordingRemote {
    records: Mutex<BTreeMap<(String, String), Transaction>>,
    calls: Mutex<Vec<RemoteCall>>,
    outcomes: Mutex<VecDeque<Option<RemoteError>>>,
}

impl RecordingRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next unscripted call to fail with `error`.
    pub fn fail_next(&self, error: RemoteError) {
        self.outcomes.lock().unwrap().push_back(Some(error));
    }

    /// Script the next unscripted call to succeed.
    pub fn succeed_next(&self) {
        self.outcomes.lock().unwrap().push_back(None);
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn record(&self, user_id: &str, id: &str) -> Option<Transaction> {
        self.records
            .lock()
            .unwrap()
            .get(&(user_id.to_string(), id.to_string()))
            .cloned()
    }

    pub fn seed(&self, user_id: &str, records: Vec<Transaction>) {
        let mut stored = self.records.lock().unwrap();
        for record in records {
            stored.insert((user_id.to_string(), record.id.clone()), record);
        }
    }

    fn begin(&self, call: RemoteCall) -> RemoteResult<()> {
        self.calls.lock().unwrap().push(call);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .flatten()
            .map_or(Ok(()), Err)
    }
}

#[async_trait]
impl RemoteRecordApi for RecordingRemote {
    async fn upsert(&self, user_id: &str, record: &Transaction) -> RemoteResult<()> {
        self.begin(RemoteCall::Upsert(record.id.clone()))?;
        self.records
            .lock()
            .unwrap()
            .insert((user_id.to_string(), record.id.clone()), record.clone());
        Ok(())
    }

    async fn delete(&self, user_id: &str, id: &str) -> RemoteResult<()> {
        self.begin(RemoteCall::Delete(id.to_string()))?;
        self.records
            .lock()
            .unwrap()
            .remove(&(user_id.to_string(), id.to_string()));
        Ok(())
    }

    async fn fetch_all(&self, user_id: &str) -> RemoteResult<Vec<Transaction>> {
        self.begin(RemoteCall::FetchAll(user_id.to_string()))?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|((owner, _), _)| owner == user_id)
            .map(|(_, record)| record.clone())
            .collect())
    }
}

/// Build a record with the fields the sync machinery looks at.
pub fn transaction(id: &str, date: &str, updated_at: Option<&str>) -> Transaction {
    Transaction {
        id: id.to_string(),
        date: date.to_string(),
        description: format!("tx {id}"),
        amount: 10.0,
        category: None,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        updated_at: updated_at.map(str::to_string),
        extra: Map::new(),
    }
}
