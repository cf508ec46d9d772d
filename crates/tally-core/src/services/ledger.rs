//! Offline-first transaction ledger shared across clients.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::SyncSettings;
use crate::connectivity::ConnectivityPort;
use crate::merge::{merge_with_report, sort_by_date_desc};
use crate::models::{MutationKind, NewOutboxItem, NewTransaction, OutboxItem, Transaction};
use crate::outbox::OutboxQueue;
use crate::records::LocalRecords;
use crate::remote::RemoteRecordApi;
use crate::store::KeyValueStore;
use crate::sync::{SyncProcessor, SyncReport, UserLocks};
use crate::Result;

/// Where a mutation ended up
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// Accepted by the remote store right away
    Confirmed,
    /// Waiting in the outbox for the next drain
    Queued(OutboxItem),
}

impl MutationOutcome {
    pub const fn is_queued(&self) -> bool {
        matches!(self, Self::Queued(_))
    }
}

/// Thread-safe service for ledger reads, writes and sync.
///
/// Writes go to the remote store directly when possible and fall back to the
/// outbox otherwise. Either way the local view reflects the write before the
/// call returns.
#[derive(Clone)]
pub struct LedgerService {
    outbox: OutboxQueue,
    records: LocalRecords,
    remote: Arc<dyn RemoteRecordApi>,
    connectivity: Arc<dyn ConnectivityPort>,
    locks: Arc<UserLocks>,
    processor: Arc<SyncProcessor>,
}

impl LedgerService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteRecordApi>,
        connectivity: Arc<dyn ConnectivityPort>,
        settings: &SyncSettings,
    ) -> Self {
        let outbox = OutboxQueue::new(store.clone());
        let records = LocalRecords::new(store);
        let locks = Arc::new(UserLocks::new());
        let processor = Arc::new(
            SyncProcessor::new(
                outbox.clone(),
                remote.clone(),
                connectivity.clone(),
                locks.clone(),
            )
            .with_backoff(settings.backoff()),
        );

        Self {
            outbox,
            records,
            remote,
            connectivity,
            locks,
            processor,
        }
    }

    /// Processor sharing this service's locks, for background workers
    pub fn processor(&self) -> Arc<SyncProcessor> {
        self.processor.clone()
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub async fn create(
        &self,
        user_id: &str,
        input: NewTransaction,
    ) -> Result<(Transaction, MutationOutcome)> {
        let record = input.into_transaction();
        let mutation = NewOutboxItem::create(&record)?;
        let outcome = self.submit(user_id, mutation).await?;
        Ok((record, outcome))
    }

    /// Replace a record, stamping `updated_at` with the current time
    pub async fn update(
        &self,
        user_id: &str,
        mut record: Transaction,
    ) -> Result<(Transaction, MutationOutcome)> {
        record.touch();
        let mutation = NewOutboxItem::update(&record)?;
        let outcome = self.submit(user_id, mutation).await?;
        Ok((record, outcome))
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<MutationOutcome> {
        self.submit(user_id, NewOutboxItem::delete(id)).await
    }

    /// Local records, newest first
    pub async fn transactions(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let _guard = self.locks.lock(user_id).await;
        let mut records = self.records.load(user_id)?;
        sort_by_date_desc(&mut records);
        Ok(records)
    }

    pub async fn find(&self, user_id: &str, id: &str) -> Result<Option<Transaction>> {
        let _guard = self.locks.lock(user_id).await;
        Ok(self
            .records
            .load(user_id)?
            .into_iter()
            .find(|record| record.id == id))
    }

    pub async fn pending(&self, user_id: &str) -> Result<Vec<OutboxItem>> {
        let _guard = self.locks.lock(user_id).await;
        self.outbox.list(user_id)
    }

    /// Drain the outbox once
    pub async fn sync(&self, user_id: &str) -> Result<SyncReport> {
        let report = self.processor.process_outbox_queue(user_id).await?;
        tracing::info!(
            "Sync for {user_id}: {} processed, {} failed, {} remaining",
            report.processed,
            report.failed,
            report.remaining
        );
        Ok(report)
    }

    /// Pull the remote set and merge it into the local one.
    ///
    /// Offline, the local records are returned untouched. Records whose last
    /// queued mutation is a delete are kept out of the merged set so a pull
    /// does not bring them back before the delete reaches the remote.
    pub async fn refresh(&self, user_id: &str) -> Result<Vec<Transaction>> {
        if !self.connectivity.is_online() {
            tracing::debug!("Offline, skipping pull for {user_id}");
            return self.transactions(user_id).await;
        }

        let remote = self.remote.fetch_all(user_id).await?;

        let _guard = self.locks.lock(user_id).await;
        let local = self.records.load(user_id)?;
        let (mut merged, report) = merge_with_report(&local, &remote);

        let queued = self.outbox.list(user_id)?;
        let pending_deletes = pending_deletes(&queued);
        if !pending_deletes.is_empty() {
            merged.retain(|record| !pending_deletes.contains(&record.id.as_str()));
        }

        self.records.save(user_id, &merged)?;
        tracing::info!(
            "Pulled {} remote records for {user_id}: {} local wins, {} remote wins, {} local only",
            remote.len(),
            report.local_wins,
            report.remote_wins,
            report.local_only
        );
        Ok(merged)
    }

    /// Forget everything stored for `user_id` (logout)
    pub async fn reset(&self, user_id: &str) -> Result<()> {
        let _guard = self.locks.lock(user_id).await;
        self.outbox.clear(user_id)?;
        self.records.clear(user_id)?;
        tracing::info!("Cleared local ledger for {user_id}");
        Ok(())
    }

    /// Send `mutation` directly when nothing is queued, otherwise queue it.
    ///
    /// Once the remote has accepted the change the outcome is `Confirmed` even
    /// if the local copy cannot be written; the next refresh restores it.
    async fn submit(&self, user_id: &str, mutation: NewOutboxItem) -> Result<MutationOutcome> {
        let _guard = self.locks.lock(user_id).await;

        // Earlier queued mutations must reach the remote first.
        if self.connectivity.is_online() && self.outbox.size(user_id)? == 0 {
            match self.send(user_id, &mutation).await {
                Ok(()) => {
                    if let Err(error) = self.records.apply(user_id, &mutation) {
                        tracing::warn!(
                            "Remote {} for {} applied but local save failed: {error}",
                            mutation.kind.as_str(),
                            mutation.entity_id
                        );
                    }
                    return Ok(MutationOutcome::Confirmed);
                }
                Err(error) => tracing::warn!(
                    "Remote {} for {} failed, queueing: {error}",
                    mutation.kind.as_str(),
                    mutation.entity_id
                ),
            }
        }

        self.records.apply(user_id, &mutation)?;
        let item = self.outbox.enqueue(user_id, mutation)?;
        Ok(MutationOutcome::Queued(item))
    }

    async fn send(&self, user_id: &str, mutation: &NewOutboxItem) -> Result<()> {
        match mutation.kind {
            MutationKind::Create | MutationKind::Update => {
                let record = Transaction::from_payload(&mutation.payload)?;
                self.remote.upsert(user_id, &record).await?;
            }
            MutationKind::Delete => self.remote.delete(user_id, &mutation.entity_id).await?,
        }
        Ok(())
    }
}

fn pending_deletes(items: &[OutboxItem]) -> Vec<&str> {
    let mut last_kind: HashMap<&str, MutationKind> = HashMap::new();
    for item in items {
        last_kind.insert(item.entity_id.as_str(), item.kind);
    }
    last_kind
        .into_iter()
        .filter(|(_, kind)| *kind == MutationKind::Delete)
        .map(|(id, _)| id)
        .collect()
}
