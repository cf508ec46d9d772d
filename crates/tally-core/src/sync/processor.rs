//! Outbox drain against the remote record API

use std::sync::Arc;

use serde::Serialize;

use super::{BackoffPolicy, UserLocks};
use crate::connectivity::ConnectivityPort;
use crate::error::Result;
use crate::models::{MutationKind, OutboxItem, OutboxItemPatch, Transaction};
use crate::outbox::OutboxQueue;
use crate::remote::{RemoteError, RemoteRecordApi};

/// Outcome of one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Items applied remotely and removed from the queue
    pub processed: usize,
    /// Items that failed (at most one per pass)
    pub failed: usize,
    /// Queue size after the pass
    pub remaining: usize,
}

/// Why a single item could not be applied
#[derive(Debug)]
enum ApplyError {
    Remote(RemoteError),
    InvalidPayload(String),
}

impl ApplyError {
    fn is_connectivity(&self) -> bool {
        match self {
            Self::Remote(error) => error.is_connectivity(),
            Self::InvalidPayload(_) => false,
        }
    }
}

impl std::fmt::Display for ApplyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(error) => write!(f, "{error}"),
            Self::InvalidPayload(message) => write!(f, "invalid payload: {message}"),
        }
    }
}

/// Drains a user's outbox in FIFO order, one item at a time.
///
/// A pass stops at the first failure. Connectivity failures stop it at once;
/// any other failure waits out the item's backoff delay first. The failed
/// item stays queued with its `retry_count` bumped.
pub struct SyncProcessor {
    outbox: OutboxQueue,
    remote: Arc<dyn RemoteRecordApi>,
    connectivity: Arc<dyn ConnectivityPort>,
    locks: Arc<UserLocks>,
    backoff: BackoffPolicy,
}

impl SyncProcessor {
    pub fn new(
        outbox: OutboxQueue,
        remote: Arc<dyn RemoteRecordApi>,
        connectivity: Arc<dyn ConnectivityPort>,
        locks: Arc<UserLocks>,
    ) -> Self {
        Self {
            outbox,
            remote,
            connectivity,
            locks,
            backoff: BackoffPolicy::default(),
        }
    }

    #[must_use]
    pub const fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn connectivity(&self) -> &Arc<dyn ConnectivityPort> {
        &self.connectivity
    }

    /// Run one drain pass for `user_id`
    ///
    /// Returns immediately, without remote calls, when offline or when the
    /// queue is empty. Storage errors abort the pass and are returned.
    pub async fn process_outbox_queue(&self, user_id: &str) -> Result<SyncReport> {
        let _guard = self.locks.lock(user_id).await;

        let items = self.outbox.list(user_id)?;
        if !self.connectivity.is_online() || items.is_empty() {
            tracing::debug!(
                "Skipping outbox drain for {user_id}: online={}, pending={}",
                self.connectivity.is_online(),
                items.len()
            );
            return Ok(SyncReport {
                remaining: items.len(),
                ..SyncReport::default()
            });
        }

        let mut report = SyncReport::default();
        for item in items {
            match self.apply(user_id, &item).await {
                Ok(()) => {
                    self.outbox.remove(user_id, &item.id)?;
                    report.processed += 1;
                    tracing::debug!(
                        "Applied {} for {} (queue entry {})",
                        item.kind.as_str(),
                        item.entity_id,
                        item.id
                    );
                }
                Err(error) => {
                    let retry_count = item.retry_count.saturating_add(1);
                    self.outbox
                        .update(user_id, &item.id, OutboxItemPatch::retry_count(retry_count))?;
                    report.failed += 1;

                    if error.is_connectivity() || !self.connectivity.is_online() {
                        tracing::warn!(
                            "Connectivity lost applying {} for {}: {error}",
                            item.kind.as_str(),
                            item.entity_id
                        );
                    } else {
                        let delay = self.backoff.delay(item.retry_count);
                        tracing::warn!(
                            "Remote rejected {} for {} (attempt {retry_count}), backing off {delay:?}: {error}",
                            item.kind.as_str(),
                            item.entity_id
                        );
                        tokio::time::sleep(delay).await;
                    }
                    break;
                }
            }
        }

        report.remaining = self.outbox.size(user_id)?;
        tracing::info!(
            "Outbox drain for {user_id}: processed={}, failed={}, remaining={}",
            report.processed,
            report.failed,
            report.remaining
        );
        Ok(report)
    }

    async fn apply(&self, user_id: &str, item: &OutboxItem) -> std::result::Result<(), ApplyError> {
        match item.kind {
            MutationKind::Create | MutationKind::Update => {
                let record = Transaction::from_payload(&item.payload)
                    .map_err(|error| ApplyError::InvalidPayload(error.to_string()))?;
                self.remote
                    .upsert(user_id, &record)
                    .await
                    .map_err(ApplyError::Remote)
            }
            MutationKind::Delete => self
                .remote
                .delete(user_id, &item.entity_id)
                .await
                .map_err(ApplyError::Remote),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::ConnectivityMonitor;
    use crate::models::NewOutboxItem;
    use crate::remote::RemoteResult;
    use crate::store::MemoryStore;
    use crate::testing::{transaction, RecordingRemote, RemoteCall};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    struct Harness {
        outbox: OutboxQueue,
        remote: Arc<RecordingRemote>,
        monitor: Arc<ConnectivityMonitor>,
        processor: SyncProcessor,
    }

    fn harness(online: bool) -> Harness {
        let outbox = OutboxQueue::new(Arc::new(MemoryStore::new()));
        let remote = Arc::new(RecordingRemote::new());
        let monitor = Arc::new(ConnectivityMonitor::new(online));
        let processor = SyncProcessor::new(
            outbox.clone(),
            remote.clone(),
            monitor.clone(),
            Arc::new(UserLocks::new()),
        );
        Harness {
            outbox,
            remote,
            monitor,
            processor,
        }
    }

    impl Harness {
        fn enqueue(&self, user_id: &str, item: NewOutboxItem) -> OutboxItem {
            self.outbox.enqueue(user_id, item).unwrap()
        }
    }

    #[tokio::test]
    async fn offline_guard_makes_no_remote_calls() {
        let h = harness(false);
        let tx = transaction("t-1", "2024-01-01", None);
        h.enqueue("alice", NewOutboxItem::create(&tx).unwrap());
        h.enqueue("alice", NewOutboxItem::delete("t-1"));

        let report = h.processor.process_outbox_queue("alice").await.unwrap();

        assert_eq!(
            report,
            SyncReport {
                processed: 0,
                failed: 0,
                remaining: 2
            }
        );
        assert!(h.remote.calls().is_empty());

        h.monitor.set_online(true);
        let report = h.processor.process_outbox_queue("alice").await.unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.remaining, 0);
    }

    #[tokio::test]
    async fn empty_queue_is_a_noop() {
        let h = harness(true);
        let report = h.processor.process_outbox_queue("alice").await.unwrap();
        assert_eq!(report, SyncReport::default());
        assert!(h.remote.calls().is_empty());
    }

    #[tokio::test]
    async fn drains_create_update_delete_of_one_entity() {
        let h = harness(true);
        let mut tx = transaction("t-1", "2024-01-01", None);
        h.enqueue("alice", NewOutboxItem::create(&tx).unwrap());
        tx.description = "edited".to_string();
        h.enqueue("alice", NewOutboxItem::update(&tx).unwrap());
        h.enqueue("alice", NewOutboxItem::delete("t-1"));

        let report = h.processor.process_outbox_queue("alice").await.unwrap();

        assert_eq!(
            report,
            SyncReport {
                processed: 3,
                failed: 0,
                remaining: 0
            }
        );
        assert_eq!(
            h.remote.calls(),
            vec![
                RemoteCall::Upsert("t-1".to_string()),
                RemoteCall::Upsert("t-1".to_string()),
                RemoteCall::Delete("t-1".to_string()),
            ]
        );
        assert!(h.remote.record("alice", "t-1").is_none());
    }

    #[tokio::test]
    async fn fifo_order_across_entities() {
        let h = harness(true);
        let a = transaction("a", "2024-01-02", None);
        let b = transaction("b", "2024-01-01", None);
        h.enqueue("alice", NewOutboxItem::create(&a).unwrap());
        h.enqueue("alice", NewOutboxItem::create(&b).unwrap());

        h.processor.process_outbox_queue("alice").await.unwrap();

        assert_eq!(
            h.remote.calls(),
            vec![
                RemoteCall::Upsert("a".to_string()),
                RemoteCall::Upsert("b".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn connectivity_failure_bumps_retry_and_aborts_without_delay() {
        let h = harness(true);
        let first = h.enqueue("alice", NewOutboxItem::delete("t-1"));
        h.enqueue("alice", NewOutboxItem::delete("t-2"));
        let outage = RemoteError::network("connection refused");
        h.remote.fail_next(outage);

        let started = std::time::Instant::now();
        let report = h.processor.process_outbox_queue("alice").await.unwrap();

        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(
            report,
            SyncReport {
                processed: 0,
                failed: 1,
                remaining: 2
            }
        );
        assert_eq!(h.remote.calls(), vec![RemoteCall::Delete("t-1".to_string())]);

        let items = h.outbox.list("alice").unwrap();
        assert_eq!(items[0].id, first.id);
        assert_eq!(items[0].retry_count, 1);
        assert_eq!(items[1].retry_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_backs_off_then_aborts() {
        let h = harness(true);
        let item = h.enqueue("alice", NewOutboxItem::delete("t-1"));
        h.enqueue("alice", NewOutboxItem::delete("t-2"));
        h.outbox
            .update("alice", &item.id, OutboxItemPatch::retry_count(2))
            .unwrap();
        let rejection = RemoteError::rejected(Some(422), "amount is required");
        h.remote.fail_next(rejection);

        let started = Instant::now();
        let report = h.processor.process_outbox_queue("alice").await.unwrap();

        // Two earlier failures: 500ms * 2^2.
        assert!(started.elapsed() >= Duration::from_millis(2_000));
        assert!(started.elapsed() < Duration::from_millis(2_500));
        assert_eq!(report.failed, 1);
        assert_eq!(report.processed, 0);
        assert_eq!(report.remaining, 2);
        assert_eq!(h.remote.calls().len(), 1);
        assert_eq!(h.outbox.list("alice").unwrap()[0].retry_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_from_the_base_delay_across_passes() {
        let h = harness(true);
        h.enqueue("alice", NewOutboxItem::delete("t-1"));

        let mut waits = Vec::new();
        for _ in 0..3 {
            let rejection = RemoteError::rejected(Some(503), "unavailable");
            h.remote.fail_next(rejection);
            let started = Instant::now();
            h.processor.process_outbox_queue("alice").await.unwrap();
            waits.push(started.elapsed().as_millis());
        }

        for (wait, expected) in waits.iter().zip([500, 1_000, 2_000]) {
            assert!((expected..expected + 100).contains(wait), "{waits:?}");
        }
        assert_eq!(h.outbox.list("alice").unwrap()[0].retry_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_after_successes_keeps_tail_queued() {
        let h = harness(true);
        for id in ["t-1", "t-2", "t-3"] {
            h.enqueue("alice", NewOutboxItem::delete(id));
        }
        h.remote.succeed_next();
        let rejection = RemoteError::rejected(Some(409), "stale");
        h.remote.fail_next(rejection);

        let report = h.processor.process_outbox_queue("alice").await.unwrap();
        assert_eq!(
            report,
            SyncReport {
                processed: 1,
                failed: 1,
                remaining: 2
            }
        );

        let report = h.processor.process_outbox_queue("alice").await.unwrap();
        assert_eq!(
            report,
            SyncReport {
                processed: 2,
                failed: 0,
                remaining: 0
            }
        );
        assert_eq!(
            h.remote.calls(),
            vec![
                RemoteCall::Delete("t-1".to_string()),
                RemoteCall::Delete("t-2".to_string()),
                RemoteCall::Delete("t-2".to_string()),
                RemoteCall::Delete("t-3".to_string()),
            ]
        );
    }

    /// Remote that loses the network while answering with a server error.
    struct DroppingRemote {
        monitor: Arc<ConnectivityMonitor>,
    }

    #[async_trait::async_trait]
    impl RemoteRecordApi for DroppingRemote {
        async fn upsert(&self, _user_id: &str, _record: &Transaction) -> RemoteResult<()> {
            self.monitor.set_online(false);
            Err(RemoteError::rejected(Some(500), "internal error"))
        }

        async fn delete(&self, _user_id: &str, _id: &str) -> RemoteResult<()> {
            self.monitor.set_online(false);
            Err(RemoteError::rejected(Some(500), "internal error"))
        }

        async fn fetch_all(&self, _user_id: &str) -> RemoteResult<Vec<Transaction>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn going_offline_mid_pass_aborts_without_backoff() {
        let outbox = OutboxQueue::new(Arc::new(MemoryStore::new()));
        let monitor = Arc::new(ConnectivityMonitor::new(true));
        let processor = SyncProcessor::new(
            outbox.clone(),
            Arc::new(DroppingRemote {
                monitor: monitor.clone(),
            }),
            monitor.clone(),
            Arc::new(UserLocks::new()),
        );
        let item = NewOutboxItem::delete("t-1");
        outbox.enqueue("alice", item).unwrap();

        let started = Instant::now();
        let report = processor.process_outbox_queue("alice").await.unwrap();

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(report.failed, 1);
        assert_eq!(report.remaining, 1);
        assert!(!monitor.is_online());
        assert_eq!(outbox.list("alice").unwrap()[0].retry_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn undecodable_payload_is_treated_as_rejection() {
        let h = harness(true);
        h.enqueue(
            "alice",
            NewOutboxItem {
                kind: MutationKind::Update,
                entity_id: "t-1".to_string(),
                payload: json!({ "id": "t-1" }),
            },
        );

        let started = Instant::now();
        let report = h.processor.process_outbox_queue("alice").await.unwrap();

        // First failure waits the base delay.
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert!(started.elapsed() < Duration::from_millis(1_000));
        assert_eq!(report.failed, 1);
        assert!(h.remote.calls().is_empty());
        assert_eq!(h.outbox.list("alice").unwrap()[0].retry_count, 1);
    }

    #[tokio::test]
    async fn queues_of_other_users_are_untouched() {
        let h = harness(true);
        h.enqueue("alice", NewOutboxItem::delete("t-1"));
        h.enqueue("bob", NewOutboxItem::delete("t-2"));

        let report = h.processor.process_outbox_queue("alice").await.unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(h.outbox.size("bob").unwrap(), 1);
    }
}
