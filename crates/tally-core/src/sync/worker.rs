//! Background drain task
//!
//! Drains one user's outbox when the worker starts, whenever connectivity
//! comes back, and optionally on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::{SyncProcessor, SyncReport};
use crate::state::SyncState;

/// Last known sync state plus the report of the last completed pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStatus {
    pub state: SyncState,
    pub last_report: Option<SyncReport>,
}

/// Spawns drain tasks
pub struct SyncWorker;

impl SyncWorker {
    /// Start draining `user_id`'s outbox in the background.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(
        processor: Arc<SyncProcessor>,
        user_id: impl Into<String>,
        interval: Option<Duration>,
    ) -> SyncWorkerHandle {
        let user_id = user_id.into();
        let initial = if processor.connectivity().is_online() {
            SyncState::Syncing
        } else {
            SyncState::Offline
        };
        let (status_tx, status_rx) = watch::channel(SyncStatus {
            state: initial,
            last_report: None,
        });
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        // Subscribe before spawning so no transition is missed.
        let connectivity = processor.connectivity().subscribe();

        let task = tokio::spawn(run(
            processor,
            user_id,
            interval,
            connectivity,
            status_tx,
            shutdown_rx,
        ));

        SyncWorkerHandle {
            status: status_rx,
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Handle to a running [`SyncWorker`] task
pub struct SyncWorkerHandle {
    status: watch::Receiver<SyncStatus>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SyncWorkerHandle {
    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }

    /// Stop the worker after its current pass, if any
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(error) = (&mut self.task).await {
            tracing::warn!("Sync worker ended abnormally: {error}");
        }
    }
}

async fn run(
    processor: Arc<SyncProcessor>,
    user_id: String,
    interval: Option<Duration>,
    mut connectivity: watch::Receiver<bool>,
    status: watch::Sender<SyncStatus>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = interval.map(|period| {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    });

    tracing::debug!("Sync worker started for {user_id}");
    run_pass(&processor, &user_id, &status).await;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = connectivity.changed() => {
                if changed.is_err() {
                    break;
                }
                let online = *connectivity.borrow_and_update();
                if online {
                    run_pass(&processor, &user_id, &status).await;
                } else {
                    publish(&status, SyncState::Offline, None);
                }
            }
            () = next_tick(ticker.as_mut()) => {
                run_pass(&processor, &user_id, &status).await;
            }
        }
    }

    tracing::debug!("Sync worker stopped for {user_id}");
}

/// Drain once and publish the outcome.
///
/// While offline the processor makes no remote calls, so the published
/// `Offline` report only carries the number of queued items.
async fn run_pass(processor: &SyncProcessor, user_id: &str, status: &watch::Sender<SyncStatus>) {
    if processor.connectivity().is_online() {
        publish(status, SyncState::Syncing, None);
    }
    match processor.process_outbox_queue(user_id).await {
        Ok(report) => {
            let state = if processor.connectivity().is_online() {
                if report.failed > 0 {
                    SyncState::Error
                } else {
                    SyncState::Synced
                }
            } else {
                SyncState::Offline
            };
            publish(status, state, Some(report));
        }
        Err(error) => {
            tracing::error!("Outbox drain for {user_id} failed: {error}");
            publish(status, SyncState::Error, None);
        }
    }
}

fn publish(status: &watch::Sender<SyncStatus>, state: SyncState, report: Option<SyncReport>) {
    status.send_modify(|current| {
        current.state = state;
        if report.is_some() {
            current.last_report = report;
        }
    });
}

async fn next_tick(ticker: Option<&mut Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
