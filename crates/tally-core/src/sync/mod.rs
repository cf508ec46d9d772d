//! Outbox draining: backoff, per-user serialization, the processor and its
//! background worker.

mod backoff;
mod locks;
mod processor;
mod worker;

pub use backoff::BackoffPolicy;
pub use locks::UserLocks;
pub use processor::{SyncProcessor, SyncReport};
pub use worker::{SyncStatus, SyncWorker, SyncWorkerHandle};
