//! tally-core - Core library for Tally
//!
//! This crate contains the offline-first machinery shared by every Tally
//! client: the durable key-value store, the outbox of pending mutations, the
//! last-write-wins merge engine, and the sync processor that drains the
//! outbox once connectivity returns.

pub mod config;
pub mod connectivity;
pub mod error;
pub mod merge;
pub mod models;
pub mod outbox;
pub mod records;
pub mod remote;
pub mod services;
pub mod state;
pub mod store;
pub mod sync;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
pub use models::{MutationKind, NewOutboxItem, NewTransaction, OutboxItem, Transaction};
