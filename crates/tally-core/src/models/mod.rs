//! Data models for Tally

mod outbox;
mod transaction;

pub use outbox::{MutationKind, NewOutboxItem, OutboxItem, OutboxItemPatch};
pub use transaction::{NewTransaction, Transaction, TransactionId};
