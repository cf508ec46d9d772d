//! Client-facing services composed from the core building blocks.

mod ledger;

pub use ledger::{LedgerService, MutationOutcome};
