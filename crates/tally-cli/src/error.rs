use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tally_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid date: {0} (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("No description provided")]
    EmptyDescription,
    #[error("Transaction ID cannot be empty")]
    EmptyTransactionId,
    #[error("Transaction not found for id/prefix: {0}")]
    TransactionNotFound(String),
    #[error("{0}")]
    AmbiguousTransactionId(String),
    #[error("Nothing to change; pass at least one of --date, --description, --amount, --category")]
    NothingToEdit,
    #[error("Refusing to clear local data without --yes")]
    ResetNotConfirmed,
    #[error(
        "No user configured. Run `tally config init --set-user <id>`, pass --user, or set TALLY_USER."
    )]
    UserNotConfigured,
}
