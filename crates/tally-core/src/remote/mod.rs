//! Remote record API consumed by the sync engine

mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Transaction;

pub use http::HttpRecordApi;

/// Error signatures that indicate the network, not the server, failed.
const NETWORK_SIGNATURES: [&str; 6] = [
    "failed to fetch",
    "network",
    "connection",
    "timed out",
    "timeout",
    "dns",
];

/// Failure reported by a remote record API call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The request never got a response (offline, DNS, refused, timed out)
    #[error("Network error: {0}")]
    Network(String),
    /// The remote answered and refused the mutation
    #[error("Remote rejected request: {message}")]
    Rejected {
        status: Option<u16>,
        message: String,
    },
}

impl RemoteError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn rejected(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Whether this failure means connectivity dropped.
    ///
    /// Rejections whose message carries a network/fetch signature count too,
    /// since some transports surface socket failures as generic errors.
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Rejected { message, .. } => {
                let message = message.to_ascii_lowercase();
                NETWORK_SIGNATURES
                    .iter()
                    .any(|signature| message.contains(signature))
            }
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Remote store of transactions, namespaced per user.
///
/// Implementations own the mapping between [`Transaction`] and their wire
/// schema.
#[async_trait]
pub trait RemoteRecordApi: Send + Sync {
    /// Insert or replace the record with `record.id`
    async fn upsert(&self, user_id: &str, record: &Transaction) -> RemoteResult<()>;

    /// Delete the record with `id`
    async fn delete(&self, user_id: &str, id: &str) -> RemoteResult<()>;

    /// Fetch every record of `user_id`
    async fn fetch_all(&self, user_id: &str) -> RemoteResult<Vec<Transaction>>;
}
