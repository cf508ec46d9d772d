//! HTTP implementation of the remote record API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{RemoteError, RemoteRecordApi, RemoteResult};
use crate::error::{Error, Result};
use crate::models::Transaction;
use crate::util::{compact_text, is_http_url, normalize_text_option};

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// REST client for `<base>/v1/users/<user>/transactions`
#[derive(Clone)]
pub struct HttpRecordApi {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpRecordApi {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRecordApi")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpRecordApi {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|error| Error::InvalidInput(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            base_url,
            token: normalize_text_option(token),
            client,
        })
    }

    fn collection_url(&self, user_id: &str) -> String {
        format!(
            "{}/v1/users/{}/transactions",
            self.base_url,
            urlencoding::encode(user_id)
        )
    }

    fn record_url(&self, user_id: &str, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(user_id),
            urlencoding::encode(id)
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header(reqwest::header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl RemoteRecordApi for HttpRecordApi {
    async fn upsert(&self, user_id: &str, record: &Transaction) -> RemoteResult<()> {
        let row = RemoteTransactionRow::from_record(user_id, record);
        let response = self
            .authorize(self.client.put(self.record_url(user_id, &record.id)))
            .json(&row)
            .send()
            .await
            .map_err(|error| map_transport_error(&error))?;

        ensure_success(response).await.map(|_| ())
    }

    async fn delete(&self, user_id: &str, id: &str) -> RemoteResult<()> {
        let response = self
            .authorize(self.client.delete(self.record_url(user_id, id)))
            .send()
            .await
            .map_err(|error| map_transport_error(&error))?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Remote record {id} already deleted");
            return Ok(());
        }
        ensure_success(response).await.map(|_| ())
    }

    async fn fetch_all(&self, user_id: &str) -> RemoteResult<Vec<Transaction>> {
        let response = self
            .authorize(self.client.get(self.collection_url(user_id)))
            .send()
            .await
            .map_err(|error| map_transport_error(&error))?;

        let rows = ensure_success(response)
            .await?
            .json::<Vec<RemoteTransactionRow>>()
            .await
            .map_err(|error| map_transport_error(&error))?;

        Ok(rows
            .into_iter()
            .map(RemoteTransactionRow::into_record)
            .collect())
    }
}

/// Wire shape of a transaction on the remote side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RemoteTransactionRow {
    id: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    date: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    amount: f64,
    #[serde(default)]
    category: Option<String>,
    created_at: String,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    metadata: Map<String, Value>,
}

impl RemoteTransactionRow {
    fn from_record(user_id: &str, record: &Transaction) -> Self {
        Self {
            id: record.id.clone(),
            user_id: Some(user_id.to_string()),
            date: record.date.clone(),
            description: record.description.clone(),
            amount: record.amount,
            category: record.category.clone(),
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
            metadata: record.extra.clone(),
        }
    }

    fn into_record(self) -> Transaction {
        Transaction {
            id: self.id,
            date: self.date,
            description: self.description,
            amount: self.amount,
            category: self.category,
            created_at: self.created_at,
            updated_at: self.updated_at,
            extra: self.metadata,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    error: Option<String>,
    message: Option<String>,
}

async fn ensure_success(response: reqwest::Response) -> RemoteResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::rejected(
        Some(status.as_u16()),
        parse_api_error(status, &body),
    ))
}

fn map_transport_error(error: &reqwest::Error) -> RemoteError {
    if error.is_connect() || error.is_timeout() || error.is_request() {
        RemoteError::network(error.to_string())
    } else {
        RemoteError::rejected(
            error.status().map(|status| status.as_u16()),
            error.to_string(),
        )
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<RemoteErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let base_url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput("remote base URL must not be empty".to_string()))?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "remote base URL must include http:// or https://".to_string(),
        ))
    }
}
