use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, Utc};
use serde::Serialize;
use tally_core::connectivity::{ConnectivityMonitor, ConnectivityPort};
use tally_core::remote::{HttpRecordApi, RemoteError, RemoteRecordApi, RemoteResult};
use tally_core::services::LedgerService;
use tally_core::store::{open_local_store, KeyValueStore};
use tally_core::util::{is_http_url, parse_timestamp_millis};
use tally_core::{OutboxItem, Transaction};

use crate::config::CliConfig;
use crate::error::CliError;

/// Flags shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub offline: bool,
    pub data_dir: Option<PathBuf>,
    pub user: Option<String>,
}

/// Everything a command needs to act on one user's ledger
pub struct Context {
    pub ledger: LedgerService,
    pub user_id: String,
    pub config: CliConfig,
}

#[derive(Debug, Serialize)]
pub struct TransactionListItem {
    pub id: String,
    pub date: String,
    pub description: String,
    pub amount: f64,
    pub category: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PendingItem {
    pub id: String,
    pub kind: &'static str,
    pub entity_id: String,
    pub created_at: String,
    pub retry_count: u32,
}

/// Remote used when no API URL is configured; the CLI then stays offline.
struct UnconfiguredRemote;

#[async_trait]
impl RemoteRecordApi for UnconfiguredRemote {
    async fn upsert(&self, _user_id: &str, _record: &Transaction) -> RemoteResult<()> {
        Err(unconfigured())
    }

    async fn delete(&self, _user_id: &str, _id: &str) -> RemoteResult<()> {
        Err(unconfigured())
    }

    async fn fetch_all(&self, _user_id: &str) -> RemoteResult<Vec<Transaction>> {
        Err(unconfigured())
    }
}

fn unconfigured() -> RemoteError {
    RemoteError::network("no API URL configured")
}

pub fn open_context(options: &GlobalOptions) -> Result<Context, CliError> {
    let config = CliConfig::load()
        .map_err(CliError::Config)?
        .with_env_overrides();
    open_context_with_config(options, config)
}

pub fn open_context_with_config(
    options: &GlobalOptions,
    config: CliConfig,
) -> Result<Context, CliError> {
    let user_id = resolve_user_id(options.user.as_deref(), &config)?;
    let data_dir = options.data_dir.clone().unwrap_or_else(|| config.data_dir());
    let store: Arc<dyn KeyValueStore> = Arc::new(open_local_store(&data_dir)?);
    open_context_with_store(options, config, user_id, store)
}

pub fn open_context_with_store(
    options: &GlobalOptions,
    config: CliConfig,
    user_id: String,
    store: Arc<dyn KeyValueStore>,
) -> Result<Context, CliError> {
    let remote: Arc<dyn RemoteRecordApi> = match config.api_base_url.as_deref() {
        Some(url) if !is_http_url(url) => {
            return Err(CliError::Config(format!(
                "API URL must start with http:// or https:// (got {url})"
            )));
        }
        Some(url) => Arc::new(HttpRecordApi::new(url, config.api_token.clone())?),
        None => Arc::new(UnconfiguredRemote),
    };

    let online = !options.offline && config.api_base_url.is_some();
    if online {
        tracing::debug!("Using records API for {user_id}");
    } else {
        tracing::info!("Running offline; changes are queued locally");
    }
    let connectivity: Arc<dyn ConnectivityPort> = Arc::new(ConnectivityMonitor::new(online));

    let ledger = LedgerService::new(store, remote, connectivity, &config.sync);
    Ok(Context {
        ledger,
        user_id,
        config,
    })
}

pub fn resolve_user_id(explicit: Option<&str>, config: &CliConfig) -> Result<String, CliError> {
    explicit
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| config.user_id.clone())
        .ok_or(CliError::UserNotConfigured)
}

/// Find a transaction by full id or unique id prefix
pub async fn resolve_transaction(ctx: &Context, query: &str) -> Result<Transaction, CliError> {
    let query = normalize_transaction_identifier(query)?;
    let records = ctx.ledger.transactions(&ctx.user_id).await?;

    if let Some(exact) = records.iter().find(|record| record.id == query) {
        return Ok(exact.clone());
    }

    let matches: Vec<&Transaction> = records
        .iter()
        .filter(|record| record.id.starts_with(&query))
        .collect();

    match matches.as_slice() {
        [] => Err(CliError::TransactionNotFound(query)),
        [single] => Ok((*single).clone()),
        many => {
            let options = many
                .iter()
                .take(5)
                .map(|record| short_id(&record.id))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousTransactionId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn normalize_transaction_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyTransactionId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn parse_amount(raw: &str) -> Result<f64, CliError> {
    let cleaned = raw.trim().replace(['_', ','], "");
    match cleaned.parse::<f64>() {
        Ok(amount) if amount.is_finite() => Ok(amount),
        _ => Err(CliError::InvalidAmount(raw.trim().to_string())),
    }
}

pub fn parse_date(raw: &str) -> Result<String, CliError> {
    let trimmed = raw.trim();
    if parse_timestamp_millis(trimmed).is_some() {
        Ok(trimmed.to_string())
    } else {
        Err(CliError::InvalidDate(trimmed.to_string()))
    }
}

pub fn resolve_description(parts: &[String]) -> Result<String, CliError> {
    normalize_description(&parts.join(" ")).ok_or(CliError::EmptyDescription)
}

pub fn normalize_description(value: &str) -> Option<String> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

pub fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

pub fn format_amount(amount: f64) -> String {
    format!("{amount:+.2}")
}

pub fn format_transaction_lines(records: &[Transaction]) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            let id = short_id(&record.id);
            let description = truncate(&record.description, 32);
            let amount = format_amount(record.amount);
            match record.category.as_deref() {
                Some(category) => format!(
                    "{id:<13}  {:<10}  {description:<32}  {amount:>12}  [{category}]",
                    record.date
                ),
                None => format!(
                    "{id:<13}  {:<10}  {description:<32}  {amount:>12}",
                    record.date
                ),
            }
        })
        .collect()
}

pub fn transaction_to_list_item(record: &Transaction) -> TransactionListItem {
    TransactionListItem {
        id: record.id.clone(),
        date: record.date.clone(),
        description: record.description.clone(),
        amount: record.amount,
        category: record.category.clone(),
        created_at: record.created_at.clone(),
        updated_at: record.updated_at.clone(),
    }
}

pub fn format_pending_lines(items: &[OutboxItem]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    items
        .iter()
        .map(|item| {
            let queued = parse_timestamp_millis(&item.created_at).map_or_else(
                || item.created_at.clone(),
                |millis| format_relative_time(millis, now_ms),
            );
            let line = format!(
                "{:<6}  {:<13}  queued {queued}",
                item.kind.as_str(),
                short_id(&item.entity_id)
            );
            if item.retry_count > 0 {
                format!("{line}  (retried {}x)", item.retry_count)
            } else {
                line
            }
        })
        .collect()
}

pub fn outbox_item_to_pending_item(item: &OutboxItem) -> PendingItem {
    PendingItem {
        id: item.id.clone(),
        kind: item.kind.as_str(),
        entity_id: item.entity_id.clone(),
        created_at: item.created_at.clone(),
        retry_count: item.retry_count,
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        let mut truncated = value
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect::<String>();
        truncated.push_str("...");
        truncated
    }
}
