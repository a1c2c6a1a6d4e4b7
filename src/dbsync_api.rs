use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Row identifier used by the indexer tables
pub type RowId = i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Epoch {
    pub no: i64,
    #[serde(default)]
    pub id: Option<RowId>,
    #[serde(default)]
    pub blk_count: Option<i64>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolHash {
    pub id: RowId,
    #[serde(default)]
    pub view: Option<String>,
    #[serde(default)]
    pub hash_raw: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotLeader {
    pub id: RowId,
    #[serde(default)]
    pub pool_hash_id: Option<RowId>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub id: Option<RowId>,
    #[serde(default)]
    pub epoch_no: Option<i64>,
    #[serde(default)]
    pub slot_leader_id: Option<RowId>,
    #[serde(default)]
    pub block_no: Option<i64>,
    #[serde(default)]
    pub slot_no: Option<i64>,
}

/// Read-only view over the indexer tables the fetch chain walks.
///
/// The HTTP client implements it against the REST gateway; tests swap in
/// in-memory fixtures.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// All epochs, ascending by row id
    async fn epochs(&self) -> Result<Vec<Epoch>, AppError>;

    /// Pool hash rows whose bech32 view equals `view`
    async fn pool_hashes(&self, view: &str) -> Result<Vec<PoolHash>, AppError>;

    /// Slot leaders registered for one pool hash
    async fn slot_leaders(&self, pool_hash_id: RowId) -> Result<Vec<SlotLeader>, AppError>;

    /// Blocks produced by `slot_leader_id` in epoch `epoch_no`
    async fn blocks(&self, epoch_no: i64, slot_leader_id: RowId) -> Result<Vec<Block>, AppError>;
}

/// REST client for the db-sync tables exposed through a PostgREST gateway
pub struct DbSyncClient {
    base_url: String,
    http: Client,
}

impl DbSyncClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_rows<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, AppError> {
        let url = self.api_url(path);
        tracing::debug!(%url, "querying indexer");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("GET {path} failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::UpstreamUnavailable(format!(
                "GET {path} returned {status}: {}",
                truncate(&body, 200)
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("Failed to read response: {e}")))?;

        serde_json::from_str::<Vec<T>>(&body).map_err(|e| {
            AppError::UpstreamUnavailable(format!(
                "Unexpected response format for {path}: {e}: {}",
                truncate(&body, 200)
            ))
        })
    }
}

#[async_trait]
impl DataSource for DbSyncClient {
    async fn epochs(&self) -> Result<Vec<Epoch>, AppError> {
        self.get_rows(&epochs_path()).await
    }

    async fn pool_hashes(&self, view: &str) -> Result<Vec<PoolHash>, AppError> {
        self.get_rows(&pool_hash_path(view)).await
    }

    async fn slot_leaders(&self, pool_hash_id: RowId) -> Result<Vec<SlotLeader>, AppError> {
        self.get_rows(&slot_leader_path(pool_hash_id)).await
    }

    async fn blocks(&self, epoch_no: i64, slot_leader_id: RowId) -> Result<Vec<Block>, AppError> {
        self.get_rows(&block_path(epoch_no, slot_leader_id)).await
    }
}

pub(crate) fn epochs_path() -> String {
    "/epoch?order=id.asc".to_string()
}

pub(crate) fn pool_hash_path(view: &str) -> String {
    format!("/pool_hash?view=eq.{}", urlencoding::encode(view))
}

pub(crate) fn slot_leader_path(pool_hash_id: RowId) -> String {
    format!("/slot_leader?pool_hash_id=eq.{pool_hash_id}")
}

pub(crate) fn block_path(epoch_no: i64, slot_leader_id: RowId) -> String {
    format!("/block?and=(epoch_no.eq.{epoch_no},slot_leader_id.eq.{slot_leader_id})")
}

/// Cut `s` to at most `max_bytes` without splitting a char
pub(crate) fn truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
