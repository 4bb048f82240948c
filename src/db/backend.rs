//! Database gateway trait and the typed handle passed to data functions

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::memory::MemoryBackend;
use super::query::Query;

/// Row-level operations a storage backend must provide.
///
/// Rows travel as JSON objects keyed by column name.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Rows matching the query, ordered and paged as requested
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, DbError>;

    /// Like `select`, plus the number of rows matching the filters before paging
    async fn select_page(&self, table: &str, query: &Query) -> Result<(Vec<Value>, u64), DbError>;

    /// Number of rows matching the filters
    async fn count(&self, table: &str, query: &Query) -> Result<u64, DbError>;

    /// Insert a row and return it as stored
    async fn insert(&self, table: &str, row: Value) -> Result<Value, DbError>;

    /// Overwrite the given columns on every matching row, returning the updated rows
    async fn update(&self, table: &str, query: &Query, patch: Value) -> Result<Vec<Value>, DbError>;
}

/// Cloneable database handle with typed helpers
#[derive(Clone)]
pub struct Database {
    backend: Arc<dyn Backend>,
}

impl Database {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Fresh, empty in-process database
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub async fn fetch<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<Vec<T>, DbError> {
        let rows = self.backend.select(table, query).await?;
        rows.into_iter().map(decode).collect()
    }

    /// First matching row, if any
    pub async fn fetch_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<Option<T>, DbError> {
        let query = query.clone().limit(1);
        let rows = self.backend.select(table, &query).await?;
        rows.into_iter().next().map(decode).transpose()
    }

    /// Page of rows plus the total number of matches
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<(Vec<T>, u64), DbError> {
        let (rows, total) = self.backend.select_page(table, query).await?;
        let rows = rows.into_iter().map(decode).collect::<Result<Vec<T>, _>>()?;
        Ok((rows, total))
    }

    pub async fn count(&self, table: &str, query: &Query) -> Result<u64, DbError> {
        self.backend.count(table, query).await
    }

    pub async fn insert<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<R, DbError> {
        let row = serde_json::to_value(row).map_err(DbError::Encode)?;
        decode(self.backend.insert(table, row).await?)
    }

    pub async fn update<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
        patch: &T,
    ) -> Result<Vec<R>, DbError> {
        let patch = serde_json::to_value(patch).map_err(DbError::Encode)?;
        let rows = self.backend.update(table, query, patch).await?;
        rows.into_iter().map(decode).collect()
    }

    /// Update expecting exactly one affected row
    pub async fn update_one<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
        patch: &T,
    ) -> Result<R, DbError> {
        let rows: Vec<R> = self.update(table, query, patch).await?;
        rows.into_iter().next().ok_or(DbError::NoRowReturned)
    }
}

impl DbError {
    /// Unique-key violation (PostgREST answers 409)
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Api { status: 409, .. })
    }
}

fn decode<T: DeserializeOwned>(row: Value) -> Result<T, DbError> {
    serde_json::from_value(row).map_err(DbError::Decode)
}

/// Database gateway errors
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to encode row: {0}")]
    Encode(serde_json::Error),

    #[error("Failed to decode row: {0}")]
    Decode(serde_json::Error),

    #[error("Missing or malformed Content-Range header")]
    MissingCount,

    #[error("Expected a row to be returned")]
    NoRowReturned,
}
