//! Key-value storage with per-key expiry
//!
//! Rate counters and short-term memory both live in a [`KvStore`]. Two
//! backends are provided: an in-process map and a SQLite table.

mod memory;
mod sqlite;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::InMemoryKvStore;
pub use sqlite::SqliteKvStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unsupported store URL: {0}")]
    UnsupportedUrl(String),
}

/// A string key-value store where every entry carries a time-to-live
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a live entry. Expired entries read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write an entry, replacing any previous value and expiry
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Drop expired entries, returning how many were removed
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}

/// Open the store named by a `KV_URL` value.
///
/// `memory` selects the in-process map, anything starting with `sqlite:` is
/// handed to SQLite.
pub async fn open(url: &str) -> Result<Arc<dyn KvStore>, StoreError> {
    match url {
        "memory" => Ok(Arc::new(InMemoryKvStore::new())),
        u if u.starts_with("sqlite:") => Ok(Arc::new(SqliteKvStore::connect(u).await?)),
        other => Err(StoreError::UnsupportedUrl(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory() {
        let store = open("memory").await.unwrap();
        store.put("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_open_sqlite_in_memory() {
        let store = open("sqlite::memory:").await.unwrap();
        store.put("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_open_rejects_unknown_scheme() {
        let err = open("redis://localhost").await.err().unwrap();
        assert!(matches!(err, StoreError::UnsupportedUrl(_)));
    }
}
