//! Session store
//!
//! A key-value substrate holding ordered lists and flat mappings of plain
//! JSON values. `SessionRepo` layers the per-session keys on top.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Context, Result};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::{StoreBackend, StoreConfig};

mod repo;
mod sqlite;

pub use repo::SessionRepo;
pub use sqlite::SqliteStore;

/// Session store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend failure: {0}")]
    Backend(String),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("key '{key}' does not hold a {expected}")]
    WrongKind { key: String, expected: &'static str },
}

/// Get/set/append over ordered lists and mappings
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Items stored under `key`, empty when absent
    async fn get_list(&self, key: &str) -> Result<Vec<Value>, StoreError>;

    async fn set_list(&self, key: &str, items: Vec<Value>) -> Result<(), StoreError>;

    /// Read the full list, push one item and write it back.
    ///
    /// Not atomic: concurrent appends to one key are last-write-wins.
    async fn append(&self, key: &str, item: Value) -> Result<(), StoreError> {
        let mut items = self.get_list(key).await?;
        items.push(item);
        self.set_list(key, items).await
    }

    async fn get_map(&self, key: &str) -> Result<Option<Map<String, Value>>, StoreError>;

    /// Replace the whole mapping under `key`
    async fn set_map(&self, key: &str, map: Map<String, Value>) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
enum Entry {
    List(Vec<Value>),
    Map(Map<String, Value>),
}

/// In-process store; contents die with the process
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get_list(&self, key: &str) -> Result<Vec<Value>, StoreError> {
        match self.entries.read().await.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::List(items)) => Ok(items.clone()),
            Some(Entry::Map(_)) => Err(StoreError::WrongKind {
                key: key.to_string(),
                expected: "list",
            }),
        }
    }

    async fn set_list(&self, key: &str, items: Vec<Value>) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), Entry::List(items));
        Ok(())
    }

    async fn get_map(&self, key: &str) -> Result<Option<Map<String, Value>>, StoreError> {
        match self.entries.read().await.get(key) {
            None => Ok(None),
            Some(Entry::Map(map)) => Ok(Some(map.clone())),
            Some(Entry::List(_)) => Err(StoreError::WrongKind {
                key: key.to_string(),
                expected: "map",
            }),
        }
    }

    async fn set_map(&self, key: &str, map: Map<String, Value>) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), Entry::Map(map));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Open the configured backend
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn SessionStore>> {
    debug!(?config, "open_store: called");
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Sqlite => {
            let store = SqliteStore::open(&config.path)
                .with_context(|| format!("Failed to open session store at {}", config.path.display()))?;
            info!(path = %config.path.display(), "Opened sqlite session store");
            Ok(Arc::new(store))
        }
    }
}
