//! SQLite-backed session store

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use tracing::debug;

use super::{SessionStore, StoreError};

const KIND_LIST: &str = "list";
const KIND_MAP: &str = "map";

/// One `kv(key, kind, value)` table; blocking calls run off the runtime
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        debug!(path = %path.display(), "SqliteStore::open: called");
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                kind  TEXT NOT NULL,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Backend("connection mutex poisoned".to_string()))?;
            f(&*guard)
        })
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?
    }

    async fn read(&self, key: &str, expected: &'static str) -> Result<Option<Value>, StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let row: Option<(String, String)> = conn
                .query_row("SELECT kind, value FROM kv WHERE key = ?1", params![key], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })
                .optional()?;

            match row {
                None => Ok(None),
                Some((kind, _)) if kind != expected => Err(StoreError::WrongKind { key, expected }),
                Some((_, text)) => Ok(Some(serde_json::from_str(&text)?)),
            }
        })
        .await
    }

    async fn write(&self, key: &str, kind: &'static str, value: Value) -> Result<(), StoreError> {
        let key = key.to_string();
        let text = serde_json::to_string(&value)?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO kv (key, kind, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET kind = excluded.kind, value = excluded.value",
                params![key, kind, text],
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn get_list(&self, key: &str) -> Result<Vec<Value>, StoreError> {
        match self.read(key, KIND_LIST).await? {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(StoreError::WrongKind {
                key: key.to_string(),
                expected: KIND_LIST,
            }),
        }
    }

    async fn set_list(&self, key: &str, items: Vec<Value>) -> Result<(), StoreError> {
        self.write(key, KIND_LIST, Value::Array(items)).await
    }

    async fn get_map(&self, key: &str) -> Result<Option<Map<String, Value>>, StoreError> {
        match self.read(key, KIND_MAP).await? {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(_) => Err(StoreError::WrongKind {
                key: key.to_string(),
                expected: KIND_MAP,
            }),
        }
    }

    async fn set_map(&self, key: &str, map: Map<String, Value>) -> Result<(), StoreError> {
        self.write(key, KIND_MAP, Value::Object(map)).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
            Ok(())
        })
        .await
    }
}
