//! Typed per-session accessors

use std::sync::Arc;

use contextstore::FileTree;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::{SessionStore, StoreError};
use crate::conversation::ConversationTurn;
use crate::synthesis::DocumentSet;

fn conversation_key(session: &str) -> String {
    format!("conversation:{}", session)
}

fn developer_chat_key(session: &str) -> String {
    format!("developer_chat:{}", session)
}

fn documents_key(session: &str) -> String {
    format!("documents:{}", session)
}

fn tree_key(session: &str) -> String {
    format!("gitingest_tree:{}", session)
}

/// Session state over a `SessionStore`
#[derive(Clone)]
pub struct SessionRepo {
    store: Arc<dyn SessionStore>,
}

impl SessionRepo {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    async fn turns(&self, key: &str) -> Result<Vec<ConversationTurn>, StoreError> {
        self.store
            .get_list(key)
            .await?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(StoreError::from))
            .collect()
    }

    async fn mapping<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get_map(key).await? {
            Some(map) => Ok(Some(serde_json::from_value(Value::Object(map))?)),
            None => Ok(None),
        }
    }

    async fn set_mapping<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        match serde_json::to_value(value)? {
            Value::Object(map) => self.store.set_map(key, map).await,
            _ => Err(StoreError::WrongKind {
                key: key.to_string(),
                expected: "map",
            }),
        }
    }

    pub async fn pm_history(&self, session: &str) -> Result<Vec<ConversationTurn>, StoreError> {
        self.turns(&conversation_key(session)).await
    }

    pub async fn append_pm(&self, session: &str, turn: &ConversationTurn) -> Result<(), StoreError> {
        debug!(%session, role = ?turn.role(), "SessionRepo::append_pm: called");
        self.store
            .append(&conversation_key(session), serde_json::to_value(turn)?)
            .await
    }

    pub async fn developer_history(&self, session: &str) -> Result<Vec<ConversationTurn>, StoreError> {
        self.turns(&developer_chat_key(session)).await
    }

    pub async fn append_developer(&self, session: &str, turn: &ConversationTurn) -> Result<(), StoreError> {
        debug!(%session, role = ?turn.role(), "SessionRepo::append_developer: called");
        self.store
            .append(&developer_chat_key(session), serde_json::to_value(turn)?)
            .await
    }

    pub async fn documents(&self, session: &str) -> Result<Option<DocumentSet>, StoreError> {
        self.mapping(&documents_key(session)).await
    }

    /// Replace the session's documents as a whole
    pub async fn set_documents(&self, session: &str, documents: &DocumentSet) -> Result<(), StoreError> {
        debug!(%session, "SessionRepo::set_documents: called");
        self.set_mapping(&documents_key(session), documents).await
    }

    pub async fn tree(&self, session: &str) -> Result<Option<FileTree>, StoreError> {
        self.mapping(&tree_key(session)).await
    }

    pub async fn set_tree(&self, session: &str, tree: &FileTree) -> Result<(), StoreError> {
        self.set_mapping(&tree_key(session), tree).await
    }

    /// Delete every key of the session
    pub async fn reset(&self, session: &str) -> Result<(), StoreError> {
        debug!(%session, "SessionRepo::reset: called");
        for key in [
            conversation_key(session),
            developer_chat_key(session),
            documents_key(session),
            tree_key(session),
        ] {
            self.store.delete(&key).await?;
        }
        Ok(())
    }
}
