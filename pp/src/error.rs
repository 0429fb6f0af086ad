//! Application error taxonomy

use thiserror::Error;

use crate::conversation::HistoryError;
use crate::llm::LlmError;
use crate::store::StoreError;

/// Failures surfaced by public operations.
///
/// Messages are user-facing and returned verbatim in error responses.
#[derive(Debug, Error)]
pub enum PilotError {
    /// Unrecognised provider or otherwise unusable configuration
    #[error("{0}")]
    Configuration(String),

    /// LLM or retrieval failure that could not be degraded into text
    #[error("{0}")]
    Provider(String),

    /// Operation invoked before its required predecessor
    #[error("{0}")]
    Precondition(String),

    /// Session or cached artifact absent
    #[error("{0}")]
    NotFound(String),

    #[error("Error del almacén de sesiones: {0}")]
    Store(#[from] StoreError),

    #[error("Historial de conversación inválido: {0}")]
    History(#[from] HistoryError),
}

impl From<LlmError> for PilotError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::MissingApiKey(_) => PilotError::Configuration(e.to_string()),
            other => PilotError::Provider(other.to_string()),
        }
    }
}
