//! HTTP error mapping

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use crate::error::PilotError;
use crate::llm::LlmError;

/// Error returned by route handlers
#[derive(Debug)]
pub enum AppError {
    Pilot(PilotError),
    /// Index build failure, reported with a `detail` body
    Indexing(eyre::Report),
}

impl From<PilotError> for AppError {
    fn from(e: PilotError) -> Self {
        AppError::Pilot(e)
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        AppError::Pilot(e.into())
    }
}

impl From<crate::store::StoreError> for AppError {
    fn from(e: crate::store::StoreError) -> Self {
        AppError::Pilot(e.into())
    }
}

impl From<crate::conversation::HistoryError> for AppError {
    fn from(e: crate::conversation::HistoryError) -> Self {
        AppError::Pilot(e.into())
    }
}

fn status_of(e: &PilotError) -> StatusCode {
    match e {
        PilotError::Configuration(_) => StatusCode::BAD_REQUEST,
        PilotError::NotFound(_) => StatusCode::NOT_FOUND,
        PilotError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        PilotError::Precondition(_)
        | PilotError::Provider(_)
        | PilotError::History(_) => StatusCode::OK,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Pilot(e) => {
                let status = status_of(&e);
                if status.is_server_error() {
                    error!(error = %e, "Request failed");
                } else {
                    warn!(error = %e, %status, "Request rejected");
                }
                (status, Json(json!({ "status": "error", "message": e.to_string() }))).into_response()
            }
            AppError::Indexing(report) => {
                let detail = report.chain().map(|c| c.to_string()).collect::<Vec<_>>().join(": ");
                error!(%detail, "Indexing failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": format!("Error durante la indexación: {}", detail) })),
                )
                    .into_response()
            }
        }
    }
}
