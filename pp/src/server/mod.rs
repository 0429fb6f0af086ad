//! JSON-over-HTTP request surface

use axum::Router;
use axum::routing::{get, post};
use eyre::{Context, Result};
use tower_http::cors::CorsLayer;
use tracing::info;

mod error;
mod routes;
mod state;

#[cfg(test)]
mod tests;

pub use error::AppError;
pub use state::{ActiveProject, AppState, ProjectSlot};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/index_project", post(routes::index_project))
        .route("/start_conversation", post(routes::start_conversation))
        .route("/send_message", post(routes::send_message))
        .route("/generate_documents", post(routes::generate_documents))
        .route("/developer_chat", post(routes::developer_chat))
        .route("/summarize_developer_chat", post(routes::summarize_developer_chat))
        .route("/generate_code_agent_brief", post(routes::code_agent_brief))
        .route("/reset_session", post(routes::reset_session))
        .route("/documents/{session_id}", get(routes::get_documents))
        .route("/project_tree/{session_id}", get(routes::get_project_tree))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind {}", addr))?;

    info!(%addr, "PrdPilot server listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
