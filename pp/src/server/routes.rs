//! Route handlers

use std::path::PathBuf;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};
use uuid::Uuid;

use super::error::AppError;
use super::state::{ActiveProject, AppState};
use crate::conversation::{ConversationTurn, OpeningMetadata, PmConversation, TemplateType, next_question};
use crate::developer::{developer_chat_response, generate_code_agent_brief, summarize_for_ticket};
use crate::error::PilotError;
use crate::pipeline::Generation;
use crate::synthesis::{DocumentSet, synthesize};

const NO_PROJECT: &str = "Por favor, indexa un proyecto primero.";
const PROJECT_NOT_INDEXED: &str = "El proyecto no ha sido indexado aún.";
const SESSION_NOT_FOUND: &str = "Sesión no encontrada.";
const SESSION_OR_PROJECT_MISSING: &str = "Sesión no encontrada o proyecto no indexado.";
const DOCUMENTS_REQUIRED: &str = "Por favor, genera los documentos antes de continuar con el desarrollador.";
const DEVELOPER_CHAT_REQUIRED: &str = "No hay conversación con el desarrollador para esta sesión.";
const DOCUMENTS_NOT_FOUND: &str = "Documentos no encontrados para esta sesión.";
const TREE_NOT_FOUND: &str = "Árbol de ficheros no encontrado para esta sesión.";

fn precondition(message: &str) -> AppError {
    PilotError::Precondition(message.to_string()).into()
}

fn not_found(message: &str) -> AppError {
    PilotError::NotFound(message.to_string()).into()
}

#[derive(Debug, Deserialize)]
pub struct IndexRequest {
    pub project_path: PathBuf,
    #[serde(default)]
    pub force_index: bool,
}

/// POST /index_project
pub async fn index_project(State(app): State<AppState>, Json(req): Json<IndexRequest>) -> Result<Json<Value>, AppError> {
    debug!(path = %req.project_path.display(), force = req.force_index, "index_project: called");
    let (index, tree) = app
        .indexer
        .build_or_load(&req.project_path, req.force_index)
        .await
        .map_err(AppError::Indexing)?;

    info!(path = %req.project_path.display(), files = tree.file_count(), "Project is now active");
    app.project
        .replace(ActiveProject {
            context: Arc::new(index),
            tree,
        })
        .await;
    Ok(Json(json!({ "message": "Proyecto indexado con éxito." })))
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub initial_description: Option<String>,
    pub template_type: String,
    #[serde(default)]
    pub existing_prd_content: Option<String>,
    #[serde(default)]
    pub llm_provider: Option<String>,
}

/// POST /start_conversation
pub async fn start_conversation(
    State(app): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Result<Json<Value>, AppError> {
    let provider = app.provider(req.llm_provider.as_deref())?;
    let project = app.project.current().await.ok_or_else(|| precondition(NO_PROJECT))?;
    let llm = app.clients.client(provider)?;

    let session_id = Uuid::now_v7().to_string();
    debug!(%session_id, %provider, template_type = %req.template_type, "start_conversation: called");

    let conversation = PmConversation::start(
        req.initial_description.unwrap_or_default(),
        OpeningMetadata {
            template_type: TemplateType::from(req.template_type),
            existing_prd: req.existing_prd_content,
            provider,
        },
    );
    for turn in conversation.turns() {
        app.repo.append_pm(&session_id, turn).await?;
    }
    app.repo.set_tree(&session_id, &project.tree).await?;

    let generation = Generation::new(llm.as_ref(), project.context.as_ref(), &app.prompts);
    let metadata = conversation.metadata();
    let question = next_question(
        &generation,
        conversation.turns(),
        &metadata.template_type,
        metadata.existing_prd.as_deref(),
    )
    .await;
    app.repo.append_pm(&session_id, &ConversationTurn::ia(&question)).await?;

    Ok(Json(json!({ "status": "success", "message": question, "session_id": session_id })))
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub session_id: String,
    pub user_message: String,
    #[serde(default)]
    pub llm_provider: Option<String>,
}

/// POST /send_message
pub async fn send_message(State(app): State<AppState>, Json(req): Json<MessageRequest>) -> Result<Json<Value>, AppError> {
    debug!(session_id = %req.session_id, "send_message: called");
    let provider = app.provider(req.llm_provider.as_deref())?;

    let turns = app.repo.pm_history(&req.session_id).await?;
    if turns.is_empty() {
        return Err(precondition(SESSION_NOT_FOUND));
    }
    let project = app.project.current().await.ok_or_else(|| precondition(PROJECT_NOT_INDEXED))?;
    let mut conversation = PmConversation::try_from(turns)?;
    let llm = app.clients.client(provider)?;

    let pm_turn = ConversationTurn::pm(req.user_message);
    app.repo.append_pm(&req.session_id, &pm_turn).await?;
    conversation.push(pm_turn)?;

    let generation = Generation::new(llm.as_ref(), project.context.as_ref(), &app.prompts);
    let metadata = conversation.metadata();
    let answer = next_question(
        &generation,
        conversation.turns(),
        &metadata.template_type,
        metadata.existing_prd.as_deref(),
    )
    .await;
    app.repo.append_pm(&req.session_id, &ConversationTurn::ia(&answer)).await?;

    Ok(Json(json!({ "status": "success", "ai_response": answer })))
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub session_id: String,
    pub template_type: String,
    #[serde(default)]
    pub existing_prd_content: Option<String>,
    #[serde(default)]
    pub llm_provider: Option<String>,
}

/// POST /generate_documents
pub async fn generate_documents(
    State(app): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<Value>, AppError> {
    debug!(session_id = %req.session_id, template_type = %req.template_type, "generate_documents: called");
    let provider = app.provider(req.llm_provider.as_deref())?;

    let turns = app.repo.pm_history(&req.session_id).await?;
    let project = match app.project.current().await {
        Some(project) if !turns.is_empty() => project,
        _ => return Err(precondition(SESSION_OR_PROJECT_MISSING)),
    };
    let llm = app.clients.client(provider)?;

    let generation = Generation::new(llm.as_ref(), project.context.as_ref(), &app.prompts);
    let template_type = TemplateType::from(req.template_type);
    let documents = synthesize(&generation, &turns, &template_type, req.existing_prd_content.as_deref()).await;
    app.repo.set_documents(&req.session_id, &documents).await?;

    Ok(Json(json!({
        "status": "success",
        "prd": documents.prd,
        "user_stories": documents.user_stories,
        "technical_plan": documents.technical_plan,
    })))
}

#[derive(Debug, Deserialize)]
pub struct DeveloperMessageRequest {
    pub session_id: String,
    pub developer_message: String,
    #[serde(default)]
    pub llm_provider: Option<String>,
}

/// POST /developer_chat
pub async fn developer_chat(
    State(app): State<AppState>,
    Json(req): Json<DeveloperMessageRequest>,
) -> Result<Json<Value>, AppError> {
    debug!(session_id = %req.session_id, "developer_chat: called");
    let provider = app.provider(req.llm_provider.as_deref())?;

    let documents = app
        .repo
        .documents(&req.session_id)
        .await?
        .ok_or_else(|| precondition(DOCUMENTS_REQUIRED))?;
    let project = app.project.current().await.ok_or_else(|| precondition(NO_PROJECT))?;
    let llm = app.clients.client(provider)?;

    app.repo
        .append_developer(&req.session_id, &ConversationTurn::developer(req.developer_message))
        .await?;
    let turns = app.repo.developer_history(&req.session_id).await?;

    let generation = Generation::new(llm.as_ref(), project.context.as_ref(), &app.prompts);
    let answer = developer_chat_response(&generation, &turns, &documents).await;
    app.repo
        .append_developer(&req.session_id, &ConversationTurn::ia(&answer))
        .await?;

    Ok(Json(json!({ "status": "success", "ai_response": answer })))
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub session_id: String,
    #[serde(default)]
    pub llm_provider: Option<String>,
}

/// POST /summarize_developer_chat
pub async fn summarize_developer_chat(
    State(app): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<Value>, AppError> {
    debug!(session_id = %req.session_id, "summarize_developer_chat: called");
    let provider = app.provider(req.llm_provider.as_deref())?;

    let turns = app.repo.developer_history(&req.session_id).await?;
    if turns.is_empty() {
        return Err(precondition(DEVELOPER_CHAT_REQUIRED));
    }
    let llm = app.clients.client(provider)?;

    let summary = summarize_for_ticket(llm.as_ref(), &app.prompts, &turns).await;
    Ok(Json(json!({ "status": "success", "summary": summary })))
}

/// POST /generate_code_agent_brief
pub async fn code_agent_brief(
    State(app): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<Value>, AppError> {
    debug!(session_id = %req.session_id, "code_agent_brief: called");
    let provider = app.provider(req.llm_provider.as_deref())?;

    let documents = app
        .repo
        .documents(&req.session_id)
        .await?
        .ok_or_else(|| precondition(DOCUMENTS_REQUIRED))?;
    let turns = app.repo.developer_history(&req.session_id).await?;
    if turns.is_empty() {
        return Err(precondition(DEVELOPER_CHAT_REQUIRED));
    }
    let project = app.project.current().await.ok_or_else(|| precondition(NO_PROJECT))?;
    let llm = app.clients.client(provider)?;

    let generation = Generation::new(llm.as_ref(), project.context.as_ref(), &app.prompts);
    let brief = generate_code_agent_brief(&generation, &turns, &documents).await;
    Ok(Json(json!({ "status": "success", "brief": brief })))
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub session_id: String,
}

/// POST /reset_session
pub async fn reset_session(State(app): State<AppState>, Json(req): Json<ResetRequest>) -> Result<Json<Value>, AppError> {
    debug!(session_id = %req.session_id, "reset_session: called");
    app.repo.reset(&req.session_id).await?;
    Ok(Json(json!({ "status": "success", "message": "Sesión reiniciada." })))
}

fn non_empty_lines(text: &str) -> Vec<&str> {
    text.lines().filter(|line| !line.trim().is_empty()).collect()
}

fn structured(documents: &DocumentSet) -> Value {
    json!({
        "status": "success",
        "prd": non_empty_lines(&documents.prd),
        "user_stories": non_empty_lines(&documents.user_stories),
        "technical_plan": non_empty_lines(&documents.technical_plan),
        "generated_at": documents.generated_at,
    })
}

/// GET /documents/{session_id}
pub async fn get_documents(State(app): State<AppState>, Path(session_id): Path<String>) -> Result<Json<Value>, AppError> {
    debug!(%session_id, "get_documents: called");
    let documents = app
        .repo
        .documents(&session_id)
        .await?
        .ok_or_else(|| not_found(DOCUMENTS_NOT_FOUND))?;
    Ok(Json(structured(&documents)))
}

/// GET /project_tree/{session_id}
pub async fn get_project_tree(
    State(app): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    debug!(%session_id, "get_project_tree: called");
    let tree = app
        .repo
        .tree(&session_id)
        .await?
        .ok_or_else(|| not_found(TREE_NOT_FOUND))?;
    Ok(Json(json!({ "status": "success", "tree": tree })))
}

/// GET /health
pub async fn health(State(app): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "project_active": app.project.is_active().await }))
}
