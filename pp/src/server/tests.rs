use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use contextstore::{ERROR_TREE_NAME, FileTree, HashingEmbedder};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use super::*;
use crate::config::IndexConfig;
use crate::llm::client::mock::MockLlmClient;
use crate::llm::{FixedClient, LlmClient, Provider};
use crate::project::ProjectIndexer;
use crate::project::stub::StubContext;
use crate::prompts::PromptLoader;
use crate::store::{MemoryStore, SessionRepo};

struct Harness {
    app: AppState,
    mock: Arc<MockLlmClient>,
    project: Arc<StubContext>,
    temp: TempDir,
}

fn harness(mock: MockLlmClient) -> Harness {
    let temp = TempDir::new().unwrap();
    let mock = Arc::new(mock);
    let client: Arc<dyn LlmClient> = mock.clone();
    let index_config = IndexConfig {
        store_dir: temp.path().join("index"),
        chunk_size: 256,
        chunk_overlap: 16,
        synthesize: false,
        ..Default::default()
    };

    let app = AppState {
        default_provider: Provider::Google,
        repo: SessionRepo::new(Arc::new(MemoryStore::new())),
        project: ProjectSlot::default(),
        clients: Arc::new(FixedClient(client)),
        prompts: Arc::new(PromptLoader::embedded_only()),
        indexer: Arc::new(ProjectIndexer::new(index_config, Arc::new(HashingEmbedder::new(64)), None)),
    };

    Harness {
        app,
        mock,
        project: Arc::new(StubContext::new("src/lib.rs expone la API pública")),
        temp,
    }
}

impl Harness {
    async fn activate_stub(&self) {
        let mut tree = FileTree::dir("demo");
        tree.insert_path(&["src".to_string(), "lib.rs".to_string()]);
        self.app
            .project
            .replace(ActiveProject {
                context: self.project.clone(),
                tree,
            })
            .await;
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(self.app.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn start(&self) -> String {
        let (status, body) = self
            .post(
                "/start_conversation",
                json!({
                    "initial_description": "Queremos exportar facturas a PDF",
                    "template_type": "feature.md",
                    "llm_provider": "ollama",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        body["session_id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_reports_project() {
    let h = harness(MockLlmClient::always("ok"));
    let (_, body) = h.get("/health").await;
    assert_eq!(body["project_active"], false);

    h.activate_stub().await;
    let (status, body) = h.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["project_active"], true);
}

#[tokio::test]
async fn test_start_requires_indexed_project() {
    let h = harness(MockLlmClient::always("¿Pregunta?"));
    let (status, body) = h
        .post("/start_conversation", json!({ "template_type": "feature.md" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Por favor, indexa un proyecto primero.");
    assert_eq!(h.mock.call_count(), 0);
}

#[tokio::test]
async fn test_unknown_provider_is_configuration_error() {
    let h = harness(MockLlmClient::always("¿Pregunta?"));
    h.activate_stub().await;

    let (status, body) = h
        .post(
            "/start_conversation",
            json!({ "template_type": "feature.md", "llm_provider": "openai" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("openai"));
    assert_eq!(h.mock.call_count(), 0);
}

#[tokio::test]
async fn test_full_session_flow() {
    let h = harness(MockLlmClient::replies(&[
        "¿Qué problema resuelve?",
        "¿Qué formato de página?",
        "# PRD Exportación\n\nResumen",
        "Como contable, quiero exportar...",
        "# Plan Técnico\n1. Añadir crate de PDF",
        "Usa src/lib.rs",
        "- Exportar facturas",
        "## Brief",
    ]));
    h.activate_stub().await;

    let session = h.start().await;

    let (_, body) = h.get(&format!("/project_tree/{}", session)).await;
    assert_eq!(body["tree"]["name"], "demo");

    let (_, body) = h
        .post(
            "/send_message",
            json!({ "session_id": session, "user_message": "Para los contables" }),
        )
        .await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["ai_response"], "¿Qué formato de página?");

    let history = h.app.repo.pm_history(&session).await.unwrap();
    assert_eq!(history.len(), 4);
    assert!(history[0].metadata().is_some());

    let (_, body) = h
        .post(
            "/generate_documents",
            json!({ "session_id": session, "template_type": "feature.md" }),
        )
        .await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["prd"], "# PRD Exportación\n\nResumen");
    assert_eq!(body["user_stories"], "# Historias de Usuario\nComo contable, quiero exportar...");
    assert_eq!(body["technical_plan"], "# Plan Técnico\n1. Añadir crate de PDF");

    let (status, body) = h.get(&format!("/documents/{}", session)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prd"], json!(["# PRD Exportación", "Resumen"]));

    let (_, body) = h
        .post(
            "/developer_chat",
            json!({ "session_id": session, "developer_message": "¿Dónde empiezo?" }),
        )
        .await;
    assert_eq!(body["ai_response"], "Usa src/lib.rs");
    assert_eq!(h.app.repo.developer_history(&session).await.unwrap().len(), 2);

    let (_, body) = h
        .post("/summarize_developer_chat", json!({ "session_id": session }))
        .await;
    assert_eq!(body["summary"], "- Exportar facturas");

    let (_, body) = h
        .post("/generate_code_agent_brief", json!({ "session_id": session }))
        .await;
    assert_eq!(body["brief"], "## Brief");

    let prompts = h.mock.prompts();
    assert_eq!(prompts.len(), 8);
    assert!(prompts[1].contains("PM: Para los contables"));

    let (_, body) = h.post("/reset_session", json!({ "session_id": session })).await;
    assert_eq!(body["status"], "success");
    let (status, _) = h.get(&format!("/documents/{}", session)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_developer_chat_before_documents_is_precondition() {
    let h = harness(MockLlmClient::always("¿Pregunta?"));
    h.activate_stub().await;
    let session = h.start().await;
    let calls_after_start = h.mock.call_count();

    let (status, body) = h
        .post(
            "/developer_chat",
            json!({ "session_id": session, "developer_message": "¿Qué hago?" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert_eq!(
        body["message"],
        "Por favor, genera los documentos antes de continuar con el desarrollador."
    );
    assert_eq!(h.mock.call_count(), calls_after_start);
    assert!(h.app.repo.developer_history(&session).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_brief_requires_developer_chat() {
    let h = harness(MockLlmClient::always("texto"));
    h.activate_stub().await;
    let session = h.start().await;
    h.post(
        "/generate_documents",
        json!({ "session_id": session, "template_type": "prd.md" }),
    )
    .await;

    let (_, body) = h
        .post("/generate_code_agent_brief", json!({ "session_id": session }))
        .await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "No hay conversación con el desarrollador para esta sesión.");
}

#[tokio::test]
async fn test_unknown_session() {
    let h = harness(MockLlmClient::always("texto"));
    h.activate_stub().await;

    let (_, body) = h
        .post("/send_message", json!({ "session_id": "nope", "user_message": "hola" }))
        .await;
    assert_eq!(body["message"], "Sesión no encontrada.");

    let (_, body) = h
        .post(
            "/generate_documents",
            json!({ "session_id": "nope", "template_type": "prd.md" }),
        )
        .await;
    assert_eq!(body["message"], "Sesión no encontrada o proyecto no indexado.");

    let (status, body) = h.get("/project_tree/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
    assert_eq!(h.mock.call_count(), 0);
}

#[tokio::test]
async fn test_index_project_activates_real_index() {
    let h = harness(MockLlmClient::always("¿Pregunta?"));
    let project = h.temp.path().join("app");
    std::fs::create_dir_all(project.join("src")).unwrap();
    std::fs::write(project.join("src/main.rs"), "fn main() { println!(\"hola\"); }\n").unwrap();

    let (status, body) = h
        .post("/index_project", json!({ "project_path": project, "force_index": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Proyecto indexado con éxito.");

    let session = h.start().await;
    let (_, body) = h.get(&format!("/project_tree/{}", session)).await;
    assert_eq!(body["tree"]["name"], "app");
}

#[tokio::test]
async fn test_index_missing_path_degrades_to_error_tree() {
    let h = harness(MockLlmClient::always("¿Pregunta?"));
    let missing = h.temp.path().join("does-not-exist");

    let (status, body) = h
        .post("/index_project", json!({ "project_path": missing, "force_index": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Proyecto indexado con éxito.");

    let session = h.start().await;
    let (_, body) = h.get(&format!("/project_tree/{}", session)).await;
    assert_eq!(
        body["tree"],
        json!({ "name": ERROR_TREE_NAME, "type": "dir", "children": [] })
    );
}

#[tokio::test]
async fn test_server_starts_without_embedding_key() {
    let mut h = harness(MockLlmClient::always("¿Pregunta?"));
    let mut config = crate::config::Config::default();
    config.llm.default = Provider::Ollama;
    config.llm.google.api_key_env = "PRDPILOT_TEST_UNSET_GOOGLE_KEY".to_string();
    config.index.store_dir = h.temp.path().join("index");
    config.index.synthesize = false;
    h.app = AppState::from_config(&config).unwrap();

    let (status, body) = h.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let project = h.temp.path().join("app");
    std::fs::create_dir_all(&project).unwrap();
    let (status, body) = h.post("/index_project", json!({ "project_path": project })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body["detail"]
            .as_str()
            .unwrap()
            .starts_with("Error durante la indexación: Failed to create embedding client")
    );
}
