//! LLM Client module for PrdPilot
//!
//! Provides completion and embedding clients for the two supported providers.

use std::sync::Arc;

use tracing::{debug, warn};

pub mod client;
mod embed;
mod error;
mod google;
mod http;
mod ollama;
mod types;

pub use client::LlmClient;
pub use embed::{GoogleEmbedder, OllamaEmbedder, create_embedder};
pub use error::LlmError;
pub use google::GoogleClient;
pub use ollama::OllamaClient;
pub use types::{CompletionRequest, CompletionResponse, DEFAULT_MAX_TOKENS, Provider, TokenUsage};

use crate::config::LlmConfig;

/// Create an LLM client for the given provider
///
/// Adding a provider variant makes this match non-exhaustive, so every
/// provider is guaranteed a client.
pub fn create_client(provider: Provider, config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let resolved = config.resolve(provider);
    debug!(%provider, model = %resolved.model, "create_client: called");
    match provider {
        Provider::Google => Ok(Arc::new(GoogleClient::from_config(&resolved)?)),
        Provider::Ollama => Ok(Arc::new(OllamaClient::from_config(&resolved)?)),
    }
}

/// User-facing text shown in place of a failed generation
pub fn diagnostic(task: &str, error: &LlmError) -> String {
    format!(
        "Error al generar {} con el LLM: {}. Por favor, verifica tu clave de API y la disponibilidad del modelo.",
        task, error
    )
}

/// Run one completion and return the trimmed text.
///
/// A failed completion never propagates: the diagnostic for `task` is
/// returned in its place so the caller can store it like any other reply.
pub async fn complete_or_diagnose(llm: &dyn LlmClient, prompt: String, task: &str) -> String {
    debug!(%task, prompt_len = prompt.len(), model = %llm.model(), "complete_or_diagnose: called");
    match llm.complete(CompletionRequest::new(prompt)).await {
        Ok(response) => response.content.trim().to_string(),
        Err(e) => {
            warn!(%task, error = %e, "LLM completion failed, returning diagnostic");
            diagnostic(task, &e)
        }
    }
}

/// Resolves a per-call provider to a client
pub trait ClientFactory: Send + Sync {
    fn client(&self, provider: Provider) -> Result<Arc<dyn LlmClient>, LlmError>;
}

/// Factory that builds real HTTP clients from configuration
pub struct ConfiguredClients {
    config: LlmConfig,
}

impl ConfiguredClients {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }
}

impl ClientFactory for ConfiguredClients {
    fn client(&self, provider: Provider) -> Result<Arc<dyn LlmClient>, LlmError> {
        create_client(provider, &self.config)
    }
}

/// Factory that hands out one fixed client for every provider
pub struct FixedClient(pub Arc<dyn LlmClient>);

impl ClientFactory for FixedClient {
    fn client(&self, _provider: Provider) -> Result<Arc<dyn LlmClient>, LlmError> {
        Ok(self.0.clone())
    }
}
