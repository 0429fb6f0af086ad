//! Remote embedding clients for the project index

use async_trait::async_trait;
use contextstore::{Embedder, HashingEmbedder};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::LlmError;
use super::http::post_json;
use crate::config::{EmbeddingConfig, EmbeddingProvider, LlmConfig};
use crate::llm::Provider;

/// batchEmbedContents accepts at most this many requests per call
const GOOGLE_BATCH_SIZE: usize = 100;

/// Gemini `batchEmbedContents` embedder
pub struct GoogleEmbedder {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    timeout: Duration,
}

impl GoogleEmbedder {
    pub fn new(model: String, llm: &LlmConfig) -> Result<Self, LlmError> {
        let resolved = llm.resolve(Provider::Google);
        let api_key = resolved
            .get_api_key()?
            .ok_or_else(|| LlmError::MissingApiKey(llm.google.api_key_env.clone()))?;
        let timeout = Duration::from_millis(resolved.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: model.trim_start_matches("models/").to_string(),
            api_key,
            base_url: resolved.base_url.trim_end_matches('/').to_string(),
            http,
            timeout,
        })
    }

    fn build_request_body(&self, texts: &[String]) -> serde_json::Value {
        let requests: Vec<serde_json::Value> = texts
            .iter()
            .map(|t| {
                serde_json::json!({
                    "model": format!("models/{}", self.model),
                    "content": { "parts": [{ "text": t }] },
                })
            })
            .collect();
        serde_json::json!({ "requests": requests })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let url = format!("{}/v1beta/models/{}:batchEmbedContents", self.base_url, self.model);
        let headers = [("x-goog-api-key", self.api_key.clone())];
        let body = self.build_request_body(texts);

        let response = post_json(&self.http, &url, &headers, &body, self.timeout).await?;
        let parsed: GoogleEmbedResponse = response.json().await?;
        let vectors: Vec<Vec<f32>> = parsed.embeddings.into_iter().map(|e| e.values).collect();

        if vectors.len() != texts.len() {
            return Err(LlmError::InvalidResponse(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for GoogleEmbedder {
    async fn embed(&self, texts: &[String]) -> eyre::Result<Vec<Vec<f32>>> {
        debug!(count = texts.len(), model = %self.model, "GoogleEmbedder::embed: called");
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(GOOGLE_BATCH_SIZE) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Deserialize)]
struct GoogleEmbedResponse {
    #[serde(default)]
    embeddings: Vec<GoogleEmbedding>,
}

#[derive(Debug, Deserialize)]
struct GoogleEmbedding {
    values: Vec<f32>,
}

/// Ollama `/api/embed` embedder
pub struct OllamaEmbedder {
    model: String,
    base_url: String,
    http: Client,
    timeout: Duration,
}

impl OllamaEmbedder {
    pub fn new(model: String, llm: &LlmConfig) -> Result<Self, LlmError> {
        let resolved = llm.resolve(Provider::Ollama);
        let timeout = Duration::from_millis(resolved.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model,
            base_url: resolved.base_url.trim_end_matches('/').to_string(),
            http,
            timeout,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> eyre::Result<Vec<Vec<f32>>> {
        debug!(count = texts.len(), model = %self.model, "OllamaEmbedder::embed: called");
        let url = format!("{}/api/embed", self.base_url);
        let body = serde_json::json!({ "model": self.model, "input": texts });

        let response = post_json(&self.http, &url, &[], &body, self.timeout).await?;
        let parsed: OllamaEmbedResponse = response.json().await.map_err(LlmError::Network)?;

        if parsed.embeddings.len() != texts.len() {
            return Err(LlmError::InvalidResponse(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            ))
            .into());
        }
        Ok(parsed.embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

/// Create the embedder selected by configuration
pub fn create_embedder(config: &EmbeddingConfig, llm: &LlmConfig) -> Result<Arc<dyn Embedder>, LlmError> {
    debug!(provider = ?config.provider, "create_embedder: called");
    let model = config.model_or_default();
    match config.provider {
        EmbeddingProvider::Google => Ok(Arc::new(GoogleEmbedder::new(model, llm)?)),
        EmbeddingProvider::Ollama => Ok(Arc::new(OllamaEmbedder::new(model, llm)?)),
        EmbeddingProvider::Local => Ok(Arc::new(HashingEmbedder::new(config.dimensions))),
    }
}
