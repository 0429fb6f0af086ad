//! PrdPilot configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::llm::{LlmError, Provider};

/// Main PrdPilot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default log level (CLI --log-level wins)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Embedding backend used for the project index
    pub embedding: EmbeddingConfig,

    /// Project index configuration
    pub index: IndexConfig,

    /// Prompt and document skeleton locations
    pub prompts: PromptsConfig,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Session store configuration
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .prdpilot.yml
        let local_config = PathBuf::from(".prdpilot.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/prdpilot/prdpilot.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("prdpilot").join("prdpilot.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Peek at the configured log level before logging is initialised.
    ///
    /// Errors are swallowed here; the full `load` reports them once logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider used when a request does not name one
    pub default: Provider,

    /// Google Gemini settings
    pub google: GoogleConfig,

    /// Ollama settings
    pub ollama: OllamaConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default: Provider::Google,
            google: GoogleConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl LlmConfig {
    /// Flatten the settings of one provider
    pub fn resolve(&self, provider: Provider) -> ResolvedLlmConfig {
        match provider {
            Provider::Google => ResolvedLlmConfig {
                provider,
                model: self.google.model.clone(),
                api_key_env: Some(self.google.api_key_env.clone()),
                base_url: self.google.base_url.clone(),
                max_tokens: self.google.max_tokens,
                timeout_ms: self.google.timeout_ms,
            },
            Provider::Ollama => ResolvedLlmConfig {
                provider,
                model: self.ollama.model.clone(),
                api_key_env: None,
                base_url: self.ollama.base_url.clone(),
                max_tokens: self.ollama.max_tokens,
                timeout_ms: self.ollama.timeout_ms,
            },
        }
    }
}

/// Google Gemini settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum output tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            max_tokens: 8000,
            timeout_ms: 120_000,
        }
    }
}

/// Ollama settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Model identifier
    pub model: String,

    /// Server base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens to predict per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            model: "gemma3n:e2b".to_string(),
            base_url: "http://localhost:11434".to_string(),
            max_tokens: 8000,
            timeout_ms: 360_000,
        }
    }
}

/// Settings for a single provider, flattened from `LlmConfig`
#[derive(Debug, Clone)]
pub struct ResolvedLlmConfig {
    pub provider: Provider,
    pub model: String,
    pub api_key_env: Option<String>,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl ResolvedLlmConfig {
    /// Read the API key from the environment, if this provider needs one
    pub fn get_api_key(&self) -> Result<Option<String>, LlmError> {
        match &self.api_key_env {
            Some(var) => std::env::var(var)
                .map(Some)
                .map_err(|_| LlmError::MissingApiKey(var.clone())),
            None => Ok(None),
        }
    }
}

/// Embedding backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Google,
    Ollama,
    /// Offline feature hashing, no network
    Local,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,

    /// Model identifier; provider default when unset
    pub model: Option<String>,

    /// Vector size for the local hashing embedder
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Google,
            model: None,
            dimensions: 256,
        }
    }
}

impl EmbeddingConfig {
    pub fn model_or_default(&self) -> String {
        if let Some(model) = &self.model {
            return model.clone();
        }
        match self.provider {
            EmbeddingProvider::Google => "text-embedding-004".to_string(),
            EmbeddingProvider::Ollama => "nomic-embed-text".to_string(),
            EmbeddingProvider::Local => "local-hashing".to_string(),
        }
    }
}

/// Project index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding vector collections
    #[serde(rename = "store-dir")]
    pub store_dir: PathBuf,

    /// Collection used for the active project
    pub collection: String,

    /// Chunk size in characters
    #[serde(rename = "chunk-size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(rename = "chunk-overlap")]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per query
    #[serde(rename = "top-k")]
    pub top_k: usize,

    /// Files larger than this are not ingested
    #[serde(rename = "max-file-bytes")]
    pub max_file_bytes: u64,

    /// Condense retrieved chunks with the default LLM
    pub synthesize: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/prdpilot on Linux)
        let store_dir = dirs::data_local_dir()
            .map(|d| d.join("prdpilot").join("index"))
            .unwrap_or_else(|| PathBuf::from(".prdpilot/index"));

        Self {
            store_dir,
            collection: contextstore::DEFAULT_COLLECTION.to_string(),
            chunk_size: contextstore::DEFAULT_CHUNK_SIZE,
            chunk_overlap: contextstore::DEFAULT_OVERLAP,
            top_k: 5,
            max_file_bytes: 1024 * 1024,
            synthesize: true,
        }
    }
}

/// Prompt and document skeleton locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Override directory for `.pmt` prompt files
    pub dir: PathBuf,

    /// Directory holding document skeletons (`prd.md`, `feature.md`)
    #[serde(rename = "templates-dir")]
    pub templates_dir: PathBuf,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("templates/prompts"),
            templates_dir: PathBuf::from("templates"),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Session store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

/// Session store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Database file for the sqlite backend
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let path = dirs::data_local_dir()
            .map(|d| d.join("prdpilot").join("sessions.db"))
            .unwrap_or_else(|| PathBuf::from(".prdpilot/sessions.db"));

        Self {
            backend: StoreBackend::Memory,
            path,
        }
    }
}
