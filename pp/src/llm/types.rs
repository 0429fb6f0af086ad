//! LLM request/response types for PrdPilot
//!
//! Every generation task is a single fully-rendered prompt in, text out.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::PilotError;

/// Default cap on output tokens for one completion
pub const DEFAULT_MAX_TOKENS: u32 = 8000;

/// The closed set of LLM backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Ollama => "ollama",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = PilotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "Provider::from_str: called");
        match s {
            "google" => Ok(Provider::Google),
            "ollama" => Ok(Provider::Ollama),
            other => Err(PilotError::Configuration(format!(
                "Proveedor de LLM no válido: '{}'. Valores admitidos: google, ollama",
                other
            ))),
        }
    }
}

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Fully rendered prompt
    pub prompt: String,

    /// Max tokens for response (capped by provider config)
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Response from a completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    /// Generated text
    pub content: String,

    /// Token usage for this request
    pub usage: TokenUsage,
}

impl CompletionResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: TokenUsage::default(),
        }
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!("google".parse::<Provider>().unwrap(), Provider::Google);
        assert_eq!("ollama".parse::<Provider>().unwrap(), Provider::Ollama);
    }

    #[test]
    fn test_provider_parse_rejects_unknown() {
        for bad in ["openai", "Google", "", " ollama"] {
            let err = bad.parse::<Provider>().unwrap_err();
            assert!(matches!(err, PilotError::Configuration(_)), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_provider_display_roundtrip() {
        for p in [Provider::Google, Provider::Ollama] {
            assert_eq!(p.to_string().parse::<Provider>().unwrap(), p);
        }
    }

    #[test]
    fn test_usage_total() {
        let usage = TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
        };
        assert_eq!(usage.total(), 15);
    }
}
