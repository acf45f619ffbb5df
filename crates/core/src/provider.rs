//! Provider trait: the abstraction over remote model backends.
//!
//! A Provider takes a prompt (plus an optional system/style string) and
//! returns a text completion, or signals that it is unavailable. The agent
//! treats every completion as untrusted text.
//!
//! Implementations: Ollama, OpenAI-compatible endpoints, and a disabled
//! provider for offline use.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// A single completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "llama3.2", "gpt-4o-mini")
    pub model: String,

    /// The user prompt
    pub prompt: String,

    /// Optional system / style instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Temperature (0.0 = deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.1
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            temperature: default_temperature(),
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// The core Provider trait.
///
/// Every model backend implements this trait. The agent calls `complete()`
/// without knowing which backend is answering.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "ollama", "openai").
    fn name(&self) -> &str;

    /// Send a request and get the completion text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}
