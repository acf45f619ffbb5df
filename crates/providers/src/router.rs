//! Provider selection from configuration.

use std::sync::Arc;
use std::time::Duration;

use codeclaw_config::ModelConfig;
use codeclaw_core::provider::Provider;
use tracing::{info, warn};

use crate::disabled::DisabledProvider;
use crate::ollama::OllamaProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the configured provider.
///
/// Unknown provider names fall back to [`DisabledProvider`] so the agent
/// still runs on its rule-based tier.
pub fn build_from_config(config: &ModelConfig) -> Arc<dyn Provider> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let name = config.provider.to_ascii_lowercase();

    let provider: Arc<dyn Provider> = match name.as_str() {
        "ollama" => Arc::new(OllamaProvider::new(config.base_url.as_deref(), timeout)),
        "none" | "off" | "disabled" => Arc::new(DisabledProvider),
        other => match default_base_url(other).or(config.base_url.clone()) {
            Some(default_url) => {
                let base_url = config.base_url.clone().unwrap_or(default_url);
                let api_key = config.api_key.clone().unwrap_or_default();
                Arc::new(OpenAiCompatProvider::new(other, base_url, api_key, timeout))
            }
            None => {
                warn!(provider = %other, "Unknown model provider, running without a model");
                Arc::new(DisabledProvider)
            }
        },
    };

    info!(provider = %provider.name(), model = %config.model, "Model provider selected");
    provider
}

/// Get the default base URL for well-known OpenAI-compatible providers.
fn default_base_url(provider_name: &str) -> Option<String> {
    let url = match provider_name {
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url.into())
}
