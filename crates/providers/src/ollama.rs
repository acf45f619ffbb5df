//! Ollama provider for a local model server.
//!
//! Uses the native API rather than the OpenAI shim:
//! - `GET  /api/tags`     health check (any 200 means the server is up)
//! - `POST /api/generate` non-streaming completion

use async_trait::async_trait;
use codeclaw_core::error::ProviderError;
use codeclaw_core::provider::{CompletionRequest, Provider};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::openai_compat::network_error;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: Option<&str>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url
                .unwrap_or(DEFAULT_OLLAMA_URL)
                .trim_end_matches('/')
                .to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_body(request: &CompletionRequest) -> serde_json::Value {
        let mut options = serde_json::json!({ "temperature": request.temperature });
        if let Some(max_tokens) = request.max_tokens {
            options["num_predict"] = serde_json::json!(max_tokens);
        }

        let mut body = serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
            "options": options,
        });
        if let Some(system) = &request.system {
            body["system"] = serde_json::json!(system);
        }
        body
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(model = %request.model, "Sending ollama generate request");

        let response = self
            .client
            .post(&url)
            .json(&Self::request_body(&request))
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Ollama returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        Ok(generated.response)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await.map_err(network_error)?;
        Ok(response.status().is_success())
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}
