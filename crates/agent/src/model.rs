//! Model client: the provider plus a cached health check, the response
//! cache and a hard timeout on every call.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use codeclaw_config::{CacheConfig, ModelConfig};
use codeclaw_core::error::ProviderError;
use codeclaw_core::provider::{CompletionRequest, Provider};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::ResponseCache;

pub struct ModelClient {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    health_ttl: Duration,
    health: Mutex<Option<(bool, Instant)>>,
    cache: ResponseCache,
}

impl ModelClient {
    pub fn new(provider: Arc<dyn Provider>, model: &ModelConfig, cache: &CacheConfig) -> Self {
        Self {
            provider,
            model: model.model.clone(),
            temperature: model.temperature,
            max_tokens: model.max_tokens,
            timeout: Duration::from_secs(model.timeout_secs),
            health_ttl: Duration::from_secs(model.health_check_ttl_secs),
            health: Mutex::new(None),
            cache: ResponseCache::from_config(cache),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Whether the provider answered its health check recently.
    ///
    /// The result is remembered for the health TTL; errors and timeouts
    /// count as unavailable.
    pub async fn is_available(&self) -> bool {
        if let Some((healthy, checked_at)) = *self.health.lock().unwrap_or_else(PoisonError::into_inner)
            && checked_at.elapsed() < self.health_ttl
        {
            return healthy;
        }

        let healthy = match tokio::time::timeout(self.timeout, self.provider.health_check()).await {
            Ok(Ok(healthy)) => healthy,
            Ok(Err(e)) => {
                debug!(provider = %self.provider.name(), error = %e, "Health check failed");
                false
            }
            Err(_) => {
                debug!(provider = %self.provider.name(), "Health check timed out");
                false
            }
        };

        *self.health.lock().unwrap_or_else(PoisonError::into_inner) = Some((healthy, Instant::now()));
        healthy
    }

    /// Complete `prompt`, consulting the response cache first.
    ///
    /// `role` separates cache namespaces (intent parsing vs. analysis);
    /// `files` is the context-file set the answer depends on.
    pub async fn complete(
        &self,
        role: &str,
        prompt: &str,
        system: Option<&str>,
        files: &[String],
    ) -> Result<String, ProviderError> {
        if let Some(cached) = self.cache.get(role, prompt, files) {
            return Ok(cached);
        }

        let mut request = CompletionRequest::new(&self.model, prompt)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);
        if let Some(system) = system {
            request = request.with_system(system);
        }

        let text = match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(provider = %self.provider.name(), timeout_secs = self.timeout.as_secs(), "Model call timed out");
                return Err(ProviderError::Timeout(format!(
                    "no response within {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let text = text.trim().to_string();
        self.cache.put(role, prompt, files, text.clone());
        Ok(text)
    }
}
