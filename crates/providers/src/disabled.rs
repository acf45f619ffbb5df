//! A provider that is never available, used when `model.provider = "none"`.

use async_trait::async_trait;
use codeclaw_core::error::ProviderError;
use codeclaw_core::provider::{CompletionRequest, Provider};

#[derive(Debug, Default)]
pub struct DisabledProvider;

#[async_trait]
impl Provider for DisabledProvider {
    fn name(&self) -> &str {
        "none"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<String, ProviderError> {
        Err(ProviderError::NotConfigured("model provider is disabled".into()))
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn never_healthy_never_completes() {
        let provider = DisabledProvider;
        assert!(!provider.health_check().await.unwrap());
        assert!(matches!(
            provider.complete(CompletionRequest::new("m", "p")).await,
            Err(ProviderError::NotConfigured(_))
        ));
    }
}
