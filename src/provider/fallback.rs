use std::sync::Arc;

use crate::provider::{
    error::{ProviderError, unavailable},
    mock::MockProvider,
    ports::LlmProvider,
    types::{Generation, GenerationRequest},
};

/// Tries each configured provider in order, then the offline mock when allowed.
pub struct FallbackGenerator {
    providers: Vec<Arc<dyn LlmProvider>>,
    mock: Option<MockProvider>,
}

impl FallbackGenerator {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>, mock_fallback: bool) -> Self {
        Self {
            providers,
            mock: mock_fallback.then_some(MockProvider),
        }
    }

    pub fn provider_ids(&self) -> Vec<String> {
        self.providers
            .iter()
            .map(|provider| provider.id().to_string())
            .collect()
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        let mut last_error = None;
        for provider in &self.providers {
            match provider.generate(request).await {
                Ok(generation) => return Ok(generation),
                Err(err) => {
                    tracing::warn!(
                        target: "provider",
                        provider_id = provider.id(),
                        error = %err,
                        "provider_failed_trying_next"
                    );
                    last_error = Some(err);
                }
            }
        }

        match &self.mock {
            Some(mock) => {
                let mut generation = mock.generate(request).await?;
                // Only a fallback if a real provider was configured and failed.
                generation.fallback_used = !self.providers.is_empty();
                Ok(generation)
            }
            None => Err(last_error.unwrap_or_else(|| unavailable("no generation provider configured"))),
        }
    }
}
