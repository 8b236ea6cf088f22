use async_trait::async_trait;

use crate::provider::{
    error::ProviderError,
    types::{Generation, GenerationRequest},
};

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError>;
}
