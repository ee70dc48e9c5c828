use anyhow::Result;
use async_trait::async_trait;
use kairos_core::{GeminiClient, GenerationRequest};

/// The model the relay forwards to
#[async_trait]
pub trait Upstream: Send + Sync {
    /// `Ok(None)` when the model produced no text
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>>;
}

#[async_trait]
impl Upstream for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>> {
        Ok(GeminiClient::generate(self, request).await?)
    }
}
