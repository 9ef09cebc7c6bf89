//! Embedding provider trait and factory.

use colloquy_core::config::EmbeddingSettings;
use colloquy_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results.pop().ok_or_else(|| {
            AppError::GatewayUnavailable(format!(
                "{} returned no embedding",
                self.provider_name()
            ))
        })
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(settings: &EmbeddingSettings) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match settings.provider.as_str() {
        "mock" => Arc::new(super::providers::mock::MockProvider::new(settings.dimensions)),

        "ollama" => Arc::new(super::providers::ollama::OllamaProvider::new(
            settings.endpoint.as_deref(),
            &settings.model,
            settings.dimensions,
        )?),

        "openai" => {
            let api_key = settings.api_key().ok_or_else(|| {
                AppError::Config("OpenAI embeddings require an API key".to_string())
            })?;
            Arc::new(super::providers::openai::OpenAiProvider::new(
                settings.endpoint.as_deref(),
                api_key,
                &settings.model,
                settings.dimensions,
            )?)
        }

        _ => {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: '{}'. Supported providers: mock, ollama, openai",
                settings.provider
            )))
        }
    };

    tracing::debug!(
        "Created embedding provider: provider={}, model={}, dimensions={}",
        provider.provider_name(),
        provider.model_name(),
        provider.dimensions()
    );

    Ok(provider)
}
