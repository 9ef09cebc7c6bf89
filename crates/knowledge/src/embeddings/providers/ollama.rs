//! Ollama embedding provider.
//!
//! Provides semantic embeddings via Ollama's local API using models like
//! nomic-embed-text. Ollama embeds one prompt per request, so batches are
//! sent sequentially. Transient failures are retried with exponential
//! backoff.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use colloquy_core::{AppError, AppResult};
use colloquy_llm::providers::{send_error, status_error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Maximum attempts per text
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Ollama embedding provider using the local API.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Only connection problems and rate limits are worth another attempt.
fn is_transient(err: &AppError) -> bool {
    matches!(
        err,
        AppError::GatewayUnavailable(_) | AppError::RateLimited(_)
    )
}

impl OllamaProvider {
    /// Create a provider for `model`, talking to `endpoint` or the local
    /// default daemon.
    pub fn new(endpoint: Option<&str>, model: &str, dimensions: usize) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client for Ollama: {}", e)))?;

        Ok(Self {
            client,
            base_url: endpoint
                .unwrap_or(DEFAULT_OLLAMA_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            dimensions,
        })
    }

    /// Embed single text with retry logic.
    #[instrument(skip(self, text), fields(text_len = text.len(), model = %self.model))]
    async fn embed_with_retries(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut attempt = 0;

        loop {
            match self.embed_single(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(e) if is_transient(&e) && attempt + 1 < MAX_RETRIES => {
                    attempt += 1;
                    let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                    warn!(
                        "Embedding failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt, MAX_RETRIES, backoff_ms, e
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Embed single text (no retries).
    async fn embed_single(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);

        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| send_error("Ollama", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|body| body.error)
                .unwrap_or(error_text);
            return Err(status_error("Ollama", status, &message));
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            AppError::GatewayUnavailable(format!("Failed to parse Ollama response: {}", e))
        })?;

        // Dimensionality is checked by the chunk store
        debug!("Received {} dimensional embedding", body.embedding.len());
        Ok(body.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        debug!("Embedding batch of {} texts", texts.len());

        let mut embeddings = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            // Ollama rejects blank prompts; a zero vector scores 0 against anything
            if text.trim().is_empty() {
                debug!("Blank text at index {} embedded as zero vector", i);
                embeddings.push(vec![0.0; self.dimensions]);
                continue;
            }

            embeddings.push(self.embed_with_retries(text).await?);
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_provider_creation() {
        let provider = OllamaProvider::new(None, "nomic-embed-text", 768).unwrap();
        assert_eq!(provider.base_url, "http://localhost:11434");
        assert_eq!(provider.dimensions(), 768);
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "nomic-embed-text");

        let custom = OllamaProvider::new(Some("http://gpu-box:11434/"), "m", 8).unwrap();
        assert_eq!(custom.base_url, "http://gpu-box:11434");
    }

    #[test]
    fn test_transient_errors() {
        assert!(is_transient(&AppError::GatewayUnavailable("down".into())));
        assert!(is_transient(&AppError::RateLimited("429".into())));
        assert!(!is_transient(&AppError::Generation("bad request".into())));
        assert!(!is_transient(&AppError::Indexing("dims".into())));
    }

    #[tokio::test]
    async fn test_blank_texts_skip_the_network() {
        // Nothing listens on this port; blank input must never reach it
        let provider = OllamaProvider::new(Some("http://127.0.0.1:9"), "m", 4).unwrap();
        let embeddings = provider
            .embed_batch(&["".to_string(), " \n".to_string()])
            .await
            .unwrap();

        assert_eq!(embeddings, vec![vec![0.0; 4], vec![0.0; 4]]);
    }

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(EmbeddingRequest {
            model: "nomic-embed-text",
            prompt: "hello",
        })
        .unwrap();
        assert_eq!(body["prompt"], "hello");
    }
}
