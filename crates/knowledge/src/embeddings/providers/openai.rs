//! OpenAI-compatible embedding provider (`/v1/embeddings`).

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use colloquy_core::{AppError, AppResult};
use colloquy_llm::providers::{send_error, status_error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedding provider for api.openai.com and compatible servers.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

// Hand-written so the key never lands in logs
impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    pub fn new(
        endpoint: Option<&str>,
        api_key: impl Into<String>,
        model: &str,
        dimensions: usize,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client for OpenAI: {}", e)))?;

        Ok(Self {
            client,
            base_url: endpoint
                .unwrap_or(DEFAULT_OPENAI_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.into(),
            model: model.to_string(),
            dimensions,
        })
    }

    async fn request(&self, input: Vec<&str>) -> AppResult<Vec<Vec<f32>>> {
        let expected = input.len();
        let url = format!("{}/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.trim())
            .json(&EmbeddingRequest {
                model: &self.model,
                input,
            })
            .send()
            .await
            .map_err(|e| send_error("OpenAI", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(status_error("OpenAI", status, &text));
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            AppError::GatewayUnavailable(format!("Failed to parse OpenAI response: {}", e))
        })?;

        into_ordered(body, expected)
    }
}

/// Order vectors by their `index` and check none is missing.
fn into_ordered(body: EmbeddingResponse, expected: usize) -> AppResult<Vec<Vec<f32>>> {
    let mut data = body.data;
    data.sort_by_key(|d| d.index);

    let in_order = data.iter().enumerate().all(|(i, d)| d.index == i);
    if data.len() != expected || !in_order {
        return Err(AppError::GatewayUnavailable(format!(
            "OpenAI returned {} embeddings for {} inputs",
            data.len(),
            expected
        )));
    }

    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        // The API rejects empty input strings; those become zero vectors
        let (blank, present): (Vec<usize>, Vec<usize>) =
            (0..texts.len()).partition(|&i| texts[i].trim().is_empty());

        let mut embeddings = vec![Vec::new(); texts.len()];
        for i in blank {
            embeddings[i] = vec![0.0; self.dimensions];
        }

        if !present.is_empty() {
            tracing::debug!("Requesting {} embeddings from OpenAI", present.len());
            let input: Vec<&str> = present.iter().map(|&i| texts[i].as_str()).collect();
            let vectors = self.request(input).await?;
            for (i, vector) in present.into_iter().zip(vectors) {
                embeddings[i] = vector;
            }
        }

        Ok(embeddings)
    }
}
