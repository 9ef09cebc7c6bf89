//! Ollama LLM provider implementation.
//!
//! This module provides integration with Ollama, a local LLM runtime, through
//! its chat endpoint.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use super::{lines, send_error, status_error};
use crate::client::{ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use colloquy_core::{AppError, AppResult};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

/// Default URL of a local Ollama daemon.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Ollama chat request format.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "OllamaOptions::is_empty")]
    options: OllamaOptions,
}

#[derive(Debug, Default, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

impl OllamaOptions {
    fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.top_p.is_none() && self.num_predict.is_none()
    }
}

/// Ollama chat response format (one object per NDJSON line when streaming).
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

impl OllamaChatResponse {
    fn usage(&self) -> LlmUsage {
        LlmUsage::new(
            self.prompt_eval_count.unwrap_or(0),
            self.eval_count.unwrap_or(0),
        )
    }

    fn into_chunk(self) -> AppResult<LlmStreamChunk> {
        let usage = self.done.then(|| self.usage());

        if let Some(error) = self.error {
            return Err(AppError::Generation(format!("Ollama stream error: {}", error)));
        }

        Ok(LlmStreamChunk {
            content: self.message.map(|m| m.content).unwrap_or_default(),
            model: self.model,
            done: self.done,
            usage,
        })
    }
}

/// Ollama LLM client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with default settings.
    ///
    /// Default URL: http://localhost:11434
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_OLLAMA_URL)
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Convert LlmRequest to Ollama format.
    fn to_ollama_request<'a>(&self, request: &'a LlmRequest, stream: bool) -> OllamaChatRequest<'a> {
        OllamaChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream,
            options: OllamaOptions {
                temperature: request.temperature,
                top_p: request.top_p,
                num_predict: request.max_tokens,
            },
        }
    }

    async fn send(&self, request: &LlmRequest, stream: bool) -> AppResult<reqwest::Response> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&self.to_ollama_request(request, stream))
            .send()
            .await
            .map_err(|e| send_error("Ollama", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error("Ollama", status, &error_text));
        }

        Ok(response)
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(
            "Sending completion request to Ollama ({} messages)",
            request.messages.len()
        );

        let response = self.send(request, false).await?;

        // For non-streaming, Ollama returns a single JSON object
        let body: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to parse Ollama response: {}", e)))?;

        let usage = body.usage();
        let chunk = body.into_chunk()?;

        tracing::debug!("Received completion from Ollama");

        Ok(LlmResponse {
            content: chunk.content,
            model: chunk.model,
            usage,
            done: chunk.done,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::debug!(
            "Starting streaming request to Ollama ({} messages)",
            request.messages.len()
        );

        let response = self.send(request, true).await?;
        let mut lines = Box::pin(lines("Ollama", response.bytes_stream()));

        // Ollama sends newline-delimited JSON and marks the last object with done=true
        let stream = async_stream::try_stream! {
            let mut finished = false;
            while let Some(line) = lines.next().await {
                let line = line?;
                let parsed: OllamaChatResponse = serde_json::from_str(&line)
                    .map_err(|e| AppError::Generation(format!("Failed to parse chunk: {}", e)))?;
                let chunk = parsed.into_chunk()?;
                finished = chunk.done;
                yield chunk;
                if finished {
                    break;
                }
            }

            if !finished {
                Err::<(), AppError>(AppError::Generation(
                    "Ollama stream ended before completion".to_string(),
                ))?;
            }
        };

        Ok(Box::pin(stream))
    }
}
