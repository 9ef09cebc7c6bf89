//! OpenAI-compatible chat completions provider.
//!
//! Works against api.openai.com and any server exposing the same
//! `/v1/chat/completions` contract. Streaming uses server-sent events.

use super::{lines, send_error, status_error};
use crate::client::{ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use colloquy_core::{AppError, AppResult};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

/// Default base URL, including the API version segment.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<UsageBody>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageBody {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// One `data:` event of a streamed completion.
#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Parsed server-sent event line.
#[derive(Debug, PartialEq)]
enum SseLine {
    Data(String),
    Done,
    Ignored,
}

fn parse_sse_line(line: &str) -> SseLine {
    match line.strip_prefix("data:") {
        Some(data) => {
            let data = data.trim();
            if data == "[DONE]" {
                SseLine::Done
            } else {
                SseLine::Data(data.to_string())
            }
        }
        // Comments, event names and retry hints carry no content
        None => SseLine::Ignored,
    }
}

/// OpenAI-compatible chat client.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_OPENAI_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn to_chat_request<'a>(&self, request: &'a LlmRequest, stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream,
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
        }
    }

    async fn send(&self, request: &LlmRequest, stream: bool) -> AppResult<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.trim())
            .json(&self.to_chat_request(request, stream))
            .send()
            .await
            .map_err(|e| send_error("OpenAI", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(status_error("OpenAI", status, &text));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(
            "Sending completion request to OpenAI ({} messages)",
            request.messages.len()
        );

        let parsed: ChatResponse = self
            .send(request, false)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to parse OpenAI response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::Generation("OpenAI returned no choices".to_string()))?;

        let usage = parsed
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: parsed.model,
            usage,
            done: true,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::debug!(
            "Starting streaming request to OpenAI ({} messages)",
            request.messages.len()
        );

        let response = self.send(request, true).await?;
        let mut lines = Box::pin(lines("OpenAI", response.bytes_stream()));

        let stream = async_stream::try_stream! {
            let mut model = String::new();
            let mut finished = false;

            while let Some(line) = lines.next().await {
                let line = line?;
                let data = match parse_sse_line(&line) {
                    SseLine::Data(data) => data,
                    SseLine::Done => {
                        finished = true;
                        break;
                    }
                    SseLine::Ignored => continue,
                };

                let event: StreamEvent = serde_json::from_str(&data)
                    .map_err(|e| AppError::Generation(format!("Failed to parse chunk: {}", e)))?;
                if !event.model.is_empty() {
                    model = event.model;
                }

                for choice in event.choices {
                    if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                        yield LlmStreamChunk::fragment(content, model.clone());
                    }
                    if choice.finish_reason.is_some() {
                        finished = true;
                    }
                }
            }

            if !finished {
                Err::<(), AppError>(AppError::Generation(
                    "OpenAI stream ended before completion".to_string(),
                ))?;
            }

            yield LlmStreamChunk {
                content: String::new(),
                model,
                done: true,
                usage: None,
            };
        };

        Ok(Box::pin(stream))
    }
}
