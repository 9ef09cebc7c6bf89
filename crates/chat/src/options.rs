//! Model settings shared by the rewriter and the answer generator.

use colloquy_core::config::LlmSettings;
use colloquy_llm::{ChatMessage, LlmRequest};

/// Model and sampling settings applied to every generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOptions {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ModelOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self {
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }

    /// Non-streaming request for `messages`.
    pub fn request(&self, messages: Vec<ChatMessage>) -> LlmRequest {
        LlmRequest::new(messages, self.model.clone()).with_sampling(self.temperature, self.max_tokens)
    }
}
