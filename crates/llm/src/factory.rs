//! LLM provider factory.
//!
//! Resolves the configured provider name into a shared client.

use crate::client::LlmClient;
use crate::providers::{ollama::DEFAULT_OLLAMA_URL, openai::DEFAULT_OPENAI_URL};
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use colloquy_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "openai")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by OpenAI-compatible servers
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required key
/// is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown LLM provider: {}", provider)))?;

    let api_key = match api_key.filter(|k| !k.trim().is_empty()) {
        Some(key) => key,
        None if provider_type.requires_api_key() => {
            return Err(AppError::Config(format!(
                "{} provider requires an API key",
                provider_type
            )));
        }
        None => "",
    };

    let client: Arc<dyn LlmClient> = match provider_type {
        ProviderType::Ollama => {
            Arc::new(OllamaClient::with_base_url(endpoint.unwrap_or(DEFAULT_OLLAMA_URL)))
        }
        ProviderType::OpenAI => Arc::new(OpenAiClient::with_base_url(
            api_key,
            endpoint.unwrap_or(DEFAULT_OPENAI_URL),
        )),
    };

    tracing::debug!(provider = client.provider_name(), "Created LLM client");
    Ok(client)
}
