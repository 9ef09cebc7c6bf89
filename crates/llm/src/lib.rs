//! Generation gateway for Colloquy.
//!
//! This crate provides a provider-agnostic abstraction for chat completion
//! models, with a buffered mode (`complete`) and a streaming mode (`stream`).
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI**: `api.openai.com` or any compatible server
//!
//! # Example
//! ```no_run
//! use colloquy_llm::{ChatMessage, LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new(vec![ChatMessage::user("Hello, world!")], "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{
    ChatMessage, ChatRole, LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk,
    LlmUsage,
};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
