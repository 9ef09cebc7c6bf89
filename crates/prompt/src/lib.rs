//! Prompt system for Colloquy.
//!
//! This crate provides the two conversation prompts (query rephrasing and
//! answer generation) with:
//! - Built-in default templates
//! - Optional YAML overrides
//! - Handlebars rendering into ordered chat messages

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::PromptBuilder;
pub use loader::load_templates;
pub use types::{PromptDefinition, PromptFile, PromptTemplates};
