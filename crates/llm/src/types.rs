//! Provider identifiers.

use std::fmt;

/// Generation gateway backends known to the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Ollama,
    OpenAI,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" | "openai-compatible" => Some(Self::OpenAI),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAI => "openai",
        }
    }

    /// Whether the provider refuses requests without a bearer key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI)
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
