//! Error types for Colloquy.
//!
//! This module defines a unified error enum covering request validation,
//! corpus indexing, the external embedding and generation gateways, and the
//! ambient concerns (I/O, configuration, serialization).

use thiserror::Error;

/// Unified error type for Colloquy.
///
/// All fallible functions return `Result<T, AppError>`. Errors raised while
/// answering a request abort that request only.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed request (missing or blank fields, invalid arguments)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Corpus indexing failed; fatal at startup
    #[error("Indexing error: {0}")]
    Indexing(String),

    /// Similarity search could not be performed
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// An external gateway could not be reached or answered with a server error
    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// An external gateway rejected the call because of rate limiting
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The generation gateway failed before or during streaming
    #[error("Generation error: {0}")]
    Generation(String),

    /// A gateway call exceeded the configured timeout
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The caller went away before the request finished
    #[error("Request cancelled")]
    Cancelled,

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error originated from an external gateway (including timeouts).
    pub fn is_gateway_failure(&self) -> bool {
        matches!(
            self,
            AppError::GatewayUnavailable(_)
                | AppError::RateLimited(_)
                | AppError::Generation(_)
                | AppError::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
