//! Embedding gateway.
//!
//! Provides provider-agnostic embedding generation. Every provider returns
//! vectors of one fixed dimensionality.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
