//! Corpus knowledge for Colloquy.
//!
//! Turns a raw corpus into an immutable, embedded chunk store and answers
//! similarity queries against it:
//! - [`chunker`]: fixed-size overlapping windows
//! - [`embeddings`]: the embedding gateway and its providers
//! - [`store`]: the chunk store and cosine ranking
//! - [`retrieval`]: question to context string
//! - [`parser`]: loading the corpus from disk

pub mod chunker;
pub mod embeddings;
pub mod parser;
pub mod retrieval;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use chunker::{chunk_text, Window};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use parser::load_corpus;
pub use retrieval::Retriever;
pub use store::{cosine_similarity, ChunkStore, IndexOptions, DEFAULT_TOP_K};
pub use types::{Chunk, ChunkId, ScoredChunk};
