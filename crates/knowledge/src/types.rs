//! Core types for the chunk store.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque, content-derived chunk identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkId(String);

impl ChunkId {
    /// Derive an id from the window position and text. Identical text at
    /// different offsets gets different ids.
    pub fn derive(source_offset: usize, text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source_offset.to_le_bytes());
        hasher.update(text.as_bytes());
        let digest = hasher.finalize();

        let hex: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An embedded window of the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,

    /// Window text, untrimmed
    pub text: String,

    pub embedding: Vec<f32>,

    /// Character offset of the window start in the raw corpus
    pub source_offset: usize,
}

/// A chunk paired with its similarity to a query.
#[derive(Debug, Clone, Copy)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_is_stable() {
        let a = ChunkId::derive(0, "hello");
        let b = ChunkId::derive(0, "hello");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 16);
    }

    #[test]
    fn test_chunk_id_depends_on_offset() {
        assert_ne!(ChunkId::derive(0, "same"), ChunkId::derive(10, "same"));
    }
}
