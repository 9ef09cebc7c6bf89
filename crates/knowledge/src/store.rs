//! In-memory chunk store with brute-force cosine similarity search.

use crate::chunker::chunk_text;
use crate::embeddings::EmbeddingProvider;
use crate::types::{Chunk, ChunkId, ScoredChunk};
use colloquy_core::config::{CorpusConfig, EmbeddingSettings};
use colloquy_core::{AppError, AppResult};
use std::cmp::Ordering;

/// Number of chunks retrieved per question unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 4;

/// Chunking and batching parameters for [`ChunkStore::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,

    /// Windows per embedding request
    pub batch_size: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1536,
            chunk_overlap: 128,
            batch_size: 32,
        }
    }
}

impl IndexOptions {
    pub fn from_config(corpus: &CorpusConfig, embedding: &EmbeddingSettings) -> Self {
        Self {
            chunk_size: corpus.chunk_size,
            chunk_overlap: corpus.chunk_overlap,
            batch_size: embedding.batch_size,
        }
    }
}

/// Immutable, ordered collection of embedded chunks.
///
/// Every embedding has exactly `dimensions` components.
#[derive(Debug)]
pub struct ChunkStore {
    chunks: Vec<Chunk>,
    dimensions: usize,
}

impl ChunkStore {
    /// Chunk `raw`, embed every window, and freeze the result.
    ///
    /// Invalid chunking parameters fail with `AppError::Config`. Gateway
    /// failures and vectors of the wrong dimensionality fail with
    /// `AppError::Indexing`.
    pub async fn build(
        raw: &str,
        options: &IndexOptions,
        embedder: &dyn EmbeddingProvider,
    ) -> AppResult<Self> {
        let windows = chunk_text(raw, options.chunk_size, options.chunk_overlap)?;
        let dimensions = embedder.dimensions();
        let batch_size = options.batch_size.max(1);

        tracing::info!(
            "Indexing {} windows with {} ({}, {} dimensions)",
            windows.len(),
            embedder.provider_name(),
            embedder.model_name(),
            dimensions
        );

        let mut chunks = Vec::with_capacity(windows.len());
        for batch in windows.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|w| w.text.clone()).collect();
            let vectors = embedder
                .embed_batch(&texts)
                .await
                .map_err(|e| AppError::Indexing(format!("Embedding gateway failed: {}", e)))?;

            if vectors.len() != batch.len() {
                return Err(AppError::Indexing(format!(
                    "Embedding gateway returned {} vectors for {} windows",
                    vectors.len(),
                    batch.len()
                )));
            }

            for (window, embedding) in batch.iter().zip(vectors) {
                if embedding.len() != dimensions {
                    return Err(AppError::Indexing(format!(
                        "Embedding for window at offset {} has {} dimensions, expected {}",
                        window.offset,
                        embedding.len(),
                        dimensions
                    )));
                }

                chunks.push(Chunk {
                    id: ChunkId::derive(window.offset, &window.text),
                    text: window.text.clone(),
                    embedding,
                    source_offset: window.offset,
                });
            }

            tracing::debug!("Embedded {}/{} windows", chunks.len(), windows.len());
        }

        Ok(Self { chunks, dimensions })
    }

    /// Assemble a store from already-embedded chunks.
    pub fn from_chunks(chunks: Vec<Chunk>, dimensions: usize) -> AppResult<Self> {
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dimensions) {
            return Err(AppError::Indexing(format!(
                "Chunk {} has {} dimensions, expected {}",
                bad.id,
                bad.embedding.len(),
                dimensions
            )));
        }
        Ok(Self { chunks, dimensions })
    }

    /// Up to `k` chunks ranked by descending cosine similarity to `query`.
    ///
    /// Ties keep corpus order, so results are fully deterministic.
    pub fn similarity_search(&self, query: &[f32], k: usize) -> AppResult<Vec<ScoredChunk<'_>>> {
        if k == 0 {
            return Err(AppError::Validation(
                "k must be greater than zero".to_string(),
            ));
        }
        if self.chunks.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(AppError::Retrieval(format!(
                "Query has {} dimensions, store has {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<ScoredChunk<'_>> = self
            .chunks
            .iter()
            .map(|chunk| ScoredChunk {
                chunk,
                score: cosine_similarity(query, &chunk.embedding),
            })
            .collect();

        // Stable sort keeps corpus order among equal scores
        scored.sort_by(|a, b| descending(a.score, b.score));
        scored.truncate(k);

        Ok(scored)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn descending(a: f32, b: f32) -> Ordering {
    b.total_cmp(&a)
}

/// Cosine similarity of two equal-length vectors; 0.0 if either has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
