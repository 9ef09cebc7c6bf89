//! Retrieval stage: standalone question to context string.

use crate::embeddings::EmbeddingProvider;
use crate::store::{ChunkStore, DEFAULT_TOP_K};
use crate::types::ScoredChunk;
use colloquy_core::{within, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Embeds questions and looks them up in the chunk store.
#[derive(Debug, Clone)]
pub struct Retriever {
    store: Arc<ChunkStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
    min_score: Option<f32>,
    timeout: Option<Duration>,
}

impl Retriever {
    pub fn new(store: Arc<ChunkStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            top_k: DEFAULT_TOP_K,
            min_score: None,
            timeout: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Drop ranked chunks scoring below `min_score`.
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    /// Deadline for the query embedding call.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Ranked chunks for `question`, best first.
    pub async fn retrieve_chunks(&self, question: &str) -> AppResult<Vec<ScoredChunk<'_>>> {
        let query = within(self.timeout, "query embedding", self.embedder.embed(question)).await?;

        let mut results = self.store.similarity_search(&query, self.top_k)?;
        if let Some(min_score) = self.min_score {
            results.retain(|r| r.score >= min_score);
        }

        match (results.first(), results.last()) {
            (Some(top), Some(lowest)) => tracing::debug!(
                "Retrieved {} chunks (top score: {:.3}, lowest: {:.3})",
                results.len(),
                top.score,
                lowest.score
            ),
            _ => tracing::debug!("No relevant chunks found"),
        }

        Ok(results)
    }

    /// Context string for `question`: chunk texts in rank order, each
    /// followed by one newline. No matches yield an empty string.
    pub async fn retrieve(&self, question: &str) -> AppResult<String> {
        let results = self.retrieve_chunks(question).await?;

        let mut context = String::with_capacity(results.iter().map(|r| r.chunk.text.len() + 1).sum());
        for result in &results {
            context.push_str(&result.chunk.text);
            context.push('\n');
        }

        Ok(context)
    }
}
