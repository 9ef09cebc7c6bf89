mod ranking;

use crate::embeddings::EmbeddingProvider;
use crate::types::{Chunk, ChunkId};
use colloquy_core::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Embedder returning fixed vectors per text, for exact ranking tests.
#[derive(Debug, Default)]
pub(crate) struct TableEmbedder {
    pub dimensions: usize,
    pub table: HashMap<String, Vec<f32>>,
    pub fail_after: Option<usize>,
    pub calls: AtomicUsize,
}

impl TableEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            ..Default::default()
        }
    }

    pub fn with(mut self, text: &str, vector: &[f32]) -> Self {
        self.table.insert(text.to_string(), vector.to_vec());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TableEmbedder {
    fn provider_name(&self) -> &str {
        "table"
    }

    fn model_name(&self) -> &str {
        "table-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| call >= limit) {
            return Err(AppError::GatewayUnavailable("embedding service down".to_string()));
        }

        Ok(texts
            .iter()
            .map(|t| {
                self.table
                    .get(t)
                    .cloned()
                    .unwrap_or_else(|| vec![0.0; self.dimensions])
            })
            .collect())
    }
}

/// Helper to create a normalized embedding.
pub(crate) fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

pub(crate) fn chunk(offset: usize, text: &str, embedding: Vec<f32>) -> Chunk {
    Chunk {
        id: ChunkId::derive(offset, text),
        text: text.to_string(),
        embedding,
        source_offset: offset,
    }
}
