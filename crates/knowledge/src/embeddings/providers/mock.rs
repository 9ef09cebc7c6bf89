//! Offline embedding provider using hashed character trigrams.

use crate::embeddings::provider::EmbeddingProvider;
use colloquy_core::AppResult;
use std::collections::HashMap;

/// Words too common to tell documents apart.
const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

/// Deterministic provider for tests, demos and offline runs.
///
/// Each significant word contributes its character trigrams and the whole
/// word to hashed buckets, then the vector is scaled to unit length. Texts
/// sharing vocabulary score higher than unrelated ones, which is enough to
/// exercise ranking without a model.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    /// Create a new mock provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn bucket(&self, token: &str, multiplier: u64) -> usize {
        let hash = token
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(multiplier).wrapping_add(b as u64));
        (hash % self.dimensions as u64) as usize
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }

        let lower = text.to_lowercase();
        let mut frequencies: HashMap<&str, u32> = HashMap::new();
        for word in lower.split_whitespace() {
            if word.chars().count() > 2 && !STOP_WORDS.contains(&word) {
                *frequencies.entry(word).or_insert(0) += 1;
            }
        }

        for (word, freq) in &frequencies {
            let chars: Vec<char> = word.chars().collect();
            for trigram in chars.windows(3) {
                let trigram: String = trigram.iter().collect();
                vector[self.bucket(&trigram, 37)] += (*freq as f32).sqrt();
            }
            vector[self.bucket(word, 31)] += *freq as f32;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }

        vector
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vectorize(text)).collect())
    }
}
