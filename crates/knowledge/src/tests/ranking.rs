//! Tests for similarity ranking correctness.

use super::{chunk, normalize};
use crate::store::ChunkStore;
use colloquy_core::AppError;

fn texts(results: &[crate::ScoredChunk<'_>]) -> Vec<String> {
    results.iter().map(|r| r.chunk.text.clone()).collect()
}

#[test]
fn test_relevant_query_returns_high_scores() {
    let store = ChunkStore::from_chunks(
        vec![
            chunk(0, "Cooking recipes for pasta", normalize(&[-0.3, -0.8, 0.4, -0.2])),
            chunk(30, "Rust is a systems programming language", normalize(&[1.0, 0.5, 0.2, 0.1])),
        ],
        4,
    )
    .unwrap();

    let query = normalize(&[0.9, 0.4, 0.3, 0.1]);
    let results = store.similarity_search(&query, 5).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk.text, "Rust is a systems programming language");
    assert!(results[0].score > 0.9, "got {}", results[0].score);
    assert!(results[1].score < 0.0);
}

#[test]
fn test_results_sorted_and_truncated() {
    let store = ChunkStore::from_chunks(
        (0..10)
            .map(|i| chunk(i, &format!("chunk {i}"), vec![1.0, i as f32]))
            .collect(),
        2,
    )
    .unwrap();

    let results = store.similarity_search(&[0.0, 1.0], 4).unwrap();
    assert_eq!(results.len(), 4);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(texts(&results), ["chunk 9", "chunk 8", "chunk 7", "chunk 6"]);
}

#[test]
fn test_ties_keep_corpus_order() {
    let store = ChunkStore::from_chunks(
        vec![
            chunk(0, "first", vec![1.0, 0.0]),
            chunk(1, "better", vec![0.0, 1.0]),
            chunk(2, "second", vec![2.0, 0.0]),
            chunk(3, "third", vec![3.0, 0.0]),
        ],
        2,
    )
    .unwrap();

    let results = store.similarity_search(&[1.0, 0.0], 3).unwrap();
    assert_eq!(texts(&results), ["first", "second", "third"]);
}

#[test]
fn test_search_is_deterministic() {
    let store = ChunkStore::from_chunks(
        (0..50)
            .map(|i| {
                let x = (i as f32 * 0.37).sin();
                let y = (i as f32 * 0.91).cos();
                chunk(i, &format!("c{i}"), vec![x, y, 0.5])
            })
            .collect(),
        3,
    )
    .unwrap();

    let query = [0.2, -0.7, 0.1];
    let first = texts(&store.similarity_search(&query, 10).unwrap());
    for _ in 0..5 {
        assert_eq!(texts(&store.similarity_search(&query, 10).unwrap()), first);
    }
}

#[test]
fn test_zero_vectors_score_zero() {
    let store =
        ChunkStore::from_chunks(vec![chunk(0, "blank", vec![0.0, 0.0])], 2).unwrap();

    let results = store.similarity_search(&[1.0, 1.0], 1).unwrap();
    assert_eq!(results[0].score, 0.0);

    let results = store.similarity_search(&[0.0, 0.0], 1).unwrap();
    assert_eq!(results[0].score, 0.0);
}

#[test]
fn test_invalid_queries() {
    let store = ChunkStore::from_chunks(vec![chunk(0, "a", vec![1.0, 0.0])], 2).unwrap();

    assert!(matches!(
        store.similarity_search(&[1.0, 0.0], 0),
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        store.similarity_search(&[1.0, 0.0, 0.0], 1),
        Err(AppError::Retrieval(_))
    ));
}

#[test]
fn test_empty_store_returns_nothing() {
    let store = ChunkStore::from_chunks(Vec::new(), 8).unwrap();
    assert!(store.similarity_search(&[1.0], 4).unwrap().is_empty());
}

#[test]
fn test_from_chunks_rejects_mixed_dimensions() {
    let result = ChunkStore::from_chunks(
        vec![chunk(0, "a", vec![1.0, 0.0]), chunk(1, "b", vec![1.0])],
        2,
    );
    assert!(matches!(result, Err(AppError::Indexing(_))));
}
