//! Pipeline states, failures before streaming, cancellation and timeouts.

use super::*;
use crate::pipeline::{PipelineRequest, PipelineState};

#[tokio::test]
async fn test_state_follows_request() {
    let llm = FakeLlm::new();
    let pipeline = pipeline(Arc::clone(&llm)).await;

    let answer = pipeline
        .answer(PipelineRequest::new("Hello?", "s1"))
        .await
        .unwrap();
    let mut states = answer.subscribe();
    assert_eq!(answer.state(), PipelineState::Generating);

    let (_, error) = drain(answer).await;
    assert!(error.is_none());
    assert_eq!(*states.borrow_and_update(), PipelineState::Completed);
}

#[tokio::test]
async fn test_rewrite_failure_is_returned_before_streaming() {
    let llm = FakeLlm::new();
    llm.fail_rewrite(AppError::GatewayUnavailable("model offline".to_string()));
    let pipeline = pipeline(Arc::clone(&llm)).await;

    let result = pipeline.answer(PipelineRequest::new("Hello?", "s1")).await;

    assert!(matches!(result, Err(AppError::GatewayUnavailable(_))));
    assert!(llm.stream_requests().is_empty());
    assert!(pipeline.sessions().get("s1").await.turns.is_empty());
}

#[tokio::test]
async fn test_refused_generation_is_returned_before_streaming() {
    let llm = FakeLlm::new();
    llm.script(Script::Refuse);
    let pipeline = pipeline(Arc::clone(&llm)).await;

    let result = pipeline.answer(PipelineRequest::new("Hello?", "s1")).await;
    assert!(matches!(result, Err(AppError::RateLimited(_))));

    // The session is released and usable again
    let answer = pipeline
        .answer(PipelineRequest::new("Hello again?", "s1"))
        .await
        .unwrap();
    drain(answer).await;
    assert_eq!(pipeline.sessions().get("s1").await.turns.len(), 2);
}

#[tokio::test]
async fn test_cancel_stops_stream_without_recording() {
    let llm = FakeLlm::new();
    llm.script(Script::Hang(vec!["Partial"]));
    let pipeline = pipeline(Arc::clone(&llm)).await;

    let mut answer = pipeline
        .answer(PipelineRequest::new("Hello?", "s1"))
        .await
        .unwrap();
    assert_eq!(answer.next().await.unwrap().unwrap(), "Partial");

    let token = answer.cancellation_token();
    token.cancel();
    assert!(matches!(answer.next().await, Some(Err(AppError::Cancelled))));
    assert!(answer.next().await.is_none());
    assert_eq!(answer.state(), PipelineState::Failed);

    drop(answer);
    assert!(pipeline.sessions().get("s1").await.turns.is_empty());
}

#[tokio::test]
async fn test_dropped_stream_releases_session() {
    let llm = FakeLlm::new();
    llm.script(Script::Hang(vec!["Par", "tial"]));
    let pipeline = pipeline(Arc::clone(&llm)).await;

    let mut answer = pipeline
        .answer(PipelineRequest::new("Hello?", "s1"))
        .await
        .unwrap();
    let states = answer.subscribe();
    answer.next().await.unwrap().unwrap();
    drop(answer);

    assert_eq!(*states.borrow(), PipelineState::Failed);
    let session = tokio::time::timeout(Duration::from_secs(1), pipeline.sessions().get("s1"))
        .await
        .expect("session must be released on drop");
    assert!(session.turns.is_empty());
}

#[tokio::test]
async fn test_stalled_stream_times_out() {
    let llm = FakeLlm::new();
    llm.script(Script::Hang(vec!["Slow"]));
    let pipeline = pipeline(Arc::clone(&llm)).await.with_timeout(Some(SHORT));

    let answer = pipeline
        .answer(PipelineRequest::new("Hello?", "s1"))
        .await
        .unwrap();
    let (text, error) = drain(answer).await;

    assert_eq!(text, "Slow");
    assert!(matches!(error, Some(AppError::Timeout(_))));
    assert!(pipeline.sessions().get("s1").await.turns.is_empty());
}
