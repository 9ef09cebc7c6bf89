//! HTTP transport.
//!
//! `GET /` is a liveness check. `POST /` takes `{question, sessionId}` and
//! streams the answer back as plain text.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use colloquy_chat::{into_byte_stream, AnswerPipeline, PipelineRequest};
use colloquy_core::AppError;
use std::sync::Arc;

pub const HEALTH_MESSAGE: &str = "The server is working!";
pub const BAD_REQUEST_MESSAGE: &str = "Missing question or sessionId";

pub fn router(pipeline: Arc<AnswerPipeline>) -> Router {
    Router::new()
        .route("/", get(health).post(ask))
        .with_state(pipeline)
}

async fn health() -> &'static str {
    HEALTH_MESSAGE
}

async fn ask(State(pipeline): State<Arc<AnswerPipeline>>, body: Bytes) -> Response {
    let request = match serde_json::from_slice::<PipelineRequest>(&body) {
        Ok(request) if request.validate().is_ok() => request,
        Ok(_) => return (StatusCode::BAD_REQUEST, BAD_REQUEST_MESSAGE).into_response(),
        Err(e) => {
            tracing::debug!("Rejected request body: {}", e);
            return (StatusCode::BAD_REQUEST, BAD_REQUEST_MESSAGE).into_response();
        }
    };

    match pipeline.answer(request).await {
        Ok(answer) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            Body::from_stream(into_byte_stream(answer)),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Status for a failure that happened before the first byte was sent.
fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::Validation(_) => StatusCode::BAD_REQUEST,
        AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        e if e.is_gateway_failure() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &AppError) -> Response {
    let status = status_for(error);
    if status.is_server_error() {
        tracing::error!("Request failed: {}", error);
    }
    (status, error.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::Request;
    use colloquy_chat::{ModelOptions, SessionStore};
    use colloquy_core::AppResult;
    use colloquy_knowledge::embeddings::providers::MockProvider;
    use colloquy_knowledge::{ChunkStore, IndexOptions, Retriever};
    use colloquy_llm::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
    use colloquy_prompt::{PromptBuilder, PromptTemplates};
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Answers every stream with fixed fragments, or fails to start.
    struct CannedLlm {
        fragments: Vec<&'static str>,
        refuse: Option<fn() -> AppError>,
        break_off: Option<fn() -> AppError>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl LlmClient for CannedLlm {
        fn provider_name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LlmResponse {
                content: "standalone question".to_string(),
                model: request.model.clone(),
                usage: LlmUsage::default(),
                done: true,
            })
        }

        async fn stream(&self, _request: &LlmRequest) -> AppResult<LlmStream> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(refuse) = self.refuse {
                return Err(refuse());
            }
            let mut chunks: Vec<AppResult<LlmStreamChunk>> = self
                .fragments
                .iter()
                .map(|f| Ok(LlmStreamChunk::fragment(*f, "canned")))
                .collect();
            if let Some(break_off) = self.break_off {
                chunks.push(Err(break_off()));
            }
            Ok(Box::pin(stream::iter(chunks)))
        }
    }

    async fn app(llm: Arc<CannedLlm>) -> (Router, Arc<AnswerPipeline>) {
        let embedder = Arc::new(MockProvider::new(32));
        let store = ChunkStore::build(
            "I enjoy debugging hard problems.",
            &IndexOptions::default(),
            embedder.as_ref(),
        )
        .await
        .unwrap();
        let pipeline = Arc::new(AnswerPipeline::new(
            Arc::new(SessionStore::new()),
            llm,
            Arc::new(PromptBuilder::new(&PromptTemplates::default()).unwrap()),
            Retriever::new(Arc::new(store), embedder),
            ModelOptions::new("canned-model"),
        ));
        (router(Arc::clone(&pipeline)), pipeline)
    }

    fn canned(fragments: Vec<&'static str>) -> Arc<CannedLlm> {
        Arc::new(CannedLlm {
            fragments,
            refuse: None,
            break_off: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn post(body: &str) -> Request<Body> {
        Request::post("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(canned(vec![])).await;
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text(response).await, HEALTH_MESSAGE);
    }

    #[tokio::test]
    async fn test_streams_answer_and_records_session() {
        let (app, pipeline) = app(canned(vec!["I am ", "persistent."])).await;
        let response = app
            .oneshot(post(r#"{"question":"What is your strength?","sessionId":"web"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(text(response).await, "I am persistent.");
        assert_eq!(pipeline.sessions().get("web").await.turns.len(), 2);
    }

    #[tokio::test]
    async fn test_bad_requests_never_reach_the_model() {
        let llm = canned(vec!["unused"]);
        let (app, _) = app(Arc::clone(&llm)).await;

        for body in [
            r#"{"question":"Hi"}"#,
            r#"{"sessionId":"web"}"#,
            r#"{"question":"  ","sessionId":"web"}"#,
            "not json",
        ] {
            let response = app.clone().oneshot(post(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(text(response).await, BAD_REQUEST_MESSAGE);
        }
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refused_generation_maps_to_status() {
        let llm = Arc::new(CannedLlm {
            fragments: vec![],
            refuse: Some(|| AppError::RateLimited("quota".to_string())),
            break_off: None,
            calls: AtomicUsize::new(0),
        });
        let (app, pipeline) = app(llm).await;

        let response = app
            .oneshot(post(r#"{"question":"Hi","sessionId":"web"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(pipeline.sessions().get("web").await.turns.is_empty());
    }

    #[tokio::test]
    async fn test_mid_stream_failure_aborts_body() {
        let llm = Arc::new(CannedLlm {
            fragments: vec!["I am "],
            refuse: None,
            break_off: Some(|| AppError::GatewayUnavailable("connection reset".to_string())),
            calls: AtomicUsize::new(0),
        });
        let (app, pipeline) = app(llm).await;

        let response = app
            .oneshot(post(r#"{"question":"Hi","sessionId":"web"}"#))
            .await
            .unwrap();
        // Headers are already sent when the gateway breaks off
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await;
        assert!(body.is_err());
        assert!(pipeline.sessions().get("web").await.turns.is_empty());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&AppError::Timeout("x".into())),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&AppError::GatewayUnavailable("x".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&AppError::Generation("x".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&AppError::Retrieval("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
