mod lifecycle;

use crate::options::ModelOptions;
use crate::pipeline::{AnswerPipeline, AnswerStream};
use crate::session::SessionStore;
use colloquy_core::{AppError, AppResult};
use colloquy_knowledge::embeddings::providers::MockProvider;
use colloquy_knowledge::{ChunkStore, IndexOptions, Retriever};
use colloquy_llm::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use colloquy_prompt::{PromptBuilder, PromptTemplates};
use futures::{stream, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const CORPUS: &str = "I spent four years building payment systems in Rust. \
My biggest strength is debugging production incidents calmly. \
Outside of work I restore vintage bicycles and ride long distances.";

/// What the fake model does for one streamed answer.
#[derive(Debug, Clone)]
pub(crate) enum Script {
    /// Emit the fragments then finish.
    Answer(Vec<&'static str>),
    /// Emit the fragments then fail.
    FailAfter(Vec<&'static str>),
    /// Emit the fragments then never produce another item.
    Hang(Vec<&'static str>),
    /// Refuse to start the stream.
    Refuse,
}

/// Model client that records requests and follows scripts.
///
/// Rewrites echo the last user message with a `standalone: ` prefix.
/// Streams follow queued scripts and fall back to a two-fragment answer.
#[derive(Default)]
pub(crate) struct FakeLlm {
    scripts: Mutex<VecDeque<Script>>,
    rewrite_error: Mutex<Option<AppError>>,
    complete_requests: Mutex<Vec<LlmRequest>>,
    stream_requests: Mutex<Vec<LlmRequest>>,
    calls: AtomicUsize,
}

impl FakeLlm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    pub fn fail_rewrite(&self, error: AppError) {
        *self.rewrite_error.lock().unwrap() = Some(error);
    }

    /// Total gateway calls of either kind.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn complete_requests(&self) -> Vec<LlmRequest> {
        self.complete_requests.lock().unwrap().clone()
    }

    pub fn stream_requests(&self) -> Vec<LlmRequest> {
        self.stream_requests.lock().unwrap().clone()
    }
}

fn fragments(parts: Vec<&'static str>) -> impl futures::Stream<Item = AppResult<LlmStreamChunk>> {
    stream::iter(
        parts
            .into_iter()
            .map(|p| Ok(LlmStreamChunk::fragment(p, "fake"))),
    )
}

#[async_trait::async_trait]
impl LlmClient for FakeLlm {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.complete_requests.lock().unwrap().push(request.clone());

        if let Some(error) = self.rewrite_error.lock().unwrap().take() {
            return Err(error);
        }

        let question = request
            .messages
            .last()
            .map(|m| m.content.rsplit('\n').next().unwrap_or_default().to_string())
            .unwrap_or_default();

        Ok(LlmResponse {
            content: format!("standalone: {}", question),
            model: request.model.clone(),
            usage: LlmUsage::default(),
            done: true,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.stream_requests.lock().unwrap().push(request.clone());

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Script::Answer(vec!["Hello", " there"]));

        let stream: LlmStream = match script {
            Script::Answer(parts) => Box::pin(fragments(parts)),
            Script::FailAfter(parts) => Box::pin(fragments(parts).chain(stream::once(async {
                Err(AppError::GatewayUnavailable("connection reset".to_string()))
            }))),
            Script::Hang(parts) => Box::pin(fragments(parts).chain(stream::pending())),
            Script::Refuse => {
                return Err(AppError::RateLimited("slow down".to_string()));
            }
        };
        Ok(stream)
    }
}

pub(crate) async fn pipeline_with(llm: Arc<FakeLlm>, corpus: &str) -> AnswerPipeline {
    let embedder = Arc::new(MockProvider::new(64));
    let options = IndexOptions {
        chunk_size: 80,
        chunk_overlap: 10,
        batch_size: 4,
    };
    let store = ChunkStore::build(corpus, &options, embedder.as_ref())
        .await
        .unwrap();
    let retriever = Retriever::new(Arc::new(store), embedder);
    let prompts = PromptBuilder::new(&PromptTemplates::default()).unwrap();

    AnswerPipeline::new(
        Arc::new(SessionStore::new()),
        llm,
        Arc::new(prompts),
        retriever,
        ModelOptions::new("fake-model"),
    )
}

pub(crate) async fn pipeline(llm: Arc<FakeLlm>) -> AnswerPipeline {
    pipeline_with(llm, CORPUS).await
}

/// Drain an answer stream into its text and the error that ended it, if any.
pub(crate) async fn drain(mut answer: AnswerStream) -> (String, Option<AppError>) {
    let mut text = String::new();
    while let Some(item) = answer.next().await {
        match item {
            Ok(fragment) => text.push_str(&fragment),
            Err(e) => return (text, Some(e)),
        }
    }
    (text, None)
}

pub(crate) const SHORT: Duration = Duration::from_millis(50);
