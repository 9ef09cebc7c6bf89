//! Answer pipeline.
//!
//! One request moves through
//! `Received -> Rewriting -> Retrieving -> Generating -> Completed`, or ends
//! in `Failed` from any state. The session is locked from the moment the
//! request is validated until the answer stream finishes or is dropped, and
//! history is only written on `Completed`.

use crate::options::ModelOptions;
use crate::rewriter::QueryRewriter;
use crate::session::{to_messages, SessionGuard, SessionStore, Turn};
use colloquy_core::{within, AppError, AppResult};
use colloquy_knowledge::Retriever;
use colloquy_llm::{LlmClient, LlmStream};
use colloquy_prompt::PromptBuilder;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// A question asked within a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineRequest {
    pub question: String,
    pub session_id: String,
}

impl PipelineRequest {
    pub fn new(question: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            session_id: session_id.into(),
        }
    }

    /// Both fields must contain something other than whitespace.
    pub fn validate(&self) -> AppResult<()> {
        if self.question.trim().is_empty() {
            return Err(AppError::Validation(
                "question must not be empty".to_string(),
            ));
        }
        if self.session_id.trim().is_empty() {
            return Err(AppError::Validation(
                "sessionId must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Lifecycle of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Rewriting,
    Retrieving,
    Generating,
    Completed,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Rewriting => "rewriting",
            Self::Retrieving => "retrieving",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publishes state changes and logs them.
#[derive(Clone)]
struct StateReporter {
    tx: Arc<watch::Sender<PipelineState>>,
}

impl StateReporter {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(PipelineState::Received);
        Self { tx: Arc::new(tx) }
    }

    fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.tx.subscribe()
    }

    fn current(&self) -> PipelineState {
        *self.tx.borrow()
    }

    fn set(&self, state: PipelineState) {
        tracing::debug!(state = %state, "Pipeline state changed");
        self.tx.send_replace(state);
    }

    /// Move to `Failed` unless already terminal.
    fn fail(&self, error: &AppError) {
        let changed = self.tx.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = PipelineState::Failed;
                true
            }
        });
        if changed {
            tracing::warn!(error = %error, "Pipeline failed");
        }
    }
}

/// Orchestrates rewrite, retrieval and streamed generation for a request.
#[derive(Clone)]
pub struct AnswerPipeline {
    sessions: Arc<SessionStore>,
    rewriter: QueryRewriter,
    retriever: Retriever,
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptBuilder>,
    options: ModelOptions,
    timeout: Option<Duration>,
}

impl AnswerPipeline {
    pub fn new(
        sessions: Arc<SessionStore>,
        client: Arc<dyn LlmClient>,
        prompts: Arc<PromptBuilder>,
        retriever: Retriever,
        options: ModelOptions,
    ) -> Self {
        let rewriter = QueryRewriter::new(Arc::clone(&client), Arc::clone(&prompts), options.clone());
        Self {
            sessions,
            rewriter,
            retriever,
            client,
            prompts,
            options,
            timeout: None,
        }
    }

    /// Deadline applied to the rewrite, the query embedding, the start of
    /// generation and each wait for the next fragment.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self.rewriter = self.rewriter.with_timeout(timeout);
        self.retriever = self.retriever.with_timeout(timeout);
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Run the request up to the first byte of generation.
    ///
    /// Validation, rewrite, retrieval and generation-start failures are
    /// returned here, before any fragment exists. Failures after that
    /// surface as an `Err` item in the returned stream.
    ///
    /// The session stays locked until the stream ends or is dropped, so a
    /// caller must not hold one answer stream while awaiting another
    /// `answer` on the same session.
    pub async fn answer(&self, request: PipelineRequest) -> AppResult<AnswerStream> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "pipeline",
            %request_id,
            session_id = %request.session_id
        );

        let reporter = StateReporter::new();
        let result = self
            .start(request, &reporter)
            .instrument(span.clone())
            .await;

        match result {
            Ok((guard, upstream, question)) => {
                let cancel = CancellationToken::new();
                let inner = generate(
                    guard,
                    upstream,
                    question,
                    reporter.clone(),
                    cancel.clone(),
                    self.timeout,
                );
                Ok(AnswerStream {
                    inner: Box::pin(inner),
                    state: reporter.subscribe(),
                    reporter,
                    cancel,
                    request_id,
                    span,
                })
            }
            Err(e) => {
                let _entered = span.enter();
                reporter.fail(&e);
                Err(e)
            }
        }
    }

    async fn start(
        &self,
        request: PipelineRequest,
        reporter: &StateReporter,
    ) -> AppResult<(SessionGuard, LlmStream, String)> {
        request.validate()?;
        tracing::debug!("Received question");

        let guard = self.sessions.lock(&request.session_id).await;
        let history = guard.turns().to_vec();

        reporter.set(PipelineState::Rewriting);
        let standalone = self.rewriter.rewrite(&request.question, &history).await?;

        reporter.set(PipelineState::Retrieving);
        let context = self.retriever.retrieve(&standalone).await?;

        reporter.set(PipelineState::Generating);
        let messages = self
            .prompts
            .answer_messages(&to_messages(&history), &context, &standalone)?;
        let llm_request = self.options.request(messages).with_streaming();
        let upstream = within(
            self.timeout,
            "generation start",
            self.client.stream(&llm_request),
        )
        .await?;

        Ok((guard, upstream, request.question))
    }
}

/// Forward fragments from `upstream`, then record the exchange.
fn generate(
    mut guard: SessionGuard,
    mut upstream: LlmStream,
    question: String,
    reporter: StateReporter,
    cancel: CancellationToken,
    timeout: Option<Duration>,
) -> impl Stream<Item = AppResult<String>> + Send {
    async_stream::stream! {
        let mut answer = String::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(AppError::Cancelled),
                next = within(timeout, "answer fragment", async { Ok(upstream.next().await) }) => next,
            };

            match next {
                Ok(Some(Ok(chunk))) => {
                    if !chunk.content.is_empty() {
                        answer.push_str(&chunk.content);
                        yield Ok(chunk.content);
                    }
                }
                Ok(None) => break,
                Ok(Some(Err(e))) | Err(e) => {
                    reporter.fail(&e);
                    yield Err(e);
                    return;
                }
            }
        }

        let answer_len = answer.len();
        guard.append([Turn::user(question), Turn::assistant(answer)]);
        let turns = guard.turns().len();
        drop(guard);

        reporter.set(PipelineState::Completed);
        tracing::info!(answer_len, turns, "Answer completed");
    }
}

/// Streamed answer for one request.
///
/// Yields answer fragments in order. An `Err` item ends the stream. The
/// session history is updated only when the stream runs to its natural end;
/// cancelling or dropping it first leaves history untouched.
pub struct AnswerStream {
    inner: Pin<Box<dyn Stream<Item = AppResult<String>> + Send>>,
    state: watch::Receiver<PipelineState>,
    reporter: StateReporter,
    cancel: CancellationToken,
    request_id: Uuid,
    span: tracing::Span,
}

impl AnswerStream {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Current pipeline state.
    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.clone()
    }

    /// Token that aborts generation when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Stream for AnswerStream {
    type Item = AppResult<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let _entered = this.span.enter();
        this.inner.as_mut().poll_next(cx)
    }
}

impl Drop for AnswerStream {
    fn drop(&mut self) {
        self.cancel.cancel();
        if !self.reporter.current().is_terminal() {
            let _entered = self.span.enter();
            self.reporter.fail(&AppError::Cancelled);
        }
    }
}

impl fmt::Debug for AnswerStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnswerStream")
            .field("request_id", &self.request_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_validation() {
        assert!(PipelineRequest::new("What is your strength?", "s1")
            .validate()
            .is_ok());

        for (question, session) in [("", "s1"), ("   ", "s1"), ("q", ""), ("q", "\t")] {
            assert!(matches!(
                PipelineRequest::new(question, session).validate(),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: PipelineRequest =
            serde_json::from_str(r#"{"question":"hi","sessionId":"abc"}"#).unwrap();
        assert_eq!(request, PipelineRequest::new("hi", "abc"));

        let missing: PipelineRequest = serde_json::from_str(r#"{"question":"hi"}"#).unwrap();
        assert!(missing.validate().is_err());
    }

    #[test]
    fn test_state_reporter_keeps_terminal_state() {
        let reporter = StateReporter::new();
        let rx = reporter.subscribe();

        reporter.set(PipelineState::Generating);
        assert_eq!(*rx.borrow(), PipelineState::Generating);

        reporter.set(PipelineState::Completed);
        reporter.fail(&AppError::Cancelled);
        assert_eq!(*rx.borrow(), PipelineState::Completed);
    }
}
