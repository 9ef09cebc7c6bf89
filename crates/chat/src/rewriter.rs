//! Query rewriter: follow-up question to standalone question.

use crate::options::ModelOptions;
use crate::session::{to_messages, Turn};
use colloquy_core::{within, AppResult};
use colloquy_llm::LlmClient;
use colloquy_prompt::PromptBuilder;
use std::sync::Arc;
use std::time::Duration;

/// Rewrites a question so it can be understood without the conversation.
#[derive(Clone)]
pub struct QueryRewriter {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptBuilder>,
    options: ModelOptions,
    timeout: Option<Duration>,
}

impl QueryRewriter {
    pub fn new(client: Arc<dyn LlmClient>, prompts: Arc<PromptBuilder>, options: ModelOptions) -> Self {
        Self {
            client,
            prompts,
            options,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ask the model for a standalone version of `question` given `history`
    /// (oldest first). The model's text is returned verbatim.
    ///
    /// The model is consulted even when `history` is empty.
    pub async fn rewrite(&self, question: &str, history: &[Turn]) -> AppResult<String> {
        let messages = self
            .prompts
            .rephrase_messages(&to_messages(history), question)?;
        let request = self.options.request(messages);

        let response = within(
            self.timeout,
            "question rewrite",
            self.client.complete(&request),
        )
        .await?;

        tracing::debug!(
            history = history.len(),
            standalone = %response.content,
            "Rewrote question"
        );

        Ok(response.content)
    }
}
