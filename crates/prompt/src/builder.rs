//! Prompt builder for rendering templates into chat messages.

use crate::types::{PromptDefinition, PromptTemplates};
use colloquy_core::{AppError, AppResult};
use colloquy_llm::ChatMessage;
use handlebars::Handlebars;
use std::collections::HashMap;

const REPHRASE: &str = "rephrase";
const ANSWER: &str = "answer";

/// Compiled prompt templates.
///
/// Templates are parsed once at construction; rendering only substitutes
/// variables.
pub struct PromptBuilder {
    registry: Handlebars<'static>,
}

impl PromptBuilder {
    /// Compile both prompts. Fails with `AppError::Prompt` on a template
    /// syntax error.
    pub fn new(templates: &PromptTemplates) -> AppResult<Self> {
        let mut registry = Handlebars::new();

        // Prompts are plain text, not HTML
        registry.register_escape_fn(handlebars::no_escape);

        register(&mut registry, REPHRASE, &templates.rephrase)?;
        register(&mut registry, ANSWER, &templates.answer)?;

        Ok(Self { registry })
    }

    /// Messages asking the model to rewrite `question` as a standalone
    /// question, given the conversation so far.
    pub fn rephrase_messages(
        &self,
        history: &[ChatMessage],
        question: &str,
    ) -> AppResult<Vec<ChatMessage>> {
        let mut variables = HashMap::new();
        variables.insert("question", question);
        self.build(REPHRASE, history, &variables)
    }

    /// Messages asking the model to answer `standalone_question` from the
    /// retrieved `context`.
    pub fn answer_messages(
        &self,
        history: &[ChatMessage],
        context: &str,
        standalone_question: &str,
    ) -> AppResult<Vec<ChatMessage>> {
        let mut variables = HashMap::new();
        variables.insert("context", context);
        variables.insert("standalone_question", standalone_question);
        self.build(ANSWER, history, &variables)
    }

    /// System message, then history oldest first, then the human message.
    fn build(
        &self,
        name: &str,
        history: &[ChatMessage],
        variables: &HashMap<&str, &str>,
    ) -> AppResult<Vec<ChatMessage>> {
        tracing::debug!(prompt = name, history = history.len(), "Building prompt");

        let system = self.render(&format!("{}.system", name), variables)?;
        let human = self.render(&format!("{}.human", name), variables)?;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(human));
        Ok(messages)
    }

    fn render(&self, template: &str, variables: &HashMap<&str, &str>) -> AppResult<String> {
        self.registry
            .render(template, variables)
            .map_err(|e| AppError::Prompt(format!("Failed to render template {}: {}", template, e)))
    }
}

fn register(
    registry: &mut Handlebars<'static>,
    name: &str,
    definition: &PromptDefinition,
) -> AppResult<()> {
    for (part, source) in [("system", &definition.system), ("human", &definition.human)] {
        let key = format!("{}.{}", name, part);
        registry
            .register_template_string(&key, source)
            .map_err(|e| AppError::Prompt(format!("Failed to register template {}: {}", key, e)))?;
    }
    Ok(())
}
