//! Ask command handler.
//!
//! Runs questions through the pipeline in one session and streams each
//! answer to stdout.

use crate::app;
use anyhow::Context;
use clap::Args;
use colloquy_chat::{AnswerPipeline, PipelineRequest};
use colloquy_core::config::AppConfig;
use futures::StreamExt;
use std::io::Write;

/// Questions asked when none are given.
const DEMO_QUESTIONS: &[&str] = &[
    "What is your strength?",
    "Can you list them in bullet point form?",
];

/// Ask one or more questions in a single conversation
#[derive(Args, Debug)]
pub struct AskCommand {
    /// Questions, asked in order (defaults to a two-question demo)
    pub questions: Vec<String>,

    /// Session id shared by all questions (default: a fresh id)
    #[arg(short, long)]
    pub session: Option<String>,

    /// Print the session history as JSON when done
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        let pipeline = app::build_pipeline(config)
            .await
            .context("failed to prepare the answer pipeline")?;

        let session_id = self
            .session
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        tracing::debug!(session_id = %session_id, "Using session");

        let questions: Vec<String> = if self.questions.is_empty() {
            DEMO_QUESTIONS.iter().map(|q| q.to_string()).collect()
        } else {
            self.questions.clone()
        };

        for question in questions {
            if !self.json {
                println!("> {}", question);
            }
            self.ask_one(&pipeline, &question, &session_id)
                .await
                .with_context(|| format!("failed to answer {:?}", question))?;
        }

        if self.json {
            let session = pipeline.sessions().get(&session_id).await;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }

        Ok(())
    }

    async fn ask_one(
        &self,
        pipeline: &AnswerPipeline,
        question: &str,
        session_id: &str,
    ) -> anyhow::Result<()> {
        let mut answer = pipeline
            .answer(PipelineRequest::new(question, session_id))
            .await?;

        let mut stdout = std::io::stdout();
        while let Some(fragment) = answer.next().await {
            let fragment = fragment?;
            if !self.json {
                write!(stdout, "{}", fragment)?;
                stdout.flush()?;
            }
        }

        if !self.json {
            writeln!(stdout)?;
            writeln!(stdout)?;
        }
        Ok(())
    }
}
