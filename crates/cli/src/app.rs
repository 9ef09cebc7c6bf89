//! Startup wiring: corpus, gateways, prompts and the answer pipeline.

use colloquy_chat::{AnswerPipeline, ModelOptions, SessionStore};
use colloquy_core::{config::AppConfig, AppResult};
use colloquy_knowledge::{create_provider, load_corpus, ChunkStore, IndexOptions, Retriever};
use colloquy_llm::create_client;
use colloquy_prompt::{load_templates, PromptBuilder};
use std::path::PathBuf;
use std::sync::Arc;

/// Index the corpus and assemble a ready pipeline.
///
/// Runs once before serving. Any failure here is fatal.
pub async fn build_pipeline(config: &AppConfig) -> AppResult<AnswerPipeline> {
    config.validate()?;

    let raw = match config.corpus.path.as_deref() {
        Some(path) => {
            let path = resolve(config, path.to_path_buf());
            tracing::info!("Loading corpus from {:?}", path);
            load_corpus(&path)?
        }
        None => {
            tracing::warn!("No corpus configured; answers will have no context");
            String::new()
        }
    };

    let embedder = create_provider(&config.embedding)?;
    let options = IndexOptions::from_config(&config.corpus, &config.embedding);
    let store = ChunkStore::build(&raw, &options, embedder.as_ref()).await?;
    tracing::info!("Indexed {} chunks", store.len());

    let retriever = Retriever::new(Arc::new(store), embedder)
        .with_top_k(config.retrieval.top_k)
        .with_min_score(config.retrieval.min_score);

    let api_key = config.llm.api_key();
    let client = create_client(
        &config.llm.provider,
        config.llm.endpoint.as_deref(),
        api_key.as_deref(),
    )?;

    let prompt_file = config.prompts.file.clone().map(|p| resolve(config, p));
    let templates = load_templates(prompt_file.as_deref())?;
    let prompts = PromptBuilder::new(&templates)?;

    Ok(AnswerPipeline::new(
        Arc::new(SessionStore::new()),
        client,
        Arc::new(prompts),
        retriever,
        ModelOptions::from_settings(&config.llm),
    )
    .with_timeout(config.gateway_timeout()))
}

/// Relative paths are taken from the workspace.
fn resolve(config: &AppConfig, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        config.workspace.join(path)
    }
}
