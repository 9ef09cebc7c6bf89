//! Colloquy CLI
//!
//! Main entry point for the colloquy command-line tool.
//! Serves streamed, conversation-aware answers about one document corpus.

mod app;
mod commands;
mod server;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colloquy_core::config::{AppConfig, ConfigOverrides};
use colloquy_core::logging;
use commands::{AskCommand, ServeCommand};
use std::path::PathBuf;

/// Colloquy - conversational answers about a document corpus
#[derive(Parser, Debug)]
#[command(name = "colloquy")]
#[command(about = "Conversational retrieval-augmented answers over one corpus", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "COLLOQUY_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "COLLOQUY_CONFIG")]
    config: Option<PathBuf>,

    /// Corpus file or directory
    #[arg(long, global = true, env = "COLLOQUY_CORPUS")]
    corpus: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// LLM provider (ollama, openai)
    #[arg(short, long, global = true, env = "COLLOQUY_LLM_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "COLLOQUY_LLM_MODEL")]
    model: Option<String>,

    /// Embedding provider (mock, ollama, openai)
    #[arg(long, global = true, env = "COLLOQUY_EMBEDDING_PROVIDER")]
    embedding_provider: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve answers over HTTP
    Serve(ServeCommand),

    /// Ask questions from the terminal
    Ask(AskCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Workspace and config file decide which YAML is merged, so they go in first
    let config = AppConfig::load_with(cli.workspace, cli.config)
        .context("failed to load configuration")?;

    let config = config.with_overrides(ConfigOverrides {
        workspace: None,
        config_file: None,
        bind: None,
        corpus: cli.corpus,
        llm_provider: cli.provider,
        llm_model: cli.model,
        embedding_provider: cli.embedding_provider,
        log_level: cli.log_level,
        verbose: cli.verbose,
        no_color: cli.no_color,
        json_logs: cli.json_logs,
    });

    logging::init_logging(
        config.logging.level.as_deref(),
        !config.logging.color,
        config.logging.json,
    )?;

    tracing::info!("Colloquy starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("LLM: {} ({})", config.llm.provider, config.llm.model);
    tracing::debug!(
        "Embeddings: {} ({})",
        config.embedding.provider,
        config.embedding.model
    );

    let command_name = match &cli.command {
        Commands::Serve(_) => "serve",
        Commands::Ask(_) => "ask",
    };
    let span = tracing::info_span!("command", name = command_name);

    let result = {
        use tracing::Instrument;
        match cli.command {
            Commands::Serve(cmd) => cmd.execute(&config).instrument(span).await,
            Commands::Ask(cmd) => cmd.execute(&config).instrument(span).await,
        }
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {:#}", e),
    }

    result
}
