//! Configuration management for Colloquy.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (`.colloquy/config.yaml` or `COLLOQUY_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! Later sources take precedence over earlier ones.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Generation providers the factory knows how to build.
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["ollama", "openai"];

/// Embedding providers the factory knows how to build.
pub const KNOWN_EMBEDDING_PROVIDERS: &[&str] = &["mock", "ollama", "openai"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory that holds `.colloquy/` (defaults to the current directory)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    pub server: ServerConfig,
    pub corpus: CorpusConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub pipeline: PipelineSettings,
    pub prompts: PromptSettings,
    pub logging: LoggingSettings,
}

/// HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// Address the HTTP server binds to (host:port)
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Corpus ingestion and chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CorpusConfig {
    /// File or directory holding the corpus
    pub path: Option<PathBuf>,

    /// Window size in characters
    pub chunk_size: usize,

    /// Characters shared by consecutive windows
    pub chunk_overlap: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: None,
            chunk_size: 1536,
            chunk_overlap: 128,
        }
    }
}

/// Retrieval stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalConfig {
    /// Number of chunks concatenated into the context
    pub top_k: usize,

    /// Optional cosine similarity cutoff
    pub min_score: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            min_score: None,
        }
    }
}

/// Generation gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LlmSettings {
    /// Provider name ("ollama", "openai")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Custom endpoint (provider default when unset)
    pub endpoint: Option<String>,

    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Maximum tokens per completion
    pub max_tokens: Option<u32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            endpoint: None,
            api_key_env: None,
            temperature: Some(0.1),
            max_tokens: None,
        }
    }
}

impl LlmSettings {
    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        resolve_env_key(self.api_key_env.as_deref(), &self.provider)
    }
}

/// Embedding gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider name ("mock", "ollama", "openai")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Custom endpoint (provider default when unset)
    pub endpoint: Option<String>,

    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Expected vector dimensionality
    pub dimensions: usize,

    /// Texts per embedding request during indexing
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            endpoint: None,
            api_key_env: None,
            dimensions: 768,
            batch_size: 32,
        }
    }
}

impl EmbeddingSettings {
    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        resolve_env_key(self.api_key_env.as_deref(), &self.provider)
    }
}

/// Answer pipeline settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineSettings {
    /// Timeout applied to every gateway wait; unset means no timeout
    pub gateway_timeout_secs: Option<u64>,
}

/// Prompt template settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PromptSettings {
    /// YAML file overriding the built-in prompt templates
    pub file: Option<PathBuf>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingSettings {
    /// Log level or filter directive
    pub level: Option<String>,

    /// Colored output
    pub color: bool,

    /// JSON lines output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: None,
            color: true,
            json: false,
        }
    }
}

/// Config file structure; every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    server: Option<ServerConfig>,
    corpus: Option<CorpusConfig>,
    retrieval: Option<RetrievalConfig>,
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    pipeline: Option<PipelineSettings>,
    prompts: Option<PromptSettings>,
    logging: Option<LoggingSettings>,
}

/// Values supplied on the command line; `None` leaves the loaded value alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub workspace: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub bind: Option<String>,
    pub corpus: Option<PathBuf>,
    pub llm_provider: Option<String>,
    pub llm_model: Option<String>,
    pub embedding_provider: Option<String>,
    pub log_level: Option<String>,
    pub verbose: bool,
    pub no_color: bool,
    pub json_logs: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            server: ServerConfig::default(),
            corpus: CorpusConfig::default(),
            retrieval: RetrievalConfig::default(),
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            pipeline: PipelineSettings::default(),
            prompts: PromptSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file, and environment variables.
    ///
    /// Environment variables:
    /// - `COLLOQUY_WORKSPACE`: Override workspace path
    /// - `COLLOQUY_CONFIG`: Path to config file
    /// - `COLLOQUY_BIND`: Server bind address
    /// - `COLLOQUY_CORPUS`: Corpus file or directory
    /// - `COLLOQUY_LLM_PROVIDER` / `COLLOQUY_LLM_MODEL`: Generation gateway
    /// - `COLLOQUY_EMBEDDING_PROVIDER`: Embedding gateway
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use colloquy_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Serving on {}", config.server.bind);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Load configuration with an explicit workspace and config file.
    ///
    /// Explicit values win over `COLLOQUY_WORKSPACE` and `COLLOQUY_CONFIG`.
    /// An explicit config file that does not exist is an error.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace {
            config.workspace = workspace;
        } else if let Ok(workspace) = std::env::var("COLLOQUY_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Some(config_file) = config_file {
            config.config_file = Some(config_file);
        } else if let Ok(config_file) = std::env::var("COLLOQUY_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.colloquy_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        config.apply_env();

        Ok(config)
    }

    /// Environment variables override the config file.
    fn apply_env(&mut self) {
        if let Ok(bind) = std::env::var("COLLOQUY_BIND") {
            self.server.bind = bind;
        }

        if let Ok(corpus) = std::env::var("COLLOQUY_CORPUS") {
            self.corpus.path = Some(PathBuf::from(corpus));
        }

        if let Ok(provider) = std::env::var("COLLOQUY_LLM_PROVIDER") {
            self.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("COLLOQUY_LLM_MODEL") {
            self.llm.model = model;
        }

        if let Ok(provider) = std::env::var("COLLOQUY_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.logging.color = false;
        }
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();
        result.config_file = Some(path.to_path_buf());

        if let Some(server) = file.server {
            result.server = server;
        }
        if let Some(corpus) = file.corpus {
            result.corpus = corpus;
        }
        if let Some(retrieval) = file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(llm) = file.llm {
            result.llm = llm;
        }
        if let Some(embedding) = file.embedding {
            result.embedding = embedding;
        }
        if let Some(pipeline) = file.pipeline {
            result.pipeline = pipeline;
        }
        if let Some(prompts) = file.prompts {
            result.prompts = prompts;
        }
        if let Some(logging) = file.logging {
            result.logging = logging;
        }

        tracing::debug!("Merged config file {:?}", path);

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and the
    /// config file.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(workspace) = overrides.workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = overrides.config_file {
            self.config_file = Some(config_file);
        }

        if let Some(bind) = overrides.bind {
            self.server.bind = bind;
        }

        if let Some(corpus) = overrides.corpus {
            self.corpus.path = Some(corpus);
        }

        if let Some(provider) = overrides.llm_provider {
            self.llm.provider = provider;
        }

        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }

        if let Some(provider) = overrides.embedding_provider {
            self.embedding.provider = provider;
        }

        if let Some(level) = overrides.log_level {
            self.logging.level = Some(level);
        }

        // Verbose mode implies debug logging
        if overrides.verbose && self.logging.level.is_none() {
            self.logging.level = Some("debug".to_string());
        }

        if overrides.no_color {
            self.logging.color = false;
        }

        if overrides.json_logs {
            self.logging.json = true;
        }

        self
    }

    /// Get the path to the .colloquy directory.
    pub fn colloquy_dir(&self) -> PathBuf {
        self.workspace.join(".colloquy")
    }

    /// Gateway timeout as a duration, if configured.
    pub fn gateway_timeout(&self) -> Option<Duration> {
        self.pipeline.gateway_timeout_secs.map(Duration::from_secs)
    }

    /// Validate the merged configuration before anything is built from it.
    pub fn validate(&self) -> AppResult<()> {
        check_known("LLM provider", &self.llm.provider, KNOWN_LLM_PROVIDERS)?;
        check_known(
            "embedding provider",
            &self.embedding.provider,
            KNOWN_EMBEDDING_PROVIDERS,
        )?;

        if self.corpus.chunk_size == 0 {
            return Err(AppError::Config(
                "corpus.chunkSize must be greater than zero".to_string(),
            ));
        }

        if self.corpus.chunk_overlap >= self.corpus.chunk_size {
            return Err(AppError::Config(format!(
                "corpus.chunkOverlap ({}) must be less than corpus.chunkSize ({})",
                self.corpus.chunk_overlap, self.corpus.chunk_size
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "retrieval.topK must be greater than zero".to_string(),
            ));
        }

        if self.embedding.dimensions == 0 || self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "embedding.dimensions and embedding.batchSize must be greater than zero"
                    .to_string(),
            ));
        }

        if self.llm.provider == "openai" && self.llm.api_key().is_none() {
            return Err(AppError::Config(
                "OpenAI generation requires an API key (set llm.apiKeyEnv or OPENAI_API_KEY)"
                    .to_string(),
            ));
        }

        if self.embedding.provider == "openai" && self.embedding.api_key().is_none() {
            return Err(AppError::Config(
                "OpenAI embeddings require an API key (set embedding.apiKeyEnv or OPENAI_API_KEY)"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn check_known(what: &str, value: &str, known: &[&str]) -> AppResult<()> {
    if known.contains(&value) {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "Unknown {}: {}. Supported: {}",
            what,
            value,
            known.join(", ")
        )))
    }
}

/// Read an API key from the named variable, falling back to the provider's
/// conventional variable.
fn resolve_env_key(env_name: Option<&str>, provider: &str) -> Option<String> {
    let fallback = match provider {
        "openai" => Some("OPENAI_API_KEY"),
        _ => None,
    };

    env_name
        .or(fallback)
        .and_then(|name| std::env::var(name).ok())
        .filter(|key| !key.trim().is_empty())
}
