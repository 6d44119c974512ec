//! TOML configuration parsing and validation.
//!
//! Every section except `[db]` has defaults, so a minimal config file is:
//!
//! ```toml
//! [db]
//! path = "./data/vector_db.sqlite"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadsConfig {
    #[serde(default = "default_uploads_dir")]
    pub dir: PathBuf,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: default_uploads_dir(),
        }
    }
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("uploaded_files")
}

/// How the breakpoint threshold is derived from adjacent-sentence distances.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BreakpointType {
    Percentile,
    StandardDeviation,
    Interquartile,
    Gradient,
}

impl BreakpointType {
    /// Default `breakpoint_amount` for each strategy.
    pub fn default_amount(&self) -> f64 {
        match self {
            BreakpointType::Percentile => 95.0,
            BreakpointType::StandardDeviation => 3.0,
            BreakpointType::Interquartile => 1.5,
            BreakpointType::Gradient => 95.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_breakpoint_type")]
    pub breakpoint_type: BreakpointType,
    /// Overrides [`BreakpointType::default_amount`].
    #[serde(default)]
    pub breakpoint_amount: Option<f64>,
    /// Sentences on each side combined with a sentence before embedding.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Minimum chunk length in characters; shorter chunks are merged forward.
    #[serde(default)]
    pub min_chunk_size: Option<usize>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            breakpoint_type: default_breakpoint_type(),
            breakpoint_amount: None,
            buffer_size: default_buffer_size(),
            min_chunk_size: None,
        }
    }
}

impl ChunkingConfig {
    pub fn effective_amount(&self) -> f64 {
        self.breakpoint_amount
            .unwrap_or_else(|| self.breakpoint_type.default_amount())
    }
}

fn default_breakpoint_type() -> BreakpointType {
    BreakpointType::Percentile
}
fn default_buffer_size() -> usize {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the language model.
    #[serde(default = "default_k")]
    pub k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { k: default_k() }
    }
}

fn default_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// `perplexity` or `openai` (any OpenAI-compatible chat completions API).
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Overrides the provider's default base URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Request timeout; unset means no timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            temperature: default_temperature(),
            url: None,
            api_key_env: default_api_key_env(),
            timeout_secs: None,
        }
    }
}

fn default_llm_provider() -> String {
    "perplexity".to_string()
}
fn default_llm_model() -> String {
    "sonar-pro".to_string()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_api_key_env() -> String {
    "PPLX_API_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

impl Config {
    /// Config with every default, rooted at `data_dir`.
    pub fn minimal(data_dir: &Path) -> Self {
        Self {
            db: DbConfig {
                path: data_dir.join("vector_db").join("ctx-ai.sqlite"),
            },
            uploads: UploadsConfig {
                dir: data_dir.join("uploaded_files"),
            },
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.retrieval.k == 0 {
        anyhow::bail!("retrieval.k must be >= 1");
    }

    let amount = config.chunking.effective_amount();
    match config.chunking.breakpoint_type {
        BreakpointType::Percentile | BreakpointType::Gradient => {
            if !(0.0..=100.0).contains(&amount) {
                anyhow::bail!("chunking.breakpoint_amount must be in [0, 100] for percentile thresholds");
            }
        }
        BreakpointType::StandardDeviation | BreakpointType::Interquartile => {
            if amount < 0.0 {
                anyhow::bail!("chunking.breakpoint_amount must be >= 0");
            }
        }
    }

    match config.embedding.provider.as_str() {
        "local" | "hash" => {}
        "openai" | "ollama" => {
            if config.embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                anyhow::bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be local, openai, ollama, or hash.",
            other
        ),
    }

    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    match config.llm.provider.as_str() {
        "perplexity" | "openai" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be perplexity or openai.",
            other
        ),
    }

    if !(0.0..=2.0).contains(&config.llm.temperature) {
        anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
    }

    Ok(())
}
