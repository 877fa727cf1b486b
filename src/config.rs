//! Configuration loading.
//!
//! Reads a TOML file into [`Config`]. Every section is optional and every key
//! has a default, so `docchat` runs without a config file at all. Values are
//! validated once on load.

use anyhow::{bail, Context, Result};
use docchat_core::chunk::ChunkingParams;
use docchat_core::citation::CitationMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub citations: CitationsConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_target_chars")]
    pub target_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_chars: default_target_chars(),
            overlap_chars: default_overlap_chars(),
            max_chunks: default_max_chunks(),
        }
    }
}

impl ChunkingConfig {
    pub fn params(&self) -> ChunkingParams {
        ChunkingParams {
            target_chars: self.target_chars,
            overlap_chars: self.overlap_chars,
            max_chunks: self.max_chunks,
        }
    }
}

fn default_target_chars() -> usize {
    1800
}
fn default_overlap_chars() -> usize {
    200
}
fn default_max_chunks() -> usize {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    docchat_core::retrieve::DEFAULT_TOP_K
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached document versions.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

fn default_capacity() -> usize {
    docchat_core::cache::DEFAULT_CAPACITY
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CitationsConfig {
    #[serde(default)]
    pub mode: CitationMode,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
    /// Base URL for Ollama.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            dims: default_dims(),
            batch_size: default_batch_size(),
            max_retries: 0,
            timeout_secs: default_embedding_timeout(),
            url: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}
fn default_dims() -> usize {
    3072
}
fn default_batch_size() -> usize {
    docchat_core::embedding::DEFAULT_BATCH_SIZE
}
fn default_embedding_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_completion_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_completion_model(),
            temperature: default_temperature(),
            max_retries: 0,
            timeout_secs: default_completion_timeout(),
            url: None,
        }
    }
}

impl CompletionConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_completion_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_completion_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// Directory that document ids resolve against.
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load `path` if given, otherwise use defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path),
        None => Ok(Config::default()),
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.chunking.target_chars == 0 {
            bail!("chunking.target_chars must be > 0");
        }
        if self.chunking.max_chunks == 0 {
            bail!("chunking.max_chunks must be > 0");
        }

        if self.retrieval.top_k < 1 {
            bail!("retrieval.top_k must be >= 1");
        }

        if self.cache.capacity < 1 {
            bail!("cache.capacity must be >= 1");
        }

        match self.embedding.provider.as_str() {
            "disabled" | "openai" | "ollama" | "local" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
                other
            ),
        }
        if self.embedding.is_enabled() && self.embedding.dims == 0 {
            bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                self.embedding.provider
            );
        }
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be >= 1");
        }

        match self.completion.provider.as_str() {
            "disabled" | "openai" | "ollama" => {}
            other => bail!(
                "Unknown completion provider: '{}'. Must be disabled, openai, or ollama.",
                other
            ),
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            bail!("completion.temperature must be in [0.0, 2.0]");
        }

        Ok(())
    }
}
