
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;

/// Environment variable holding the Groq API key. Never written to disk.
pub const GROQ_API_KEY_VAR: &str = "GROQ_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub groq: GroqConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GroqConfig {
    pub api_url: String,
    pub model: String,
    pub max_answer_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            max_answer_tokens: 500,
            temperature: 0.3,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub dimension: usize,
    /// Courtesy delay between consecutive remote embedding calls.
    pub batch_delay_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            batch_delay_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// File stem for the two snapshot artifacts, relative to the base directory.
    pub index_stem: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_stem: "rag_index".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(usize),
    #[error("Invalid batch delay: {0}ms (must be at most 10000)")]
    InvalidBatchDelay(u64),
    #[error("Invalid answer token budget: {0} (must be between 1 and 8192)")]
    InvalidMaxAnswerTokens(u32),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("Invalid timeout: {0}s (must be between 1 and 300)")]
    InvalidTimeout(u64),
    #[error("Invalid index stem: cannot be empty or contain path separators")]
    InvalidIndexStem,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.groq.api_url)
            .map_err(|_| ConfigError::InvalidUrl(self.groq.api_url.clone()))?;

        if self.groq.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.groq.model.clone()));
        }

        if self.groq.max_answer_tokens == 0 || self.groq.max_answer_tokens > 8192 {
            return Err(ConfigError::InvalidMaxAnswerTokens(
                self.groq.max_answer_tokens,
            ));
        }

        if !(0.0..=2.0).contains(&self.groq.temperature) {
            return Err(ConfigError::InvalidTemperature(self.groq.temperature));
        }

        if self.groq.timeout_seconds == 0 || self.groq.timeout_seconds > 300 {
            return Err(ConfigError::InvalidTimeout(self.groq.timeout_seconds));
        }

        if !(64..=4096).contains(&self.embedding.dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding.dimension,
            ));
        }

        if self.embedding.batch_delay_ms > 10_000 {
            return Err(ConfigError::InvalidBatchDelay(self.embedding.batch_delay_ms));
        }

        if self.storage.index_stem.is_empty()
            || self.storage.index_stem.contains(std::path::MAIN_SEPARATOR)
        {
            return Err(ConfigError::InvalidIndexStem);
        }

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    /// Base path for the snapshot artifacts; the store derives
    /// `<stem>.index` and `<stem>.meta.json` from it.
    #[inline]
    pub fn index_path(&self) -> PathBuf {
        self.base_dir.join(&self.storage.index_stem)
    }

    /// Read the Groq API key from the environment, if configured.
    #[inline]
    pub fn groq_api_key() -> Option<String> {
        std::env::var(GROQ_API_KEY_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
