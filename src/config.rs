//! Pipeline configuration.
//!
//! Everything the orchestrator needs is carried by [`PipelineConfig`], built once
//! at startup and passed in explicitly. The pipeline itself never reads the
//! environment; only [`PipelineConfig::from_env`] does, for the binary.

use crate::llm::{LlmProvider, RetryPolicy};
use crate::types::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Database used when no target is configured.
pub const DEFAULT_DB_PATH: &str = "data/sample_service_records.db";

/// Model used when `P8_DEFAULT_LLM` is not set.
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20240620";

/// LLM endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// Model name (provider is inferred from its prefix)
    pub model: String,

    /// API key. Never written back to disk.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Override for the provider endpoint (OpenAI-compatible servers, proxies)
    pub base_url: Option<String>,

    /// Bound on a single completion call
    pub request_timeout_ms: u64,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens in a completion
    pub max_tokens: u32,

    /// Retry policy for transient failures
    pub retry: RetryPolicy,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: None,
            request_timeout_ms: 60_000,
            temperature: 0.0,
            max_tokens: 2048,
            retry: RetryPolicy::default(),
        }
    }
}

impl LlmConfig {
    /// Completion call timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Provider inferred from the model name.
    pub fn provider(&self) -> LlmProvider {
        LlmProvider::from_model(&self.model)
    }
}

/// Configuration for one orchestrator instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Open the database read-only and refuse non-SELECT statements
    pub read_only: bool,

    /// Row limit the generator is asked to apply when the question names none
    pub top_k: usize,

    /// Example rows per table included in the schema context
    pub sample_rows: usize,

    /// Bound on statement execution
    pub query_timeout_ms: u64,

    /// SQLite busy timeout
    pub busy_timeout_ms: u64,

    /// LLM settings
    pub llm: LlmConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            read_only: true,
            top_k: 5,
            sample_rows: 3,
            query_timeout_ms: 30_000,
            busy_timeout_ms: 5_000,
            llm: LlmConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Default configuration pointing at another database.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Default::default()
        }
    }

    /// Statement execution timeout.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// SQLite busy timeout.
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Load configuration from a JSON file. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::ConfigError` if the file is not valid JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            PipelineError::ConfigError(format!("Invalid config {}: {}", path.display(), e))
        })
    }

    /// Save configuration as pretty JSON (API key omitted).
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Build configuration from the process environment.
    ///
    /// Uses `P8_DB_PATH`, `P8_DEFAULT_LLM`, `P8_LLM_BASE_URL`, `P8_READ_ONLY`
    /// and the provider key (`ANTHROPIC_API_KEY`, `OPENAI_API_KEY` or
    /// `CEREBRAS_API_KEY`, chosen by model prefix).
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::ConfigError` if `P8_READ_ONLY` is not a boolean
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay variables from `lookup` onto this configuration.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("P8_DB_PATH") {
            self.db_path = PathBuf::from(shellexpand::tilde(&path).to_string());
        }
        if let Some(model) = lookup("P8_DEFAULT_LLM") {
            self.llm.model = model;
        }
        if let Some(base_url) = lookup("P8_LLM_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }
        if let Some(flag) = lookup("P8_READ_ONLY") {
            self.read_only = parse_bool(&flag).ok_or_else(|| {
                PipelineError::ConfigError(format!("P8_READ_ONLY must be true or false, got '{}'", flag))
            })?;
        }
        if self.llm.api_key.is_none() {
            self.llm.api_key = lookup(self.llm.provider().api_key_var());
        }
        Ok(self)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
