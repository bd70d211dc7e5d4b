use crate::slots::SlotInput;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which scorer implementation evaluates prompts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Mock,
    Llm,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScorerConfig {
    #[serde(default)]
    pub backend: Backend,
    /// Simulated latency applied once per evaluation batch
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            latency_ms: default_latency_ms(),
        }
    }
}

impl ScorerConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

/// Settings for the chat-completion scorer
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API endpoint
    pub api_endpoint: String,
    /// Environment variable name containing the API key
    pub env_var_api_key: String,
    /// Model used to evaluate prompts
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Requests per second; zero or less disables rate limiting
    #[serde(default = "default_rate_limit")]
    pub rate_limit_rps: f64,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    #[serde(default = "default_export_directory")]
    pub directory: PathBuf,
    /// Background fill for image exports
    #[serde(default = "default_background")]
    pub background: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: default_export_directory(),
            background: default_background(),
        }
    }
}

/// A comparison prompt declared in the run file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PromptConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub value: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl From<PromptConfig> for SlotInput {
    fn from(prompt: PromptConfig) -> Self {
        SlotInput {
            name: prompt.name,
            value: prompt.value,
            color: prompt.color,
        }
    }
}

fn default_latency_ms() -> u64 {
    2000
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_tokens() -> u32 {
    1200
}

fn default_rate_limit() -> f64 {
    2.0
}

fn default_system_prompt() -> String {
    "You are a brutally honest prompt engineering reviewer. Answer with JSON only.".to_string()
}

fn default_export_directory() -> PathBuf {
    PathBuf::from("exports")
}

fn default_background() -> String {
    "#0a0a0f".to_string()
}

/// Root of the TOML run file; every section is optional
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scorer: ScorerConfig,
    #[serde(default)]
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub prompts: Vec<PromptConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.scorer.backend == Backend::Llm && self.llm.is_none() {
            bail!("scorer backend \"llm\" requires an [llm] section");
        }
        Ok(())
    }
}
