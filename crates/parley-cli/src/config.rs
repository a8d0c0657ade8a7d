use config::{Config as ConfigLoader, ConfigError, Environment, File};
use parley_types::{ChatConfig, ContextPolicyConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[context]`, snake_case on disk
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub max_messages: usize,
    pub max_tokens: usize,
    pub summary_threshold: usize,
    pub enable_summary: bool,
    pub summary_length: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextPolicyConfig::default().into()
    }
}

impl From<ContextPolicyConfig> for ContextConfig {
    fn from(policy: ContextPolicyConfig) -> Self {
        Self {
            max_messages: policy.max_messages,
            max_tokens: policy.max_tokens,
            summary_threshold: policy.summary_threshold,
            enable_summary: policy.enable_summary,
            summary_length: policy.summary_length,
        }
    }
}

impl From<ContextConfig> for ContextPolicyConfig {
    fn from(config: ContextConfig) -> Self {
        Self {
            max_messages: config.max_messages,
            max_tokens: config.max_tokens,
            summary_threshold: config.summary_threshold,
            enable_summary: config.enable_summary,
            summary_length: config.summary_length,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Session file; defaults to the platform data dir
    pub path: Option<PathBuf>,
    /// Keep sessions in memory only
    pub in_memory: bool,
}

impl StorageConfig {
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("parley")
                .join("sessions.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables, `PARLEY_<SECTION>__<KEY>` (e.g. `PARLEY_CHAT__MODEL`)
    ///
    /// `OPENAI_API_KEY` fills `chat.api_key` when nothing else set it.
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("PARLEY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        if cfg.chat.api_key.is_none() {
            cfg.chat.api_key = std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty());
        }

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }
}
