//! Configuration loader and validator for the prompt-delivery bot.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub telegram: Telegram,
    pub openai: OpenAi,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    /// UTC hour (0-23) at which the daily batch run fires.
    pub delivery_hour_utc: u32,
}

/// Telegram bot settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Telegram {
    pub bot_token: String,
}

/// Generation provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpenAi {
    pub api_key: String,
    pub text_model: String,
    pub image_model: String,
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Base backoff delay; doubles on each retry.
    pub base_delay_ms: u64,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.delivery_hour_utc > 23 {
        return Err(ConfigError::Invalid("app.delivery_hour_utc must be 0-23"));
    }

    if cfg.telegram.bot_token.trim().is_empty() {
        return Err(ConfigError::Invalid("telegram.bot_token must be non-empty"));
    }

    if cfg.openai.api_key.trim().is_empty() {
        return Err(ConfigError::Invalid("openai.api_key must be non-empty"));
    }
    if cfg.openai.text_model.trim().is_empty() {
        return Err(ConfigError::Invalid("openai.text_model must be non-empty"));
    }
    if cfg.openai.image_model.trim().is_empty() {
        return Err(ConfigError::Invalid("openai.image_model must be non-empty"));
    }
    if cfg.openai.base_delay_ms == 0 {
        return Err(ConfigError::Invalid("openai.base_delay_ms must be > 0"));
    }

    Ok(())
}

/// Example YAML configuration, also used as a fixture in tests.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  delivery_hour_utc: 9

telegram:
  bot_token: "YOUR_TELEGRAM_BOT_TOKEN"

openai:
  api_key: "YOUR_OPENAI_API_KEY"
  text_model: "gpt-4o-mini"
  image_model: "dall-e-3"
  max_retries: 3
  base_delay_ms: 1000
"#
}
