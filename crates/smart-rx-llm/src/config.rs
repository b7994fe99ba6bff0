//! Runtime configuration.
//!
//! Layered from serde defaults, an optional TOML file and `SMART_RX__*`
//! environment variables (`SMART_RX__LLM__API_KEY` sets `llm.api_key`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "SMART_RX";

/// Default generative service endpoint.
pub const DEFAULT_PROVIDER_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model name.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default timeout for one generative call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generative service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// Master switch; when off every request uses the rule-based recommender
    pub enabled: bool,
    /// Base URL of the generateContent API
    pub provider_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl LlmConfig {
    /// Whether calls should be attempted at all.
    pub fn is_available(&self) -> bool {
        self.enabled
            && self
                .api_key
                .as_deref()
                .is_some_and(|key| !key.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SmartRxConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset
    pub log_filter: String,
    pub llm: LlmConfig,
}

impl Default for SmartRxConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("smart-rx.db"),
            log_filter: "info".to_string(),
            llm: LlmConfig::default(),
        }
    }
}

impl SmartRxConfig {
    /// Load configuration. A missing file at `path` is an error; with no path
    /// only defaults and the environment apply.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let config: SmartRxConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Invalid("llm.timeout_secs must be positive".into()));
        }
        if self.llm.enabled && self.llm.provider_url.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.provider_url is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = SmartRxConfig::default();
        assert_eq!(config.llm.timeout_secs, 30);
        assert_eq!(config.llm.timeout(), Duration::from_secs(30));
        assert!(!config.llm.is_available());
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
database_path = "/tmp/clinic.db"
log_filter = "debug"

[llm]
api_key = "test-key"
timeout_secs = 5
"#,
        );

        let config = SmartRxConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/clinic.db"));
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.llm.timeout_secs, 5);
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert!(config.llm.is_available());
    }

    #[test]
    fn test_disabled_service_is_unavailable() {
        let file = write_config(
            r#"
[llm]
enabled = false
api_key = "test-key"
"#,
        );
        let config = SmartRxConfig::load(Some(file.path())).unwrap();
        assert!(!config.llm.is_available());
    }

    #[test]
    fn test_blank_key_is_unavailable() {
        let llm = LlmConfig {
            api_key: Some("   ".into()),
            ..LlmConfig::default()
        };
        assert!(!llm.is_available());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let file = write_config("[llm]\ntimeout_secs = 0\n");
        let result = SmartRxConfig::load(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = SmartRxConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
