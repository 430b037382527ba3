//! Studymap configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::scheduler::SchedulerConfig;

/// Main studymap configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Oracle provider configuration
    pub oracle: OracleConfig,

    /// Scheduling constraints
    pub scheduler: SchedulerConfig,

    /// Calendar export configuration
    pub calendar: CalendarConfig,

    /// Storage configuration
    pub storage: StorageConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that required environment variables are set. Call this early
    /// in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.oracle.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "Oracle API key not found. Set the {} environment variable.",
                self.oracle.api_key_env
            ));
        }
        self.scheduler.validate()?;
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .studymap.yml
        let local_config = PathBuf::from(".studymap.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/studymap/studymap.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("studymap").join("studymap.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Oracle provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Provider name ("gateway" or "openai")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Sampling temperature; None uses the provider default
    pub temperature: Option<f64>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: "gateway".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "STUDYMAP_ORACLE_KEY".to_string(),
            base_url: "https://gateway.ai.example.dev".to_string(),
            max_tokens: 8192,
            timeout_ms: 60_000,
            temperature: None,
        }
    }
}

/// Calendar export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Calendar API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Target calendar identifier
    #[serde(rename = "calendar-id")]
    pub calendar_id: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/calendar/v3".to_string(),
            calendar_id: "primary".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory for record collections
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join("studymap"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.oracle.provider, "gateway");
        assert_eq!(config.oracle.api_key_env, "STUDYMAP_ORACLE_KEY");
        assert_eq!(config.calendar.calendar_id, "primary");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
oracle:
  model: gpt-4o
  timeout-ms: 120000
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.oracle.model, "gpt-4o");
        assert_eq!(config.oracle.timeout_ms, 120_000);
        // Untouched sections fall back to defaults
        assert_eq!(config.oracle.provider, "gateway");
        assert_eq!(config.calendar.calendar_id, "primary");
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let path = PathBuf::from("/nonexistent/studymap.yml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
