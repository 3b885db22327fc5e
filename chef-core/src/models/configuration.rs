//! Configuration data structures

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ChefError, Result};

/// Default Telegram Bot API endpoint
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Logging level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "info")]
    #[default]
    Info,
    #[serde(rename = "debug")]
    Debug,
    #[serde(rename = "trace")]
    Trace,
}

/// How choice buttons are labelled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LabelStyle {
    /// A, B, C, ...
    #[default]
    Letters,
    /// 1, 2, 3, ...
    Numbers,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Logging verbosity level
    pub log_level: LogLevel,
    /// Server-side long-poll timeout for each getUpdates call
    pub poll_timeout_seconds: u64,
    /// How long blocking text/choice/confirm prompts wait (0 = forever)
    pub ask_timeout_seconds: u64,
    /// How long blocking photo prompts wait (0 = forever)
    pub photo_timeout_seconds: u64,
    /// Choice button labelling
    pub choice_labels: LabelStyle,
    /// Directory holding one JSON file per queued request
    pub queue_dir: Option<PathBuf>,
    /// Directory downloaded photos are written to
    pub scratch_dir: Option<PathBuf>,
    /// Bot API base URL (self-hosted Bot API servers, tests)
    pub api_base: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            poll_timeout_seconds: 30,
            ask_timeout_seconds: 300,
            photo_timeout_seconds: 600,
            choice_labels: LabelStyle::Letters,
            queue_dir: None,
            scratch_dir: None,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl Configuration {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Configuration = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Configuration::default())
        }
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ChefError::Config(format!("cannot serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the XDG config directory path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ChefError::Config("could not determine config directory".into()))?;
        Ok(config_dir.join("chef").join("config.toml"))
    }

    /// Queue directory, defaulting to the user data dir
    pub fn queue_dir(&self) -> PathBuf {
        self.queue_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("chef")
                .join("queue")
        })
    }

    /// Scratch directory for downloaded photos
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("chef-photos"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // Telegram rejects long-poll timeouts above 50 seconds
        if self.poll_timeout_seconds > 50 {
            errors.push("poll_timeout_seconds cannot exceed 50".to_string());
        }

        if self.ask_timeout_seconds > 86_400 {
            errors.push("ask_timeout_seconds cannot exceed 86400 (1 day)".to_string());
        }

        if self.photo_timeout_seconds > 86_400 {
            errors.push("photo_timeout_seconds cannot exceed 86400 (1 day)".to_string());
        }

        match url::Url::parse(&self.api_base) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            _ => errors.push(format!("api_base is not an http(s) URL: {}", self.api_base)),
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_configuration() {
        let config = Configuration::default();
        assert_eq!(config.poll_timeout_seconds, 30);
        assert_eq!(config.ask_timeout_seconds, 300);
        assert_eq!(config.choice_labels, LabelStyle::Letters);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_configuration_validation() {
        let config = Configuration {
            poll_timeout_seconds: 120,
            ask_timeout_seconds: 100_000,
            api_base: "ftp://example.com".to_string(),
            ..Configuration::default()
        };

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("poll_timeout_seconds")));
        assert!(errors.iter().any(|e| e.contains("ask_timeout_seconds")));
        assert!(errors.iter().any(|e| e.contains("api_base")));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Configuration =
            toml::from_str("choice_labels = \"numbers\"\nask_timeout_seconds = 60\n").unwrap();
        assert_eq!(config.choice_labels, LabelStyle::Numbers);
        assert_eq!(config.ask_timeout_seconds, 60);
        assert_eq!(config.poll_timeout_seconds, 30);
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("chef").join("config.toml");

        let config = Configuration {
            ask_timeout_seconds: 120,
            queue_dir: Some(temp_dir.path().join("queue")),
            ..Configuration::default()
        };

        config.save_to_file(&config_path).unwrap();
        assert!(config_path.exists());

        let loaded = Configuration::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.ask_timeout_seconds, 120);
        assert_eq!(loaded.queue_dir(), temp_dir.path().join("queue"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = tempdir().unwrap();
        let loaded = Configuration::load_from_file(&temp_dir.path().join("nope.toml")).unwrap();
        assert_eq!(loaded.poll_timeout_seconds, 30);
    }
}
