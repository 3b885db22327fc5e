//! Error types for the coordination client

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Result alias used throughout chef-core
pub type Result<T> = std::result::Result<T, ChefError>;

/// Closed set of failure causes. Transport details are wrapped, never leaked.
#[derive(Debug, Error)]
pub enum ChefError {
    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("Invalid options: expected between 1 and {max} choices, got {count}")]
    InvalidOptions { count: usize, max: usize },

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credential: set the {var} environment variable (or add it to .env)")]
    MissingCredential { var: &'static str },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Chat backend returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Malformed response from chat backend: {0}")]
    MalformedResponse(String),

    #[error("Pending request {0} not found")]
    NotFound(Uuid),

    #[error("Queue storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChefError {
    /// True for failures that may succeed when retried (network, 5xx, 429).
    pub fn is_transient(&self) -> bool {
        match self {
            ChefError::Network(_) => true,
            ChefError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// True for caller mistakes rejected before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ChefError::EmptyPrompt | ChefError::InvalidOptions { .. } | ChefError::FileNotFound(_)
        )
    }
}

impl From<toml::de::Error> for ChefError {
    fn from(err: toml::de::Error) -> Self {
        ChefError::Config(format!("invalid config: {}", err))
    }
}
