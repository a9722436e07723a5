//! Error taxonomy shared by the API client, the snapshot store and the poller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlipperError {
    /// The API key was missing or rejected. Fatal.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Transport failure or an unusable upstream response. The current
    /// action is aborted; the poller moves on to its next cycle.
    #[error("Network error: {0}")]
    Network(String),

    /// Unknown player, or a snapshot slot that was never written.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlipperError {
    /// Whether the process should stop rather than report and carry on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FlipperError::Auth(_) | FlipperError::Config(_))
    }
}

impl From<reqwest::Error> for FlipperError {
    fn from(e: reqwest::Error) -> Self {
        FlipperError::Network(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FlipperError>;
