//! Unified error types for CountBot.

use thiserror::Error;

/// Result type alias using CountBotError.
pub type Result<T> = std::result::Result<T, CountBotError>;

/// Substring the chat network puts in throttling errors.
pub const RATE_LIMIT_MARKER: &str = "rate-overlimit";

#[derive(Error, Debug)]
pub enum CountBotError {
    // Transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    // Persistence errors
    #[error("Store error: {0}")]
    Store(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    #[error("Invalid schedule expression: {0}")]
    Schedule(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{0}")]
    Other(String),
}

impl CountBotError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for throttling failures, either typed or recognised by the
    /// network's error text.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::Transport(msg) | Self::Http(msg) => msg.contains(RATE_LIMIT_MARKER),
            _ => false,
        }
    }
}
