//! Error types for bot operations

use thiserror::Error;

/// Bot specific errors
#[derive(Debug, Error)]
pub enum BotError {
    /// API request failed
    #[error("API error: {0}")]
    ApiError(String),

    /// The data provider does not know this series
    #[error("Series not found: {0}")]
    SeriesNotFound(String),

    /// Invalid ticker symbol provided
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Unknown chart timeframe
    #[error("Invalid timeframe. Use 'd' for daily, 'w' for weekly, or 'm' for monthly.")]
    InvalidTimeframe(String),

    /// Intraday charts need a paid Finviz account
    #[error("Intraday charts are only available for FINVIZ*Elite users.")]
    IntradayUnavailable,

    /// Not enough observations for a calculation
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Malformed chat command
    #[error("{0}")]
    CommandError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Subscription file could not be read or written
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Posting a reminder failed
    #[error("Notification error: {0}")]
    NotificationError(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for bot operations
pub type Result<T> = std::result::Result<T, BotError>;

/// Convert anyhow::Error to BotError
impl From<anyhow::Error> for BotError {
    fn from(err: anyhow::Error) -> Self {
        BotError::Other(err.to_string())
    }
}
