//! Error handling for Torah Bot
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;

/// Main error type for Torah Bot application
#[derive(Error, Debug)]
pub enum TorahBotError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Service '{name}' is registered with a different type")]
    ServiceTypeMismatch { name: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Handler failed: {0}")]
    Handler(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Torah Bot operations
pub type Result<T> = std::result::Result<T, TorahBotError>;

impl From<config::ConfigError> for TorahBotError {
    fn from(err: config::ConfigError) -> Self {
        TorahBotError::Config(err.to_string())
    }
}

impl TorahBotError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            TorahBotError::Database(_) => true,
            TorahBotError::Telegram(_) => true,
            TorahBotError::Config(_) => false,
            TorahBotError::ServiceNotFound(_) => false,
            TorahBotError::ServiceTypeMismatch { .. } => false,
            TorahBotError::PermissionDenied(_) => false,
            TorahBotError::Handler(_) => true,
            TorahBotError::Http(_) => true,
            TorahBotError::Serialization(_) => false,
            TorahBotError::Io(_) => true,
            TorahBotError::UrlParse(_) => false,
            TorahBotError::InvalidInput(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TorahBotError::Config(_) => ErrorSeverity::Critical,
            TorahBotError::ServiceNotFound(_) => ErrorSeverity::Critical,
            TorahBotError::ServiceTypeMismatch { .. } => ErrorSeverity::Critical,
            TorahBotError::PermissionDenied(_) => ErrorSeverity::Warning,
            TorahBotError::InvalidInput(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
