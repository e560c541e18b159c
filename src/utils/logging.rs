//! Logging configuration and setup
//!
//! This module provides tracing initialization, structured logging helpers and
//! the formatter for the HTML event blocks posted to the audit chat.

use std::fmt;

use chrono::{DateTime, Local};
use teloxide::utils::html::escape;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::config::LoggingConfig;
use crate::models::UserContext;
use crate::utils::errors::{Result, TorahBotError};

/// Initialize logging based on configuration.
///
/// When a file path is configured a daily rolling file writer is added; the
/// returned guard must be held until shutdown so buffered lines get flushed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.level))
        .map_err(|e| TorahBotError::Config(format!("Invalid log level: {}", e)))?;

    let stdout_layer = if config.json {
        fmt_layer::layer().json().boxed()
    } else {
        fmt_layer::layer().with_writer(std::io::stdout).boxed()
    };

    let (file_layer, guard) = match &config.file_path {
        Some(directory) => {
            let file_appender = tracing_appender::rolling::daily(directory, "torah-bot.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt_layer::layer()
                .with_ansi(false)
                .with_writer(non_blocking);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .with(filter)
        .try_init()
        .map_err(|e| TorahBotError::Config(format!("Failed to initialize logging: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Value of one detail line in a formatted event log
#[derive(Debug, Clone, PartialEq)]
pub enum LogValue {
    Float(f64),
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for LogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogValue::Float(value) => write!(f, "{:.1}", value),
            LogValue::Bool(true) => write!(f, "✅"),
            LogValue::Bool(false) => write!(f, "❌"),
            LogValue::Int(value) => write!(f, "{}", value),
            LogValue::Text(value) => write!(f, "{}", value),
        }
    }
}

impl From<f64> for LogValue {
    fn from(value: f64) -> Self {
        LogValue::Float(value)
    }
}

impl From<bool> for LogValue {
    fn from(value: bool) -> Self {
        LogValue::Bool(value)
    }
}

impl From<i64> for LogValue {
    fn from(value: i64) -> Self {
        LogValue::Int(value)
    }
}

impl From<i32> for LogValue {
    fn from(value: i32) -> Self {
        LogValue::Int(value.into())
    }
}

impl From<&str> for LogValue {
    fn from(value: &str) -> Self {
        LogValue::Text(value.to_string())
    }
}

impl From<String> for LogValue {
    fn from(value: String) -> Self {
        LogValue::Text(value)
    }
}

fn icon_for_key(key: &str) -> &'static str {
    match key {
        "score" => "🏆",
        "duration" => "⏱️",
        "items_collected" => "✨",
        "mistakes" => "❌",
        "achievements" => "🎖️",
        "topic" => "📚",
        "success" => "✅",
        "error" => "⚠️",
        "language" => "🌐",
        "after_tutorial" => "📖",
        _ => "▫️",
    }
}

/// `items_collected` -> `Items Collected`
fn title_case_key(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Render an event as an HTML block for the audit chat, stamped with the
/// current local time. User fields and detail values are HTML-escaped.
pub fn format_event_log(
    event_type: &str,
    user: Option<&UserContext>,
    emoji: &str,
    details: &[(&str, LogValue)],
) -> String {
    format_event_log_at(event_type, user, emoji, details, Local::now())
}

/// Same as [`format_event_log`] with an explicit timestamp
pub fn format_event_log_at(
    event_type: &str,
    user: Option<&UserContext>,
    emoji: &str,
    details: &[(&str, LogValue)],
    at: DateTime<Local>,
) -> String {
    let (user_id, display_name, language) = match user {
        Some(user) => (
            user.user_id().to_string(),
            escape(&user.display_name()),
            escape(user.language().unwrap_or("unknown")),
        ),
        None => (
            "unknown".to_string(),
            "@unknown".to_string(),
            "unknown".to_string(),
        ),
    };

    let mut lines = vec![
        format!("{} <b>{}</b> [{}]", emoji, escape(event_type), at.format("%H:%M:%S")),
        format!("🆔 User: {} ({})", user_id, display_name),
        format!("🌐 Language: {}", language),
    ];

    if !details.is_empty() {
        lines.push(String::new());
        for (key, value) in details {
            lines.push(format!(
                "{} {}: {}",
                icon_for_key(key),
                title_case_key(key),
                escape(&value.to_string())
            ));
        }
    }

    lines.join("\n")
}

/// Log a rejected or suspicious inbound request
pub fn log_security_event(event_type: &str, client_ip: &str, user_agent: &str, details: &str) {
    warn!(
        event_type = event_type,
        client_ip = client_ip,
        user_agent = user_agent,
        details = details,
        "Security event"
    );
}

/// Log user actions with structured data
pub fn log_user_action(user_id: i64, action: &str, details: Option<&str>) {
    info!(
        user_id = user_id,
        action = action,
        details = details,
        "User action performed"
    );
}

/// Log API errors with context
pub fn log_api_error(api: &str, error: &str, context: Option<&str>) {
    error!(
        api = api,
        error = error,
        context = context,
        "API error occurred"
    );
}

/// Log database operations
pub fn log_database_operation(operation: &str, table: &str, duration_ms: u64, success: bool) {
    if success {
        debug!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation completed"
        );
    } else {
        error!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation failed"
        );
    }
}
