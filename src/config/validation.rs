//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use chrono::NaiveTime;
use url::Url;

use super::Settings;
use crate::utils::errors::{Result, TorahBotError};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_bot_config(&settings.bot)?;
    validate_database_config(&settings.database)?;
    validate_telegram_config(&settings.telegram)?;
    validate_newsletter_config(&settings.newsletter)?;
    validate_backup_config(&settings.backup)?;
    validate_menu_button_config(&settings.menu_button)?;
    validate_rate_limit_config(&settings.rate_limit)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate bot configuration
fn validate_bot_config(config: &super::BotConfig) -> Result<()> {
    if config.token.is_empty() {
        return Err(TorahBotError::Config("Bot token is required".to_string()));
    }

    if let Some(ref webhook_url) = config.webhook_url {
        let url = Url::parse(webhook_url)
            .map_err(|e| TorahBotError::Config(format!("Invalid webhook URL: {}", e)))?;
        if url.scheme() != "https" {
            return Err(TorahBotError::Config(
                "Webhook URL must use https".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(TorahBotError::Config("Database URL is required".to_string()));
    }

    if config.max_connections == 0 {
        return Err(TorahBotError::Config(
            "Max connections must be greater than 0".to_string(),
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(TorahBotError::Config(
            "Min connections cannot be greater than max connections".to_string(),
        ));
    }

    Ok(())
}

/// Validate outbound Telegram API configuration
fn validate_telegram_config(config: &super::TelegramApiConfig) -> Result<()> {
    if config.timeout_seconds == 0 {
        return Err(TorahBotError::Config(
            "Telegram API timeout must be greater than 0".to_string(),
        ));
    }

    if let Some(ref api_url) = config.api_url {
        Url::parse(api_url)
            .map_err(|e| TorahBotError::Config(format!("Invalid Bot API URL: {}", e)))?;
    }

    Ok(())
}

/// Validate newsletter defaults
fn validate_newsletter_config(config: &super::NewsletterConfig) -> Result<()> {
    parse_delivery_time(&config.default_delivery_time).ok_or_else(|| {
        TorahBotError::Config(format!(
            "Invalid default delivery time: {}",
            config.default_delivery_time
        ))
    })?;

    if config.default_timezone.is_empty() {
        return Err(TorahBotError::Config(
            "Default timezone is required".to_string(),
        ));
    }

    if !(-12..=14).contains(&config.schedule_utc_offset_hours) {
        return Err(TorahBotError::Config(format!(
            "Schedule UTC offset out of range: {}",
            config.schedule_utc_offset_hours
        )));
    }

    if config.scheduler_interval_secs == 0 {
        return Err(TorahBotError::Config(
            "Scheduler interval must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate backup configuration
fn validate_backup_config(config: &super::BackupConfig) -> Result<()> {
    if config.directory.is_empty() {
        return Err(TorahBotError::Config(
            "Backup directory is required".to_string(),
        ));
    }

    if config.max_backups == 0 {
        return Err(TorahBotError::Config(
            "At least one backup must be kept".to_string(),
        ));
    }

    Ok(())
}

/// Validate menu button configuration
fn validate_menu_button_config(config: &super::MenuButtonConfig) -> Result<()> {
    if config.text.is_empty() {
        return Err(TorahBotError::Config(
            "Menu button text is required".to_string(),
        ));
    }

    Url::parse(&config.web_app_url)
        .map_err(|e| TorahBotError::Config(format!("Invalid web app URL: {}", e)))?;

    Ok(())
}

/// Validate webhook rate limit configuration
fn validate_rate_limit_config(config: &super::RateLimitConfig) -> Result<()> {
    if config.requests_per_minute == 0 || config.burst_size == 0 {
        return Err(TorahBotError::Config(
            "Rate limit quota must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(TorahBotError::Config("Log level is required".to_string()));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(TorahBotError::Config(format!(
            "Invalid log level: {}. Valid levels: {:?}",
            config.level, valid_levels
        )));
    }

    Ok(())
}

/// Parse `HH:MM` or `HH:MM:SS` into a time of day
pub fn parse_delivery_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.bot.token = "12345:test_token".to_string();
        settings
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let settings = Settings::default();
        assert_matches!(validate_settings(&settings), Err(TorahBotError::Config(_)));
    }

    #[test]
    fn test_plain_http_webhook_is_rejected() {
        let mut settings = valid_settings();
        settings.bot.webhook_url = Some("http://example.com/webhook".to_string());
        assert_matches!(validate_settings(&settings), Err(TorahBotError::Config(_)));

        settings.bot.webhook_url = Some("https://example.com/webhook".to_string());
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        let mut settings = valid_settings();
        settings.logging.level = "verbose".to_string();
        assert_matches!(validate_settings(&settings), Err(TorahBotError::Config(_)));
    }

    #[test]
    fn test_zero_scheduler_interval_is_rejected() {
        let mut settings = valid_settings();
        settings.newsletter.scheduler_interval_secs = 0;
        assert_matches!(validate_settings(&settings), Err(TorahBotError::Config(_)));
    }

    #[test]
    fn test_parse_delivery_time() {
        assert_eq!(parse_delivery_time("09:00"), NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(parse_delivery_time("21:30:15"), NaiveTime::from_hms_opt(21, 30, 15));
        assert_eq!(parse_delivery_time("9 am"), None);
    }
}
