//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from configuration files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub bot: BotConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub telegram: TelegramApiConfig,
    pub newsletter: NewsletterConfig,
    pub backup: BackupConfig,
    pub menu_button: MenuButtonConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    pub features: FeaturesConfig,
}

/// Telegram bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    pub token: String,
    /// Public URL Telegram should deliver updates to
    pub webhook_url: Option<String>,
    /// Shared secret expected in `X-Telegram-Bot-Api-Secret-Token`
    pub webhook_secret: Option<String>,
    /// Fallback admins, used when the `admin_users` table is empty or unreachable
    pub admin_ids: Vec<i64>,
    /// Chat receiving formatted audit events
    pub log_chat_id: Option<i64>,
}

/// Webhook HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

/// Outbound Telegram Bot API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramApiConfig {
    /// Override for the Bot API base URL (local Bot API server, tests)
    pub api_url: Option<String>,
    pub timeout_seconds: u64,
}

/// Newsletter defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewsletterConfig {
    pub auto_subscribe: bool,
    pub default_delivery_time: String,
    pub default_timezone: String,
    /// Pause between two broadcast deliveries
    pub delivery_delay_ms: u64,
    /// Offset of the calendar that decides which day a broadcast belongs to
    pub schedule_utc_offset_hours: i32,
    /// How often the scheduler looks for a due broadcast
    pub scheduler_interval_secs: u64,
}

/// Database backup configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackupConfig {
    pub directory: String,
    pub max_backups: usize,
}

/// Web app menu button configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MenuButtonConfig {
    pub text: String,
    pub web_app_url: String,
}

/// Webhook rate limit configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub burst_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub json: bool,
}

/// Feature flags configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeaturesConfig {
    pub configure_bot_profile: bool,
    pub register_webhook: bool,
    pub menu_button: bool,
    pub broadcast_scheduler: bool,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Settings::default())?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("TORAHBOT")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("bot.admin_ids")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::TorahBotError> {
        super::validation::validate_settings(self)
    }

    /// Configured webhook secret, treating an empty string as absent
    pub fn webhook_secret(&self) -> Option<&str> {
        self.bot
            .webhook_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                token: String::new(),
                webhook_url: None,
                webhook_secret: None,
                admin_ids: vec![],
                log_chat_id: None,
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/torah_bot".to_string(),
                max_connections: 4,
                min_connections: 0,
                acquire_timeout_seconds: 30,
            },
            telegram: TelegramApiConfig {
                api_url: None,
                timeout_seconds: 30,
            },
            newsletter: NewsletterConfig {
                auto_subscribe: true,
                default_delivery_time: "09:00".to_string(),
                default_timezone: "UTC".to_string(),
                delivery_delay_ms: 50,
                schedule_utc_offset_hours: 3,
                scheduler_interval_secs: 600,
            },
            backup: BackupConfig {
                directory: "backups".to_string(),
                max_backups: 30,
            },
            menu_button: MenuButtonConfig {
                text: "🎮 Shabbat Runner: Kedusha Path".to_string(),
                web_app_url: "https://torah-project-jobjoyclub.replit.app".to_string(),
            },
            rate_limit: RateLimitConfig {
                requests_per_minute: 120,
                burst_size: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                json: false,
            },
            features: FeaturesConfig {
                configure_bot_profile: true,
                register_webhook: true,
                menu_button: true,
                broadcast_scheduler: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_webhook_secret_is_absent() {
        let mut settings = Settings::default();
        assert_eq!(settings.webhook_secret(), None);

        settings.bot.webhook_secret = Some(String::new());
        assert_eq!(settings.webhook_secret(), None);

        settings.bot.webhook_secret = Some("abc123".to_string());
        assert_eq!(settings.webhook_secret(), Some("abc123"));
    }

    #[test]
    fn test_default_timeouts() {
        let settings = Settings::default();
        assert_eq!(settings.telegram.timeout_seconds, 30);
        assert_eq!(settings.newsletter.default_delivery_time, "09:00");
    }
}
