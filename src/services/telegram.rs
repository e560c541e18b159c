//! Telegram Bot API client setup

use std::time::Duration;

use teloxide::prelude::*;
use tracing::info;

use crate::config::Settings;
use crate::utils::errors::{Result, TorahBotError};

/// Build the shared bot client with a fixed per-request timeout and the
/// optional custom API URL
pub fn build_bot(settings: &Settings) -> Result<Bot> {
    if settings.bot.token.is_empty() {
        return Err(TorahBotError::Config("Bot token is required".to_string()));
    }

    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(settings.telegram.timeout_seconds))
        .build()
        .map_err(|e| TorahBotError::Config(format!("Failed to build Telegram HTTP client: {}", e)))?;

    let bot = Bot::with_client(settings.bot.token.clone(), client);

    match &settings.telegram.api_url {
        Some(api_url) => {
            info!(api_url = %api_url, "Using custom Bot API URL");
            Ok(bot.set_api_url(url::Url::parse(api_url)?))
        }
        None => Ok(bot),
    }
}

/// Point Telegram at our webhook, passing the shared secret when configured
pub async fn register_webhook(bot: &Bot, webhook_url: &str, secret: Option<&str>) -> Result<()> {
    let url = url::Url::parse(webhook_url)?;

    let mut request = bot.set_webhook(url);
    if let Some(secret) = secret {
        request = request.secret_token(secret.to_string());
    }
    request.await?;

    info!(webhook_url, secret = secret.is_some(), "Webhook registered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_build_bot_requires_token() {
        let settings = Settings::default();
        assert_matches!(build_bot(&settings), Err(TorahBotError::Config(_)));
    }

    #[test]
    fn test_build_bot_rejects_bad_api_url() {
        let mut settings = Settings::default();
        settings.bot.token = "123:abc".to_string();
        settings.telegram.api_url = Some("not a url".to_string());

        assert_matches!(build_bot(&settings), Err(TorahBotError::UrlParse(_)));
    }

    #[test]
    fn test_build_bot_with_api_url() {
        let mut settings = Settings::default();
        settings.bot.token = "123:abc".to_string();
        settings.telegram.api_url = Some("http://127.0.0.1:8081".to_string());

        let bot = build_bot(&settings).unwrap();
        assert_eq!(bot.api_url().as_str(), "http://127.0.0.1:8081/");
    }
}
