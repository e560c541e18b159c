//! Simple test infrastructure for basic testing
//!
//! Logging setup, settings and webhook update builders that work without a
//! database.

use std::sync::Once;

use serde_json::{json, Value};
use torah_bot::config::Settings;

use super::telegram_mock::{test_bot_token, test_chat_id, test_user_id};

static INIT: Once = Once::new();

/// Initialize test environment
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Settings pointing at a mock Bot API server, with auto-subscription off
pub fn test_settings(api_url: &str) -> Settings {
    let mut settings = Settings::default();
    settings.bot.token = test_bot_token();
    settings.bot.webhook_secret = Some("abc123".to_string());
    settings.telegram.api_url = Some(api_url.to_string());
    settings.telegram.timeout_seconds = 5;
    settings.newsletter.auto_subscribe = false;
    settings
}

/// Private-chat text message update from the test user
pub fn text_update(text: &str) -> Value {
    text_update_from(test_user_id(), "ru", text)
}

pub fn text_update_from(user_id: i64, language_code: &str, text: &str) -> Value {
    json!({
        "update_id": 10000,
        "message": {
            "message_id": 1,
            "date": 1640995200,
            "chat": {"id": user_id, "type": "private", "first_name": "Sarah"},
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Sarah",
                "last_name": "Levi",
                "username": "sarah_l",
                "language_code": language_code
            },
            "text": text
        }
    })
}

/// Callback query update pressing a button with `data`
pub fn callback_update(data: &str) -> Value {
    json!({
        "update_id": 10001,
        "callback_query": {
            "id": "cb-1",
            "from": {"id": test_user_id(), "is_bot": false, "first_name": "Sarah"},
            "chat_instance": "1",
            "data": data,
            "message": {
                "message_id": 2,
                "date": 1640995200,
                "chat": {"id": test_chat_id(), "type": "private"}
            }
        }
    })
}
