//! Mock Telegram API Server for testing
//!
//! Simulates the Bot API methods the bot calls, using wiremock. Method names
//! are matched case-insensitively since the Bot API accepts either form.

use serde_json::{json, Value};
use teloxide::Bot;
use wiremock::{
    matchers::{body_partial_json, method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

/// Mock Telegram API server for testing
pub struct TelegramMockServer {
    pub server: MockServer,
}

impl TelegramMockServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL to pass as `telegram.api_url`
    pub fn api_url(&self) -> String {
        self.server.uri()
    }

    /// Bot client talking to this server
    pub fn bot(&self) -> Bot {
        Bot::new(test_bot_token()).set_api_url(self.server.uri().parse().unwrap())
    }

    fn method_path(api_method: &str) -> String {
        format!(r"(?i)^/bot[^/]+/{}$", api_method)
    }

    /// Answer `api_method` with `{"ok": true, "result": result}`
    pub async fn mock_ok(&self, api_method: &str, result: Value) {
        Mock::given(method("POST"))
            .and(path_regex(Self::method_path(api_method)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": result})))
            .mount(&self.server)
            .await;
    }

    /// Answer `api_method` with a Bot API error
    pub async fn mock_error(&self, api_method: &str, error_code: u16, description: &str) {
        Mock::given(method("POST"))
            .and(path_regex(Self::method_path(api_method)))
            .respond_with(ResponseTemplate::new(error_code).set_body_json(json!({
                "ok": false,
                "error_code": error_code,
                "description": description
            })))
            .mount(&self.server)
            .await;
    }

    /// Fail `api_method` for one chat only; other chats keep their mocks
    pub async fn mock_error_for_chat(&self, api_method: &str, chat_id: i64, error_code: u16, description: &str) {
        Mock::given(method("POST"))
            .and(path_regex(Self::method_path(api_method)))
            .and(body_partial_json(json!({"chat_id": chat_id})))
            .respond_with(ResponseTemplate::new(error_code).set_body_json(json!({
                "ok": false,
                "error_code": error_code,
                "description": description
            })))
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_send_message(&self) {
        self.mock_ok("sendMessage", sent_message_json(test_chat_id(), "ok")).await;
    }

    /// Profile setters, menu button and webhook registration
    pub async fn mock_profile_methods(&self) {
        for api_method in [
            "setMyDescription",
            "setMyShortDescription",
            "setMyCommands",
            "setChatMenuButton",
            "setWebhook",
        ] {
            self.mock_ok(api_method, json!(true)).await;
        }
    }

    /// Web app page the menu button points at
    pub async fn mock_web_app_page(&self) {
        Mock::given(method("GET"))
            .and(path("/game"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&self.server)
            .await;
    }

    pub fn web_app_url(&self) -> String {
        format!("{}/game", self.server.uri())
    }

    /// Bodies of all requests made to `api_method`
    pub async fn requests_to(&self, api_method: &str) -> Vec<Value> {
        let suffix = format!("/{}", api_method.to_lowercase());
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path().to_lowercase().ends_with(&suffix))
            .map(|request| serde_json::from_slice(&request.body).unwrap_or(Value::Null))
            .collect()
    }

    /// Verify that a specific endpoint was called
    pub async fn verify_endpoint_called(&self, api_method: &str, times: usize) {
        let calls = self.requests_to(api_method).await.len();
        assert_eq!(
            calls, times,
            "Expected {} calls to {}, but got {}",
            times, api_method, calls
        );
    }
}

/// Minimal `Message` as returned by `sendMessage`
pub fn sent_message_json(chat_id: i64, text: &str) -> Value {
    json!({
        "message_id": 123,
        "from": {
            "id": 12345,
            "is_bot": true,
            "first_name": "TorahBot",
            "username": "torah_bot"
        },
        "chat": {
            "id": chat_id,
            "type": "private",
            "first_name": "Sarah"
        },
        "date": 1640995200,
        "text": text
    })
}

/// Helper function to create a test bot token
pub fn test_bot_token() -> String {
    "12345:test_token".to_string()
}

/// Helper function to create test chat ID
pub fn test_chat_id() -> i64 {
    987654321
}

/// Helper function to create test user ID
pub fn test_user_id() -> i64 {
    987654321
}
