//! Bot profile, menu button, webhook and audit calls against a mocked Bot API

mod helpers;

use serde_json::json;

use helpers::*;
use torah_bot::config::MenuButtonConfig;
use torah_bot::services::{
    register_webhook, AuditLogService, BotConfigurationService, MenuButtonService,
};
use torah_bot::utils::logging::LogValue;
use torah_bot::UserContext;

#[tokio::test]
async fn test_configure_profile() {
    init_test_env();
    let mock = TelegramMockServer::new().await;
    mock.mock_profile_methods().await;

    let report = BotConfigurationService::new(mock.bot()).configure_profile().await;

    assert!(report.all_ok());

    let commands = mock.requests_to("setMyCommands").await;
    assert_eq!(commands.len(), 1);
    let list = commands[0]["commands"].as_array().unwrap();
    assert_eq!(list.len(), 5);
    assert_eq!(list[0], json!({"command": "start", "description": "🏠 Start Torah Bot"}));

    let short = mock.requests_to("setMyShortDescription").await;
    assert_eq!(
        short[0]["short_description"],
        json!("🕯️ AI Torah wisdom + Shabbat Runner game 🎮")
    );
}

#[tokio::test]
async fn test_profile_steps_are_independent() {
    init_test_env();
    let mock = TelegramMockServer::new().await;
    mock.mock_error("setMyDescription", 400, "Bad Request: description is too long").await;
    mock.mock_ok("setMyShortDescription", json!(true)).await;
    mock.mock_ok("setMyCommands", json!(true)).await;

    let report = BotConfigurationService::new(mock.bot()).configure_profile().await;

    assert!(!report.description);
    assert!(report.short_description);
    assert!(report.commands);
    assert!(!report.all_ok());
}

#[tokio::test]
async fn test_menu_button_default_and_removal() {
    init_test_env();
    let mock = TelegramMockServer::new().await;
    mock.mock_profile_methods().await;
    mock.mock_web_app_page().await;

    let config = MenuButtonConfig {
        text: "🎮 Shabbat Runner: Kedusha Path".to_string(),
        web_app_url: mock.web_app_url(),
    };
    let service = MenuButtonService::new(mock.bot(), &config).unwrap();

    assert!(service.set_webapp_menu_button(None).await);
    assert!(service.is_set());
    assert!(service.remove_menu_button(Some(test_chat_id())).await);

    let requests = mock.requests_to("setChatMenuButton").await;
    assert_eq!(requests.len(), 2);
    assert!(requests[0].get("chat_id").is_none());
    assert_eq!(
        requests[0]["menu_button"],
        json!({
            "type": "web_app",
            "text": "🎮 Shabbat Runner: Kedusha Path",
            "web_app": {"url": mock.web_app_url()}
        })
    );
    assert_eq!(requests[1]["chat_id"], json!(test_chat_id()));
    assert_eq!(requests[1]["menu_button"], json!({"type": "default"}));
}

#[tokio::test]
async fn test_menu_button_failure() {
    init_test_env();
    let mock = TelegramMockServer::new().await;
    mock.mock_error("setChatMenuButton", 400, "Bad Request: invalid url").await;

    let config = MenuButtonConfig {
        text: "Game".to_string(),
        web_app_url: mock.web_app_url(),
    };
    let service = MenuButtonService::new(mock.bot(), &config).unwrap();

    assert!(!service.set_webapp_menu_button(None).await);
    assert!(!service.is_set());
}

#[tokio::test]
async fn test_register_webhook_passes_secret() {
    init_test_env();
    let mock = TelegramMockServer::new().await;
    mock.mock_profile_methods().await;

    register_webhook(&mock.bot(), "https://bot.example.org/webhook", Some("abc123"))
        .await
        .unwrap();

    let requests = mock.requests_to("setWebhook").await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["url"], json!("https://bot.example.org/webhook"));
    assert_eq!(requests[0]["secret_token"], json!("abc123"));
}

#[tokio::test]
async fn test_audit_event_delivery() {
    init_test_env();
    let mock = TelegramMockServer::new().await;
    mock.mock_send_message().await;

    let raw = json!({"id": test_user_id(), "first_name": "Sarah"});
    let user = UserContext::from_raw(&raw, Some("English".to_string())).unwrap();

    let audit = AuditLogService::new(mock.bot(), Some(-100123));
    assert!(
        audit
            .log_event("QUIZ_ANSWER", Some(&user), "❓", &[("score", LogValue::from(8.5))])
            .await
    );

    let requests = mock.requests_to("sendMessage").await;
    let text = requests[0]["text"].as_str().unwrap();
    assert!(text.starts_with("❓ <b>QUIZ_ANSWER</b> ["));
    assert!(text.contains(&format!("🆔 User: {} (Sarah)", test_user_id())));
    assert!(text.contains("8.5"));
}

#[tokio::test]
async fn test_audit_disabled_sends_nothing() {
    let mock = TelegramMockServer::new().await;

    let audit = AuditLogService::new(mock.bot(), None);
    assert!(!audit.is_enabled());
    assert!(!audit.log_event("USER_START", None, "🏠", &[]).await);
    mock.verify_endpoint_called("sendMessage", 0).await;
}
