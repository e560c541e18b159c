//! Webhook HTTP server
//!
//! `POST /webhook` runs every update through rate limiting, the security
//! gate, auto-subscription and the dispatch chain. `GET /health` lists the
//! registered services.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::handlers::{DispatchOutcome, IncomingMessage, MessageRouter};
use crate::middleware::{RequestMetadata, WebhookRateLimiter, WebhookSecurityGate};
use crate::models::UserContext;
use crate::services::newsletter::{AutoSubscription, NewsletterManager, NEWSLETTER_SERVICE};
use crate::services::registry::ServiceRegistry;
use crate::utils::errors::Result;
use crate::utils::logging::log_security_event;

pub const SERVICE_NAME: &str = "torah-bot";

/// Shared state of the webhook server
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<WebhookSecurityGate>,
    pub rate_limiter: Arc<WebhookRateLimiter>,
    pub router: Arc<MessageRouter>,
    pub registry: Arc<ServiceRegistry>,
    pub auto_subscribe: bool,
}

impl AppState {
    pub fn new(settings: &Settings, router: MessageRouter, registry: Arc<ServiceRegistry>) -> Result<Self> {
        Ok(Self {
            gate: Arc::new(WebhookSecurityGate::new(settings.webhook_secret())),
            rate_limiter: Arc::new(WebhookRateLimiter::new(&settings.rate_limit)?),
            router: Arc::new(router),
            registry,
            auto_subscribe: settings.newsletter.auto_subscribe,
        })
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Webhook server listening");
    }

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        return;
    }
    info!("Shutdown signal received");
}

async fn webhook_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let metadata = RequestMetadata::from_headers(&headers, Some(peer.ip()));

    // Forwarding headers are client-controlled, so the quota follows the
    // socket peer
    if !state.rate_limiter.check(peer.ip()) {
        log_security_event(
            "WEBHOOK_RATE_LIMITED",
            &peer.ip().to_string(),
            metadata.user_agent_or_unknown(),
            "Too many webhook requests",
        );
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": "Too Many Requests"})),
        )
            .into_response();
    }

    let verification = state.gate.verify(&metadata);
    if !verification.accepted {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"}))).into_response();
    }

    let update: Value = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, "Webhook body is not valid JSON");
            return (StatusCode::BAD_REQUEST, Json(json!({"error": "Invalid JSON"}))).into_response();
        }
    };

    debug!(update_id = ?update.get("update_id"), "Webhook update accepted");

    if state.auto_subscribe {
        auto_subscribe(&state.registry, &update).await;
    }

    let outcome = match IncomingMessage::from_update(&update) {
        Some(message) => state.router.route(&message).await,
        None => DispatchOutcome::unhandled(),
    };

    (StatusCode::OK, Json(json!({"ok": true, "result": outcome}))).into_response()
}

/// Failures are logged; the update is still dispatched
async fn auto_subscribe(registry: &ServiceRegistry, update: &Value) {
    let Some(user) = UserContext::from_update(update) else {
        return;
    };
    let Ok(newsletter) = registry.get_service::<NewsletterManager>(NEWSLETTER_SERVICE) else {
        debug!("Newsletter service not registered, skipping auto-subscription");
        return;
    };

    let raw_user = update
        .pointer("/message/from")
        .or_else(|| update.pointer("/callback_query/from"));

    match newsletter.ensure_subscribed(&user, raw_user).await {
        Ok(AutoSubscription::Created) => {
            info!(user_id = user.user_id(), "New subscriber from webhook")
        }
        Ok(AutoSubscription::AlreadyPresent) => {}
        Err(e) => warn!(user_id = user.user_id(), error = %e, "Auto-subscription failed"),
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "services": state.registry.list_services(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::MessageHandler;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::Request;
    use tower::ServiceExt;

    struct Echo;

    #[async_trait]
    impl MessageHandler for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn can_handle(&self, message: &IncomingMessage) -> bool {
            message.normalized_text() == "/echo"
        }

        async fn handle(&self, _message: &IncomingMessage) -> Result<DispatchOutcome> {
            Ok(DispatchOutcome::handled("echo"))
        }
    }

    fn test_app(secret: Option<&str>, peer: [u8; 4], requests_per_minute: u32) -> Router {
        let mut settings = Settings::default();
        settings.bot.webhook_secret = secret.map(str::to_string);
        settings.rate_limit.requests_per_minute = requests_per_minute;
        settings.rate_limit.burst_size = requests_per_minute;

        let router = MessageRouter::new().with_handler(Echo);
        let state = AppState::new(&settings, router, Arc::new(ServiceRegistry::new())).unwrap();

        app(state).layer(MockConnectInfo(SocketAddr::from((peer, 443))))
    }

    fn update(text: &str) -> String {
        json!({
            "update_id": 1,
            "message": {
                "message_id": 1,
                "chat": {"id": 42, "type": "private"},
                "from": {"id": 42, "first_name": "Sarah"},
                "text": text
            }
        })
        .to_string()
    }

    fn post_webhook(body: String, secret: Option<&str>) -> Request<Body> {
        post_webhook_via(body, secret, None)
    }

    fn post_webhook_via(body: String, secret: Option<&str>, forwarded_for: Option<&str>) -> Request<Body> {
        let mut builder = Request::post("/webhook").header("content-type", "application/json");
        if let Some(secret) = secret {
            builder = builder.header("X-Telegram-Bot-Api-Secret-Token", secret);
        }
        if let Some(forwarded_for) = forwarded_for {
            builder = builder.header("X-Forwarded-For", forwarded_for);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn read_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app(None, [127, 0, 0, 1], 10)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!({"status": "healthy", "service": "torah-bot", "services": []})
        );
    }

    #[tokio::test]
    async fn test_valid_secret_dispatches() {
        let response = test_app(Some("abc123"), [8, 8, 8, 8], 10)
            .oneshot(post_webhook(update("/echo"), Some("abc123")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!({"ok": true, "result": {"success": true, "handler": "echo"}})
        );
    }

    #[tokio::test]
    async fn test_wrong_secret_is_unauthorized() {
        let response = test_app(Some("abc123"), [149, 154, 160, 5], 10)
            .oneshot(post_webhook(update("/echo"), Some("abc124")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(read_json(response).await, json!({"error": "Unauthorized"}));
    }

    #[tokio::test]
    async fn test_ip_allow_list_without_secret() {
        let accepted = test_app(None, [149, 154, 160, 5], 10)
            .oneshot(post_webhook(update("hello"), None))
            .await
            .unwrap();
        assert_eq!(accepted.status(), StatusCode::OK);
        assert_eq!(
            read_json(accepted).await["result"],
            json!({"success": true, "handler": "default"})
        );

        let rejected = test_app(None, [8, 8, 8, 8], 10)
            .oneshot(post_webhook(update("hello"), None))
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let response = test_app(Some("abc123"), [8, 8, 8, 8], 10)
            .oneshot(post_webhook("{not json".to_string(), Some("abc123")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_without_message_uses_default() {
        let body = json!({"update_id": 9, "edited_channel_post": {}}).to_string();
        let response = test_app(Some("abc123"), [8, 8, 8, 8], 10)
            .oneshot(post_webhook(body, Some("abc123")))
            .await
            .unwrap();

        assert_eq!(
            read_json(response).await,
            json!({"ok": true, "result": {"success": true, "handler": "default"}})
        );
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let app = test_app(Some("abc123"), [8, 8, 8, 8], 1);

        let first = app
            .clone()
            .oneshot(post_webhook(update("/echo"), Some("abc123")))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(post_webhook(update("/echo"), Some("abc123")))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_rate_limit_ignores_forwarded_for() {
        let app = test_app(Some("abc123"), [8, 8, 8, 8], 1);

        let first = app
            .clone()
            .oneshot(post_webhook_via(update("/echo"), Some("abc123"), Some("10.0.0.1")))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        for i in 2..=5 {
            let forwarded = format!("10.0.0.{}", i);
            let response = app
                .clone()
                .oneshot(post_webhook_via(update("/echo"), Some("abc123"), Some(&forwarded)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        }
    }

    #[tokio::test]
    async fn test_forwarded_for_still_drives_ip_verification() {
        let response = test_app(None, [10, 0, 0, 1], 10)
            .oneshot(post_webhook_via(update("hello"), None, Some("149.154.167.220")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rotating_forwarded_for_tracks_one_client() {
        let mut settings = Settings::default();
        settings.rate_limit.requests_per_minute = 100;
        settings.rate_limit.burst_size = 100;
        let state = AppState::new(&settings, MessageRouter::new(), Arc::new(ServiceRegistry::new())).unwrap();
        let limiter = state.rate_limiter.clone();
        let app = app(state).layer(MockConnectInfo(SocketAddr::from(([8, 8, 8, 8], 443))));

        for i in 0..50 {
            let forwarded = format!("10.0.1.{}", i);
            app.clone()
                .oneshot(post_webhook_via(update("hello"), None, Some(&forwarded)))
                .await
                .unwrap();
        }

        assert_eq!(limiter.tracked_clients(), 1);
    }
}
