//! Torah Bot
//!
//! Webhook-driven Telegram bot for Torah learning. This library provides the
//! webhook security gate, the message dispatch chain, a shared service
//! registry, the newsletter database layer and the Telegram profile helpers.

pub mod config;
pub mod database;
pub mod handlers;
pub mod i18n;
pub mod middleware;
pub mod models;
pub mod server;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{Result, TorahBotError};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use handlers::{default_router, HandlerContext, MessageRouter};
pub use middleware::WebhookSecurityGate;
pub use models::UserContext;
pub use server::AppState;
pub use services::ServiceRegistry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
