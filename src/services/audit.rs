//! Audit chat delivery
//!
//! Posts formatted event blocks to the configured log chat. Delivery problems
//! are logged and swallowed so auditing never breaks the calling flow.

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{debug, warn};

use crate::models::UserContext;
use crate::services::registry::ManagedService;
use crate::utils::logging::{format_event_log, LogValue};

/// Registry name of the shared [`AuditLogService`]
pub const AUDIT_SERVICE: &str = "audit_log";

pub struct AuditLogService {
    bot: Bot,
    log_chat_id: Option<ChatId>,
}

impl AuditLogService {
    pub fn new(bot: Bot, log_chat_id: Option<i64>) -> Self {
        Self {
            bot,
            log_chat_id: log_chat_id.map(ChatId),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.log_chat_id.is_some()
    }

    /// Format and post an event; returns whether it was delivered
    pub async fn log_event(
        &self,
        event_type: &str,
        user: Option<&UserContext>,
        emoji: &str,
        details: &[(&str, LogValue)],
    ) -> bool {
        let Some(chat_id) = self.log_chat_id else {
            debug!(event_type, "Audit chat not configured, event skipped");
            return false;
        };

        let text = format_event_log(event_type, user, emoji, details);

        match self
            .bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::Html)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(event_type, error = %e, "Failed to deliver audit event");
                false
            }
        }
    }
}

impl ManagedService for AuditLogService {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_audit_skips_delivery() {
        let service = AuditLogService::new(Bot::new("test_token"), None);
        assert!(!service.is_enabled());
        assert!(!service.log_event("WISDOM_REQUEST", None, "🧠", &[]).await);
    }
}
