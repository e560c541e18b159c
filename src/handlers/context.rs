//! Shared dependencies of the built-in handlers

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::Message;

use crate::models::UserContext;
use crate::services::audit::{AuditLogService, AUDIT_SERVICE};
use crate::services::backup::{BackupManager, BACKUP_SERVICE};
use crate::services::menu_button::{MenuButtonService, MENU_BUTTON_SERVICE};
use crate::services::newsletter::{NewsletterManager, NEWSLETTER_SERVICE};
use crate::services::registry::ServiceRegistry;
use crate::services::scheduler::{BroadcastScheduler, SCHEDULER_SERVICE};
use crate::utils::errors::{Result, TorahBotError};
use crate::utils::logging::LogValue;

#[derive(Clone)]
pub struct HandlerContext {
    pub bot: Bot,
    pub registry: Arc<ServiceRegistry>,
}

impl HandlerContext {
    pub fn new(bot: Bot, registry: Arc<ServiceRegistry>) -> Self {
        Self { bot, registry }
    }

    pub async fn reply(&self, chat_id: i64, text: impl Into<String>) -> Result<Message> {
        let message = self.bot.send_message(ChatId(chat_id), text.into()).await?;
        Ok(message)
    }

    pub fn newsletter(&self) -> Result<Arc<NewsletterManager>> {
        self.registry.get_service(NEWSLETTER_SERVICE)
    }

    pub fn menu_button(&self) -> Result<Arc<MenuButtonService>> {
        self.registry.get_service(MENU_BUTTON_SERVICE)
    }

    pub fn backup(&self) -> Result<Arc<BackupManager>> {
        self.registry.get_service(BACKUP_SERVICE)
    }

    pub fn scheduler(&self) -> Result<Arc<BroadcastScheduler>> {
        self.registry.get_service(SCHEDULER_SERVICE)
    }

    /// Post to the audit chat when the audit service is registered
    pub async fn audit(
        &self,
        event_type: &str,
        user: Option<&UserContext>,
        emoji: &str,
        details: &[(&str, LogValue)],
    ) {
        if let Ok(audit) = self.registry.get_service::<AuditLogService>(AUDIT_SERVICE) {
            audit.log_event(event_type, user, emoji, details).await;
        }
    }
}

/// The sender, or an input error for anonymous messages
pub fn require_user(user: Option<&UserContext>) -> Result<&UserContext> {
    user.ok_or_else(|| TorahBotError::InvalidInput("Message has no sender".to_string()))
}
