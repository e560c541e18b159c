//! Administrator commands
//!
//! Backup and broadcast maintenance. Each command is gated by one of the
//! sender's admin permission flags.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::handlers::context::{require_user, HandlerContext};
use crate::handlers::router::{DispatchOutcome, IncomingMessage, MessageHandler};
use crate::models::AdminPermissions;
use crate::services::backup::{format_backup_created, format_backup_status};
use crate::services::newsletter::NewsletterManager;
use crate::services::scheduler::{format_schedule_status, WISDOM_WINDOW};
use crate::utils::errors::{Result, TorahBotError};
use crate::utils::logging::{log_user_action, LogValue};

/// Sent by `/send_test_now` when nothing is prepared for today
pub const TEST_BROADCAST_TEXT: &str = "🧪 TEST BROADCAST - Torah Bot Newsletter\n\n\
Who is wise? One who learns from every person.\n\
📚 Pirkei Avot 4:1\n\n\
✅ This confirms the newsletter can reach subscribers.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    BackupDatabase,
    BackupStatus,
    SendTestNow,
    ScheduleStatus,
}

impl AdminCommand {
    pub fn parse(normalized_text: &str) -> Option<Self> {
        match normalized_text {
            "/backup_database" => Some(AdminCommand::BackupDatabase),
            "/backup_status" => Some(AdminCommand::BackupStatus),
            "/send_test_now" => Some(AdminCommand::SendTestNow),
            "/schedule_status" => Some(AdminCommand::ScheduleStatus),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminCommand::BackupDatabase => "backup_database",
            AdminCommand::BackupStatus => "backup_status",
            AdminCommand::SendTestNow => "send_test_now",
            AdminCommand::ScheduleStatus => "schedule_status",
        }
    }

    pub fn permitted(&self, permissions: &AdminPermissions) -> bool {
        match self {
            AdminCommand::BackupDatabase | AdminCommand::BackupStatus => permissions.can_manage_users,
            AdminCommand::SendTestNow => permissions.can_test_broadcasts,
            AdminCommand::ScheduleStatus => permissions.can_manage_schedule,
        }
    }
}

pub struct AdminHandler {
    ctx: HandlerContext,
}

impl AdminHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    async fn backup_database(&self, chat_id: i64) -> Result<String> {
        let backup = self.ctx.backup()?;

        let path = match backup.create_backup().await {
            Ok(path) => path,
            Err(e) => {
                error!(error = %e, "Manual backup failed");
                self.ctx.reply(chat_id, "❌ Database backup failed").await?;
                return Err(e);
            }
        };

        let stats = backup.stats().await?;
        Ok(format_backup_created(&path, &stats))
    }

    async fn backup_status(&self) -> Result<String> {
        let backup = self.ctx.backup()?;
        let stats = backup.stats().await?;
        let backups = backup.list_backups().await?;
        Ok(format_backup_status(&stats, &backups))
    }

    /// Today's prepared wisdom in the admin's language, or a fixed sample
    async fn send_test(&self, newsletter: &NewsletterManager, message: &IncomingMessage) -> Result<String> {
        let prepared = newsletter
            .get_broadcast_for_date(newsletter.schedule_date(), WISDOM_WINDOW.broadcast_type)
            .await?
            .and_then(|broadcast| broadcast.content());

        let text = prepared
            .as_ref()
            .and_then(|content| content.text_for(message.language()))
            .unwrap_or(TEST_BROADCAST_TEXT);
        debug!(prepared = prepared.is_some(), "Sending test broadcast to admin");

        self.ctx.reply(message.chat_id, text).await?;
        Ok("✅ Test broadcast sent. Check the message above to see what subscribers receive.".to_string())
    }

    async fn schedule_status(&self) -> Result<String> {
        let status = self.ctx.scheduler()?.status().await?;
        Ok(format_schedule_status(&status))
    }
}

#[async_trait]
impl MessageHandler for AdminHandler {
    fn name(&self) -> &str {
        "admin"
    }

    fn can_handle(&self, message: &IncomingMessage) -> bool {
        AdminCommand::parse(&message.normalized_text()).is_some()
    }

    async fn handle(&self, message: &IncomingMessage) -> Result<DispatchOutcome> {
        let command = AdminCommand::parse(&message.normalized_text())
            .ok_or_else(|| TorahBotError::InvalidInput("Not an admin command".to_string()))?;
        let user = require_user(message.user.as_ref())?;
        let newsletter = self.ctx.newsletter()?;

        let permissions = newsletter.admin_permissions(user.user_id()).await;
        if !command.permitted(&permissions) {
            warn!(user_id = user.user_id(), command = command.as_str(), "Admin command refused");
            self.ctx
                .reply(message.chat_id, "⛔ This command is for administrators only.")
                .await?;
            return Err(TorahBotError::PermissionDenied(format!(
                "user {} may not run {}",
                user.user_id(),
                command.as_str()
            )));
        }

        let reply = match command {
            AdminCommand::BackupDatabase => self.backup_database(message.chat_id).await?,
            AdminCommand::BackupStatus => self.backup_status().await?,
            AdminCommand::SendTestNow => self.send_test(&newsletter, message).await?,
            AdminCommand::ScheduleStatus => self.schedule_status().await?,
        };
        self.ctx.reply(message.chat_id, reply).await?;

        info!(user_id = user.user_id(), command = command.as_str(), "Admin command executed");
        log_user_action(user.user_id(), "admin_command", Some(command.as_str()));
        self.ctx
            .audit(
                "ADMIN_COMMAND",
                Some(user),
                "🛠️",
                &[("command", LogValue::from(command.as_str()))],
            )
            .await;

        Ok(DispatchOutcome::handled(self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(AdminCommand::parse("/backup_database"), Some(AdminCommand::BackupDatabase));
        assert_eq!(AdminCommand::parse("/schedule_status"), Some(AdminCommand::ScheduleStatus));
        assert_eq!(AdminCommand::parse("/backup_status now"), None);
        assert_eq!(AdminCommand::parse("/backup"), None);
    }

    #[test]
    fn test_permission_flags() {
        let testers = AdminPermissions {
            can_test_broadcasts: true,
            ..AdminPermissions::none()
        };

        assert!(AdminCommand::SendTestNow.permitted(&testers));
        assert!(!AdminCommand::BackupDatabase.permitted(&testers));
        assert!(!AdminCommand::ScheduleStatus.permitted(&testers));
        assert!(AdminCommand::BackupStatus.permitted(&AdminPermissions::full()));
        assert!(!AdminCommand::BackupStatus.permitted(&AdminPermissions::none()));
    }
}
