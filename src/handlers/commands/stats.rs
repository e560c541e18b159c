//! Admin statistics command

use async_trait::async_trait;
use tracing::warn;

use crate::handlers::context::{require_user, HandlerContext};
use crate::handlers::router::{DispatchOutcome, IncomingMessage, MessageHandler};
use crate::services::newsletter::format_analytics;
use crate::utils::errors::{Result, TorahBotError};

pub struct StatsHandler {
    ctx: HandlerContext,
}

impl StatsHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl MessageHandler for StatsHandler {
    fn name(&self) -> &str {
        "stats"
    }

    fn can_handle(&self, message: &IncomingMessage) -> bool {
        message.normalized_text() == "/stats"
    }

    async fn handle(&self, message: &IncomingMessage) -> Result<DispatchOutcome> {
        let user = require_user(message.user.as_ref())?;
        let newsletter = self.ctx.newsletter()?;

        if !newsletter.admin_permissions(user.user_id()).await.can_view_stats {
            warn!(user_id = user.user_id(), "Statistics requested by non-admin");
            self.ctx
                .reply(message.chat_id, "⛔ This command is for administrators only.")
                .await?;
            return Err(TorahBotError::PermissionDenied(format!(
                "user {} may not view statistics",
                user.user_id()
            )));
        }

        let analytics = newsletter.analytics().await?;
        self.ctx
            .reply(message.chat_id, format_analytics(&analytics))
            .await?;

        Ok(DispatchOutcome::handled(self.name()))
    }
}
