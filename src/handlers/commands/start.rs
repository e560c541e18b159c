//! Start command handler
//!
//! Greets the user in their language

use async_trait::async_trait;

use crate::handlers::context::HandlerContext;
use crate::handlers::router::{DispatchOutcome, IncomingMessage, MessageHandler};
use crate::i18n;
use crate::utils::errors::Result;
use crate::utils::logging::log_user_action;

pub const START_TRIGGERS: &[&str] = &["/start", "старт", "начать"];

pub struct StartHandler {
    ctx: HandlerContext,
}

impl StartHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl MessageHandler for StartHandler {
    fn name(&self) -> &str {
        "start"
    }

    fn can_handle(&self, message: &IncomingMessage) -> bool {
        START_TRIGGERS.contains(&message.normalized_text().as_str())
    }

    async fn handle(&self, message: &IncomingMessage) -> Result<DispatchOutcome> {
        let name = message
            .user
            .as_ref()
            .map(|user| user.display_name())
            .unwrap_or_else(|| "friend".to_string());

        self.ctx
            .reply(message.chat_id, i18n::welcome_text(message.language(), &name))
            .await?;

        if let Some(user_id) = message.user_id() {
            log_user_action(user_id, "start", None);
        }
        self.ctx
            .audit("USER_START", message.user.as_ref(), "🏠", &[])
            .await;

        Ok(DispatchOutcome::handled(self.name()))
    }
}
