//! Help command handler

use async_trait::async_trait;

use crate::handlers::context::HandlerContext;
use crate::handlers::router::{DispatchOutcome, IncomingMessage, MessageHandler};
use crate::services::bot_configuration::BOT_COMMANDS;
use crate::utils::errors::Result;

pub struct HelpHandler {
    ctx: HandlerContext,
}

impl HelpHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

/// Command overview built from the registered command menu
pub fn help_text() -> String {
    let mut text = String::from("🕯️ Torah Bot Help\n\n");
    for (command, description) in BOT_COMMANDS {
        text.push_str(&format!("/{} - {}\n", command, description));
    }
    text.push_str("/subscribe - 📧 Daily wisdom newsletter\n");
    text.push_str("/unsubscribe - 📭 Stop the newsletter");
    text
}

#[async_trait]
impl MessageHandler for HelpHandler {
    fn name(&self) -> &str {
        "help"
    }

    fn can_handle(&self, message: &IncomingMessage) -> bool {
        message.normalized_text() == "/help"
    }

    async fn handle(&self, message: &IncomingMessage) -> Result<DispatchOutcome> {
        self.ctx.reply(message.chat_id, help_text()).await?;
        Ok(DispatchOutcome::handled(self.name()))
    }
}
