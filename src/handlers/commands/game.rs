//! Game command handler
//!
//! Puts the Shabbat Runner web app behind the sender's menu button

use async_trait::async_trait;

use crate::handlers::context::HandlerContext;
use crate::handlers::router::{DispatchOutcome, IncomingMessage, MessageHandler};
use crate::utils::errors::{Result, TorahBotError};
use crate::utils::logging::LogValue;

pub const GAME_KEYWORDS: &[&str] = &["game", "игра"];

pub struct GameHandler {
    ctx: HandlerContext,
}

impl GameHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

fn game_text(language: &str) -> &'static str {
    match language {
        "Russian" => "🎮 Shabbat Runner ждёт вас! Нажмите кнопку меню рядом с полем ввода, чтобы начать.",
        _ => "🎮 Shabbat Runner is ready! Tap the menu button next to the input field to play.",
    }
}

#[async_trait]
impl MessageHandler for GameHandler {
    fn name(&self) -> &str {
        "game"
    }

    fn can_handle(&self, message: &IncomingMessage) -> bool {
        let text = message.normalized_text();
        text == "/game" || GAME_KEYWORDS.iter().any(|keyword| text.contains(keyword))
    }

    async fn handle(&self, message: &IncomingMessage) -> Result<DispatchOutcome> {
        let menu_button = self.ctx.menu_button()?;

        if !menu_button
            .set_webapp_menu_button(Some(message.chat_id))
            .await
        {
            return Err(TorahBotError::Handler(
                "failed to set the game menu button".to_string(),
            ));
        }

        self.ctx
            .reply(message.chat_id, game_text(message.language()))
            .await?;
        self.ctx
            .audit(
                "GAME_OPENED",
                message.user.as_ref(),
                "🎮",
                &[("success", LogValue::from(true))],
            )
            .await;

        Ok(DispatchOutcome::handled(self.name()))
    }
}
