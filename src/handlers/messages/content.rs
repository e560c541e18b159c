//! Wisdom and quiz requests
//!
//! Content generation lives outside this service; these handlers count the
//! request against the user and report it to the audit chat.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::handlers::context::HandlerContext;
use crate::handlers::router::{DispatchOutcome, IncomingMessage, MessageHandler};
use crate::models::ActivityType;
use crate::utils::errors::Result;
use crate::utils::logging::{log_user_action, LogValue};

pub const WISDOM_KEYWORDS: &[&str] = &["мудрость", "совет", "wisdom", "quote", "teach"];

pub const QUIZ_KEYWORDS: &[&str] = &["викторина", "quiz", "вопрос", "question", "тест"];

fn matches_any(message: &IncomingMessage, keywords: &[&str]) -> bool {
    let text = message.normalized_text();
    keywords.iter().any(|keyword| text.contains(keyword))
}

async fn record(ctx: &HandlerContext, message: &IncomingMessage, activity: ActivityType) {
    let Some(user_id) = message.user_id() else {
        return;
    };

    log_user_action(user_id, activity.as_str(), None);

    match ctx.newsletter() {
        Ok(newsletter) => {
            if let Err(e) = newsletter.record_activity(user_id, activity).await {
                warn!(user_id, error = %e, "Failed to record activity");
            }
        }
        Err(_) => debug!(user_id, "Newsletter service not registered, activity not stored"),
    }
}

pub struct WisdomHandler {
    ctx: HandlerContext,
}

impl WisdomHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl MessageHandler for WisdomHandler {
    fn name(&self) -> &str {
        "wisdom"
    }

    fn can_handle(&self, message: &IncomingMessage) -> bool {
        matches_any(message, WISDOM_KEYWORDS)
    }

    async fn handle(&self, message: &IncomingMessage) -> Result<DispatchOutcome> {
        record(&self.ctx, message, ActivityType::WisdomRequest).await;
        self.ctx
            .audit(
                "WISDOM_REQUEST",
                message.user.as_ref(),
                "🧠",
                &[("topic", LogValue::from(message.text.trim()))],
            )
            .await;

        Ok(DispatchOutcome::handled(self.name()))
    }
}

pub struct QuizHandler {
    ctx: HandlerContext,
}

impl QuizHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl MessageHandler for QuizHandler {
    fn name(&self) -> &str {
        "quiz"
    }

    fn can_handle(&self, message: &IncomingMessage) -> bool {
        matches_any(message, QUIZ_KEYWORDS)
    }

    async fn handle(&self, message: &IncomingMessage) -> Result<DispatchOutcome> {
        record(&self.ctx, message, ActivityType::QuizAttempt).await;
        self.ctx
            .audit("QUIZ_REQUEST", message.user.as_ref(), "❓", &[])
            .await;

        Ok(DispatchOutcome::handled(self.name()))
    }
}
