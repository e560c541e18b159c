//! Newsletter subscription commands

use async_trait::async_trait;

use crate::handlers::context::{require_user, HandlerContext};
use crate::handlers::router::{DispatchOutcome, IncomingMessage, MessageHandler};
use crate::i18n;
use crate::models::UpsertUserRequest;
use crate::utils::errors::Result;
use crate::utils::logging::{log_user_action, LogValue};

pub struct SubscribeHandler {
    ctx: HandlerContext,
}

impl SubscribeHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl MessageHandler for SubscribeHandler {
    fn name(&self) -> &str {
        "subscribe"
    }

    fn can_handle(&self, message: &IncomingMessage) -> bool {
        message.normalized_text() == "/subscribe"
    }

    async fn handle(&self, message: &IncomingMessage) -> Result<DispatchOutcome> {
        let user = require_user(message.user.as_ref())?;
        let newsletter = self.ctx.newsletter()?;
        let language = message.language();

        newsletter
            .upsert_user(&UpsertUserRequest::from_context(user, None))
            .await?;
        newsletter
            .subscribe_user(user.user_id(), language, None, None)
            .await?;

        self.ctx
            .reply(message.chat_id, i18n::subscribed_text(language))
            .await?;

        log_user_action(user.user_id(), "subscribe", Some(language));
        self.ctx
            .audit(
                "NEWSLETTER_SUBSCRIBE",
                Some(user),
                "📧",
                &[("language", LogValue::from(language))],
            )
            .await;

        Ok(DispatchOutcome::handled(self.name()))
    }
}

pub struct UnsubscribeHandler {
    ctx: HandlerContext,
}

impl UnsubscribeHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl MessageHandler for UnsubscribeHandler {
    fn name(&self) -> &str {
        "unsubscribe"
    }

    fn can_handle(&self, message: &IncomingMessage) -> bool {
        message.normalized_text() == "/unsubscribe"
    }

    async fn handle(&self, message: &IncomingMessage) -> Result<DispatchOutcome> {
        let user = require_user(message.user.as_ref())?;
        let newsletter = self.ctx.newsletter()?;

        let was_subscribed = newsletter.unsubscribe_user(user.user_id()).await?;

        self.ctx
            .reply(
                message.chat_id,
                i18n::unsubscribed_text(message.language(), was_subscribed),
            )
            .await?;

        log_user_action(user.user_id(), "unsubscribe", None);
        self.ctx
            .audit(
                "NEWSLETTER_UNSUBSCRIBE",
                Some(user),
                "📭",
                &[("success", LogValue::from(was_subscribed))],
            )
            .await;

        Ok(DispatchOutcome::handled(self.name()))
    }
}
