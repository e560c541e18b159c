//! Newsletter broadcast delivery
//!
//! Sends one broadcast to every active subscriber in their language, writes a
//! delivery log row per recipient and stores the final counters. Failed
//! sends are recorded, not retried.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use teloxide::prelude::*;
use teloxide::{ApiError, RequestError};
use tracing::{error, info, warn};

use crate::models::{BroadcastContent, BroadcastStatus, DeliveryRecord, DeliveryStatus};
use crate::services::newsletter::NewsletterManager;
use crate::services::registry::ManagedService;
use crate::utils::errors::Result;

/// Registry name of the shared [`BroadcastService`]
pub const BROADCAST_SERVICE: &str = "broadcast";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeliveryErrorKind {
    Blocked,
    RateLimited,
    BadRequest,
    Network,
    Unknown,
}

impl DeliveryErrorKind {
    pub fn classify(error: &RequestError) -> Self {
        match error {
            RequestError::Api(ApiError::BotBlocked | ApiError::UserDeactivated) => {
                DeliveryErrorKind::Blocked
            }
            RequestError::RetryAfter(_) => DeliveryErrorKind::RateLimited,
            RequestError::Api(_) => DeliveryErrorKind::BadRequest,
            RequestError::Network(_) => DeliveryErrorKind::Network,
            _ => DeliveryErrorKind::Unknown,
        }
    }
}

impl fmt::Display for DeliveryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryErrorKind::Blocked => write!(f, "🚫 User blocked bot"),
            DeliveryErrorKind::RateLimited => write!(f, "⏱️ Rate limited"),
            DeliveryErrorKind::BadRequest => write!(f, "❌ Bad request"),
            DeliveryErrorKind::Network => write!(f, "🌐 Network error"),
            DeliveryErrorKind::Unknown => write!(f, "❓ Unknown error"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    pub broadcast_id: i64,
    pub total_recipients: usize,
    pub sent: usize,
    pub failed: usize,
    pub errors: BTreeMap<DeliveryErrorKind, usize>,
}

impl DeliverySummary {
    fn record_failure(&mut self, kind: DeliveryErrorKind) {
        self.failed += 1;
        *self.errors.entry(kind).or_insert(0) += 1;
    }

    /// Completed unless every single delivery failed
    pub fn final_status(&self) -> BroadcastStatus {
        if self.total_recipients > 0 && self.sent == 0 {
            BroadcastStatus::Failed
        } else {
            BroadcastStatus::Completed
        }
    }

    /// One line per error kind, or `None`
    pub fn error_breakdown(&self) -> String {
        if self.errors.is_empty() {
            return "None".to_string();
        }
        self.errors
            .iter()
            .map(|(kind, count)| format!("{}: {}", kind, count))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct BroadcastService {
    bot: Bot,
    newsletter: Arc<NewsletterManager>,
    delivery_delay: Duration,
}

impl BroadcastService {
    pub fn new(bot: Bot, newsletter: Arc<NewsletterManager>, delivery_delay: Duration) -> Self {
        Self {
            bot,
            newsletter,
            delivery_delay,
        }
    }

    /// Reserve today's slot for `broadcast_type` and deliver `content`.
    /// Returns `None` when the slot was already taken.
    pub async fn send_scheduled(
        &self,
        broadcast_type: &str,
        content: &BroadcastContent,
    ) -> Result<Option<DeliverySummary>> {
        let Some(broadcast_id) = self.newsletter.reserve_broadcast_slot(broadcast_type).await? else {
            return Ok(None);
        };

        self.newsletter
            .database()
            .broadcasts
            .attach_content(broadcast_id, content)
            .await?;

        self.deliver(broadcast_id, content).await.map(Some)
    }

    /// Deliver an existing broadcast to every active subscriber
    pub async fn deliver(&self, broadcast_id: i64, content: &BroadcastContent) -> Result<DeliverySummary> {
        let broadcasts = &self.newsletter.database().broadcasts;
        broadcasts.set_status(broadcast_id, BroadcastStatus::Sending).await?;

        let subscribers = self.newsletter.active_subscriptions().await?;
        info!(broadcast_id, recipients = subscribers.len(), "Starting broadcast delivery");

        let mut summary = DeliverySummary {
            broadcast_id,
            total_recipients: subscribers.len(),
            ..Default::default()
        };

        for subscription in subscribers {
            let Some(text) = content.text_for(&subscription.language) else {
                warn!(broadcast_id, "Broadcast has no text in any language");
                summary.record_failure(DeliveryErrorKind::BadRequest);
                continue;
            };

            let record = match self
                .bot
                .send_message(ChatId(subscription.user_id), text.to_string())
                .await
            {
                Ok(message) => {
                    summary.sent += 1;
                    DeliveryRecord {
                        broadcast_id,
                        user_id: subscription.user_id,
                        status: DeliveryStatus::Sent,
                        telegram_message_id: Some(message.id.0),
                        error_message: None,
                    }
                }
                Err(e) => {
                    let kind = DeliveryErrorKind::classify(&e);
                    warn!(broadcast_id, user_id = subscription.user_id, error = %e, "Broadcast delivery failed");
                    summary.record_failure(kind);
                    DeliveryRecord {
                        broadcast_id,
                        user_id: subscription.user_id,
                        status: DeliveryStatus::Failed,
                        telegram_message_id: None,
                        error_message: Some(e.to_string()),
                    }
                }
            };

            if let Err(e) = broadcasts.log_delivery(&record).await {
                error!(broadcast_id, user_id = record.user_id, error = %e, "Failed to write delivery log");
            }

            tokio::time::sleep(self.delivery_delay).await;
        }

        broadcasts
            .complete(
                broadcast_id,
                summary.final_status(),
                to_i32(summary.total_recipients),
                to_i32(summary.sent),
                to_i32(summary.failed),
            )
            .await?;

        info!(
            broadcast_id,
            sent = summary.sent,
            failed = summary.failed,
            "Broadcast delivery finished"
        );

        Ok(summary)
    }
}

impl ManagedService for BroadcastService {}

fn to_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
