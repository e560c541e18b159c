//! Newsletter models: subscriptions, broadcasts, delivery log and analytics

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub language: String,
    pub delivery_time: NaiveTime,
    pub timezone: String,
    pub is_active: bool,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub user_id: i64,
    pub language: String,
    pub delivery_time: NaiveTime,
    pub timezone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SubscriberStats {
    pub total_subscribers: i64,
    pub active_30_days: i64,
    pub active_7_days: i64,
}

/// Wisdom text per language: `{"English": {"text": ..., "references": ...}}`
pub type WisdomContent = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastContent {
    pub date: NaiveDate,
    pub topic: String,
    pub wisdom_content: WisdomContent,
    pub image_url: Option<String>,
}

impl BroadcastContent {
    /// Text for `language`, falling back to English, then to any language
    pub fn text_for(&self, language: &str) -> Option<&str> {
        let pick = |lang: &str| {
            self.wisdom_content
                .get(lang)
                .and_then(|entry| entry.get("text"))
                .map(String::as_str)
        };

        pick(language)
            .or_else(|| pick(crate::i18n::DEFAULT_LANGUAGE))
            .or_else(|| {
                self.wisdom_content
                    .values()
                    .find_map(|entry| entry.get("text").map(String::as_str))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastStatus {
    Reserved,
    Ready,
    Sending,
    Completed,
    Failed,
}

impl BroadcastStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BroadcastStatus::Reserved => "reserved",
            BroadcastStatus::Ready => "ready",
            BroadcastStatus::Sending => "sending",
            BroadcastStatus::Completed => "completed",
            BroadcastStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Broadcast {
    pub id: i64,
    pub broadcast_date: NaiveDate,
    pub broadcast_type: String,
    pub wisdom_content: Option<serde_json::Value>,
    pub image_url: Option<String>,
    pub status: String,
    pub created_by: String,
    pub total_recipients: i32,
    pub successful_deliveries: i32,
    pub failed_deliveries: i32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Broadcast {
    pub fn is_ready(&self) -> bool {
        self.status == BroadcastStatus::Ready.as_str()
    }

    /// Stored content; `None` for a bare reservation or unreadable JSON
    pub fn content(&self) -> Option<BroadcastContent> {
        let wisdom_content: WisdomContent =
            serde_json::from_value(self.wisdom_content.clone()?).ok()?;
        if wisdom_content.is_empty() {
            return None;
        }

        Some(BroadcastContent {
            date: self.broadcast_date,
            topic: self.broadcast_type.clone(),
            wisdom_content,
            image_url: self.image_url.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub broadcast_id: i64,
    pub user_id: i64,
    pub status: DeliveryStatus,
    pub telegram_message_id: Option<i32>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LanguageStats {
    pub language: String,
    pub subscriber_count: i64,
    pub active_users_30d: i64,
    pub active_users_7d: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BroadcastStatistics {
    pub broadcast_date: NaiveDate,
    pub broadcast_type: String,
    pub status: String,
    pub total_recipients: i32,
    pub delivery_rate_percent: Option<f64>,
    pub open_rate_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct AnalyticsOverview {
    pub total_users: i64,
    pub active_subscribers: i64,
    pub completed_broadcasts: i64,
    pub deliveries_last_30d: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsletterAnalytics {
    pub overview: AnalyticsOverview,
    pub languages: Vec<LanguageStats>,
    pub recent_broadcasts: Vec<BroadcastStatistics>,
}
