//! Newsletter service
//!
//! Users, subscriptions, broadcast slots, admin checks and analytics on top of
//! the newsletter tables.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use tracing::{debug, error, info, warn};

use crate::config::validation::parse_delivery_time;
use crate::config::Settings;
use crate::database::{create_pool, DatabaseService};
use crate::models::{
    ActivityType, AdminPermissions, Broadcast, BroadcastContent, NewsletterAnalytics,
    SubscribeRequest, SubscriberStats, Subscription, UpsertUserRequest, User, UserContext,
};
use crate::services::registry::ManagedService;
use crate::utils::errors::{Result, TorahBotError};

/// Registry name of the shared [`NewsletterManager`]
pub const NEWSLETTER_SERVICE: &str = "newsletter_manager";

/// What the webhook did for a sender's subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoSubscription {
    Created,
    AlreadyPresent,
}

#[derive(Debug)]
pub struct NewsletterManager {
    db: DatabaseService,
    fallback_admins: Vec<i64>,
    default_delivery_time: NaiveTime,
    default_timezone: String,
    schedule_offset: FixedOffset,
}

impl NewsletterManager {
    pub fn new(db: DatabaseService, settings: &Settings) -> Result<Self> {
        let newsletter = &settings.newsletter;
        let default_delivery_time = parse_delivery_time(&newsletter.default_delivery_time)
            .ok_or_else(|| {
                TorahBotError::Config(format!(
                    "Invalid default delivery time: {}",
                    newsletter.default_delivery_time
                ))
            })?;
        let schedule_offset = FixedOffset::east_opt(newsletter.schedule_utc_offset_hours * 3600)
            .ok_or_else(|| {
                TorahBotError::Config(format!(
                    "Invalid schedule UTC offset: {}",
                    newsletter.schedule_utc_offset_hours
                ))
            })?;

        Ok(Self {
            db,
            fallback_admins: settings.bot.admin_ids.clone(),
            default_delivery_time,
            default_timezone: newsletter.default_timezone.clone(),
            schedule_offset,
        })
    }

    /// Open a pool from settings and build the manager on it
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let pool = create_pool(&settings.database).await?;
        Self::new(DatabaseService::new(pool), settings)
    }

    pub fn database(&self) -> &DatabaseService {
        &self.db
    }

    pub async fn upsert_user(&self, request: &UpsertUserRequest) -> Result<User> {
        let user = self.db.users.upsert(request).await?;
        debug!(telegram_user_id = request.telegram_user_id, "User upserted");
        Ok(user)
    }

    /// Count a wisdom request or quiz attempt. Unknown users are ignored.
    pub async fn record_activity(&self, telegram_user_id: i64, activity: ActivityType) -> Result<()> {
        let updated = self.db.users.record_activity(telegram_user_id, activity).await?;
        if !updated {
            debug!(
                telegram_user_id,
                activity = activity.as_str(),
                "Activity for unknown user not recorded"
            );
        }
        Ok(())
    }

    /// Subscribe or resubscribe a user, with default delivery time and
    /// timezone unless given
    pub async fn subscribe_user(
        &self,
        telegram_user_id: i64,
        language: &str,
        delivery_time: Option<NaiveTime>,
        timezone: Option<&str>,
    ) -> Result<Subscription> {
        let request = self.subscribe_request(telegram_user_id, language, delivery_time, timezone);
        let subscription = self.db.subscriptions.subscribe(&request).await?;
        info!(telegram_user_id, language, "User subscribed to newsletter");
        Ok(subscription)
    }

    /// Returns false when the user had no active subscription
    pub async fn unsubscribe_user(&self, telegram_user_id: i64) -> Result<bool> {
        let unsubscribed = self.db.subscriptions.unsubscribe(telegram_user_id).await?;
        if unsubscribed {
            info!(telegram_user_id, "User unsubscribed from newsletter");
        } else {
            warn!(telegram_user_id, "User was not subscribed");
        }
        Ok(unsubscribed)
    }

    /// Store the sender and give them a subscription on first contact.
    ///
    /// An existing subscription is left untouched, so someone who
    /// unsubscribed stays unsubscribed.
    pub async fn ensure_subscribed(
        &self,
        user: &UserContext,
        raw_user: Option<&serde_json::Value>,
    ) -> Result<AutoSubscription> {
        self.upsert_user(&UpsertUserRequest::from_context(user, raw_user))
            .await?;

        let request =
            self.subscribe_request(user.user_id(), user.language_or_default(), None, None);
        if self.db.subscriptions.create_if_absent(&request).await? {
            info!(
                telegram_user_id = user.user_id(),
                language = %request.language,
                "User auto-subscribed to newsletter"
            );
            Ok(AutoSubscription::Created)
        } else {
            Ok(AutoSubscription::AlreadyPresent)
        }
    }

    pub async fn subscriber_count(&self) -> Result<SubscriberStats> {
        self.db.subscriptions.stats().await
    }

    pub async fn subscribers_by_language(&self) -> Result<Vec<(String, i64)>> {
        self.db.subscriptions.count_by_language().await
    }

    pub async fn active_subscriptions(&self) -> Result<Vec<Subscription>> {
        self.db.subscriptions.list_active().await
    }

    pub async fn create_broadcast_content(
        &self,
        content: &BroadcastContent,
        broadcast_type: &str,
        created_by: &str,
    ) -> Result<i64> {
        let id = self
            .db
            .broadcasts
            .create(content, broadcast_type, created_by)
            .await?;
        info!(broadcast_id = id, date = %content.date, "Broadcast content created");
        Ok(id)
    }

    /// Claim today's slot for `broadcast_type`; `None` when already taken
    pub async fn reserve_broadcast_slot(&self, broadcast_type: &str) -> Result<Option<i64>> {
        self.reserve_broadcast_slot_on(self.schedule_date(), broadcast_type)
            .await
    }

    pub async fn reserve_broadcast_slot_on(
        &self,
        date: NaiveDate,
        broadcast_type: &str,
    ) -> Result<Option<i64>> {
        let reserved = self.db.broadcasts.reserve_slot(date, broadcast_type).await?;

        match reserved {
            Some(id) => info!(broadcast_id = id, %date, broadcast_type, "Broadcast slot reserved"),
            None => info!(%date, broadcast_type, "Broadcast slot already taken, skipping"),
        }

        Ok(reserved)
    }

    /// Take a prepared broadcast for sending; false when it is no longer ready
    pub async fn claim_prepared_broadcast(&self, broadcast_id: i64) -> Result<bool> {
        let claimed = self.db.broadcasts.claim_ready(broadcast_id).await?;
        if !claimed {
            debug!(broadcast_id, "Prepared broadcast already claimed");
        }
        Ok(claimed)
    }

    pub async fn get_broadcast_for_date(
        &self,
        date: NaiveDate,
        broadcast_type: &str,
    ) -> Result<Option<Broadcast>> {
        self.db.broadcasts.find_by_date(date, broadcast_type).await
    }

    /// Current time on the broadcast schedule calendar
    pub fn schedule_now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.schedule_offset)
    }

    /// Calendar day broadcasts are currently scheduled for
    pub fn schedule_date(&self) -> NaiveDate {
        self.schedule_now().date_naive()
    }

    pub fn schedule_offset(&self) -> FixedOffset {
        self.schedule_offset
    }

    /// Whether the user is an active admin.
    ///
    /// Configured fallback admins are accepted while the admin table is empty
    /// or the database cannot be reached.
    pub async fn is_admin(&self, telegram_user_id: i64) -> bool {
        match self.db.admins.find_active(telegram_user_id).await {
            Ok(Some(_)) => true,
            Ok(None) => self.fallback_allowed(telegram_user_id).await,
            Err(e) => {
                error!(telegram_user_id, error = %e, "Admin lookup failed, using fallback list");
                self.is_fallback_admin(telegram_user_id)
            }
        }
    }

    pub async fn admin_permissions(&self, telegram_user_id: i64) -> AdminPermissions {
        match self.db.admins.find_active(telegram_user_id).await {
            Ok(Some(admin)) => serde_json::from_value(admin.permissions).unwrap_or_else(|e| {
                warn!(telegram_user_id, error = %e, "Malformed admin permissions");
                AdminPermissions::none()
            }),
            Ok(None) if self.fallback_allowed(telegram_user_id).await => AdminPermissions::full(),
            Ok(None) => AdminPermissions::none(),
            Err(e) => {
                error!(telegram_user_id, error = %e, "Admin permission lookup failed");
                if self.is_fallback_admin(telegram_user_id) {
                    AdminPermissions::full()
                } else {
                    AdminPermissions::none()
                }
            }
        }
    }

    pub async fn analytics(&self) -> Result<NewsletterAnalytics> {
        Ok(NewsletterAnalytics {
            overview: self.db.broadcasts.analytics_overview().await?,
            languages: self.db.broadcasts.language_stats().await?,
            recent_broadcasts: self.db.broadcasts.recent_statistics().await?,
        })
    }

    fn is_fallback_admin(&self, telegram_user_id: i64) -> bool {
        self.fallback_admins.contains(&telegram_user_id)
    }

    async fn fallback_allowed(&self, telegram_user_id: i64) -> bool {
        if !self.is_fallback_admin(telegram_user_id) {
            return false;
        }

        match self.db.admins.count_active().await {
            Ok(0) => {
                warn!(telegram_user_id, "Admin table empty, using fallback admin");
                true
            }
            Ok(_) => false,
            Err(e) => {
                error!(error = %e, "Admin count failed, using fallback admin");
                true
            }
        }
    }

    fn subscribe_request(
        &self,
        telegram_user_id: i64,
        language: &str,
        delivery_time: Option<NaiveTime>,
        timezone: Option<&str>,
    ) -> SubscribeRequest {
        SubscribeRequest {
            user_id: telegram_user_id,
            language: language.to_string(),
            delivery_time: delivery_time.unwrap_or(self.default_delivery_time),
            timezone: timezone.unwrap_or(&self.default_timezone).to_string(),
        }
    }
}

#[async_trait]
impl ManagedService for NewsletterManager {
    async fn cleanup(&self) -> Result<()> {
        self.db.close().await;
        info!("Newsletter database pool closed");
        Ok(())
    }
}

/// Plain-text summary of analytics for the `/stats` reply
pub fn format_analytics(analytics: &NewsletterAnalytics) -> String {
    let overview = &analytics.overview;
    let mut lines = vec![
        "📊 Newsletter statistics".to_string(),
        String::new(),
        format!("👥 Users: {}", overview.total_users),
        format!("📧 Active subscribers: {}", overview.active_subscribers),
        format!("📨 Completed broadcasts: {}", overview.completed_broadcasts),
        format!("✅ Deliveries (30 days): {}", overview.deliveries_last_30d),
    ];

    if !analytics.languages.is_empty() {
        lines.push(String::new());
        lines.push("🌐 By language:".to_string());
        for language in &analytics.languages {
            lines.push(format!(
                "  {}: {} ({} active in 7d)",
                language.language, language.subscriber_count, language.active_users_7d
            ));
        }
    }

    if !analytics.recent_broadcasts.is_empty() {
        lines.push(String::new());
        lines.push("🗓️ Last 7 days:".to_string());
        for broadcast in &analytics.recent_broadcasts {
            let rate = broadcast
                .delivery_rate_percent
                .map(|rate| format!("{:.1}%", rate))
                .unwrap_or_else(|| "n/a".to_string());
            lines.push(format!(
                "  {} {} [{}]: {} recipients, {} delivered",
                broadcast.broadcast_date,
                broadcast.broadcast_type,
                broadcast.status,
                broadcast.total_recipients,
                rate
            ));
        }
    }

    lines.join("\n")
}
