//! Newsletter subscription repository

use sqlx::PgPool;

use crate::models::newsletter::{SubscribeRequest, SubscriberStats, Subscription};
use crate::utils::errors::TorahBotError;

const SUBSCRIPTION_COLUMNS: &str =
    "id, user_id, language, delivery_time, timezone, is_active, subscribed_at, unsubscribed_at";

#[derive(Clone, Debug)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create or reactivate a subscription
    pub async fn subscribe(&self, request: &SubscribeRequest) -> Result<Subscription, TorahBotError> {
        let query = format!(
            r#"
            INSERT INTO newsletter_subscriptions (user_id, language, delivery_time, timezone, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT (user_id)
            DO UPDATE SET
                is_active = TRUE,
                language = EXCLUDED.language,
                delivery_time = EXCLUDED.delivery_time,
                timezone = EXCLUDED.timezone,
                unsubscribed_at = NULL
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        );

        let subscription = sqlx::query_as::<_, Subscription>(&query)
            .bind(request.user_id)
            .bind(&request.language)
            .bind(request.delivery_time)
            .bind(&request.timezone)
            .fetch_one(&self.pool)
            .await?;

        Ok(subscription)
    }

    /// Create a subscription unless the user already has one, active or not.
    /// Returns true when a row was inserted.
    pub async fn create_if_absent(&self, request: &SubscribeRequest) -> Result<bool, TorahBotError> {
        let result = sqlx::query(
            r#"
            INSERT INTO newsletter_subscriptions (user_id, language, delivery_time, timezone, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(request.user_id)
        .bind(&request.language)
        .bind(request.delivery_time)
        .bind(&request.timezone)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deactivate an active subscription. Returns false when there was none.
    pub async fn unsubscribe(&self, user_id: i64) -> Result<bool, TorahBotError> {
        let result = sqlx::query(
            "UPDATE newsletter_subscriptions SET is_active = FALSE, unsubscribed_at = NOW() \
             WHERE user_id = $1 AND is_active = TRUE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_user(&self, user_id: i64) -> Result<Option<Subscription>, TorahBotError> {
        let query = format!(
            "SELECT {} FROM newsletter_subscriptions WHERE user_id = $1",
            SUBSCRIPTION_COLUMNS
        );

        let subscription = sqlx::query_as::<_, Subscription>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(subscription)
    }

    /// All active subscriptions, oldest first
    pub async fn list_active(&self) -> Result<Vec<Subscription>, TorahBotError> {
        let query = format!(
            "SELECT {} FROM newsletter_subscriptions WHERE is_active = TRUE ORDER BY subscribed_at",
            SUBSCRIPTION_COLUMNS
        );

        let subscriptions = sqlx::query_as::<_, Subscription>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(subscriptions)
    }

    pub async fn stats(&self) -> Result<SubscriberStats, TorahBotError> {
        let stats = sqlx::query_as::<_, SubscriberStats>(
            r#"
            SELECT
                COUNT(*) AS total_subscribers,
                COUNT(*) FILTER (WHERE u.last_interaction > NOW() - INTERVAL '30 days') AS active_30_days,
                COUNT(*) FILTER (WHERE u.last_interaction > NOW() - INTERVAL '7 days') AS active_7_days
            FROM newsletter_subscriptions ns
            JOIN users u ON u.telegram_user_id = ns.user_id
            WHERE ns.is_active = TRUE
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    /// Active subscriber count per language, largest first
    pub async fn count_by_language(&self) -> Result<Vec<(String, i64)>, TorahBotError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT language, COUNT(*) AS count FROM newsletter_subscriptions \
             WHERE is_active = TRUE GROUP BY language ORDER BY count DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
