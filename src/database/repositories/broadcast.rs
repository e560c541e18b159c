//! Broadcast and delivery log repository

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::models::newsletter::{
    AnalyticsOverview, Broadcast, BroadcastContent, BroadcastStatistics, BroadcastStatus,
    DeliveryRecord, LanguageStats,
};
use crate::utils::errors::TorahBotError;

const BROADCAST_COLUMNS: &str = "id, broadcast_date, broadcast_type, wisdom_content, image_url, \
     status, created_by, total_recipients, successful_deliveries, failed_deliveries, created_at, completed_at";

#[derive(Clone, Debug)]
pub struct BroadcastRepository {
    pool: PgPool,
}

impl BroadcastRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store ready-to-send content for a date
    pub async fn create(
        &self,
        content: &BroadcastContent,
        broadcast_type: &str,
        created_by: &str,
    ) -> Result<i64, TorahBotError> {
        let wisdom_content = serde_json::to_value(&content.wisdom_content)?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO newsletter_broadcasts
                (broadcast_date, broadcast_type, wisdom_content, image_url, created_by, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(content.date)
        .bind(broadcast_type)
        .bind(wisdom_content)
        .bind(&content.image_url)
        .bind(created_by)
        .bind(BroadcastStatus::Ready.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Claim the `(date, type)` slot. `None` when it was already taken.
    pub async fn reserve_slot(
        &self,
        date: NaiveDate,
        broadcast_type: &str,
    ) -> Result<Option<i64>, TorahBotError> {
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO newsletter_broadcasts (broadcast_date, broadcast_type, status, created_by)
            VALUES ($1, $2, $3, 'auto_scheduler')
            ON CONFLICT (broadcast_date, broadcast_type) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(date)
        .bind(broadcast_type)
        .bind(BroadcastStatus::Reserved.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    /// Fill a reserved slot with its content and mark it ready
    pub async fn attach_content(&self, id: i64, content: &BroadcastContent) -> Result<(), TorahBotError> {
        let wisdom_content = serde_json::to_value(&content.wisdom_content)?;

        sqlx::query(
            "UPDATE newsletter_broadcasts SET wisdom_content = $2, image_url = $3, status = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(wisdom_content)
        .bind(&content.image_url)
        .bind(BroadcastStatus::Ready.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_date(
        &self,
        date: NaiveDate,
        broadcast_type: &str,
    ) -> Result<Option<Broadcast>, TorahBotError> {
        let query = format!(
            "SELECT {} FROM newsletter_broadcasts WHERE broadcast_date = $1 AND broadcast_type = $2",
            BROADCAST_COLUMNS
        );

        let broadcast = sqlx::query_as::<_, Broadcast>(&query)
            .bind(date)
            .bind(broadcast_type)
            .fetch_optional(&self.pool)
            .await?;

        Ok(broadcast)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Broadcast>, TorahBotError> {
        let query = format!("SELECT {} FROM newsletter_broadcasts WHERE id = $1", BROADCAST_COLUMNS);

        let broadcast = sqlx::query_as::<_, Broadcast>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(broadcast)
    }

    /// Move a prepared broadcast to `sending`. False when it was not
    /// `ready`, e.g. another instance claimed it first.
    pub async fn claim_ready(&self, id: i64) -> Result<bool, TorahBotError> {
        let result = sqlx::query("UPDATE newsletter_broadcasts SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(BroadcastStatus::Ready.as_str())
            .bind(BroadcastStatus::Sending.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn set_status(&self, id: i64, status: BroadcastStatus) -> Result<(), TorahBotError> {
        sqlx::query("UPDATE newsletter_broadcasts SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Record the final counters of a delivery run
    pub async fn complete(
        &self,
        id: i64,
        status: BroadcastStatus,
        total_recipients: i32,
        successful: i32,
        failed: i32,
    ) -> Result<(), TorahBotError> {
        sqlx::query(
            r#"
            UPDATE newsletter_broadcasts
            SET status = $2,
                total_recipients = $3,
                successful_deliveries = $4,
                failed_deliveries = $5,
                completed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(total_recipients)
        .bind(successful)
        .bind(failed)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn log_delivery(&self, record: &DeliveryRecord) -> Result<(), TorahBotError> {
        sqlx::query(
            "INSERT INTO delivery_log (broadcast_id, user_id, status, telegram_message_id, error_message) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(record.broadcast_id)
        .bind(record.user_id)
        .bind(record.status.as_str())
        .bind(record.telegram_message_id)
        .bind(&record.error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn analytics_overview(&self) -> Result<AnalyticsOverview, TorahBotError> {
        let overview = sqlx::query_as::<_, AnalyticsOverview>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM newsletter_subscriptions WHERE is_active = TRUE) AS active_subscribers,
                (SELECT COUNT(*) FROM newsletter_broadcasts WHERE status = 'completed') AS completed_broadcasts,
                (SELECT COUNT(*) FROM delivery_log
                    WHERE status = 'sent' AND delivered_at > NOW() - INTERVAL '30 days') AS deliveries_last_30d
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(overview)
    }

    pub async fn language_stats(&self) -> Result<Vec<LanguageStats>, TorahBotError> {
        let stats = sqlx::query_as::<_, LanguageStats>(
            "SELECT language, subscriber_count, active_users_30d, active_users_7d \
             FROM active_subscribers_by_language",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(stats)
    }

    /// Broadcast statistics for the last seven days, newest first
    pub async fn recent_statistics(&self) -> Result<Vec<BroadcastStatistics>, TorahBotError> {
        let stats = sqlx::query_as::<_, BroadcastStatistics>(
            r#"
            SELECT broadcast_date, broadcast_type, status, total_recipients,
                   delivery_rate_percent, open_rate_percent
            FROM broadcast_statistics
            WHERE broadcast_date >= CURRENT_DATE - INTERVAL '7 days'
            ORDER BY broadcast_date DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(stats)
    }
}
