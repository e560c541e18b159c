//! Admin repository implementation

use sqlx::PgPool;

use crate::models::admin::{AdminUser, CreateAdminRequest};
use crate::utils::errors::TorahBotError;

#[derive(Clone, Debug)]
pub struct AdminRepository {
    pool: PgPool,
}

impl AdminRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active admin entry for a Telegram user
    pub async fn find_active(&self, telegram_user_id: i64) -> Result<Option<AdminUser>, TorahBotError> {
        let admin = sqlx::query_as::<_, AdminUser>(
            "SELECT id, telegram_user_id, username, role, permissions, is_active, created_at \
             FROM admin_users WHERE telegram_user_id = $1 AND is_active = TRUE",
        )
        .bind(telegram_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(admin)
    }

    pub async fn count_active(&self) -> Result<i64, TorahBotError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admin_users WHERE is_active = TRUE")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    /// Add an admin, reactivating and updating an existing row
    pub async fn upsert(&self, request: &CreateAdminRequest) -> Result<AdminUser, TorahBotError> {
        let permissions = serde_json::to_value(&request.permissions)?;

        let admin = sqlx::query_as::<_, AdminUser>(
            r#"
            INSERT INTO admin_users (telegram_user_id, username, role, permissions, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT (telegram_user_id)
            DO UPDATE SET
                username = EXCLUDED.username,
                role = EXCLUDED.role,
                permissions = EXCLUDED.permissions,
                is_active = TRUE
            RETURNING id, telegram_user_id, username, role, permissions, is_active, created_at
            "#,
        )
        .bind(request.telegram_user_id)
        .bind(&request.username)
        .bind(&request.role)
        .bind(permissions)
        .fetch_one(&self.pool)
        .await?;

        Ok(admin)
    }

    /// Returns false when no active admin matched
    pub async fn deactivate(&self, telegram_user_id: i64) -> Result<bool, TorahBotError> {
        let result = sqlx::query(
            "UPDATE admin_users SET is_active = FALSE WHERE telegram_user_id = $1 AND is_active = TRUE",
        )
        .bind(telegram_user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
