//! User repository implementation

use sqlx::PgPool;

use crate::models::user::{ActivityType, UpsertUserRequest, User};
use crate::utils::errors::TorahBotError;

const USER_COLUMNS: &str = "id, telegram_user_id, username, first_name, last_name, language_code, \
     is_bot, is_premium, total_wisdom_requests, total_quiz_attempts, created_at, last_interaction";

#[derive(Clone, Debug)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a user or refresh the stored profile of an existing one
    pub async fn upsert(&self, request: &UpsertUserRequest) -> Result<User, TorahBotError> {
        let query = format!(
            r#"
            INSERT INTO users (
                telegram_user_id, username, first_name, last_name,
                language_code, is_bot, is_premium, user_data
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (telegram_user_id)
            DO UPDATE SET
                username = EXCLUDED.username,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                language_code = EXCLUDED.language_code,
                is_premium = EXCLUDED.is_premium,
                user_data = EXCLUDED.user_data,
                last_interaction = NOW()
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(request.telegram_user_id)
            .bind(&request.username)
            .bind(&request.first_name)
            .bind(&request.last_name)
            .bind(request.language_code.as_deref().unwrap_or("en"))
            .bind(request.is_bot)
            .bind(request.is_premium)
            .bind(&request.user_data)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find user by Telegram ID
    pub async fn find_by_telegram_id(&self, telegram_user_id: i64) -> Result<Option<User>, TorahBotError> {
        let query = format!("SELECT {} FROM users WHERE telegram_user_id = $1", USER_COLUMNS);

        let user = sqlx::query_as::<_, User>(&query)
            .bind(telegram_user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Bump an activity counter and the last interaction time.
    /// Returns false when the user is unknown.
    pub async fn record_activity(
        &self,
        telegram_user_id: i64,
        activity: ActivityType,
    ) -> Result<bool, TorahBotError> {
        let query = match activity {
            ActivityType::WisdomRequest => {
                "UPDATE users SET total_wisdom_requests = total_wisdom_requests + 1, \
                 last_interaction = NOW() WHERE telegram_user_id = $1"
            }
            ActivityType::QuizAttempt => {
                "UPDATE users SET total_quiz_attempts = total_quiz_attempts + 1, \
                 last_interaction = NOW() WHERE telegram_user_id = $1"
            }
        };

        let result = sqlx::query(query)
            .bind(telegram_user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count total users
    pub async fn count(&self) -> Result<i64, TorahBotError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
