//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::UserContext;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub telegram_user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
    pub is_bot: bool,
    pub is_premium: bool,
    pub total_wisdom_requests: i32,
    pub total_quiz_attempts: i32,
    pub created_at: DateTime<Utc>,
    pub last_interaction: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertUserRequest {
    pub telegram_user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
    pub is_bot: bool,
    pub is_premium: bool,
    /// Raw Telegram user object, kept for reference
    pub user_data: serde_json::Value,
}

impl UpsertUserRequest {
    /// Build from a normalised context plus the raw `from` object of the update
    pub fn from_context(user: &UserContext, raw: Option<&serde_json::Value>) -> Self {
        let flag = |key: &str| {
            raw.and_then(|value| value.get(key))
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false)
        };

        Self {
            telegram_user_id: user.user_id(),
            username: user.username().map(str::to_string),
            first_name: user.first_name().map(str::to_string),
            last_name: user.last_name().map(str::to_string),
            language_code: user.language_code().map(str::to_string),
            is_bot: flag("is_bot"),
            is_premium: flag("is_premium"),
            user_data: raw.cloned().unwrap_or_else(|| user.to_dict()),
        }
    }
}

/// Counted user activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityType {
    WisdomRequest,
    QuizAttempt,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::WisdomRequest => "wisdom_request",
            ActivityType::QuizAttempt => "quiz_attempt",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upsert_request_from_context() {
        let raw = json!({"id": 5, "first_name": "Ruth", "is_premium": true, "language_code": "he"});
        let user = UserContext::from_raw(&raw, Some("Hebrew".to_string())).unwrap();

        let request = UpsertUserRequest::from_context(&user, Some(&raw));
        assert_eq!(request.telegram_user_id, 5);
        assert_eq!(request.first_name.as_deref(), Some("Ruth"));
        assert!(request.is_premium);
        assert!(!request.is_bot);
        assert_eq!(request.user_data, raw);
    }
}
