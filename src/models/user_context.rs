//! User context model
//!
//! One consistent shape for the sender of an update, built from the raw
//! Telegram `from` object.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::i18n;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    user_id: i64,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    language_code: Option<String>,
    language: Option<String>,
}

impl UserContext {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            username: None,
            first_name: None,
            last_name: None,
            language_code: None,
            language: None,
        }
    }

    /// Build a context from a raw Telegram user object.
    ///
    /// Returns `None` when the payload carries no usable `id`.
    pub fn from_raw(payload: &Value, language: Option<String>) -> Option<Self> {
        let user_id = payload.get("id").and_then(Value::as_i64).filter(|id| *id != 0)?;
        let field = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_string);

        Some(Self {
            user_id,
            username: field("username"),
            first_name: field("first_name"),
            last_name: field("last_name"),
            language_code: field("language_code"),
            language,
        })
    }

    /// Find the sender of a webhook update (message or callback query) and
    /// resolve its language name from `language_code`.
    pub fn from_update(update: &Value) -> Option<Self> {
        let from = update
            .get("message")
            .and_then(|message| message.get("from"))
            .or_else(|| {
                update
                    .get("callback_query")
                    .and_then(|query| query.get("from"))
            })?;

        let language_code = from.get("language_code").and_then(Value::as_str);
        let language = i18n::detect_language(language_code).to_string();

        Self::from_raw(from, Some(language))
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    pub fn language_code(&self) -> Option<&str> {
        self.language_code.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Language name to talk to this user in
    pub fn language_or_default(&self) -> &str {
        self.language
            .as_deref()
            .unwrap_or_else(|| i18n::detect_language(self.language_code.as_deref()))
    }

    /// `@username`, else first name, else `user_{id}`
    pub fn display_name(&self) -> String {
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            return format!("@{}", username);
        }
        if let Some(first_name) = self.first_name.as_deref().filter(|n| !n.is_empty()) {
            return first_name.to_string();
        }
        format!("user_{}", self.user_id)
    }

    pub fn full_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            self.display_name()
        } else {
            parts.join(" ")
        }
    }

    /// Telegram-shaped representation, `id` instead of `user_id`
    pub fn to_dict(&self) -> Value {
        json!({
            "id": self.user_id,
            "username": self.username,
            "first_name": self.first_name,
            "last_name": self.last_name,
            "language_code": self.language_code,
            "language": self.language,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_username() {
        let ctx = UserContext::from_raw(&json!({"id": 42, "username": "bob"}), None).unwrap();
        assert_eq!(ctx.display_name(), "@bob");
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let ctx = UserContext::from_raw(&json!({"id": 42}), None).unwrap();
        assert_eq!(ctx.display_name(), "user_42");
        assert_eq!(ctx.full_name(), "user_42");
    }

    #[test]
    fn test_display_name_uses_first_name() {
        let ctx = UserContext::from_raw(&json!({"id": 7, "first_name": "Sarah"}), None).unwrap();
        assert_eq!(ctx.display_name(), "Sarah");
    }

    #[test]
    fn test_missing_id_yields_none() {
        assert!(UserContext::from_raw(&json!({}), None).is_none());
        assert!(UserContext::from_raw(&json!({"username": "bob"}), None).is_none());
        assert!(UserContext::from_raw(&json!({"id": "42"}), None).is_none());
        assert!(UserContext::from_raw(&json!({"id": 0}), None).is_none());
    }

    #[test]
    fn test_full_name() {
        let ctx = UserContext::from_raw(
            &json!({"id": 1, "first_name": "Moshe", "last_name": "Levi", "username": "ml"}),
            None,
        )
        .unwrap();
        assert_eq!(ctx.full_name(), "Moshe Levi");

        let ctx = UserContext::from_raw(&json!({"id": 1, "last_name": "Levi"}), None).unwrap();
        assert_eq!(ctx.full_name(), "Levi");
    }

    #[test]
    fn test_to_dict_reproduces_identity_fields() {
        let payload = json!({
            "id": 42,
            "username": "bob",
            "first_name": "Bob",
            "last_name": "Cohen",
            "language_code": "he",
            "is_bot": false
        });
        let ctx = UserContext::from_raw(&payload, Some("Hebrew".to_string())).unwrap();
        let dict = ctx.to_dict();

        for key in ["id", "username", "first_name", "last_name", "language_code"] {
            assert_eq!(dict[key], payload[key], "field {}", key);
        }
        assert_eq!(dict["language"], "Hebrew");
    }

    #[test]
    fn test_from_update_message_and_callback() {
        let update = json!({
            "update_id": 1,
            "message": {"from": {"id": 5, "language_code": "ru"}, "text": "hi"}
        });
        let ctx = UserContext::from_update(&update).unwrap();
        assert_eq!(ctx.user_id(), 5);
        assert_eq!(ctx.language(), Some("Russian"));

        let update = json!({
            "update_id": 2,
            "callback_query": {"from": {"id": 6}, "data": "x"}
        });
        let ctx = UserContext::from_update(&update).unwrap();
        assert_eq!(ctx.user_id(), 6);
        assert_eq!(ctx.language(), Some("English"));

        assert!(UserContext::from_update(&json!({"update_id": 3})).is_none());
    }
}
