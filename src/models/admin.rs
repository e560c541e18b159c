//! Admin models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminUser {
    pub id: i64,
    pub telegram_user_id: i64,
    pub username: Option<String>,
    pub role: String,
    pub permissions: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Permission flags stored in `admin_users.permissions`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminPermissions {
    pub can_send_broadcasts: bool,
    pub can_test_broadcasts: bool,
    pub can_manage_users: bool,
    pub can_view_stats: bool,
    pub can_manage_schedule: bool,
}

impl AdminPermissions {
    /// Everything allowed; granted to configured fallback admins
    pub fn full() -> Self {
        Self {
            can_send_broadcasts: true,
            can_test_broadcasts: true,
            can_manage_users: true,
            can_view_stats: true,
            can_manage_schedule: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAdminRequest {
    pub telegram_user_id: i64,
    pub username: Option<String>,
    pub role: String,
    pub permissions: AdminPermissions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_permissions_default_to_false() {
        let permissions: AdminPermissions =
            serde_json::from_str(r#"{"can_view_stats": true}"#).unwrap();
        assert!(permissions.can_view_stats);
        assert!(!permissions.can_send_broadcasts);
    }
}
