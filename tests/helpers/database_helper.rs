//! Test database helper utilities
//!
//! Database-backed tests run against `TEST_DATABASE_URL` and are skipped
//! when it is unset. Each test starts from freshly truncated tables.

use sqlx::PgPool;
use torah_bot::config::Settings;
use torah_bot::database::{bootstrap_schema, DatabaseService};
use torah_bot::services::NewsletterManager;

use super::simple_test::init_test_env;

/// Test database helper that manages the newsletter schema
pub struct TestDatabase {
    pub pool: PgPool,
    pub database_url: String,
}

impl TestDatabase {
    /// Connect and bootstrap, or `None` when no test database is configured
    pub async fn connect() -> Option<Self> {
        init_test_env();

        let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set, skipping database test");
            return None;
        };

        let pool = PgPool::connect(&database_url)
            .await
            .expect("Failed to connect to test database");
        let report = bootstrap_schema(&pool).await.expect("Failed to bootstrap schema");
        assert!(report.is_complete(), "schema incomplete: {:?}", report);

        let db = Self { pool, database_url };
        db.clean().await;
        Some(db)
    }

    /// Remove all rows from the newsletter tables
    pub async fn clean(&self) {
        sqlx::query(
            "TRUNCATE delivery_log, newsletter_broadcasts, newsletter_subscriptions, admin_users, users \
             RESTART IDENTITY CASCADE",
        )
        .execute(&self.pool)
        .await
        .expect("Failed to clean test database");
    }

    pub fn service(&self) -> DatabaseService {
        DatabaseService::new(self.pool.clone())
    }

    pub fn newsletter(&self, settings: &Settings) -> NewsletterManager {
        NewsletterManager::new(self.service(), settings).expect("Failed to build newsletter manager")
    }
}
