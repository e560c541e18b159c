//! Newsletter schema bootstrap
//!
//! The schema file is applied section by section. A failing section is logged
//! and skipped, so one bad statement never blocks the rest; afterwards the
//! expected tables and views are checked and anything missing is reported.

use sqlx::Executor;
use tracing::{info, warn};

use crate::database::DatabasePool;
use crate::utils::errors::Result;

pub const SCHEMA_SQL: &str = include_str!("../../schema/newsletter_schema.sql");

pub const SECTION_SEPARATOR: &str =
    "-- ===================================================================";

pub const EXPECTED_TABLES: &[&str] = &[
    "users",
    "newsletter_subscriptions",
    "newsletter_broadcasts",
    "delivery_log",
    "admin_users",
];

pub const EXPECTED_VIEWS: &[&str] = &["active_subscribers_by_language", "broadcast_statistics"];

#[derive(Debug, Clone, Default)]
pub struct SchemaReport {
    pub sections_applied: usize,
    pub sections_failed: usize,
    pub missing_tables: Vec<String>,
    pub missing_views: Vec<String>,
}

impl SchemaReport {
    pub fn is_complete(&self) -> bool {
        self.missing_tables.is_empty() && self.missing_views.is_empty()
    }
}

/// Split a schema script on the section separator, dropping sections that
/// hold nothing but comments and whitespace
pub fn split_schema_sections(sql: &str) -> Vec<&str> {
    sql.split(SECTION_SEPARATOR)
        .map(str::trim)
        .filter(|section| {
            section.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            })
        })
        .collect()
}

/// Apply the bundled newsletter schema
pub async fn bootstrap_schema(pool: &DatabasePool) -> Result<SchemaReport> {
    apply_schema(pool, SCHEMA_SQL).await
}

pub async fn apply_schema(pool: &DatabasePool, sql: &str) -> Result<SchemaReport> {
    let mut report = SchemaReport::default();
    let sections = split_schema_sections(sql);

    info!(sections = sections.len(), "Applying newsletter schema");

    for (index, section) in sections.iter().enumerate() {
        match pool.execute(*section).await {
            Ok(_) => report.sections_applied += 1,
            Err(e) => {
                report.sections_failed += 1;
                warn!(section = index + 1, error = %e, "Schema section failed, continuing");
            }
        }
    }

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT table_name::text FROM information_schema.tables \
         WHERE table_schema = 'public' AND table_type = 'BASE TABLE'",
    )
    .fetch_all(pool)
    .await?;

    let views: Vec<String> = sqlx::query_scalar(
        "SELECT table_name::text FROM information_schema.views WHERE table_schema = 'public'",
    )
    .fetch_all(pool)
    .await?;

    report.missing_tables = missing(EXPECTED_TABLES, &tables);
    report.missing_views = missing(EXPECTED_VIEWS, &views);

    if report.is_complete() {
        info!(
            applied = report.sections_applied,
            failed = report.sections_failed,
            "Newsletter schema ready"
        );
    } else {
        warn!(
            missing_tables = ?report.missing_tables,
            missing_views = ?report.missing_views,
            "Newsletter schema incomplete"
        );
    }

    Ok(report)
}

fn missing(expected: &[&str], present: &[String]) -> Vec<String> {
    expected
        .iter()
        .filter(|name| !present.iter().any(|p| p == *name))
        .map(|name| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_drops_comment_only_sections() {
        let sql = format!(
            "-- header\n\n{sep}\nCREATE TABLE a (id INT);\n{sep}\n-- only a comment\n{sep}\nCREATE VIEW v AS SELECT 1;\n",
            sep = SECTION_SEPARATOR
        );

        let sections = split_schema_sections(&sql);
        assert_eq!(sections, vec!["CREATE TABLE a (id INT);", "CREATE VIEW v AS SELECT 1;"]);
    }

    #[test]
    fn test_bundled_schema_covers_expected_objects() {
        let sections = split_schema_sections(SCHEMA_SQL);
        assert_eq!(sections.len(), 6);

        for table in EXPECTED_TABLES {
            assert!(
                SCHEMA_SQL.contains(&format!("CREATE TABLE IF NOT EXISTS {} (", table)),
                "missing table {}",
                table
            );
        }
        for view in EXPECTED_VIEWS {
            assert!(SCHEMA_SQL.contains(&format!("CREATE OR REPLACE VIEW {} AS", view)));
        }
    }

    #[test]
    fn test_missing_objects() {
        let present = vec!["users".to_string(), "admin_users".to_string()];
        let result = missing(&["users", "delivery_log", "admin_users"], &present);
        assert_eq!(result, vec!["delivery_log".to_string()]);
    }
}
