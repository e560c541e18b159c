//! Database backup manager
//!
//! Dumps every public table as JSON into a timestamped file and keeps the
//! newest `max_backups` files.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::config::BackupConfig;
use crate::database::DatabasePool;
use crate::services::registry::ManagedService;
use crate::utils::errors::Result;

/// Registry name of the shared [`BackupManager`]
pub const BACKUP_SERVICE: &str = "backup_manager";

pub const BACKUP_PREFIX: &str = "torah_bot_backup_";
pub const BACKUP_EXTENSION: &str = ".json";

#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    pub filename: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub created: DateTime<Local>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupStats {
    pub total_backups: usize,
    pub total_size_bytes: u64,
    pub latest_backup: Option<DateTime<Local>>,
    pub backup_directory: PathBuf,
    pub max_backups_kept: usize,
}

#[derive(Debug, Clone)]
pub struct BackupManager {
    pool: DatabasePool,
    directory: PathBuf,
    max_backups: usize,
}

impl BackupManager {
    pub fn new(pool: DatabasePool, config: &BackupConfig) -> Self {
        Self {
            pool,
            directory: PathBuf::from(&config.directory),
            max_backups: config.max_backups,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Write a full dump and prune old files. Returns the new file's path.
    pub async fn create_backup(&self) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.directory).await?;

        let filename = backup_filename(Local::now());
        let path = self.directory.join(&filename);
        info!(file = %filename, "Starting database backup");

        let document = self.dump_tables().await?;
        let body = serde_json::to_vec_pretty(&document)?;

        if let Err(e) = tokio::fs::write(&path, body).await {
            error!(file = %filename, error = %e, "Failed to write backup");
            // Partial files must not count towards retention
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e.into());
        }

        let size = tokio::fs::metadata(&path).await?.len();
        info!(file = %filename, size_bytes = size, "Database backup completed");

        let removed = cleanup_old_backups(&self.directory, self.max_backups).await?;
        if removed > 0 {
            info!(removed, "Old backups removed");
        }

        Ok(path)
    }

    pub async fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        list_backups(&self.directory).await
    }

    pub async fn stats(&self) -> Result<BackupStats> {
        let backups = self.list_backups().await?;

        Ok(BackupStats {
            total_backups: backups.len(),
            total_size_bytes: backups.iter().map(|b| b.size_bytes).sum(),
            latest_backup: backups.first().map(|b| b.created),
            backup_directory: self.directory.clone(),
            max_backups_kept: self.max_backups,
        })
    }

    async fn dump_tables(&self) -> Result<Value> {
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT tablename::text FROM pg_tables WHERE schemaname = 'public' ORDER BY tablename",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut dumped = Map::new();
        for table in &tables {
            let query = format!(
                "SELECT COALESCE(json_agg(t), '[]'::json) FROM {} t",
                quote_identifier(table)
            );
            let rows: Value = sqlx::query_scalar(&query).fetch_one(&self.pool).await?;
            let count = rows.as_array().map(Vec::len).unwrap_or(0);
            info!(table = %table, rows = count, "Table backed up");
            dumped.insert(table.clone(), rows);
        }

        let mut document = Map::new();
        document.insert("created".to_string(), Value::String(Local::now().to_rfc3339()));
        document.insert("table_count".to_string(), Value::from(tables.len()));
        document.insert("tables".to_string(), Value::Object(dumped));

        Ok(Value::Object(document))
    }
}

impl ManagedService for BackupManager {}

/// Reply after a manual backup
pub fn format_backup_created(path: &Path, stats: &BackupStats) -> String {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    [
        "✅ Database backup completed".to_string(),
        String::new(),
        format!("📄 File: {}", filename),
        format!("💾 Storage used: {}", format_size(stats.total_size_bytes)),
        format!("🗂️ Total backups: {}", stats.total_backups),
        format!("♻️ Keeping the newest {}", stats.max_backups_kept),
    ]
    .join("\n")
}

/// Backup overview with the five most recent files
pub fn format_backup_status(stats: &BackupStats, backups: &[BackupInfo]) -> String {
    let mut lines = vec![
        "📊 Database backup status".to_string(),
        String::new(),
        format!("🗂️ Total backups: {}", stats.total_backups),
        format!("💾 Storage used: {}", format_size(stats.total_size_bytes)),
        format!(
            "🕒 Latest backup: {}",
            stats
                .latest_backup
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string())
        ),
        format!("♻️ Retention: newest {}", stats.max_backups_kept),
        String::new(),
        "📋 Recent backups:".to_string(),
    ];

    if backups.is_empty() {
        lines.push("• No backups found".to_string());
    }
    for backup in backups.iter().take(5) {
        lines.push(format!(
            "• {} ({})",
            backup.filename,
            format_size(backup.size_bytes)
        ));
    }

    lines.join("\n")
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

pub fn backup_filename(at: DateTime<Local>) -> String {
    format!("{}{}{}", BACKUP_PREFIX, at.format("%Y%m%d_%H%M%S"), BACKUP_EXTENSION)
}

fn is_backup_file(name: &str) -> bool {
    name.starts_with(BACKUP_PREFIX) && name.ends_with(BACKUP_EXTENSION)
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Backup files in `directory`, newest first. A missing directory has none.
pub async fn list_backups(directory: &Path) -> Result<Vec<BackupInfo>> {
    let mut entries = match tokio::fs::read_dir(directory).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut backups = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let filename = entry.file_name().to_string_lossy().into_owned();
        if !is_backup_file(&filename) {
            continue;
        }

        let metadata = entry.metadata().await?;
        let created = metadata
            .modified()
            .map(DateTime::<Local>::from)
            .unwrap_or_else(|_| Local::now());

        backups.push(BackupInfo {
            filename,
            path: entry.path(),
            size_bytes: metadata.len(),
            created,
        });
    }

    // Names embed the timestamp, so they order chronologically
    backups.sort_by(|a, b| b.filename.cmp(&a.filename));
    Ok(backups)
}

/// Delete everything but the newest `keep` backups; returns how many went
pub async fn cleanup_old_backups(directory: &Path, keep: usize) -> Result<usize> {
    let backups = list_backups(directory).await?;
    let mut removed = 0;

    for backup in backups.iter().skip(keep) {
        match tokio::fs::remove_file(&backup.path).await {
            Ok(()) => {
                info!(file = %backup.filename, "Removed old backup");
                removed += 1;
            }
            Err(e) => warn!(file = %backup.filename, error = %e, "Failed to remove old backup"),
        }
    }

    Ok(removed)
}
