//! Torah Bot self-check
//!
//! Exercises the newsletter database layer, the backup manager, language
//! detection and webhook secret verification against the configured
//! environment, then prints a pass/fail summary.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;

use torah_bot::{
    config::Settings,
    database::{bootstrap_schema, create_pool},
    i18n::detect_language,
    middleware::{generate_webhook_secret_token, RequestMetadata, WebhookSecurityGate},
    models::{UpsertUserRequest, UserContext},
    services::{format_analytics, BackupManager, NewsletterManager},
    utils::logging,
    DatabaseService,
};

#[derive(Parser)]
#[command(name = "torah-selfcheck")]
#[command(author, version, about = "Self-checks for the Torah Bot deployment", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Check,
}

#[derive(Subcommand)]
enum Check {
    /// Schema, subscriptions and analytics against the configured database
    Newsletter {
        /// Telegram user id used for the subscribe/unsubscribe round
        #[arg(long, default_value_t = 999_999_999)]
        test_user_id: i64,
    },
    /// Create a backup, then list and summarize backups
    Backup,
    /// Language code detection
    Language,
    /// Webhook secret generation and verification
    Secret,
}

#[derive(Default)]
struct CheckSummary {
    results: Vec<(String, bool)>,
}

impl CheckSummary {
    fn record(&mut self, name: &str, ok: bool) {
        println!("{} {}", if ok { "✅" } else { "❌" }, name);
        self.results.push((name.to_string(), ok));
    }

    fn record_result<T, E: std::fmt::Display>(&mut self, name: &str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => {
                self.record(name, true);
                Some(value)
            }
            Err(e) => {
                self.record(&format!("{}: {}", name, e), false);
                None
            }
        }
    }

    fn passed(&self) -> usize {
        self.results.iter().filter(|(_, ok)| *ok).count()
    }

    fn finish(self) -> ExitCode {
        let total = self.results.len();
        let passed = self.passed();
        println!();
        println!("📊 {}/{} checks passed", passed, total);

        if passed == total {
            println!("🎉 All checks passed");
            ExitCode::SUCCESS
        } else {
            println!("⚠️ {} check(s) failed", total - passed);
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let settings = match Settings::new() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ Failed to load settings: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let _log_guard = logging::init_logging(&settings.logging).ok().flatten();

    let mut summary = CheckSummary::default();
    match cli.command {
        Check::Newsletter { test_user_id } => check_newsletter(&settings, test_user_id, &mut summary).await,
        Check::Backup => check_backup(&settings, &mut summary).await,
        Check::Language => check_language(&mut summary),
        Check::Secret => check_secret(&mut summary),
    }

    summary.finish()
}

async fn check_newsletter(settings: &Settings, test_user_id: i64, summary: &mut CheckSummary) {
    println!("📧 Newsletter checks\n");

    let Some(pool) = summary.record_result("Database connection", create_pool(&settings.database).await) else {
        return;
    };

    if let Some(report) = summary.record_result("Schema bootstrap", bootstrap_schema(&pool).await) {
        summary.record("Expected tables and views present", report.is_complete());
    }

    let Some(manager) = summary.record_result(
        "Newsletter manager",
        NewsletterManager::new(DatabaseService::new(pool), settings),
    ) else {
        return;
    };

    let raw_user = json!({"id": test_user_id, "first_name": "Selfcheck", "language_code": "en"});
    let user = UserContext::from_raw(&raw_user, Some(detect_language(Some("en")).to_string()));
    let Some(user) = user else {
        summary.record("Test user context", false);
        return;
    };

    summary.record_result(
        "Upsert test user",
        manager
            .upsert_user(&UpsertUserRequest::from_context(&user, Some(&raw_user)))
            .await,
    );
    summary.record_result(
        "Subscribe test user",
        manager.subscribe_user(test_user_id, "English", None, None).await,
    );
    if let Some(stats) = summary.record_result("Subscriber count", manager.subscriber_count().await) {
        summary.record("Subscriber count includes test user", stats.total_subscribers >= 1);
    }
    summary.record_result("Subscribers by language", manager.subscribers_by_language().await);
    if let Some(removed) = summary.record_result("Unsubscribe test user", manager.unsubscribe_user(test_user_id).await) {
        summary.record("Unsubscribe reported an active subscription", removed);
    }
    if let Some(analytics) = summary.record_result("Analytics", manager.analytics().await) {
        println!("\n{}\n", format_analytics(&analytics));
    }

    manager.database().close().await;
}

async fn check_backup(settings: &Settings, summary: &mut CheckSummary) {
    println!("💾 Backup checks\n");

    let Some(pool) = summary.record_result("Database connection", create_pool(&settings.database).await) else {
        return;
    };
    let manager = BackupManager::new(pool.clone(), &settings.backup);

    if let Some(path) = summary.record_result("Create backup", manager.create_backup().await) {
        println!("   {}", path.display());
    }
    if let Some(backups) = summary.record_result("List backups", manager.list_backups().await) {
        summary.record("At least one backup present", !backups.is_empty());
        summary.record(
            "Retention respected",
            backups.len() <= settings.backup.max_backups,
        );
    }
    if let Some(stats) = summary.record_result("Backup stats", manager.stats().await) {
        println!(
            "   {} backup(s), {} bytes in {}",
            stats.total_backups,
            stats.total_size_bytes,
            stats.backup_directory.display()
        );
    }

    pool.close().await;
}

fn check_language(summary: &mut CheckSummary) {
    println!("🌐 Language detection checks\n");

    let cases = [
        (Some("en"), "English"),
        (Some("en-US"), "English"),
        (Some("ru"), "Russian"),
        (Some("uk"), "Russian"),
        (Some("he"), "Hebrew"),
        (Some("pt_BR"), "Portuguese"),
        (Some("ja"), "English"),
        (None, "English"),
    ];

    for (code, expected) in cases {
        let detected = detect_language(code);
        summary.record(
            &format!("{:?} → {} (got {})", code, expected, detected),
            detected == expected,
        );
    }
}

fn check_secret(summary: &mut CheckSummary) {
    println!("🔐 Webhook secret checks\n");

    let secret = generate_webhook_secret_token();
    summary.record(
        "Generated secret is 32 alphanumeric characters",
        secret.len() == 32 && secret.chars().all(|c| c.is_ascii_alphanumeric()),
    );
    summary.record(
        "Generated secrets differ",
        secret != generate_webhook_secret_token(),
    );

    let gate = WebhookSecurityGate::new(Some(&secret));
    let request = |token: Option<&str>| RequestMetadata {
        secret_token: token.map(str::to_string),
        ..Default::default()
    };

    summary.record("Matching secret accepted", gate.verify(&request(Some(&secret))).accepted);
    summary.record(
        "Altered secret rejected",
        !gate.verify(&request(Some(&format!("{}x", secret)))).accepted,
    );
    summary.record("Missing secret rejected", !gate.verify(&request(None)).accepted);

    let open_gate = WebhookSecurityGate::new(None);
    summary.record("Telegram address accepted", open_gate.is_telegram_ip("149.154.160.5"));
    summary.record("Foreign address rejected", !open_gate.is_telegram_ip("8.8.8.8"));
}
