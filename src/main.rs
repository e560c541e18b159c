//! Torah Bot
//!
//! Main application entry point

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use teloxide::Bot;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use torah_bot::{
    config::Settings,
    database::{bootstrap_schema, create_pool, DatabaseService},
    handlers::{default_router, HandlerContext},
    server::{self, AppState},
    services::{
        build_bot, register_webhook, AuditLogService, BackupManager, BotConfigurationService,
        BroadcastScheduler, BroadcastService, MenuButtonService, NewsletterManager,
        ServiceRegistry, AUDIT_SERVICE, BACKUP_SERVICE, BOT_CONFIGURATION_SERVICE,
        BROADCAST_SERVICE, MENU_BUTTON_SERVICE, NEWSLETTER_SERVICE, SCHEDULER_SERVICE,
    },
    utils::logging,
};

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("Failed to load settings")?;
    settings.validate()?;

    // Initialize logging; the guard flushes the log file on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", torah_bot::info());

    let bot = build_bot(&settings)?;
    let registry = Arc::new(ServiceRegistry::new());

    register_services(&settings, &bot, &registry).await?;
    configure_telegram(&settings, &bot, &registry).await;

    if settings.features.broadcast_scheduler {
        match registry.get_service::<BroadcastScheduler>(SCHEDULER_SERVICE) {
            Ok(scheduler) => scheduler.start().await,
            Err(e) => warn!(error = %e, "Broadcast scheduler unavailable"),
        }
    }

    let ctx = HandlerContext::new(bot, registry.clone());
    let state = AppState::new(&settings, default_router(ctx), registry.clone())?;

    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            rate_limiter.cleanup();
        }
    });

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Torah Bot is ready!");
    server::serve(listener, state).await?;

    registry.cleanup().await;
    info!("Torah Bot has been shut down.");

    Ok(())
}

/// Register the shared services. Without a database the bot still answers,
/// only the newsletter features are missing.
async fn register_services(settings: &Settings, bot: &Bot, registry: &ServiceRegistry) -> anyhow::Result<()> {
    match connect_newsletter(settings).await {
        Ok(newsletter) => {
            let newsletter = Arc::new(newsletter);
            let broadcaster = Arc::new(BroadcastService::new(
                bot.clone(),
                newsletter.clone(),
                Duration::from_millis(settings.newsletter.delivery_delay_ms),
            ));

            registry.register_service(
                BACKUP_SERVICE,
                Arc::new(BackupManager::new(
                    newsletter.database().pool().clone(),
                    &settings.backup,
                )),
            );
            registry.register_service(
                SCHEDULER_SERVICE,
                Arc::new(BroadcastScheduler::new(
                    newsletter.clone(),
                    broadcaster.clone(),
                    Duration::from_secs(settings.newsletter.scheduler_interval_secs),
                )),
            );
            registry.register_service(BROADCAST_SERVICE, broadcaster);
            registry.register_service(NEWSLETTER_SERVICE, newsletter);
        }
        Err(e) => error!(error = %e, "Newsletter database unavailable, continuing without it"),
    }

    registry.register_service(
        MENU_BUTTON_SERVICE,
        Arc::new(MenuButtonService::new(bot.clone(), &settings.menu_button)?),
    );
    registry.register_service(
        AUDIT_SERVICE,
        Arc::new(AuditLogService::new(bot.clone(), settings.bot.log_chat_id)),
    );
    registry.register_service(
        BOT_CONFIGURATION_SERVICE,
        Arc::new(BotConfigurationService::new(bot.clone())),
    );

    info!(services = ?registry.list_services(), "Services registered");
    Ok(())
}

async fn connect_newsletter(settings: &Settings) -> torah_bot::Result<NewsletterManager> {
    info!("Connecting to database...");
    let pool = create_pool(&settings.database).await?;

    info!("Applying newsletter schema...");
    let report = bootstrap_schema(&pool).await?;
    if !report.is_complete() {
        warn!(
            missing_tables = ?report.missing_tables,
            missing_views = ?report.missing_views,
            "Newsletter schema is incomplete"
        );
    }

    NewsletterManager::new(DatabaseService::new(pool), settings)
}

/// Profile, menu button and webhook registration. Failures are logged.
async fn configure_telegram(settings: &Settings, bot: &Bot, registry: &ServiceRegistry) {
    if settings.features.configure_bot_profile {
        if let Ok(service) = registry.get_service::<BotConfigurationService>(BOT_CONFIGURATION_SERVICE) {
            let report = service.configure_profile().await;
            if !report.all_ok() {
                warn!(?report, "Bot profile partially configured");
            }
        }
    }

    if settings.features.menu_button {
        if let Ok(service) = registry.get_service::<MenuButtonService>(MENU_BUTTON_SERVICE) {
            service.set_webapp_menu_button(None).await;
        }
    }

    if settings.features.register_webhook {
        if let Some(webhook_url) = &settings.bot.webhook_url {
            if let Err(e) = register_webhook(bot, webhook_url, settings.webhook_secret()).await {
                error!(error = %e, "Failed to register webhook");
            }
        }
    }
}
