//! Services module
//!
//! This module contains business logic services and the registry that
//! shares them between the webhook server and the handlers.

pub mod audit;
pub mod backup;
pub mod bot_configuration;
pub mod broadcast;
pub mod menu_button;
pub mod newsletter;
pub mod registry;
pub mod scheduler;
pub mod telegram;

// Re-export commonly used services
pub use audit::{AuditLogService, AUDIT_SERVICE};
pub use backup::{BackupInfo, BackupManager, BackupStats, BACKUP_SERVICE};
pub use bot_configuration::{BotConfigurationService, ProfileReport, BOT_CONFIGURATION_SERVICE};
pub use broadcast::{BroadcastService, DeliveryErrorKind, DeliverySummary, BROADCAST_SERVICE};
pub use menu_button::{MenuButtonService, MENU_BUTTON_SERVICE};
pub use newsletter::{format_analytics, AutoSubscription, NewsletterManager, NEWSLETTER_SERVICE};
pub use registry::{ManagedService, ServiceRegistry};
pub use scheduler::{BroadcastScheduler, ScheduledRun, SCHEDULER_SERVICE};
pub use telegram::{build_bot, register_webhook};
