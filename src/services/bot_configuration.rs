//! Bot profile configuration
//!
//! Sets the description, short description and command list shown in the
//! Telegram bot profile and search listings.

use teloxide::prelude::*;
use teloxide::types::BotCommand;
use tracing::{error, info};

use crate::services::registry::ManagedService;

/// Registry name of the shared [`BotConfigurationService`]
pub const BOT_CONFIGURATION_SERVICE: &str = "bot_configuration";

pub const BOT_DESCRIPTION: &str = "🎮 Torah Bot: AI-powered Jewish wisdom education with interactive \
Shabbat Runner Mini App game. Learn Torah with AI Rabbi, take quizzes, and play educational games. \
Perfect for Jewish learning and Shabbat preparation!";

pub const BOT_SHORT_DESCRIPTION: &str = "🕯️ AI Torah wisdom + Shabbat Runner game 🎮";

/// `(command, description)` pairs for the command menu
pub const BOT_COMMANDS: &[(&str, &str)] = &[
    ("start", "🏠 Start Torah Bot"),
    ("wisdom", "🧠 Get AI Torah wisdom"),
    ("quiz", "❓ Take Torah quiz"),
    ("game", "🎮 Play Shabbat Runner"),
    ("help", "❓ Get help"),
];

/// Which profile updates Telegram accepted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileReport {
    pub description: bool,
    pub short_description: bool,
    pub commands: bool,
}

impl ProfileReport {
    pub fn all_ok(&self) -> bool {
        self.description && self.short_description && self.commands
    }
}

pub struct BotConfigurationService {
    bot: Bot,
}

impl BotConfigurationService {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn commands() -> Vec<BotCommand> {
        BOT_COMMANDS
            .iter()
            .map(|(command, description)| BotCommand::new(*command, *description))
            .collect()
    }

    /// Apply description, short description and commands. Each step is
    /// attempted even when an earlier one failed.
    pub async fn configure_profile(&self) -> ProfileReport {
        let report = ProfileReport {
            description: self.set_description(BOT_DESCRIPTION).await,
            short_description: self.set_short_description(BOT_SHORT_DESCRIPTION).await,
            commands: self.set_commands(Self::commands()).await,
        };

        if report.all_ok() {
            info!("Bot profile configured");
        } else {
            error!(?report, "Bot profile partially configured");
        }

        report
    }

    pub async fn set_description(&self, description: &str) -> bool {
        match self
            .bot
            .set_my_description()
            .description(description.to_string())
            .await
        {
            Ok(_) => {
                info!("Bot description set");
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to set bot description");
                false
            }
        }
    }

    pub async fn set_short_description(&self, short_description: &str) -> bool {
        match self
            .bot
            .set_my_short_description()
            .short_description(short_description.to_string())
            .await
        {
            Ok(_) => {
                info!("Bot short description set");
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to set bot short description");
                false
            }
        }
    }

    pub async fn set_commands(&self, commands: Vec<BotCommand>) -> bool {
        let count = commands.len();
        match self.bot.set_my_commands(commands).await {
            Ok(_) => {
                info!(count, "Bot commands set");
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to set bot commands");
                false
            }
        }
    }
}

impl ManagedService for BotConfigurationService {}
