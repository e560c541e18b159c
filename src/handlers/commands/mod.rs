//! Command handlers module
//!
//! This module contains handlers for bot commands like /start, /stats and
//! the administrator commands.

pub mod admin;
pub mod game;
pub mod help;
pub mod start;
pub mod stats;
pub mod subscription;

pub use admin::{AdminCommand, AdminHandler};
pub use game::GameHandler;
pub use help::HelpHandler;
pub use start::StartHandler;
pub use stats::StatsHandler;
pub use subscription::{SubscribeHandler, UnsubscribeHandler};
