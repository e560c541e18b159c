//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod admin;
pub mod broadcast;
pub mod subscription;
pub mod user;

// Re-export repositories
pub use admin::AdminRepository;
pub use broadcast::BroadcastRepository;
pub use subscription::SubscriptionRepository;
pub use user::UserRepository;
