//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod admin;
pub mod newsletter;
pub mod user;
pub mod user_context;

// Re-export commonly used models
pub use admin::{AdminPermissions, AdminUser, CreateAdminRequest};
pub use newsletter::{
    AnalyticsOverview, Broadcast, BroadcastContent, BroadcastStatistics, BroadcastStatus,
    DeliveryRecord, DeliveryStatus, LanguageStats, NewsletterAnalytics, SubscribeRequest,
    SubscriberStats, Subscription, WisdomContent,
};
pub use user::{ActivityType, UpsertUserRequest, User};
pub use user_context::UserContext;
