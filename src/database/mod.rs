//! Database module
//!
//! This module handles database connections, schema bootstrap and data access

pub mod connection;
pub mod repositories;
pub mod schema;
pub mod service;

// Re-export commonly used database components
pub use connection::{create_pool, health_check, DatabasePool};
pub use repositories::{AdminRepository, BroadcastRepository, SubscriptionRepository, UserRepository};
pub use schema::{bootstrap_schema, split_schema_sections, SchemaReport};
pub use service::DatabaseService;
