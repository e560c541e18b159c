//! Middleware module
//!
//! This module contains the checks applied to inbound webhook requests

pub mod rate_limit;
pub mod webhook_security;

// Re-export commonly used middleware
pub use rate_limit::WebhookRateLimiter;
pub use webhook_security::{
    generate_webhook_secret_token, RequestMetadata, VerificationMethod, VerificationOutcome,
    WebhookSecurityGate,
};
