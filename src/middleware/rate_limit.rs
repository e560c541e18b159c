//! Rate limiting middleware
//!
//! Per-client-IP quota for the webhook endpoint so a flood from one address
//! cannot starve the dispatch chain.

use std::net::IpAddr;
use std::num::NonZeroU32;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::utils::errors::{Result, TorahBotError};

#[derive(Debug)]
pub struct WebhookRateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
}

impl WebhookRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Result<Self> {
        let per_minute = NonZeroU32::new(config.requests_per_minute).ok_or_else(|| {
            TorahBotError::Config("rate_limit.requests_per_minute must be positive".to_string())
        })?;
        let burst = NonZeroU32::new(config.burst_size).ok_or_else(|| {
            TorahBotError::Config("rate_limit.burst_size must be positive".to_string())
        })?;

        Ok(Self {
            limiter: RateLimiter::keyed(Quota::per_minute(per_minute).allow_burst(burst)),
        })
    }

    /// Returns false once `client_ip` exhausted its quota
    pub fn check(&self, client_ip: IpAddr) -> bool {
        match self.limiter.check_key(&client_ip) {
            Ok(()) => {
                debug!(client_ip = %client_ip, "Rate limit check passed");
                true
            }
            Err(_) => {
                warn!(client_ip = %client_ip, "Rate limit exceeded");
                false
            }
        }
    }

    /// Drop state for clients that are back under their quota
    pub fn cleanup(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}
