//! Webhook request verification
//!
//! Decides whether an inbound webhook call really comes from Telegram. With a
//! configured secret the `X-Telegram-Bot-Api-Secret-Token` header must match;
//! without one the client address must fall inside Telegram's published
//! ranges. Only headers and transport metadata are consulted, never the body.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use sha2::Sha256;
use tracing::debug;

use crate::utils::errors::TorahBotError;
use crate::utils::logging::log_security_event;

type HmacSha256 = Hmac<Sha256>;

pub const SECRET_TOKEN_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Networks Telegram delivers webhooks from
pub const TELEGRAM_IP_RANGES: &[&str] = &[
    "149.154.160.0/20",
    "91.108.4.0/22",
    "91.108.8.0/22",
    "91.108.12.0/22",
    "91.108.16.0/22",
    "91.108.56.0/22",
    "95.161.64.0/20",
    "2001:67c:4e8::/48",
    "2001:b28:f23d::/48",
    "2001:b28:f23f::/48",
];

/// A CIDR block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpRange {
    network: IpAddr,
    prefix: u8,
}

impl IpRange {
    pub fn contains(&self, addr: &IpAddr) -> bool {
        match (self.network, addr) {
            (IpAddr::V4(network), IpAddr::V4(addr)) => {
                let mask = u32::MAX.checked_shl(32 - u32::from(self.prefix)).unwrap_or(0);
                u32::from(network) & mask == u32::from(*addr) & mask
            }
            (IpAddr::V6(network), IpAddr::V6(addr)) => {
                let mask = u128::MAX
                    .checked_shl(128 - u32::from(self.prefix))
                    .unwrap_or(0);
                u128::from(network) & mask == u128::from(*addr) & mask
            }
            _ => false,
        }
    }
}

impl FromStr for IpRange {
    type Err = TorahBotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TorahBotError::InvalidInput(format!("Invalid CIDR range: {}", s));

        let (address, prefix) = s.split_once('/').ok_or_else(invalid)?;
        let network: IpAddr = address.trim().parse().map_err(|_| invalid())?;
        let prefix: u8 = prefix.trim().parse().map_err(|_| invalid())?;

        let max_prefix = if network.is_ipv4() { 32 } else { 128 };
        if prefix > max_prefix {
            return Err(invalid());
        }

        Ok(Self { network, prefix })
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

/// Request facts the gate is allowed to look at
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    pub secret_token: Option<String>,
    pub forwarded_for: Option<String>,
    pub real_ip: Option<String>,
    pub user_agent: Option<String>,
    pub peer_addr: Option<IpAddr>,
}

impl RequestMetadata {
    pub fn from_headers(headers: &HeaderMap, peer_addr: Option<IpAddr>) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.to_string())
        };

        Self {
            secret_token: header(SECRET_TOKEN_HEADER),
            forwarded_for: header("x-forwarded-for"),
            real_ip: header("x-real-ip"),
            user_agent: header("user-agent"),
            peer_addr,
        }
    }

    /// First `X-Forwarded-For` hop, else `X-Real-IP`, else the peer address
    pub fn client_ip(&self) -> Option<String> {
        let forwarded = self
            .forwarded_for
            .as_deref()
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        forwarded
            .or_else(|| {
                self.real_ip
                    .as_deref()
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
            })
            .map(str::to_string)
            .or_else(|| self.peer_addr.map(|addr| addr.to_string()))
    }

    /// Client address as used for rate limiting, when it parses
    pub fn client_addr(&self) -> Option<IpAddr> {
        self.client_ip().and_then(|ip| ip.parse().ok())
    }

    pub fn user_agent_or_unknown(&self) -> &str {
        self.user_agent.as_deref().unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMethod {
    SecretToken,
    IpAllowList,
}

impl fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationMethod::SecretToken => write!(f, "secret_token"),
            VerificationMethod::IpAllowList => write!(f, "ip_allow_list"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub accepted: bool,
    pub method: VerificationMethod,
    pub reason: String,
}

struct SecretCheck {
    key: [u8; 32],
    expected_tag: Vec<u8>,
}

impl SecretCheck {
    fn new(secret: &str) -> Self {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        let expected_tag = Self::tag(&key, secret.as_bytes());
        Self { key, expected_tag }
    }

    fn tag(key: &[u8], value: &[u8]) -> Vec<u8> {
        let mut mac = Self::mac(key);
        mac.update(value);
        mac.finalize().into_bytes().to_vec()
    }

    fn mac(key: &[u8]) -> HmacSha256 {
        // HMAC takes keys of any length
        match HmacSha256::new_from_slice(key) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC accepts keys of any size"),
        }
    }

    /// Constant-time comparison of `received` against the configured secret
    fn matches(&self, received: &str) -> bool {
        let mut mac = Self::mac(&self.key);
        mac.update(received.as_bytes());
        mac.verify_slice(&self.expected_tag).is_ok()
    }
}

pub struct WebhookSecurityGate {
    secret: Option<SecretCheck>,
    allowed_ranges: Vec<IpRange>,
}

impl WebhookSecurityGate {
    /// An empty secret counts as no secret
    pub fn new(secret: Option<&str>) -> Self {
        let allowed_ranges = TELEGRAM_IP_RANGES
            .iter()
            .filter_map(|range| range.parse().ok())
            .collect();

        Self {
            secret: secret.filter(|s| !s.is_empty()).map(SecretCheck::new),
            allowed_ranges,
        }
    }

    pub fn method(&self) -> VerificationMethod {
        if self.secret.is_some() {
            VerificationMethod::SecretToken
        } else {
            VerificationMethod::IpAllowList
        }
    }

    /// Whether `ip` belongs to one of Telegram's networks
    pub fn is_telegram_ip(&self, ip: &str) -> bool {
        match ip.trim().parse::<IpAddr>() {
            Ok(addr) => self.allowed_ranges.iter().any(|range| range.contains(&addr)),
            Err(_) => false,
        }
    }

    /// Accept or reject a webhook request. Rejections are written to the
    /// security log.
    pub fn verify(&self, request: &RequestMetadata) -> VerificationOutcome {
        let outcome = match &self.secret {
            Some(check) => self.verify_secret(check, request),
            None => self.verify_ip(request),
        };

        if outcome.accepted {
            debug!(method = %outcome.method, "Webhook request verified");
        } else {
            let client_ip = request.client_ip().unwrap_or_else(|| "unknown".to_string());
            log_security_event(
                "WEBHOOK_AUTH_FAILED",
                &client_ip,
                request.user_agent_or_unknown(),
                &outcome.reason,
            );
        }

        outcome
    }

    fn verify_secret(&self, check: &SecretCheck, request: &RequestMetadata) -> VerificationOutcome {
        let (accepted, reason) = match request.secret_token.as_deref() {
            None => (false, "missing secret token header"),
            Some(token) if check.matches(token) => (true, "secret token matched"),
            Some(_) => (false, "secret token mismatch"),
        };

        VerificationOutcome {
            accepted,
            method: VerificationMethod::SecretToken,
            reason: reason.to_string(),
        }
    }

    fn verify_ip(&self, request: &RequestMetadata) -> VerificationOutcome {
        let (accepted, reason) = match request.client_ip() {
            None => (false, "client IP unavailable".to_string()),
            Some(ip) if ip.parse::<IpAddr>().is_err() => {
                (false, format!("unparsable client IP {}", ip))
            }
            Some(ip) if self.is_telegram_ip(&ip) => {
                (true, format!("{} is in a Telegram range", ip))
            }
            Some(ip) => (false, format!("{} is outside Telegram ranges", ip)),
        };

        VerificationOutcome {
            accepted,
            method: VerificationMethod::IpAllowList,
            reason,
        }
    }
}

/// Random 32-character alphanumeric token suitable for `setWebhook`
pub fn generate_webhook_secret_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_token(token: Option<&str>) -> RequestMetadata {
        RequestMetadata {
            secret_token: token.map(str::to_string),
            ..Default::default()
        }
    }

    fn from_ip(ip: &str) -> RequestMetadata {
        RequestMetadata {
            forwarded_for: Some(ip.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_secret_token_verification() {
        let gate = WebhookSecurityGate::new(Some("abc123"));

        assert!(gate.verify(&with_token(Some("abc123"))).accepted);
        assert!(!gate.verify(&with_token(Some("abc124"))).accepted);
        assert!(!gate.verify(&with_token(None)).accepted);
        assert!(!gate.verify(&with_token(Some(""))).accepted);
    }

    #[test]
    fn test_secret_mode_ignores_ip() {
        let gate = WebhookSecurityGate::new(Some("abc123"));
        let mut request = from_ip("149.154.160.5");
        request.secret_token = Some("wrong".to_string());

        let outcome = gate.verify(&request);
        assert!(!outcome.accepted);
        assert_eq!(outcome.method, VerificationMethod::SecretToken);
    }

    #[test]
    fn test_ip_allow_list() {
        let gate = WebhookSecurityGate::new(None);

        assert!(gate.verify(&from_ip("149.154.160.5")).accepted);
        assert!(gate.verify(&from_ip("91.108.56.200")).accepted);
        assert!(gate.verify(&from_ip("2001:b28:f23d::1")).accepted);
        assert!(!gate.verify(&from_ip("8.8.8.8")).accepted);
        assert!(!gate.verify(&from_ip("not-an-ip")).accepted);
        assert!(!gate.verify(&RequestMetadata::default()).accepted);
    }

    #[test]
    fn test_empty_secret_falls_back_to_ip_check() {
        let gate = WebhookSecurityGate::new(Some(""));
        assert_eq!(gate.method(), VerificationMethod::IpAllowList);
    }

    #[test]
    fn test_client_ip_resolution_order() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("91.108.4.1"));
        let peer: IpAddr = "127.0.0.1".parse().unwrap();

        let request = RequestMetadata::from_headers(&headers, Some(peer));
        assert_eq!(request.client_ip().as_deref(), Some("91.108.4.1"));

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("149.154.167.99, 10.0.0.1"),
        );
        let request = RequestMetadata::from_headers(&headers, Some(peer));
        assert_eq!(request.client_ip().as_deref(), Some("149.154.167.99"));

        let request = RequestMetadata::from_headers(&HeaderMap::new(), Some(peer));
        assert_eq!(request.client_ip().as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn test_secret_header_is_read() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-telegram-bot-api-secret-token",
            HeaderValue::from_static("abc123"),
        );

        let request = RequestMetadata::from_headers(&headers, None);
        assert_eq!(request.secret_token.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_ip_range_parsing() {
        let range: IpRange = "91.108.4.0/22".parse().unwrap();
        assert!(range.contains(&"91.108.7.255".parse().unwrap()));
        assert!(!range.contains(&"91.108.8.0".parse().unwrap()));
        assert!(!range.contains(&"2001:67c:4e8::1".parse().unwrap()));
        assert_eq!(range.to_string(), "91.108.4.0/22");

        assert!("91.108.4.0".parse::<IpRange>().is_err());
        assert!("91.108.4.0/33".parse::<IpRange>().is_err());
        assert!("0.0.0.0/0".parse::<IpRange>().unwrap().contains(&"8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn test_generated_secret_token() {
        let token = generate_webhook_secret_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_webhook_secret_token());
    }
}
