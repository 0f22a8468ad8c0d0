//! Rate limiter types and core data structures

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::domain::auth::value_objects::AccessTier;

/// Counting interval for a rate window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowGranularity {
    Minute,
    Day,
}

impl WindowGranularity {
    /// Window size in seconds
    pub fn window_secs(&self) -> u64 {
        match self {
            WindowGranularity::Minute => 60,
            WindowGranularity::Day => 86_400,
        }
    }

    /// Short name used in storage keys and log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowGranularity::Minute => "min",
            WindowGranularity::Day => "day",
        }
    }

    /// Start of the window containing `now_secs`
    pub fn window_start(&self, now_secs: u64) -> u64 {
        now_secs - (now_secs % self.window_secs())
    }
}

/// Key used to identify rate limit buckets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateLimitKey {
    /// Rate limit by credential hash (keyed and partner tiers)
    Credential(String),
    /// Rate limit by caller address (public tier)
    Ip(String),
}

impl RateLimitKey {
    /// Convert to a storage-compatible key string
    pub fn to_storage_key(&self, prefix: &str) -> String {
        match self {
            RateLimitKey::Credential(hash) => format!("{}:cred:{}", prefix, hash),
            RateLimitKey::Ip(ip) => format!("{}:ip:{}", prefix, ip),
        }
    }
}

/// Result of a rate limit check
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Maximum requests allowed in the current minute window
    pub limit: u32,
    /// Remaining requests before the next denial
    pub remaining: u32,
    /// Unix timestamp when the governing window resets
    pub reset_at: u64,
    /// Retry-After duration in seconds (only set when denied)
    pub retry_after: Option<u64>,
    /// The tier that was applied
    pub tier: AccessTier,
}

impl RateLimitResult {
    /// Create a new allowed result
    pub fn allowed(limit: u32, remaining: u32, reset_at: u64, tier: AccessTier) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            reset_at,
            retry_after: None,
            tier,
        }
    }

    /// Create a new denied result
    pub fn denied(limit: u32, reset_at: u64, retry_after: u64, tier: AccessTier) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            reset_at,
            retry_after: Some(retry_after),
            tier,
        }
    }
}

/// Fixed window counter state for one (identity, granularity) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowState {
    /// Start of the window this count belongs to (Unix seconds)
    pub window_start: u64,
    /// Requests admitted in the window; never exceeds the tier limit
    pub count: u32,
}

/// Get current time in seconds since Unix epoch
pub fn current_time_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_starts_align_to_granularity() {
        let now = 1_700_000_123;
        assert_eq!(WindowGranularity::Minute.window_start(now) % 60, 0);
        assert_eq!(WindowGranularity::Day.window_start(now) % 86_400, 0);
        assert!(WindowGranularity::Minute.window_start(now) <= now);
    }

    #[test]
    fn storage_keys_embed_identity_kind() {
        let cred = RateLimitKey::Credential("abcd1234".to_string());
        assert_eq!(
            cred.to_storage_key("ratelimit"),
            "ratelimit:cred:abcd1234"
        );
        let ip = RateLimitKey::Ip("203.0.113.9".to_string());
        assert_eq!(ip.to_storage_key("ratelimit"), "ratelimit:ip:203.0.113.9");
    }

    #[test]
    fn result_constructors() {
        let allowed = RateLimitResult::allowed(10, 4, 1_700_000_160, AccessTier::Keyed);
        assert!(allowed.allowed);
        assert!(allowed.retry_after.is_none());

        let denied = RateLimitResult::denied(10, 1_700_000_160, 37, AccessTier::Public);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.retry_after, Some(37));
    }
}
