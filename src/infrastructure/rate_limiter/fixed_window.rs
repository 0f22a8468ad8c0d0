//! Fixed Window Rate Limiter
//!
//! Implements dual fixed-window counting (per-minute and per-day) on top of
//! a [`RateLimitStorage`] backend. The limit is inclusive: the request that
//! brings a window to its limit is admitted, the next one is denied.
//! Requests straddling a rollover are judged against the window active at
//! the instant of the check.

use std::sync::Arc;
use tracing::{debug, warn};

use super::storage::{AcquireOutcome, RateLimitStorage, WindowProbe};
use super::types::{RateLimitKey, RateLimitResult, WindowGranularity, current_time_secs};
use crate::config::TierQuota;
use crate::domain::auth::value_objects::AccessTier;

/// Fixed window limiter over both admission granularities
pub struct FixedWindowLimiter {
    storage: Arc<dyn RateLimitStorage>,
    key_prefix: String,
}

impl FixedWindowLimiter {
    /// Create a new fixed window limiter
    pub fn new(storage: Arc<dyn RateLimitStorage>, key_prefix: &str) -> Self {
        Self {
            storage,
            key_prefix: key_prefix.to_string(),
        }
    }

    /// Atomically test-and-increment both windows for `key`.
    ///
    /// Storage failures fail open with full remaining allowance: admission
    /// control degrades to a pass-through rather than taking the service
    /// down with it.
    pub async fn check_and_increment(
        &self,
        key: &RateLimitKey,
        tier: AccessTier,
        quota: &TierQuota,
    ) -> RateLimitResult {
        self.check_and_increment_at(key, tier, quota, current_time_secs())
            .await
    }

    async fn check_and_increment_at(
        &self,
        key: &RateLimitKey,
        tier: AccessTier,
        quota: &TierQuota,
        now_secs: u64,
    ) -> RateLimitResult {
        let base_key = key.to_storage_key(&self.key_prefix);
        let minute = self.probe(&base_key, WindowGranularity::Minute, quota, now_secs);
        let day = self.probe(&base_key, WindowGranularity::Day, quota, now_secs);

        let minute_reset = minute.window_start + WindowGranularity::Minute.window_secs();

        match self.storage.try_acquire(&minute, &day).await {
            Ok(AcquireOutcome::Granted {
                minute_count,
                day_count,
            }) => {
                let remaining = (quota.requests_per_minute - minute_count)
                    .min(quota.requests_per_day - day_count);
                debug!(
                    tier = %tier,
                    minute_count = minute_count,
                    day_count = day_count,
                    "Rate limit check passed"
                );
                RateLimitResult::allowed(quota.requests_per_minute, remaining, minute_reset, tier)
            }
            Ok(AcquireOutcome::Exhausted { granularity, count }) => {
                let reset_at = granularity.window_start(now_secs) + granularity.window_secs();
                let retry_after = reset_at.saturating_sub(now_secs).max(1);
                debug!(
                    tier = %tier,
                    granularity = granularity.as_str(),
                    count = count,
                    retry_after = retry_after,
                    "Rate limit exceeded"
                );
                RateLimitResult::denied(quota.requests_per_minute, reset_at, retry_after, tier)
            }
            Err(e) => {
                warn!("Rate limit storage error, failing open: {}", e);
                RateLimitResult::allowed(
                    quota.requests_per_minute,
                    quota.requests_per_minute,
                    minute_reset,
                    tier,
                )
            }
        }
    }

    fn probe(
        &self,
        base_key: &str,
        granularity: WindowGranularity,
        quota: &TierQuota,
        now_secs: u64,
    ) -> WindowProbe {
        let window_start = granularity.window_start(now_secs);
        let limit = match granularity {
            WindowGranularity::Minute => quota.requests_per_minute,
            WindowGranularity::Day => quota.requests_per_day,
        };
        WindowProbe {
            key: format!(
                "{}:{}:{}",
                base_key,
                granularity.as_str(),
                window_start
            ),
            limit,
            window_start,
            // Counters outlive their window by one extra period so
            // in-flight checks at the boundary never resurrect a key
            ttl_secs: granularity.window_secs() * 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::rate_limiter::storage::InMemoryRateLimitStorage;

    fn limiter() -> FixedWindowLimiter {
        FixedWindowLimiter::new(Arc::new(InMemoryRateLimitStorage::new()), "test:ratelimit")
    }

    fn quota(per_minute: u32, per_day: u32) -> TierQuota {
        TierQuota {
            requests_per_minute: per_minute,
            requests_per_day: per_day,
        }
    }

    #[tokio::test]
    async fn limit_is_inclusive() {
        let limiter = limiter();
        let key = RateLimitKey::Ip("203.0.113.1".to_string());
        let quota = quota(3, 100);
        let now = 1_700_000_000;

        for _ in 0..3 {
            let result = limiter
                .check_and_increment_at(&key, AccessTier::Public, &quota, now)
                .await;
            assert!(result.allowed);
        }

        let denied = limiter
            .check_and_increment_at(&key, AccessTier::Public, &quota, now)
            .await;
        assert!(!denied.allowed);
        assert!(denied.retry_after.unwrap() > 0);
    }

    #[tokio::test]
    async fn window_rollover_readmits() {
        let limiter = limiter();
        let key = RateLimitKey::Ip("203.0.113.2".to_string());
        let quota = quota(1, 100);
        let now = 1_700_000_000;

        assert!(
            limiter
                .check_and_increment_at(&key, AccessTier::Public, &quota, now)
                .await
                .allowed
        );
        assert!(
            !limiter
                .check_and_increment_at(&key, AccessTier::Public, &quota, now + 30)
                .await
                .allowed
        );

        // Next minute window
        let rolled = limiter
            .check_and_increment_at(&key, AccessTier::Public, &quota, now + 60)
            .await;
        assert!(rolled.allowed);
    }

    #[tokio::test]
    async fn day_window_outlives_minute_rollover() {
        let limiter = limiter();
        let key = RateLimitKey::Credential("deadbeef".to_string());
        let quota = quota(10, 2);
        let now = 1_700_000_000;

        assert!(
            limiter
                .check_and_increment_at(&key, AccessTier::Keyed, &quota, now)
                .await
                .allowed
        );
        assert!(
            limiter
                .check_and_increment_at(&key, AccessTier::Keyed, &quota, now + 60)
                .await
                .allowed
        );

        let denied = limiter
            .check_and_increment_at(&key, AccessTier::Keyed, &quota, now + 120)
            .await;
        assert!(!denied.allowed);
        // Denied by the day window, so the reset is the day boundary
        assert!(denied.reset_at > now + 3600);
    }

    #[tokio::test]
    async fn remaining_counts_down() {
        let limiter = limiter();
        let key = RateLimitKey::Ip("203.0.113.3".to_string());
        let quota = quota(5, 100);
        let now = 1_700_000_000;

        let first = limiter
            .check_and_increment_at(&key, AccessTier::Public, &quota, now)
            .await;
        assert_eq!(first.remaining, 4);

        let second = limiter
            .check_and_increment_at(&key, AccessTier::Public, &quota, now)
            .await;
        assert_eq!(second.remaining, 3);
        assert_eq!(second.limit, 5);
        assert_eq!(second.reset_at, 1_700_000_040);
    }
}
