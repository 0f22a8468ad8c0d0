//! Rate Limiter Service
//!
//! The admission-control entry point: resolves the quota for a tier and
//! runs the atomic dual-window check against the configured storage
//! backend.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, warn};

use super::fixed_window::FixedWindowLimiter;
use super::storage::{InMemoryRateLimitStorage, RateLimitStorage, RedisRateLimitStorage};
use super::types::{RateLimitKey, RateLimitResult};
use crate::config::{RateLimitConfig, RateLimitStorageBackend, TierQuota};
use crate::domain::auth::value_objects::AccessTier;

/// Main rate limiter service
pub struct RateLimiterService {
    limiter: FixedWindowLimiter,
    storage: Arc<dyn RateLimitStorage>,
    config: RateLimitConfig,
}

impl RateLimiterService {
    /// Create a new rate limiter service against the shared store URL.
    ///
    /// Falls back to in-memory storage when the shared store is
    /// unreachable; multi-instance deployments then enforce per-instance
    /// rather than global quotas until connectivity returns.
    pub async fn new_with_url(config: RateLimitConfig, url: &str) -> Self {
        let storage: Arc<dyn RateLimitStorage> = match config.storage_backend {
            RateLimitStorageBackend::Redis => match RedisRateLimitStorage::new(url).await {
                Ok(storage) => {
                    info!("Rate limiter using Redis storage backend at {}", url);
                    Arc::new(storage)
                }
                Err(e) => {
                    warn!(
                        "Failed to connect to Redis for rate limiting, falling back to in-memory: {}",
                        e
                    );
                    Arc::new(InMemoryRateLimitStorage::new())
                }
            },
            RateLimitStorageBackend::Memory => {
                info!("Rate limiter using in-memory storage backend");
                Arc::new(InMemoryRateLimitStorage::new())
            }
        };

        Self::with_storage(storage, config)
    }

    /// Create with a custom storage backend (for testing)
    pub fn with_storage(storage: Arc<dyn RateLimitStorage>, config: RateLimitConfig) -> Self {
        let limiter = FixedWindowLimiter::new(Arc::clone(&storage), "ratelimit");

        Self {
            limiter,
            storage,
            config,
        }
    }

    /// Check if rate limiting is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// The quota applied to a tier
    pub fn quota_for(&self, tier: AccessTier) -> TierQuota {
        match tier {
            AccessTier::Public => self.config.tiers.public,
            AccessTier::Keyed => self.config.tiers.keyed,
            AccessTier::Partner => self.config.tiers.partner,
        }
    }

    /// Atomically test-and-increment the per-minute and per-day counters
    /// for `key` against `tier`'s quota.
    pub async fn check_and_increment(
        &self,
        key: &RateLimitKey,
        tier: AccessTier,
    ) -> RateLimitResult {
        if !self.config.enabled {
            return RateLimitResult::allowed(u32::MAX, u32::MAX, 0, tier);
        }

        let quota = self.quota_for(tier);
        self.limiter.check_and_increment(key, tier, &quota).await
    }

    /// Start the cleanup task for in-memory storage
    pub fn start_cleanup_task(self: Arc<Self>) {
        let cleanup_interval = Duration::from_secs(self.config.cleanup_interval_seconds);

        tokio::spawn(async move {
            let mut interval = interval(cleanup_interval);

            loop {
                interval.tick().await;
                self.storage.cleanup().await;
                debug!("Rate limiter cleanup completed");
            }
        });
    }

    /// Get the configuration
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}
