//! Rate Limit Storage Backends
//!
//! Provides storage implementations for windowed admission counters:
//! - Redis for distributed, multi-instance deployments
//! - In-memory for development and single-instance deployments
//!
//! Both backends perform the dual-window test-and-increment as one atomic
//! operation: a denied request increments nothing, and counters never
//! exceed their limits.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::types::{WindowGranularity, WindowState, current_time_secs};

/// One window of a dual-window probe
#[derive(Debug, Clone)]
pub struct WindowProbe {
    /// Full storage key, including the window start
    pub key: String,
    /// Admission ceiling for this window
    pub limit: u32,
    /// Start of the window being probed (Unix seconds)
    pub window_start: u64,
    /// How long the counter may outlive its window
    pub ttl_secs: u64,
}

/// Outcome of an atomic dual-window test-and-increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Both windows had room; both counters were incremented
    Granted { minute_count: u32, day_count: u32 },
    /// One window was already at its limit; nothing was incremented
    Exhausted {
        granularity: WindowGranularity,
        count: u32,
    },
}

/// Trait for rate limit storage backends
#[async_trait]
pub trait RateLimitStorage: Send + Sync {
    /// Atomically test-and-increment the minute and day counters.
    /// Increments happen only when both windows have room.
    async fn try_acquire(
        &self,
        minute: &WindowProbe,
        day: &WindowProbe,
    ) -> Result<AcquireOutcome, String>;

    /// Cleanup expired entries (for in-memory storage)
    async fn cleanup(&self);
}

/// The check-and-increment runs server-side so concurrent requests for the
/// same identity cannot jointly exceed a limit.
const ACQUIRE_SCRIPT: &str = r#"
local minute_limit = tonumber(ARGV[1])
local day_limit = tonumber(ARGV[2])
local minute_count = tonumber(redis.call('GET', KEYS[1]) or '0')
local day_count = tonumber(redis.call('GET', KEYS[2]) or '0')
if minute_count >= minute_limit then
  return {0, 0, minute_count}
end
if day_count >= day_limit then
  return {0, 1, day_count}
end
minute_count = redis.call('INCR', KEYS[1])
if minute_count == 1 then
  redis.call('EXPIRE', KEYS[1], tonumber(ARGV[3]))
end
day_count = redis.call('INCR', KEYS[2])
if day_count == 1 then
  redis.call('EXPIRE', KEYS[2], tonumber(ARGV[4]))
end
return {1, minute_count, day_count}
"#;

/// Redis storage backend
pub struct RedisRateLimitStorage {
    connection_manager: Arc<ConnectionManager>,
    acquire: redis::Script,
}

impl RedisRateLimitStorage {
    /// Create a new Redis storage backend
    pub async fn new(url: &str) -> Result<Self, String> {
        let client = redis::Client::open(url).map_err(|e| {
            warn!("Failed to create Redis client for rate limiting: {}", e);
            format!("Failed to create Redis client: {}", e)
        })?;

        let connection_manager = ConnectionManager::new(client).await.map_err(|e| {
            warn!(
                "Failed to create connection manager for rate limiting: {}",
                e
            );
            format!("Failed to create connection manager: {}", e)
        })?;

        // Test connection
        let mut conn = connection_manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| {
                warn!("Failed to ping Redis for rate limiting: {}", e);
                format!("Failed to ping Redis: {}", e)
            })?;

        debug!("Successfully connected to Redis for rate limiting");

        Ok(Self {
            connection_manager: Arc::new(connection_manager),
            acquire: redis::Script::new(ACQUIRE_SCRIPT),
        })
    }
}

#[async_trait]
impl RateLimitStorage for RedisRateLimitStorage {
    async fn try_acquire(
        &self,
        minute: &WindowProbe,
        day: &WindowProbe,
    ) -> Result<AcquireOutcome, String> {
        let mut conn = (*self.connection_manager).clone();

        let reply: Vec<i64> = self
            .acquire
            .key(&minute.key)
            .key(&day.key)
            .arg(minute.limit)
            .arg(day.limit)
            .arg(minute.ttl_secs)
            .arg(day.ttl_secs)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| format!("Redis EVAL error: {}", e))?;

        match reply.as_slice() {
            [1, minute_count, day_count] => Ok(AcquireOutcome::Granted {
                minute_count: *minute_count as u32,
                day_count: *day_count as u32,
            }),
            [0, which, count] => {
                let granularity = if *which == 0 {
                    WindowGranularity::Minute
                } else {
                    WindowGranularity::Day
                };
                Ok(AcquireOutcome::Exhausted {
                    granularity,
                    count: *count as u32,
                })
            }
            other => Err(format!("unexpected script reply: {:?}", other)),
        }
    }

    async fn cleanup(&self) {
        // Redis handles TTL-based cleanup automatically
    }
}

/// In-memory storage entry with expiration
#[derive(Clone)]
struct MemoryEntry {
    state: WindowState,
    expires_at: u64,
}

/// In-memory storage backend for development/single instance.
///
/// A single mutex over all windows makes the dual-window probe atomic.
pub struct InMemoryRateLimitStorage {
    windows: Arc<Mutex<HashMap<String, MemoryEntry>>>,
}

impl InMemoryRateLimitStorage {
    /// Create a new in-memory storage backend
    pub fn new() -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count in the probed window; a stored entry from an older window
    /// counts as zero (rollover)
    fn effective_count(entry: Option<&MemoryEntry>, window_start: u64) -> u32 {
        match entry {
            Some(entry) if entry.state.window_start == window_start => entry.state.count,
            _ => 0,
        }
    }
}

impl Default for InMemoryRateLimitStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimitStorage for InMemoryRateLimitStorage {
    async fn try_acquire(
        &self,
        minute: &WindowProbe,
        day: &WindowProbe,
    ) -> Result<AcquireOutcome, String> {
        let mut windows = self.windows.lock().await;

        let minute_count = Self::effective_count(windows.get(&minute.key), minute.window_start);
        let day_count = Self::effective_count(windows.get(&day.key), day.window_start);

        if minute_count >= minute.limit {
            return Ok(AcquireOutcome::Exhausted {
                granularity: WindowGranularity::Minute,
                count: minute_count,
            });
        }
        if day_count >= day.limit {
            return Ok(AcquireOutcome::Exhausted {
                granularity: WindowGranularity::Day,
                count: day_count,
            });
        }

        windows.insert(
            minute.key.clone(),
            MemoryEntry {
                state: WindowState {
                    window_start: minute.window_start,
                    count: minute_count + 1,
                },
                expires_at: minute.window_start + minute.ttl_secs,
            },
        );
        windows.insert(
            day.key.clone(),
            MemoryEntry {
                state: WindowState {
                    window_start: day.window_start,
                    count: day_count + 1,
                },
                expires_at: day.window_start + day.ttl_secs,
            },
        );

        Ok(AcquireOutcome::Granted {
            minute_count: minute_count + 1,
            day_count: day_count + 1,
        })
    }

    async fn cleanup(&self) {
        let now = current_time_secs();
        let mut windows = self.windows.lock().await;
        windows.retain(|_, entry| entry.expires_at > now);
        debug!("Completed rate limit storage cleanup");
    }
}
