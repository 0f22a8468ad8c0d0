//! Test data factories

use chrono::Utc;
use serde_json::Map;

use observatory_core::config::{
    Config, RateLimitConfig, RateLimitStorageBackend, TierQuota, TierQuotasConfig,
};
use observatory_core::domain::job::entities::BatchJob;
use observatory_core::domain::job::value_objects::{BatchJobId, JobPriority};

/// Conversation ids conv-0..conv-n
pub fn conversation_ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("conv-{}", i)).collect()
}

/// A queued batch job over the given conversations
pub fn batch_job(conversations: Vec<String>, priority: JobPriority) -> BatchJob {
    BatchJob::new(
        BatchJobId::generate(),
        conversations,
        Map::new(),
        priority,
        1000,
        Utc::now(),
    )
    .expect("factory batch job must be valid")
}

/// A batch job labeled by a single conversation id, for ordering tests
pub fn labeled_job(label: &str, priority: JobPriority) -> BatchJob {
    batch_job(vec![label.to_string()], priority)
}

/// Rate limit config with an in-memory backend and small public quota
pub fn rate_limit_config(per_minute: u32, per_day: u32) -> RateLimitConfig {
    RateLimitConfig {
        enabled: true,
        storage_backend: RateLimitStorageBackend::Memory,
        cleanup_interval_seconds: 300,
        tiers: TierQuotasConfig {
            public: TierQuota {
                requests_per_minute: per_minute,
                requests_per_day: per_day,
            },
            keyed: TierQuota {
                requests_per_minute: per_minute * 6,
                requests_per_day: per_day * 10,
            },
            partner: TierQuota {
                requests_per_minute: per_minute * 60,
                requests_per_day: per_day * 100,
            },
        },
    }
}

/// Crate config tuned for fast tests
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.jobs.analysis_timeout_seconds = 5;
    config.jobs.cancel_grace_seconds = 1;
    config.queue.poll_timeout_seconds = 1;
    config
}
