//! Configuration management

pub mod validation;

pub use validation::{ConfigValidationError, Validate};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub storage: StorageConfig,
    pub queue: QueueConfig,
    pub jobs: JobsConfig,
    pub rate_limit: RateLimitConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Shared durable store configuration (queue, counters, credential registry)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Connection URL for the shared Redis-compatible store
    pub url: String,
    /// Key prefix applied to every key this service writes
    pub key_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            key_prefix: "observatory".to_string(),
        }
    }
}

/// Batch queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum conversations per batch; oversized batches are rejected
    pub max_batch_size: usize,
    /// Total queue depth ceiling across both priority lists
    pub max_queue_size: usize,
    /// How long a worker blocks waiting for normal-priority work (seconds)
    pub poll_timeout_seconds: u64,
    /// Retry policy for transient backend failures
    pub retry: RetryConfigSerializable,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 1000,
            max_queue_size: 10_000,
            poll_timeout_seconds: 5,
            retry: RetryConfigSerializable::default(),
        }
    }
}

impl QueueConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_seconds)
    }
}

/// Job supervision configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Default wall-clock bound for a single analysis job (seconds)
    pub analysis_timeout_seconds: u64,
    /// Grace period a cancelled or timed-out task gets to unwind (seconds)
    pub cancel_grace_seconds: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            analysis_timeout_seconds: 30,
            cancel_grace_seconds: 5,
        }
    }
}

impl JobsConfig {
    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_seconds)
    }

    pub fn cancel_grace(&self) -> Duration {
        Duration::from_secs(self.cancel_grace_seconds)
    }
}

/// Storage backend selection for rate limiting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitStorageBackend {
    /// Shared Redis-compatible store; enforces one global quota per
    /// identity across all service instances
    Redis,
    /// Process-local storage for development and single-instance deployments
    Memory,
}

/// Per-tier admission quotas
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TierQuota {
    pub requests_per_minute: u32,
    pub requests_per_day: u32,
}

impl Default for TierQuota {
    fn default() -> Self {
        Self {
            requests_per_minute: 10,
            requests_per_day: 500,
        }
    }
}

/// Quotas for every access tier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierQuotasConfig {
    pub public: TierQuota,
    pub keyed: TierQuota,
    pub partner: TierQuota,
}

impl Default for TierQuotasConfig {
    fn default() -> Self {
        Self {
            public: TierQuota {
                requests_per_minute: 10,
                requests_per_day: 500,
            },
            keyed: TierQuota {
                requests_per_minute: 60,
                requests_per_day: 5_000,
            },
            partner: TierQuota {
                requests_per_minute: 600,
                requests_per_day: 50_000,
            },
        }
    }
}

/// Rate limiter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub storage_backend: RateLimitStorageBackend,
    /// Sweep interval for expired windows in the in-memory backend (seconds)
    pub cleanup_interval_seconds: u64,
    pub tiers: TierQuotasConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            storage_backend: RateLimitStorageBackend::Redis,
            cleanup_interval_seconds: 300,
            tiers: TierQuotasConfig::default(),
        }
    }
}

/// Credential handling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Salt mixed into every credential hash
    pub credential_salt: String,
    /// Prefix for issued credentials (e.g. "obs_")
    pub credential_prefix: String,
    /// Random byte length of issued credentials (before hex encoding)
    pub credential_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credential_salt: "change-this-in-production".to_string(),
            credential_prefix: "obs_".to_string(),
            credential_length: 32,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter, overridable via `RUST_LOG`
    pub level: String,
    /// Output format: "json" or "pretty"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

/// Retry configuration (serializable version)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfigSerializable {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Initial delay between retries (in milliseconds)
    pub initial_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfigSerializable {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 250,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfigSerializable {
    /// Convert to the runtime RetryConfig
    pub fn to_retry_config(&self) -> crate::infrastructure::resilience::RetryConfig {
        crate::infrastructure::resilience::RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        // Add environment-specific config if ENV is set
        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        // Add local config and environment variables last (highest priority)
        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("OBSERVATORY").separator("__"));

        let config: Config = builder.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ConfigValidationError),
}
