//! Configuration validation

use thiserror::Error;

use super::{Config, QueueConfig, RateLimitConfig, TierQuota};

/// Validation error for configuration values
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigValidationError {
    fn invalid(field: &str, reason: &str) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ConfigValidationError>;
}

impl Validate for QueueConfig {
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_batch_size == 0 {
            return Err(ConfigValidationError::invalid(
                "queue.max_batch_size",
                "must be greater than zero",
            ));
        }
        if self.max_queue_size == 0 {
            return Err(ConfigValidationError::invalid(
                "queue.max_queue_size",
                "must be greater than zero",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigValidationError::invalid(
                "queue.retry.max_attempts",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn validate_quota(name: &str, quota: &TierQuota) -> Result<(), ConfigValidationError> {
    if quota.requests_per_minute == 0 {
        return Err(ConfigValidationError::invalid(
            &format!("rate_limit.tiers.{}.requests_per_minute", name),
            "must be greater than zero",
        ));
    }
    if quota.requests_per_day < quota.requests_per_minute {
        return Err(ConfigValidationError::invalid(
            &format!("rate_limit.tiers.{}.requests_per_day", name),
            "must be at least the per-minute limit",
        ));
    }
    Ok(())
}

impl Validate for RateLimitConfig {
    fn validate(&self) -> Result<(), ConfigValidationError> {
        validate_quota("public", &self.tiers.public)?;
        validate_quota("keyed", &self.tiers.keyed)?;
        validate_quota("partner", &self.tiers.partner)?;
        Ok(())
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ConfigValidationError> {
        self.queue.validate()?;
        self.rate_limit.validate()?;
        if self.storage.url.is_empty() {
            return Err(ConfigValidationError::invalid(
                "storage.url",
                "must not be empty",
            ));
        }
        if self.auth.credential_salt.is_empty() {
            return Err(ConfigValidationError::invalid(
                "auth.credential_salt",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_batch_size() {
        let mut config = Config::default();
        config.queue.max_batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_day_quota_below_minute_quota() {
        let mut config = Config::default();
        config.rate_limit.tiers.keyed.requests_per_day = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_salt() {
        let mut config = Config::default();
        config.auth.credential_salt = String::new();
        assert!(config.validate().is_err());
    }
}
