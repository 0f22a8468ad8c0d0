//! Redis credential registry

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

use crate::domain::auth::entities::CredentialRecord;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::repositories::ICredentialRegistry;
use crate::domain::auth::value_objects::{AccessTier, CredentialHash};

/// Stored form of a record; the hash itself lives only in the key
#[derive(Serialize, Deserialize)]
struct StoredRecord {
    tier: AccessTier,
    registered_at: DateTime<Utc>,
}

/// Credential registry backed by the shared durable store, so every
/// service instance resolves the same tier for a credential.
pub struct RedisCredentialRegistry {
    connection_manager: Arc<ConnectionManager>,
    key_prefix: String,
}

impl RedisCredentialRegistry {
    /// Create a new registry against the shared store
    pub async fn new(url: &str, key_prefix: &str) -> Result<Self, AuthError> {
        let client = redis::Client::open(url).map_err(|e| {
            error!("Failed to create Redis client for credential registry: {}", e);
            AuthError::RegistryUnavailable {
                message: format!("Failed to create Redis client: {}", e),
            }
        })?;

        let connection_manager = ConnectionManager::new(client).await.map_err(|e| {
            error!(
                "Failed to create connection manager for credential registry: {}",
                e
            );
            AuthError::RegistryUnavailable {
                message: format!("Failed to create connection manager: {}", e),
            }
        })?;

        // Test connection
        let mut conn = connection_manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| AuthError::RegistryUnavailable {
                message: format!("Failed to ping Redis: {}", e),
            })?;

        debug!("Successfully connected to Redis for the credential registry");

        Ok(Self {
            connection_manager: Arc::new(connection_manager),
            key_prefix: key_prefix.to_string(),
        })
    }

    fn record_key(&self, hash: &CredentialHash) -> String {
        format!("{}:credential:{}", self.key_prefix, hash.as_str())
    }
}

#[async_trait]
impl ICredentialRegistry for RedisCredentialRegistry {
    async fn find_by_hash(
        &self,
        hash: &CredentialHash,
    ) -> Result<Option<CredentialRecord>, AuthError> {
        let mut conn = (*self.connection_manager).clone();

        let value: Option<String> = redis::cmd("GET")
            .arg(self.record_key(hash))
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::RegistryUnavailable {
                message: format!("Redis GET error: {}", e),
            })?;

        match value {
            Some(json) => {
                let stored: StoredRecord =
                    serde_json::from_str(&json).map_err(|e| AuthError::RegistryUnavailable {
                        message: format!("corrupt registry record: {}", e),
                    })?;
                Ok(Some(CredentialRecord::new(
                    hash.clone(),
                    stored.tier,
                    stored.registered_at,
                )))
            }
            None => Ok(None),
        }
    }

    async fn insert(&self, record: CredentialRecord) -> Result<(), AuthError> {
        let mut conn = (*self.connection_manager).clone();
        let stored = StoredRecord {
            tier: record.tier,
            registered_at: record.registered_at,
        };
        let json =
            serde_json::to_string(&stored).map_err(|e| AuthError::RegistryUnavailable {
                message: format!("failed to encode registry record: {}", e),
            })?;

        redis::cmd("SET")
            .arg(self.record_key(&record.credential_hash))
            .arg(json)
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| AuthError::RegistryUnavailable {
                message: format!("Redis SET error: {}", e),
            })?;

        Ok(())
    }

    async fn revoke(&self, hash: &CredentialHash) -> Result<bool, AuthError> {
        let mut conn = (*self.connection_manager).clone();

        let removed: i64 = redis::cmd("DEL")
            .arg(self.record_key(hash))
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::RegistryUnavailable {
                message: format!("Redis DEL error: {}", e),
            })?;

        Ok(removed > 0)
    }
}
