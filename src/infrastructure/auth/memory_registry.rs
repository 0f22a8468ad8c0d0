//! In-memory credential registry

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::auth::entities::CredentialRecord;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::repositories::ICredentialRegistry;
use crate::domain::auth::value_objects::CredentialHash;

/// Explicitly injected in-memory registry for tests and single-process
/// deployments. Keys are credential hashes; plaintext never enters.
pub struct InMemoryCredentialRegistry {
    records: Arc<RwLock<HashMap<String, CredentialRecord>>>,
}

impl InMemoryCredentialRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of registered credentials
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the registry has no records
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemoryCredentialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ICredentialRegistry for InMemoryCredentialRegistry {
    async fn find_by_hash(
        &self,
        hash: &CredentialHash,
    ) -> Result<Option<CredentialRecord>, AuthError> {
        let records = self.records.read().await;
        Ok(records.get(hash.as_str()).cloned())
    }

    async fn insert(&self, record: CredentialRecord) -> Result<(), AuthError> {
        let mut records = self.records.write().await;
        records.insert(record.credential_hash.as_str().to_string(), record);
        Ok(())
    }

    async fn revoke(&self, hash: &CredentialHash) -> Result<bool, AuthError> {
        let mut records = self.records.write().await;
        Ok(records.remove(hash.as_str()).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::auth::value_objects::AccessTier;
    use chrono::Utc;

    fn record(hash: &str, tier: AccessTier) -> CredentialRecord {
        CredentialRecord::new(CredentialHash::from(hash.to_string()), tier, Utc::now())
    }

    #[tokio::test]
    async fn insert_and_find() {
        let registry = InMemoryCredentialRegistry::new();
        registry
            .insert(record("hash-a", AccessTier::Keyed))
            .await
            .unwrap();

        let found = registry
            .find_by_hash(&CredentialHash::from("hash-a".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.tier, AccessTier::Keyed);

        let missing = registry
            .find_by_hash(&CredentialHash::from("hash-b".to_string()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn revoke_removes_the_record() {
        let registry = InMemoryCredentialRegistry::new();
        let hash = CredentialHash::from("hash-a".to_string());
        registry
            .insert(record("hash-a", AccessTier::Partner))
            .await
            .unwrap();

        assert!(registry.revoke(&hash).await.unwrap());
        assert!(!registry.revoke(&hash).await.unwrap());
        assert!(registry.find_by_hash(&hash).await.unwrap().is_none());
    }
}
