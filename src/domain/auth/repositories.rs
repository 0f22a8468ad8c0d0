//! Credential registry trait

use async_trait::async_trait;

use super::entities::CredentialRecord;
use super::errors::AuthError;
use super::value_objects::CredentialHash;

/// Registry mapping credential hashes to tiers.
///
/// Injected wherever credentials are resolved so deployments can swap the
/// in-memory implementation (tests, single process) for the shared durable
/// store without touching call sites.
#[async_trait]
pub trait ICredentialRegistry: Send + Sync {
    /// Find a record by its credential hash
    async fn find_by_hash(
        &self,
        hash: &CredentialHash,
    ) -> Result<Option<CredentialRecord>, AuthError>;

    /// Insert or replace a record
    async fn insert(&self, record: CredentialRecord) -> Result<(), AuthError>;

    /// Remove a record; returns whether one existed
    async fn revoke(&self, hash: &CredentialHash) -> Result<bool, AuthError>;
}
