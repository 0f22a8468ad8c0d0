//! Credential domain entities

use chrono::{DateTime, Utc};

use super::value_objects::{AccessTier, CredentialHash};

/// A registered credential and the tier it grants.
///
/// Only the salted one-way hash of the credential is ever held here; the
/// plaintext exists solely in the caller's hands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub credential_hash: CredentialHash,
    pub tier: AccessTier,
    pub registered_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// Create a new record. `registered_at` is supplied by the caller so
    /// construction stays side-effect free.
    pub fn new(
        credential_hash: CredentialHash,
        tier: AccessTier,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            credential_hash,
            tier,
            registered_at,
        }
    }
}
