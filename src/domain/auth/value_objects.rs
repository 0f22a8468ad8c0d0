//! Authentication value objects

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access tier granted to a caller
///
/// Determines which admission quota applies to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    /// Unauthenticated callers - lowest limits
    Public,
    /// Registered credential holders - standard limits
    Keyed,
    /// Partner integrations - highest limits
    Partner,
}

impl AccessTier {
    /// Get the tier name for logging and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessTier::Public => "public",
            AccessTier::Keyed => "keyed",
            AccessTier::Partner => "partner",
        }
    }
}

impl fmt::Display for AccessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccessTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(AccessTier::Public),
            "keyed" => Ok(AccessTier::Keyed),
            "partner" => Ok(AccessTier::Partner),
            _ => Err(format!("Unknown tier: {}", s)),
        }
    }
}

/// Outcome of resolving a presented credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierResolution {
    /// A recognized credential; `identity` is the credential's one-way
    /// hash, suitable as a rate-limit key
    Authenticated { tier: AccessTier, identity: String },
    /// No credential was presented
    Unauthenticated,
}

impl TierResolution {
    /// The tier admission control should apply
    pub fn effective_tier(&self) -> AccessTier {
        match self {
            TierResolution::Authenticated { tier, .. } => *tier,
            TierResolution::Unauthenticated => AccessTier::Public,
        }
    }
}

/// Credential hash value object (never exposes the plaintext it was
/// derived from)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CredentialHash(String);

impl CredentialHash {
    /// Create a new CredentialHash
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    /// Get the hash for lookups (internal use only)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get as owned string (internal use only)
    pub fn into_string(self) -> String {
        self.0
    }

    /// Short non-reversible form safe for log lines
    pub fn fingerprint(&self) -> &str {
        let end = self.0.len().min(8);
        &self.0[..end]
    }
}

// Intentionally no Display or Serialize to keep hashes out of payloads
impl From<String> for CredentialHash {
    fn from(hash: String) -> Self {
        Self(hash)
    }
}
