//! Admission use cases
//!
//! The single pre-flight gate applied before any work is scheduled:
//! a presented credential resolves to an access tier, and the tier's
//! quota is checked-and-consumed atomically. The plaintext credential is
//! hashed immediately and never stored or logged on any path.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::domain::auth::entities::CredentialRecord;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::repositories::ICredentialRegistry;
use crate::domain::auth::value_objects::{AccessTier, TierResolution};
use crate::infrastructure::auth::CredentialHasher;
use crate::infrastructure::rate_limiter::{RateLimitKey, RateLimitResult, RateLimiterService};

/// Resolves opaque credentials to access tiers via the injected registry
pub struct AuthResolver {
    hasher: CredentialHasher,
    registry: Arc<dyn ICredentialRegistry>,
}

impl AuthResolver {
    pub fn new(hasher: CredentialHasher, registry: Arc<dyn ICredentialRegistry>) -> Self {
        Self { hasher, registry }
    }

    /// Resolve a presented credential.
    ///
    /// No credential resolves to [`TierResolution::Unauthenticated`]; an
    /// unknown credential is an explicit error, never a silent downgrade
    /// to the public tier.
    pub async fn resolve(&self, credential: Option<&str>) -> Result<TierResolution, AuthError> {
        let Some(credential) = credential else {
            return Ok(TierResolution::Unauthenticated);
        };

        let hash = self.hasher.hash_credential(credential);
        match self.registry.find_by_hash(&hash).await? {
            Some(record) => {
                debug!(
                    credential = %hash.fingerprint(),
                    tier = %record.tier,
                    "Credential resolved"
                );
                Ok(TierResolution::Authenticated {
                    tier: record.tier,
                    identity: hash.into_string(),
                })
            }
            None => {
                debug!(credential = %hash.fingerprint(), "Unknown credential rejected");
                Err(AuthError::InvalidCredential)
            }
        }
    }

    /// Register an existing credential for a tier. Only the salted hash
    /// reaches the registry.
    pub async fn register(
        &self,
        credential: &str,
        tier: AccessTier,
        registered_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let hash = self.hasher.hash_credential(credential);
        debug!(credential = %hash.fingerprint(), tier = %tier, "Credential registered");
        self.registry
            .insert(CredentialRecord::new(hash, tier, registered_at))
            .await
    }

    /// Issue a fresh credential for a tier. The plaintext is returned to
    /// the caller exactly once and retained nowhere.
    pub async fn issue(
        &self,
        tier: AccessTier,
        registered_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let (plaintext, hash) = self.hasher.generate();
        debug!(credential = %hash.fingerprint(), tier = %tier, "Credential issued");
        self.registry
            .insert(CredentialRecord::new(hash, tier, registered_at))
            .await?;
        Ok(plaintext)
    }
}

/// Outcome of the admission gate, carrying the metadata client-facing
/// layers put into rate-limit headers
#[derive(Debug, Clone)]
pub struct Admission {
    pub tier: AccessTier,
    pub rate_limit: RateLimitResult,
}

impl Admission {
    /// Whether the request may proceed
    pub fn allowed(&self) -> bool {
        self.rate_limit.allowed
    }
}

/// The combined AuthResolver + RateLimiter gate
pub struct AdmissionService {
    resolver: AuthResolver,
    limiter: Arc<RateLimiterService>,
}

impl AdmissionService {
    pub fn new(resolver: AuthResolver, limiter: Arc<RateLimiterService>) -> Self {
        Self { resolver, limiter }
    }

    /// Run the full gate for one request.
    ///
    /// Authenticated callers are counted per credential hash so their
    /// quota follows them across addresses; unauthenticated callers are
    /// counted per client address on the public tier.
    pub async fn admit(
        &self,
        credential: Option<&str>,
        client_addr: &str,
    ) -> Result<Admission, AuthError> {
        let resolution = self.resolver.resolve(credential).await?;

        let (tier, key) = match &resolution {
            TierResolution::Authenticated { tier, identity } => {
                (*tier, RateLimitKey::Credential(identity.clone()))
            }
            TierResolution::Unauthenticated => (
                AccessTier::Public,
                RateLimitKey::Ip(client_addr.to_string()),
            ),
        };

        let rate_limit = self.limiter.check_and_increment(&key, tier).await;
        if !rate_limit.allowed {
            debug!(
                tier = %tier,
                retry_after = rate_limit.retry_after,
                "Request denied by rate limiter"
            );
        }

        Ok(Admission { tier, rate_limit })
    }

    /// The resolver, for registration flows
    pub fn resolver(&self) -> &AuthResolver {
        &self.resolver
    }
}
