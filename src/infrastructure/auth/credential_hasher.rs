//! Credential hashing service

use hex;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::domain::auth::value_objects::CredentialHash;

/// Salted one-way credential hashing.
///
/// The same salt must be used at registration and resolution time; the
/// plaintext credential never leaves this type's stack frames.
#[derive(Clone)]
pub struct CredentialHasher {
    salt: String,
    /// Random byte length of issued credentials (before hex encoding)
    credential_length: usize,
    /// Prefix for issued credentials (e.g. "obs_")
    prefix: String,
}

impl CredentialHasher {
    /// Create a new hasher with the given salt and default issuance shape
    pub fn new(salt: impl Into<String>) -> Self {
        Self {
            salt: salt.into(),
            credential_length: 32,
            prefix: "obs_".to_string(),
        }
    }

    /// Create a hasher with custom prefix and length
    pub fn with_prefix_and_length(
        salt: impl Into<String>,
        prefix: impl Into<String>,
        credential_length: usize,
    ) -> Self {
        Self {
            salt: salt.into(),
            credential_length,
            prefix: prefix.into(),
        }
    }

    /// Generate a new credential and its hash.
    /// Returns (plaintext, hash); the plaintext is shown to the caller
    /// exactly once and only the hash is retained anywhere.
    pub fn generate(&self) -> (String, CredentialHash) {
        let mut random_bytes = vec![0u8; self.credential_length];
        rand::rng().fill_bytes(&mut random_bytes);

        let plaintext = format!("{}{}", self.prefix, hex::encode(random_bytes));
        let hash = self.hash_credential(&plaintext);

        (plaintext, hash)
    }

    /// Hash a presented credential with the configured salt
    pub fn hash_credential(&self, credential: &str) -> CredentialHash {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(credential.as_bytes());
        let hash_bytes = hasher.finalize();
        CredentialHash::from(hex::encode(hash_bytes))
    }

    /// Compare two credential hashes in constant time to prevent timing
    /// attacks when validating a presented credential against a stored
    /// hash.
    pub fn constant_time_compare(provided: &CredentialHash, stored: &CredentialHash) -> bool {
        let provided_bytes = provided.as_str().as_bytes();
        let stored_bytes = stored.as_str().as_bytes();

        if provided_bytes.len() != stored_bytes.len() {
            return false;
        }

        provided_bytes.ct_eq(stored_bytes).into()
    }

    /// Mask a credential for display (prefix + first 4 chars + last 4)
    pub fn mask_credential(&self, credential: &str) -> String {
        if credential.len() <= 12 {
            return "*".repeat(credential.len());
        }

        let prefix_len = self.prefix.len();
        if credential.starts_with(&self.prefix) {
            let rest = &credential[prefix_len..];
            if rest.len() <= 8 {
                format!("{}{}", self.prefix, "*".repeat(rest.len()))
            } else {
                format!(
                    "{}{}...{}",
                    self.prefix,
                    &rest[..4],
                    &rest[rest.len() - 4..]
                )
            }
        } else {
            format!(
                "{}...{}",
                &credential[..4],
                &credential[credential.len() - 4..]
            )
        }
    }
}
