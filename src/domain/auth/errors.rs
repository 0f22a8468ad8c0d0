//! Credential domain errors

use thiserror::Error;

/// Credential resolution and registry errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("credential is not recognized")]
    InvalidCredential,

    #[error("credential registry unavailable: {message}")]
    RegistryUnavailable { message: String },
}
