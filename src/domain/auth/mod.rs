//! Credential and tier domain model

pub mod entities;
pub mod errors;
pub mod repositories;
pub mod value_objects;

pub use entities::CredentialRecord;
pub use errors::AuthError;
pub use repositories::ICredentialRegistry;
pub use value_objects::{AccessTier, CredentialHash, TierResolution};
