//! Credential hashing and registry backends

pub mod credential_hasher;
pub mod memory_registry;
pub mod redis_registry;

pub use credential_hasher::CredentialHasher;
pub use memory_registry::InMemoryCredentialRegistry;
pub use redis_registry::RedisCredentialRegistry;
