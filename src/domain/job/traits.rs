//! External collaborator traits

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use super::entities::BatchOutcome;
use super::errors::TaskError;

/// The conversation-analysis algorithm, treated as an opaque async
/// collaborator supplied by the embedding service.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// Analyze one conversation, returning its result document
    async fn analyze(
        &self,
        conversation_id: &str,
        options: &Map<String, Value>,
    ) -> Result<Value, TaskError>;
}

/// Error from the external results store
#[derive(Error, Debug, Clone)]
#[error("result store error: {message}")]
pub struct ResultStoreError {
    pub message: String,
}

impl ResultStoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// External persistence collaborator that owns result storage and
/// retention; terminal batch records are handed to it and never touched
/// again by this crate.
#[async_trait]
pub trait IResultStore: Send + Sync {
    /// Record the terminal outcome of one batch
    async fn record_batch(&self, outcome: &BatchOutcome) -> Result<(), ResultStoreError>;
}
