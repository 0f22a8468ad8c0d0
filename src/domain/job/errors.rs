//! Job domain errors

use thiserror::Error;

use super::value_objects::{BatchJobId, JobId};

/// Malformed input rejected before any work is scheduled
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("batch contains {count} conversations, maximum is {max}")]
    BatchTooLarge { count: usize, max: usize },

    #[error("batch contains no conversations")]
    EmptyBatch,
}

/// Queue storage failures.
///
/// `Backend` is retried internally with bounded backoff before it reaches a
/// caller; everything else fails immediately.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("queue backend unavailable: {message}")]
    Backend { message: String },

    #[error("queue is full: depth {depth} at ceiling {ceiling}")]
    CapacityExceeded { depth: usize, ceiling: usize },

    #[error("failed to encode or decode batch payload: {message}")]
    Serialization { message: String },

    #[error("batch job not found: {id}")]
    NotFound { id: BatchJobId },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl QueueError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Whether the operation is worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueueError::Backend { .. })
    }
}

/// Job manager lookup errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobError {
    #[error("job not found: {job_id}")]
    NotFound { job_id: JobId },
}

/// Error raised by the analysis callable itself.
///
/// Captured verbatim into the owning job's error field; never retried by
/// the manager.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct TaskError {
    pub message: String,
}

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
