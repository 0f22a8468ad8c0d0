//! Job domain entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use super::errors::ValidationError;
use super::value_objects::{BatchJobId, BatchJobStatus, JobId, JobPriority, JobStatus};

/// A single cancellable, timeout-bound unit of analysis work.
///
/// Constructors are pure: timestamps are supplied by the caller, and all
/// mutation goes through the `mark_*` methods, which enforce the
/// one-directional lifecycle and report whether the transition applied.
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    status: JobStatus,
    result: Option<Value>,
    error: Option<String>,
    timeout: Option<Duration>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a job in the pending state
    pub fn pending(id: JobId, timeout: Option<Duration>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            result: None,
            error: None,
            timeout,
            created_at,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Present iff the job completed
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Present iff the job failed
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Transition pending → running
    pub fn mark_running(&mut self, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(JobStatus::Running) {
            return false;
        }
        self.status = JobStatus::Running;
        self.started_at = Some(at);
        true
    }

    /// Terminal transition with the task's result
    pub fn mark_completed(&mut self, result: Value, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(JobStatus::Completed) {
            return false;
        }
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.completed_at = Some(at);
        true
    }

    /// Terminal transition with the captured task error
    pub fn mark_failed(&mut self, error: String, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(JobStatus::Failed) {
            return false;
        }
        self.status = JobStatus::Failed;
        self.error = Some(error);
        self.completed_at = Some(at);
        true
    }

    /// Terminal transition honoring a cancel request
    pub fn mark_cancelled(&mut self, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(JobStatus::Cancelled) {
            return false;
        }
        self.status = JobStatus::Cancelled;
        self.completed_at = Some(at);
        true
    }

    /// Terminal transition after the wall-clock bound elapsed
    pub fn mark_timed_out(&mut self, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(JobStatus::TimedOut) {
            return false;
        }
        self.status = JobStatus::TimedOut;
        self.completed_at = Some(at);
        true
    }
}

/// A queued group-analysis request.
///
/// Validated at construction: oversized batches never reach the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    pub id: BatchJobId,
    pub conversation_ids: Vec<String>,
    pub options: Map<String, Value>,
    pub priority: JobPriority,
    pub status: BatchJobStatus,
    pub created_at: DateTime<Utc>,
}

impl BatchJob {
    /// Create a queued batch job, rejecting oversized or empty batches.
    /// `created_at` is supplied by the caller so construction stays
    /// side-effect free.
    pub fn new(
        id: BatchJobId,
        conversation_ids: Vec<String>,
        options: Map<String, Value>,
        priority: JobPriority,
        max_batch_size: usize,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if conversation_ids.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }
        if conversation_ids.len() > max_batch_size {
            return Err(ValidationError::BatchTooLarge {
                count: conversation_ids.len(),
                max: max_batch_size,
            });
        }
        Ok(Self {
            id,
            conversation_ids,
            options,
            priority,
            status: BatchJobStatus::Queued,
            created_at,
        })
    }

    /// Whether a cancel request has been recorded for this batch
    pub fn is_cancelled(&self) -> bool {
        self.status == BatchJobStatus::Cancelled
    }

    /// Whether the batch is still waiting in a queue list
    pub fn is_queued(&self) -> bool {
        self.status == BatchJobStatus::Queued
    }

    /// Apply a lifecycle transition, reporting whether it took effect
    pub fn transition(&mut self, next: BatchJobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        true
    }
}

/// Terminal record of one processed batch, handed to the external
/// persistence collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub batch_id: BatchJobId,
    pub status: BatchJobStatus,
    pub total_conversations: usize,
    pub completed_count: usize,
    pub failed_count: usize,
    /// Per-conversation outcome map produced by the analysis task
    pub results: Value,
    pub finished_at: DateTime<Utc>,
}
