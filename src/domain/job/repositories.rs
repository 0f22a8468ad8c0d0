//! Batch queue trait

use async_trait::async_trait;
use std::time::Duration;

use super::entities::BatchJob;
use super::errors::QueueError;
use super::value_objects::{BatchJobId, BatchJobStatus, JobPriority};

/// Current depth of both priority lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueDepth {
    pub normal: usize,
    pub high: usize,
}

impl QueueDepth {
    pub fn total(&self) -> usize {
        self.normal + self.high
    }
}

/// Durable, priority-ordered batch queue shared by submitter and worker
/// processes.
///
/// Implementations guarantee that payload writes and list-index insertions
/// commit together, and that a pop is exclusive at the storage layer: two
/// concurrent workers never receive the same id.
#[async_trait]
pub trait IJobQueue: Send + Sync {
    /// Persist a batch job and insert its id into the list matching its
    /// priority, atomically. Fails with `CapacityExceeded` once total
    /// depth reaches the configured ceiling.
    async fn enqueue(&self, job: &BatchJob) -> Result<BatchJobId, QueueError>;

    /// Claim the next batch job. Drains the high-priority list first
    /// without blocking, then waits up to `timeout` for normal-priority
    /// work. Returns `None` when nothing arrives in time. The claimed
    /// payload is marked dequeued.
    async fn dequeue(&self, timeout: Duration) -> Result<Option<BatchJob>, QueueError>;

    /// Move a still-queued job between priority lists. A job already
    /// claimed by a worker keeps its queue position; only the payload's
    /// priority field is updated (last write wins). No-op once terminal.
    async fn reprioritize(
        &self,
        id: &BatchJobId,
        new_priority: JobPriority,
    ) -> Result<(), QueueError>;

    /// Cancel a batch job. Still-queued jobs are removed from their list;
    /// already-claimed jobs get a cooperative flag the worker observes via
    /// `get`. Idempotent on terminal jobs.
    async fn cancel(&self, id: &BatchJobId) -> Result<(), QueueError>;

    /// Fetch the current payload snapshot
    async fn get(&self, id: &BatchJobId) -> Result<Option<BatchJob>, QueueError>;

    /// Record a worker-side lifecycle transition on the payload
    async fn update_status(&self, id: &BatchJobId, status: BatchJobStatus)
    -> Result<(), QueueError>;

    /// Current size of both lists
    async fn depth(&self) -> Result<QueueDepth, QueueError>;

    /// Drop every list entry and payload (tests and dev resets)
    async fn purge(&self) -> Result<(), QueueError>;
}
