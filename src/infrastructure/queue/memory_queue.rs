//! In-memory batch queue

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::job::entities::BatchJob;
use crate::domain::job::errors::QueueError;
use crate::domain::job::repositories::{IJobQueue, QueueDepth};
use crate::domain::job::value_objects::{BatchJobId, BatchJobStatus, JobPriority};

struct QueueInner {
    normal: VecDeque<BatchJobId>,
    high: VecDeque<BatchJobId>,
    payloads: HashMap<BatchJobId, BatchJob>,
}

/// Process-local queue for tests and single-instance deployments.
///
/// A single mutex over both lists and the payload table gives every
/// operation the same atomicity the Redis backend gets from its
/// transactional pipeline, and makes each pop exclusive.
pub struct InMemoryJobQueue {
    inner: Arc<Mutex<QueueInner>>,
    arrival: Notify,
    max_queue_size: usize,
}

impl InMemoryJobQueue {
    /// Create an empty queue with the given depth ceiling
    pub fn new(max_queue_size: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(QueueInner {
                normal: VecDeque::new(),
                high: VecDeque::new(),
                payloads: HashMap::new(),
            })),
            arrival: Notify::new(),
            max_queue_size,
        }
    }

    /// Pop the next id, high list first, and mark its payload dequeued
    async fn try_claim(&self) -> Option<BatchJob> {
        let mut inner = self.inner.lock().await;
        loop {
            let id = inner.high.pop_front().or_else(|| inner.normal.pop_front())?;

            match inner.payloads.get_mut(&id) {
                Some(job) => {
                    job.transition(BatchJobStatus::Dequeued);
                    return Some(job.clone());
                }
                None => {
                    warn!(batch_id = %id, "Queued id without payload, skipping");
                }
            }
        }
    }
}

#[async_trait]
impl IJobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: &BatchJob) -> Result<BatchJobId, QueueError> {
        {
            let mut inner = self.inner.lock().await;
            let depth = inner.normal.len() + inner.high.len();
            if depth >= self.max_queue_size {
                return Err(QueueError::CapacityExceeded {
                    depth,
                    ceiling: self.max_queue_size,
                });
            }

            inner.payloads.insert(job.id, job.clone());
            match job.priority {
                JobPriority::High => inner.high.push_back(job.id),
                JobPriority::Normal => inner.normal.push_back(job.id),
            }
        }

        self.arrival.notify_one();
        debug!(batch_id = %job.id, priority = %job.priority, "Batch job enqueued");
        Ok(job.id)
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<BatchJob>, QueueError> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(job) = self.try_claim().await {
                return Ok(Some(job));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            if tokio::time::timeout(remaining, self.arrival.notified())
                .await
                .is_err()
            {
                return Ok(None);
            }
        }
    }

    async fn reprioritize(
        &self,
        id: &BatchJobId,
        new_priority: JobPriority,
    ) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().await;
        let Some(job) = inner.payloads.get(id) else {
            return Err(QueueError::NotFound { id: *id });
        };

        if job.status.is_terminal() || job.priority == new_priority {
            return Ok(());
        }

        let still_queued = job.is_queued();
        if still_queued {
            inner.normal.retain(|queued| queued != id);
            inner.high.retain(|queued| queued != id);
            match new_priority {
                JobPriority::High => inner.high.push_back(*id),
                JobPriority::Normal => inner.normal.push_back(*id),
            }
        }

        // Claimed jobs keep their position; the payload records the last
        // requested priority either way
        if let Some(job) = inner.payloads.get_mut(id) {
            job.priority = new_priority;
        }
        Ok(())
    }

    async fn cancel(&self, id: &BatchJobId) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().await;
        let Some(job) = inner.payloads.get(id) else {
            return Err(QueueError::NotFound { id: *id });
        };

        if job.status.is_terminal() {
            return Ok(());
        }

        inner.normal.retain(|queued| queued != id);
        inner.high.retain(|queued| queued != id);
        if let Some(job) = inner.payloads.get_mut(id) {
            job.transition(BatchJobStatus::Cancelled);
        }
        debug!(batch_id = %id, "Batch job cancelled");
        Ok(())
    }

    async fn get(&self, id: &BatchJobId) -> Result<Option<BatchJob>, QueueError> {
        let inner = self.inner.lock().await;
        Ok(inner.payloads.get(id).cloned())
    }

    async fn update_status(
        &self,
        id: &BatchJobId,
        status: BatchJobStatus,
    ) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().await;
        let Some(job) = inner.payloads.get_mut(id) else {
            return Err(QueueError::NotFound { id: *id });
        };

        if !job.transition(status) {
            debug!(
                batch_id = %id,
                from = %job.status,
                to = %status,
                "Ignoring invalid batch status transition"
            );
        }
        Ok(())
    }

    async fn depth(&self) -> Result<QueueDepth, QueueError> {
        let inner = self.inner.lock().await;
        Ok(QueueDepth {
            normal: inner.normal.len(),
            high: inner.high.len(),
        })
    }

    async fn purge(&self) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().await;
        inner.normal.clear();
        inner.high.clear();
        inner.payloads.clear();
        Ok(())
    }
}
