//! Redis batch queue
//!
//! Durable, priority-ordered storage shared by submitter and worker
//! processes. Payload writes and list-index insertions commit inside one
//! `MULTI`/`EXEC` pipeline so the queue is never half-committed, and pops
//! ride on Redis list-pop exclusivity so two workers never claim the same
//! id. Every operation retries transient connectivity loss with bounded
//! backoff before failing loudly.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::domain::job::entities::BatchJob;
use crate::domain::job::errors::QueueError;
use crate::domain::job::repositories::{IJobQueue, QueueDepth};
use crate::domain::job::value_objects::{BatchJobId, BatchJobStatus, JobPriority};
use crate::infrastructure::resilience::{RetryConfig, retry_with_backoff};

/// Redis-backed implementation of [`IJobQueue`]
pub struct RedisJobQueue {
    connection_manager: Arc<ConnectionManager>,
    key_prefix: String,
    max_queue_size: usize,
    retry: RetryConfig,
}

impl RedisJobQueue {
    /// Connect to the shared store and verify it responds
    pub async fn new(
        url: &str,
        key_prefix: &str,
        max_queue_size: usize,
        retry: RetryConfig,
    ) -> Result<Self, QueueError> {
        let client = redis::Client::open(url).map_err(|e| {
            error!("Failed to create Redis client for the job queue: {}", e);
            QueueError::backend(format!("Failed to create Redis client: {}", e))
        })?;

        let connection_manager = ConnectionManager::new(client).await.map_err(|e| {
            error!(
                "Failed to create connection manager for the job queue: {}",
                e
            );
            QueueError::backend(format!("Failed to create connection manager: {}", e))
        })?;

        let mut conn = connection_manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| QueueError::backend(format!("Failed to ping Redis: {}", e)))?;

        debug!("Successfully connected to Redis for the job queue");

        Ok(Self {
            connection_manager: Arc::new(connection_manager),
            key_prefix: key_prefix.to_string(),
            max_queue_size,
            retry,
        })
    }

    fn conn(&self) -> ConnectionManager {
        (*self.connection_manager).clone()
    }

    fn list_key(&self, priority: JobPriority) -> String {
        format!("{}:queue:{}", self.key_prefix, priority.as_str())
    }

    fn job_key(&self, id: &BatchJobId) -> String {
        format!("{}:batch:{}", self.key_prefix, id)
    }

    fn backend_err(e: redis::RedisError) -> QueueError {
        QueueError::backend(e.to_string())
    }

    /// Fetch and decode a payload
    async fn load(&self, id: &BatchJobId) -> Result<Option<BatchJob>, QueueError> {
        let job_key = self.job_key(id);
        let json: Option<String> = retry_with_backoff(&self.retry, || {
            let mut conn = self.conn();
            let job_key = job_key.clone();
            async move {
                redis::cmd("GET")
                    .arg(&job_key)
                    .query_async(&mut conn)
                    .await
                    .map_err(Self::backend_err)
            }
        })
        .await?;

        match json {
            Some(json) => {
                let job = serde_json::from_str(&json)
                    .map_err(|e| QueueError::serialization(e.to_string()))?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    /// Encode and store a payload
    async fn store(&self, job: &BatchJob) -> Result<(), QueueError> {
        let job_key = self.job_key(&job.id);
        let json =
            serde_json::to_string(job).map_err(|e| QueueError::serialization(e.to_string()))?;

        retry_with_backoff(&self.retry, || {
            let mut conn = self.conn();
            let job_key = job_key.clone();
            let json = json.clone();
            async move {
                redis::cmd("SET")
                    .arg(&job_key)
                    .arg(&json)
                    .query_async::<String>(&mut conn)
                    .await
                    .map_err(Self::backend_err)?;
                Ok(())
            }
        })
        .await
    }

    /// Remove an id from both lists, returning how many entries went away
    async fn remove_from_lists(&self, id: &BatchJobId) -> Result<i64, QueueError> {
        let normal_key = self.list_key(JobPriority::Normal);
        let high_key = self.list_key(JobPriority::High);
        let id_str = id.to_string();

        retry_with_backoff(&self.retry, || {
            let mut conn = self.conn();
            let normal_key = normal_key.clone();
            let high_key = high_key.clone();
            let id_str = id_str.clone();
            async move {
                let (normal_removed, high_removed): (i64, i64) = redis::pipe()
                    .cmd("LREM")
                    .arg(&normal_key)
                    .arg(1)
                    .arg(&id_str)
                    .cmd("LREM")
                    .arg(&high_key)
                    .arg(1)
                    .arg(&id_str)
                    .query_async(&mut conn)
                    .await
                    .map_err(Self::backend_err)?;
                Ok(normal_removed + high_removed)
            }
        })
        .await
    }

    /// Decode a popped id, fetch its payload, and mark it dequeued
    async fn claim(&self, id_str: String) -> Result<Option<BatchJob>, QueueError> {
        let id = BatchJobId::new(
            id_str
                .parse()
                .map_err(|e| QueueError::serialization(format!("malformed queued id: {}", e)))?,
        );

        let Some(mut job) = self.load(&id).await? else {
            // Index entry with no payload: the enqueue pipeline makes this
            // unreachable short of manual key deletion
            warn!(batch_id = %id, "Queued id without payload, skipping");
            return Ok(None);
        };

        job.transition(BatchJobStatus::Dequeued);
        self.store(&job).await?;
        debug!(batch_id = %id, priority = %job.priority, "Batch job dequeued");
        Ok(Some(job))
    }
}

#[async_trait]
impl IJobQueue for RedisJobQueue {
    async fn enqueue(&self, job: &BatchJob) -> Result<BatchJobId, QueueError> {
        let depth = self.depth().await?;
        if depth.total() >= self.max_queue_size {
            return Err(QueueError::CapacityExceeded {
                depth: depth.total(),
                ceiling: self.max_queue_size,
            });
        }

        let job_key = self.job_key(&job.id);
        let list_key = self.list_key(job.priority);
        let id_str = job.id.to_string();
        let json =
            serde_json::to_string(job).map_err(|e| QueueError::serialization(e.to_string()))?;

        // Payload write and index insertion commit together or not at all
        retry_with_backoff(&self.retry, || {
            let mut conn = self.conn();
            let job_key = job_key.clone();
            let list_key = list_key.clone();
            let id_str = id_str.clone();
            let json = json.clone();
            async move {
                redis::pipe()
                    .atomic()
                    .cmd("SET")
                    .arg(&job_key)
                    .arg(&json)
                    .ignore()
                    .cmd("RPUSH")
                    .arg(&list_key)
                    .arg(&id_str)
                    .ignore()
                    .query_async::<()>(&mut conn)
                    .await
                    .map_err(Self::backend_err)
            }
        })
        .await?;

        debug!(batch_id = %job.id, priority = %job.priority, "Batch job enqueued");
        Ok(job.id)
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<BatchJob>, QueueError> {
        // Drain the high-priority list first, without blocking
        let high_key = self.list_key(JobPriority::High);
        let high_id: Option<String> = retry_with_backoff(&self.retry, || {
            let mut conn = self.conn();
            let high_key = high_key.clone();
            async move {
                redis::cmd("LPOP")
                    .arg(&high_key)
                    .query_async(&mut conn)
                    .await
                    .map_err(Self::backend_err)
            }
        })
        .await?;

        if let Some(id_str) = high_id {
            return self.claim(id_str).await;
        }

        // Nothing urgent; wait up to `timeout` for normal work. A zero
        // timeout checks without blocking (BLPOP 0 would block forever).
        let normal_key = self.list_key(JobPriority::Normal);
        let normal_id: Option<String> = if timeout.is_zero() {
            retry_with_backoff(&self.retry, || {
                let mut conn = self.conn();
                let normal_key = normal_key.clone();
                async move {
                    redis::cmd("LPOP")
                        .arg(&normal_key)
                        .query_async(&mut conn)
                        .await
                        .map_err(Self::backend_err)
                }
            })
            .await?
        } else {
            let popped: Option<(String, String)> = retry_with_backoff(&self.retry, || {
                let mut conn = self.conn();
                let normal_key = normal_key.clone();
                async move {
                    redis::cmd("BLPOP")
                        .arg(&normal_key)
                        .arg(timeout.as_secs_f64())
                        .query_async(&mut conn)
                        .await
                        .map_err(Self::backend_err)
                }
            })
            .await?;
            popped.map(|(_, id_str)| id_str)
        };

        match normal_id {
            Some(id_str) => self.claim(id_str).await,
            None => Ok(None),
        }
    }

    async fn reprioritize(
        &self,
        id: &BatchJobId,
        new_priority: JobPriority,
    ) -> Result<(), QueueError> {
        let Some(job) = self.load(id).await? else {
            return Err(QueueError::NotFound { id: *id });
        };

        if job.status.is_terminal() || job.priority == new_priority {
            return Ok(());
        }

        let mut updated = job.clone();
        updated.priority = new_priority;

        if job.is_queued() {
            let removed = self.remove_from_lists(id).await?;
            if removed > 0 {
                // Re-insert under the new priority together with the
                // payload update
                let list_key = self.list_key(new_priority);
                let job_key = self.job_key(id);
                let id_str = id.to_string();
                let json = serde_json::to_string(&updated)
                    .map_err(|e| QueueError::serialization(e.to_string()))?;

                retry_with_backoff(&self.retry, || {
                    let mut conn = self.conn();
                    let list_key = list_key.clone();
                    let job_key = job_key.clone();
                    let id_str = id_str.clone();
                    let json = json.clone();
                    async move {
                        redis::pipe()
                            .atomic()
                            .cmd("RPUSH")
                            .arg(&list_key)
                            .arg(&id_str)
                            .ignore()
                            .cmd("SET")
                            .arg(&job_key)
                            .arg(&json)
                            .ignore()
                            .query_async::<()>(&mut conn)
                            .await
                            .map_err(Self::backend_err)
                    }
                })
                .await?;
                debug!(batch_id = %id, priority = %new_priority, "Batch job moved between lists");
                return Ok(());
            }
            // A worker claimed the id between our load and the removal;
            // fall through to the last-write-wins payload update
        }

        self.store(&updated).await?;
        debug!(batch_id = %id, priority = %new_priority, "Batch job priority recorded");
        Ok(())
    }

    async fn cancel(&self, id: &BatchJobId) -> Result<(), QueueError> {
        let Some(mut job) = self.load(id).await? else {
            return Err(QueueError::NotFound { id: *id });
        };

        if job.status.is_terminal() {
            return Ok(());
        }

        self.remove_from_lists(id).await?;
        job.transition(BatchJobStatus::Cancelled);
        self.store(&job).await?;
        debug!(batch_id = %id, "Batch job cancelled");
        Ok(())
    }

    async fn get(&self, id: &BatchJobId) -> Result<Option<BatchJob>, QueueError> {
        self.load(id).await
    }

    async fn update_status(
        &self,
        id: &BatchJobId,
        status: BatchJobStatus,
    ) -> Result<(), QueueError> {
        let Some(mut job) = self.load(id).await? else {
            return Err(QueueError::NotFound { id: *id });
        };

        if !job.transition(status) {
            debug!(
                batch_id = %id,
                from = %job.status,
                to = %status,
                "Ignoring invalid batch status transition"
            );
            return Ok(());
        }
        self.store(&job).await
    }

    async fn depth(&self) -> Result<QueueDepth, QueueError> {
        let normal_key = self.list_key(JobPriority::Normal);
        let high_key = self.list_key(JobPriority::High);

        retry_with_backoff(&self.retry, || {
            let mut conn = self.conn();
            let normal_key = normal_key.clone();
            let high_key = high_key.clone();
            async move {
                let (normal, high): (i64, i64) = redis::pipe()
                    .cmd("LLEN")
                    .arg(&normal_key)
                    .cmd("LLEN")
                    .arg(&high_key)
                    .query_async(&mut conn)
                    .await
                    .map_err(Self::backend_err)?;
                Ok(QueueDepth {
                    normal: normal as usize,
                    high: high as usize,
                })
            }
        })
        .await
    }

    async fn purge(&self) -> Result<(), QueueError> {
        let normal_key = self.list_key(JobPriority::Normal);
        let high_key = self.list_key(JobPriority::High);
        let mut conn = self.conn();

        redis::cmd("DEL")
            .arg(&normal_key)
            .arg(&high_key)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(Self::backend_err)?;

        // Sweep payload keys in batches
        let pattern = format!("{}:batch:*", self.key_prefix);
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(Self::backend_err)?;

            if !keys.is_empty() {
                redis::cmd("DEL")
                    .arg(&keys)
                    .query_async::<i64>(&mut conn)
                    .await
                    .map_err(Self::backend_err)?;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(())
    }
}
