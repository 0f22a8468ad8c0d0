//! Batch worker
//!
//! Pulls batch jobs from the durable queue and drives each one through the
//! job manager. Per-conversation analysis failures are recorded in the
//! batch outcome rather than failing the whole batch; a cancel recorded on
//! the queue payload is honored cooperatively between conversations.

use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::manager::JobManager;
use crate::config::Config;
use crate::domain::job::entities::{BatchJob, BatchOutcome};
use crate::domain::job::errors::QueueError;
use crate::domain::job::repositories::IJobQueue;
use crate::domain::job::traits::{AnalysisEngine, IResultStore};
use crate::domain::job::value_objects::{BatchJobStatus, JobStatus};

/// How often a driven job is checked for terminal state and the queue
/// payload for a cooperative cancel
const DRIVE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Worker loop consuming the batch queue
pub struct BatchWorker {
    queue: Arc<dyn IJobQueue>,
    manager: Arc<JobManager>,
    engine: Arc<dyn AnalysisEngine>,
    results: Arc<dyn IResultStore>,
    poll_timeout: Duration,
    job_timeout: Duration,
    shutdown: CancellationToken,
}

impl BatchWorker {
    /// Create a worker with its collaborators
    pub fn new(
        queue: Arc<dyn IJobQueue>,
        manager: Arc<JobManager>,
        engine: Arc<dyn AnalysisEngine>,
        results: Arc<dyn IResultStore>,
        config: &Config,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            queue,
            manager,
            engine,
            results,
            poll_timeout: config.queue.poll_timeout(),
            job_timeout: config.jobs.analysis_timeout(),
            shutdown,
        }
    }

    /// Run until the shutdown token fires. Transient queue errors are
    /// logged and the loop continues after a brief pause; work is never
    /// silently dropped.
    pub async fn run(&self) {
        info!("Batch worker started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Batch worker shutting down");
                    break;
                }
                claimed = self.queue.dequeue(self.poll_timeout) => match claimed {
                    Ok(Some(job)) => {
                        let batch_id = job.id;
                        if let Err(e) = self.process(job).await {
                            error!(batch_id = %batch_id, error = %e, "Batch processing failed");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        error!(error = %e, "Worker failed to dequeue");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        info!("Batch worker stopped");
    }

    /// Process one claimed batch job end to end
    async fn process(&self, job: BatchJob) -> Result<(), QueueError> {
        let batch_id = job.id;
        let total = job.conversation_ids.len();

        // Honor a cancel that raced the claim
        if let Some(current) = self.queue.get(&batch_id).await? {
            if current.is_cancelled() {
                debug!(batch_id = %batch_id, "Skipping batch cancelled before processing");
                self.record(&job, BatchJobStatus::Cancelled, json!({}), 0, 0)
                    .await;
                return Ok(());
            }
        }

        self.queue
            .update_status(&batch_id, BatchJobStatus::Running)
            .await?;
        info!(
            batch_id = %batch_id,
            conversations = total,
            "Processing batch"
        );

        let engine = Arc::clone(&self.engine);
        let conversation_ids = job.conversation_ids.clone();
        let options = job.options.clone();
        let task = async move {
            let mut per_conversation = Map::new();
            let mut completed_count = 0usize;
            let mut failed_count = 0usize;

            for conversation_id in conversation_ids {
                match engine.analyze(&conversation_id, &options).await {
                    Ok(result) => {
                        completed_count += 1;
                        per_conversation.insert(
                            conversation_id,
                            json!({"status": "completed", "result": result}),
                        );
                    }
                    Err(e) => {
                        warn!(
                            conversation_id = %conversation_id,
                            error = %e,
                            "Conversation analysis failed"
                        );
                        failed_count += 1;
                        per_conversation.insert(
                            conversation_id,
                            json!({"status": "failed", "error": e.to_string()}),
                        );
                    }
                }
            }

            Ok(json!({
                "results": Value::Object(per_conversation),
                "completed_count": completed_count,
                "failed_count": failed_count,
            }))
        };

        let job_id = self.manager.create(task, Some(self.job_timeout)).await;

        // Drive to terminal state, relaying queue-side cancels to the
        // manager as they appear
        let snapshot = loop {
            tokio::time::sleep(DRIVE_POLL_INTERVAL).await;

            if let Ok(Some(current)) = self.queue.get(&batch_id).await {
                if current.is_cancelled() {
                    let _ = self.manager.cancel(&job_id).await;
                }
            }

            match self.manager.status(&job_id).await {
                Ok(snapshot) if snapshot.status().is_terminal() => break snapshot,
                Ok(_) => {}
                Err(e) => {
                    error!(batch_id = %batch_id, error = %e, "Driven job vanished");
                    return Ok(());
                }
            }
        };

        let status = match snapshot.status() {
            JobStatus::Completed => BatchJobStatus::Completed,
            JobStatus::Cancelled => BatchJobStatus::Cancelled,
            _ => BatchJobStatus::Failed,
        };

        let (results, completed_count, failed_count) = match snapshot.result() {
            Some(summary) => (
                summary.get("results").cloned().unwrap_or(json!({})),
                summary
                    .get("completed_count")
                    .and_then(Value::as_u64)
                    .unwrap_or(0) as usize,
                summary
                    .get("failed_count")
                    .and_then(Value::as_u64)
                    .unwrap_or(0) as usize,
            ),
            None => (
                json!({"error": snapshot.error().unwrap_or(snapshot.status().as_str())}),
                0,
                if status == BatchJobStatus::Failed {
                    total
                } else {
                    0
                },
            ),
        };

        self.queue.update_status(&batch_id, status).await?;
        self.record(&job, status, results, completed_count, failed_count)
            .await;

        info!(
            batch_id = %batch_id,
            status = %status,
            completed = completed_count,
            failed = failed_count,
            "Batch finished"
        );
        Ok(())
    }

    /// Hand the terminal outcome to the external results store
    async fn record(
        &self,
        job: &BatchJob,
        status: BatchJobStatus,
        results: Value,
        completed_count: usize,
        failed_count: usize,
    ) {
        let outcome = BatchOutcome {
            batch_id: job.id,
            status,
            total_conversations: job.conversation_ids.len(),
            completed_count,
            failed_count,
            results,
            finished_at: chrono::Utc::now(),
        };

        if let Err(e) = self.results.record_batch(&outcome).await {
            error!(batch_id = %job.id, error = %e, "Failed to record batch outcome");
        }
    }
}
