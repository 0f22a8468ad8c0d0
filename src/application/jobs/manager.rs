//! In-process job lifecycle manager
//!
//! Runs each unit of analysis work as an independently cancellable,
//! timeout-bound task and answers status queries for it. Cancellation is
//! cooperative: a request takes effect at the task's next suspension
//! point. The guarantee this module makes is bookkeeping correctness
//! (every created job reaches exactly one terminal state), not
//! instantaneous halt.

use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::JobsConfig;
use crate::domain::job::entities::Job;
use crate::domain::job::errors::{JobError, TaskError};
use crate::domain::job::value_objects::{JobId, JobStatus};

/// Outcome of a supervised task
enum Outcome {
    Completed(Value),
    Failed(String),
    Cancelled,
    TimedOut,
}

struct JobHandle {
    job: Job,
    cancel: CancellationToken,
    supervisor: Option<JoinHandle<()>>,
}

/// Supervisor for cancellable, timeout-bound analysis jobs.
///
/// The job table is the only state shared across jobs; registration,
/// lookup, and status mutation all happen under its lock.
pub struct JobManager {
    jobs: Arc<Mutex<HashMap<JobId, JobHandle>>>,
    grace: Duration,
}

impl JobManager {
    /// Create a manager with the configured cancellation grace period
    pub fn new(config: &JobsConfig) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            grace: config.cancel_grace(),
        }
    }

    /// Register a new job and schedule `task` for concurrent execution.
    ///
    /// Returns the job id without waiting for completion. `timeout`, when
    /// given, bounds total wall-clock execution; once it elapses the task
    /// is cancelled and given the grace period to unwind.
    pub async fn create<F>(&self, task: F, timeout: Option<Duration>) -> JobId
    where
        F: Future<Output = Result<Value, TaskError>> + Send + 'static,
    {
        let id = JobId::generate();
        let cancel = CancellationToken::new();

        {
            let mut jobs = self.jobs.lock().await;
            jobs.insert(
                id,
                JobHandle {
                    job: Job::pending(id, timeout, Utc::now()),
                    cancel: cancel.clone(),
                    supervisor: None,
                },
            );
        }

        let jobs = Arc::clone(&self.jobs);
        let token = cancel.clone();
        let grace = self.grace;
        let supervisor = tokio::spawn(async move {
            // A cancel that lands before this point wins: the task is
            // dropped without ever being polled
            let proceed = {
                let mut jobs = jobs.lock().await;
                match jobs.get_mut(&id) {
                    Some(handle) => !token.is_cancelled() && handle.job.mark_running(Utc::now()),
                    None => false,
                }
            };
            if !proceed {
                debug!(job_id = %id, "Job cancelled before start");
                return;
            }

            let outcome = supervise(tokio::spawn(task), timeout, &token, grace).await;

            // Unconditional finalization: exactly one terminal transition,
            // no matter which path the supervision took
            let mut jobs = jobs.lock().await;
            if let Some(handle) = jobs.get_mut(&id) {
                let now = Utc::now();
                let applied = match outcome {
                    Outcome::Completed(value) => handle.job.mark_completed(value, now),
                    Outcome::Failed(error) => handle.job.mark_failed(error, now),
                    Outcome::Cancelled => handle.job.mark_cancelled(now),
                    Outcome::TimedOut => handle.job.mark_timed_out(now),
                };
                if !applied {
                    // Already terminal (e.g. a direct cancel raced us)
                    debug!(
                        job_id = %id,
                        status = %handle.job.status(),
                        "Job already terminal at finalization"
                    );
                }
            }
        });

        let mut jobs = self.jobs.lock().await;
        if let Some(handle) = jobs.get_mut(&id) {
            handle.supervisor = Some(supervisor);
        }

        id
    }

    /// Current immutable snapshot of a job
    pub async fn status(&self, job_id: &JobId) -> Result<Job, JobError> {
        let jobs = self.jobs.lock().await;
        jobs.get(job_id)
            .map(|handle| handle.job.clone())
            .ok_or(JobError::NotFound { job_id: *job_id })
    }

    /// Result of a completed job; `None` for any other state
    pub async fn result(&self, job_id: &JobId) -> Result<Option<Value>, JobError> {
        let jobs = self.jobs.lock().await;
        let handle = jobs
            .get(job_id)
            .ok_or(JobError::NotFound { job_id: *job_id })?;
        Ok(handle.job.result().cloned())
    }

    /// Request cooperative cancellation.
    ///
    /// Idempotent: cancelling a terminal job changes nothing and does not
    /// error. A pending job that has not started is marked cancelled
    /// directly and its task never runs.
    pub async fn cancel(&self, job_id: &JobId) -> Result<(), JobError> {
        let mut jobs = self.jobs.lock().await;
        let handle = jobs
            .get_mut(job_id)
            .ok_or(JobError::NotFound { job_id: *job_id })?;

        match handle.job.status() {
            JobStatus::Pending => {
                handle.cancel.cancel();
                handle.job.mark_cancelled(Utc::now());
                debug!(job_id = %job_id, "Pending job cancelled before start");
            }
            JobStatus::Running => {
                handle.cancel.cancel();
                debug!(job_id = %job_id, "Cancellation requested for running job");
            }
            _ => {}
        }

        Ok(())
    }

    /// Number of tracked jobs (the manager never garbage-collects;
    /// expiry belongs to the external results store)
    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// Whether no jobs are tracked
    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }

    /// Cancel all live jobs and wait for their supervisors to finish, so
    /// shutdown never abandons a running record.
    pub async fn shutdown(&self) {
        let supervisors: Vec<JoinHandle<()>> = {
            let mut jobs = self.jobs.lock().await;
            let now = Utc::now();
            jobs.values_mut()
                .filter_map(|handle| {
                    match handle.job.status() {
                        JobStatus::Pending => {
                            handle.cancel.cancel();
                            handle.job.mark_cancelled(now);
                        }
                        JobStatus::Running => handle.cancel.cancel(),
                        _ => {}
                    }
                    handle.supervisor.take()
                })
                .collect()
        };

        for supervisor in supervisors {
            if let Err(e) = supervisor.await {
                warn!("Supervisor task ended abnormally during shutdown: {}", e);
            }
        }
    }
}

/// Await the task under its optional timeout, honoring cancellation.
/// Each exit path stops the underlying task and allows it a bounded grace
/// period to unwind before the outcome is reported.
async fn supervise(
    mut task: JoinHandle<Result<Value, TaskError>>,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
    grace: Duration,
) -> Outcome {
    tokio::select! {
        _ = cancel.cancelled() => {
            task.abort();
            let _ = tokio::time::timeout(grace, &mut task).await;
            Outcome::Cancelled
        }
        bounded = run_bounded(&mut task, timeout) => match bounded {
            Some(Ok(Ok(value))) => Outcome::Completed(value),
            Some(Ok(Err(task_error))) => Outcome::Failed(task_error.to_string()),
            Some(Err(join_error)) => Outcome::Failed(describe_join_error(join_error)),
            None => {
                task.abort();
                let _ = tokio::time::timeout(grace, &mut task).await;
                Outcome::TimedOut
            }
        }
    }
}

/// Await the task, returning `None` once the timeout elapses
async fn run_bounded(
    task: &mut JoinHandle<Result<Value, TaskError>>,
    timeout: Option<Duration>,
) -> Option<Result<Result<Value, TaskError>, JoinError>> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, task).await.ok(),
        None => Some(task.await),
    }
}

fn describe_join_error(error: JoinError) -> String {
    if error.is_panic() {
        "analysis task panicked".to_string()
    } else {
        "analysis task was aborted".to_string()
    }
}
