//! Integration tests for job lifecycle supervision

mod common;

use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;

use observatory_core::application::jobs::JobManager;
use observatory_core::config::JobsConfig;
use observatory_core::domain::job::value_objects::{JobId, JobStatus};

fn manager() -> JobManager {
    JobManager::new(&JobsConfig {
        analysis_timeout_seconds: 5,
        cancel_grace_seconds: 1,
    })
}

/// Position in the lifecycle; terminal states share the final slot
fn lifecycle_rank(status: JobStatus) -> u8 {
    match status {
        JobStatus::Pending => 0,
        JobStatus::Running => 1,
        _ => 2,
    }
}

async fn wait_terminal(manager: &JobManager, id: &JobId) -> JobStatus {
    loop {
        let status = manager.status(id).await.unwrap().status();
        if status.is_terminal() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

#[tokio::test]
async fn observed_transitions_never_regress() {
    let manager = manager();
    let id = manager
        .create(
            async {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok(json!({"ok": true}))
            },
            None,
        )
        .await;

    let mut observed = Vec::new();
    loop {
        let status = manager.status(&id).await.unwrap().status();
        observed.push(status);
        if status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    for pair in observed.windows(2) {
        assert!(
            lifecycle_rank(pair[0]) <= lifecycle_rank(pair[1]),
            "status regressed: {:?} -> {:?}",
            pair[0],
            pair[1]
        );
    }

    // Exactly one terminal state, observed stably afterwards
    assert_eq!(observed.last(), Some(&JobStatus::Completed));
    let after = manager.status(&id).await.unwrap().status();
    assert_eq!(after, JobStatus::Completed);
}

#[tokio::test]
async fn timeout_is_bounded_by_grace_period() {
    let manager = manager();
    let started = Instant::now();

    let id = manager
        .create(
            async {
                // Never completes on its own
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(json!({}))
            },
            Some(Duration::from_millis(50)),
        )
        .await;

    let status = wait_terminal(&manager, &id).await;
    let elapsed = started.elapsed();

    assert_eq!(status, JobStatus::TimedOut);
    // Timeout (50ms) plus grace (1s) plus scheduling slack
    assert!(
        elapsed < Duration::from_secs(3),
        "job took {:?} to time out",
        elapsed
    );
}

#[tokio::test]
async fn repeated_cancel_returns_the_same_terminal_state() {
    let manager = manager();
    let id = manager
        .create(
            async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(json!({}))
            },
            None,
        )
        .await;

    // First cancel settles the job
    manager.cancel(&id).await.unwrap();
    let first = wait_terminal(&manager, &id).await;
    assert_eq!(first, JobStatus::Cancelled);

    // Further cancels are no-ops that never raise or mutate
    for _ in 0..3 {
        manager.cancel(&id).await.unwrap();
        assert_eq!(
            manager.status(&id).await.unwrap().status(),
            JobStatus::Cancelled
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn jobs_created_concurrently_all_reach_terminal_states() {
    let manager = std::sync::Arc::new(manager());

    let mut ids = Vec::new();
    for i in 0..16u64 {
        let id = manager
            .create(
                async move {
                    tokio::time::sleep(Duration::from_millis(5 + (i % 4) * 10)).await;
                    Ok(json!({ "index": i }))
                },
                Some(Duration::from_secs(5)),
            )
            .await;
        ids.push(id);
    }

    for id in &ids {
        let status = wait_terminal(&manager, id).await;
        assert_eq!(status, JobStatus::Completed);
    }
    assert_eq!(manager.len().await, 16);
}

#[tokio::test]
async fn timestamps_track_the_lifecycle() {
    let manager = manager();
    let id = manager.create(async { Ok(json!(1)) }, None).await;
    wait_terminal(&manager, &id).await;

    let job = manager.status(&id).await.unwrap();
    let started = job.started_at().unwrap();
    let completed = job.completed_at().unwrap();
    assert!(job.created_at() <= started);
    assert!(started <= completed);
}
