//! Integration tests for the batch worker

mod common;

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use common::{batch_job, conversation_ids, test_config, MockAnalysisEngine, RecordingResultStore};
use observatory_core::application::jobs::{BatchWorker, JobManager};
use observatory_core::domain::job::entities::BatchOutcome;
use observatory_core::domain::job::repositories::IJobQueue;
use observatory_core::domain::job::value_objects::{BatchJobStatus, JobPriority};
use observatory_core::infrastructure::queue::InMemoryJobQueue;

struct Harness {
    queue: Arc<InMemoryJobQueue>,
    engine: Arc<MockAnalysisEngine>,
    results: Arc<RecordingResultStore>,
    shutdown: CancellationToken,
    worker: tokio::task::JoinHandle<()>,
}

impl Harness {
    fn start(engine: MockAnalysisEngine) -> Self {
        let config = test_config();
        let queue = Arc::new(InMemoryJobQueue::new(config.queue.max_queue_size));
        let manager = Arc::new(JobManager::new(&config.jobs));
        let engine = Arc::new(engine);
        let results = Arc::new(RecordingResultStore::new());
        let shutdown = CancellationToken::new();

        let queue_handle: Arc<dyn IJobQueue> = queue.clone();
        let worker = BatchWorker::new(
            queue_handle,
            manager,
            engine.clone(),
            results.clone(),
            &config,
            shutdown.clone(),
        );
        let worker = tokio::spawn(async move { worker.run().await });

        Self {
            queue,
            engine,
            results,
            shutdown,
            worker,
        }
    }

    async fn wait_for_outcome(&self, within: Duration) -> BatchOutcome {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            if let Some(outcome) = self.results.outcomes().await.into_iter().next() {
                return outcome;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "no batch outcome recorded within {:?}",
                within
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    async fn stop(self) {
        self.shutdown.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.worker).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn worker_processes_a_batch_end_to_end() {
    let harness = Harness::start(MockAnalysisEngine::new());
    let job = batch_job(conversation_ids(3), JobPriority::Normal);
    let batch_id = harness.queue.enqueue(&job).await.unwrap();

    let outcome = harness.wait_for_outcome(Duration::from_secs(10)).await;
    assert_eq!(outcome.batch_id, batch_id);
    assert_eq!(outcome.status, BatchJobStatus::Completed);
    assert_eq!(outcome.total_conversations, 3);
    assert_eq!(outcome.completed_count, 3);
    assert_eq!(outcome.failed_count, 0);

    // Every conversation went through the engine once
    let mut calls = harness.engine.calls().await;
    calls.sort();
    assert_eq!(calls, conversation_ids(3));

    // The payload carries the terminal status
    let payload = harness.queue.get(&batch_id).await.unwrap().unwrap();
    assert_eq!(payload.status, BatchJobStatus::Completed);

    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn per_conversation_failures_do_not_fail_the_batch() {
    let harness = Harness::start(MockAnalysisEngine::new().failing_on("conv-1"));
    let job = batch_job(conversation_ids(3), JobPriority::Normal);
    harness.queue.enqueue(&job).await.unwrap();

    let outcome = harness.wait_for_outcome(Duration::from_secs(10)).await;
    assert_eq!(outcome.status, BatchJobStatus::Completed);
    assert_eq!(outcome.completed_count, 2);
    assert_eq!(outcome.failed_count, 1);

    let failed_entry = &outcome.results["conv-1"];
    assert_eq!(failed_entry["status"], "failed");
    assert!(
        failed_entry["error"]
            .as_str()
            .unwrap()
            .contains("conv-1")
    );

    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_during_processing_is_honored_cooperatively() {
    // 200ms per conversation over 20 conversations: plenty of time to
    // cancel mid-flight
    let harness = Harness::start(
        MockAnalysisEngine::new().with_delay(Duration::from_millis(200)),
    );
    let job = batch_job(conversation_ids(20), JobPriority::Normal);
    let batch_id = harness.queue.enqueue(&job).await.unwrap();

    // Wait until the worker has claimed the batch
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let payload = harness.queue.get(&batch_id).await.unwrap().unwrap();
        if payload.status == BatchJobStatus::Running {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "batch never started");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    harness.queue.cancel(&batch_id).await.unwrap();

    let outcome = harness.wait_for_outcome(Duration::from_secs(10)).await;
    assert_eq!(outcome.status, BatchJobStatus::Cancelled);

    // Cooperative stop: nowhere near all conversations were analyzed
    assert!(harness.engine.calls().await.len() < 20);

    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn batch_cancelled_before_claim_never_runs() {
    // Stall the worker on an earlier slow batch so the second stays queued
    let harness = Harness::start(
        MockAnalysisEngine::new().with_delay(Duration::from_millis(300)),
    );
    let blocker = batch_job(conversation_ids(5), JobPriority::Normal);
    harness.queue.enqueue(&blocker).await.unwrap();

    let victim = batch_job(vec!["conv-victim".to_string()], JobPriority::Normal);
    let victim_id = harness.queue.enqueue(&victim).await.unwrap();
    harness.queue.cancel(&victim_id).await.unwrap();

    // The blocker completes; the cancelled batch is skipped entirely
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let calls = harness.engine.calls().await;
        if calls.len() >= 5 {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "blocker never finished");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(
        !harness
            .engine
            .calls()
            .await
            .contains(&"conv-victim".to_string())
    );

    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_token_stops_the_loop() {
    let harness = Harness::start(MockAnalysisEngine::new());
    tokio::time::sleep(Duration::from_millis(50)).await;

    harness.shutdown.cancel();
    let stopped = tokio::time::timeout(Duration::from_secs(5), harness.worker).await;
    assert!(stopped.is_ok(), "worker did not stop after shutdown signal");
}
