//! Mock implementations of the external collaborator traits

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use observatory_core::domain::job::entities::BatchOutcome;
use observatory_core::domain::job::errors::TaskError;
use observatory_core::domain::job::traits::{
    AnalysisEngine, IResultStore, ResultStoreError,
};

/// Analysis engine double with configurable latency and failures
pub struct MockAnalysisEngine {
    delay: Option<Duration>,
    fail_on: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl MockAnalysisEngine {
    pub fn new() -> Self {
        Self {
            delay: None,
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sleep this long per conversation before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail analysis for this conversation id
    pub fn failing_on(mut self, conversation_id: &str) -> Self {
        self.fail_on = Some(conversation_id.to_string());
        self
    }

    /// Conversation ids analyzed so far
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

impl Default for MockAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisEngine for MockAnalysisEngine {
    async fn analyze(
        &self,
        conversation_id: &str,
        _options: &Map<String, Value>,
    ) -> Result<Value, TaskError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().await.push(conversation_id.to_string());

        if self.fail_on.as_deref() == Some(conversation_id) {
            return Err(TaskError::new(format!(
                "analysis failed for {}",
                conversation_id
            )));
        }

        Ok(json!({
            "conversation_id": conversation_id,
            "patterns": ["mirroring"],
            "confidence_score": 0.87,
        }))
    }
}

/// Result store double that records every terminal outcome
pub struct RecordingResultStore {
    outcomes: Arc<Mutex<Vec<BatchOutcome>>>,
}

impl RecordingResultStore {
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn outcomes(&self) -> Vec<BatchOutcome> {
        self.outcomes.lock().await.clone()
    }
}

impl Default for RecordingResultStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IResultStore for RecordingResultStore {
    async fn record_batch(&self, outcome: &BatchOutcome) -> Result<(), ResultStoreError> {
        self.outcomes.lock().await.push(outcome.clone());
        Ok(())
    }
}
