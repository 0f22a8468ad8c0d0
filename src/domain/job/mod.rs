//! Job and batch job domain model

pub mod entities;
pub mod errors;
pub mod repositories;
pub mod traits;
pub mod value_objects;

pub use entities::{BatchJob, BatchOutcome, Job};
pub use errors::{JobError, QueueError, TaskError, ValidationError};
pub use repositories::{IJobQueue, QueueDepth};
pub use traits::{AnalysisEngine, IResultStore, ResultStoreError};
pub use value_objects::{BatchJobId, BatchJobStatus, JobId, JobPriority, JobStatus};
