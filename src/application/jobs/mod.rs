//! Job supervision and batch processing

pub mod manager;
pub mod worker;

pub use manager::JobManager;
pub use worker::BatchWorker;
