//! Application services: job supervision, batch processing, admission

pub mod admission;
pub mod jobs;
