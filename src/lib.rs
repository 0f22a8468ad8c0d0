//! Observatory Core - Job execution core for the Observatory
//! conversation-analysis service
//!
//! This crate provides the asynchronous machinery every entry point of the
//! service funnels through:
//!
//! # Modules
//!
//! - [`config`] — Strongly-typed configuration with file and environment variable support
//! - [`domain`] — Core domain models, entities, and value objects
//! - [`application`] — Job supervision, the batch worker, and the admission gate
//! - [`infrastructure`] — Queue, rate-limit, and credential storage implementations
//! - [`logging`] — Structured logging with tracing
//!
//! # Architecture
//!
//! The crate follows Domain-Driven Design principles:
//!
//! ```text
//! observatory-core/
//! ├── domain/           # Pure business logic
//! │   ├── auth/         # Tiers, credential records, registry trait
//! │   └── job/          # Jobs, batch jobs, queue trait
//! ├── application/      # Job manager, batch worker, admission gate
//! ├── infrastructure/   # Redis and in-memory backends
//! │   ├── auth/         # Credential hashing and registries
//! │   ├── queue/        # Durable priority queue
//! │   └── rate_limiter/ # Windowed admission counters
//! └── config/           # Configuration management
//! ```
//!
//! # Configuration
//!
//! Load configuration from files and environment:
//!
//! ```rust,ignore
//! use observatory_core::Config;
//!
//! let config = Config::load()?;
//! ```
//!
//! Environment variables use the `OBSERVATORY__` prefix with double
//! underscore separators:
//!
//! ```bash
//! OBSERVATORY__STORAGE__URL=redis://localhost:6379
//! OBSERVATORY__QUEUE__MAX_QUEUE_SIZE=10000
//! ```
//!
//! # Cancellation contract
//!
//! Cancellation everywhere in this crate is cooperative: a cancel request is
//! honored at the task's next suspension point, never preemptively. The
//! bookkeeping guarantee is that every job reaches exactly one terminal
//! state, not that work halts instantaneously.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

pub use application::admission::AdmissionService;
pub use application::jobs::{BatchWorker, JobManager};
pub use config::Config;
pub use logging::init_tracing;
