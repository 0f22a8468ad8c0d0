//! Rate Limiting Infrastructure
//!
//! This module provides the admission-control counters:
//! - Fixed per-minute and per-day windows with a single atomic
//!   test-and-increment per identity
//! - Tier-based quotas (public < keyed < partner)
//! - Redis storage for one global quota per identity across instances,
//!   in-memory storage for single-process deployments and tests

pub mod fixed_window;
pub mod service;
pub mod storage;
pub mod types;

pub use service::RateLimiterService;
pub use types::{RateLimitKey, RateLimitResult};
