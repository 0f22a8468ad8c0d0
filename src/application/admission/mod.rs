//! Admission control: credential resolution plus rate limiting

pub mod use_cases;

pub use use_cases::{Admission, AdmissionService, AuthResolver};
