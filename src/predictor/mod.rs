//! The inference engine and the health check built on it.
//!
//! - [`InferenceEngine`] decodes, preprocesses, classifies and ranks one image
//!   per call, loading its model lazily and at most once.
//! - [`health_check`] runs a synthetic image through the full predict cycle.

pub mod engine;
pub mod health;

pub use engine::InferenceEngine;
pub use health::{HealthReport, HealthStatus, health_check};
