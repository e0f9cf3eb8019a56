//! The core module of the classification pipeline.
//!
//! This module contains the fundamental components shared by every stage:
//! - Tensor type aliases
//! - Configuration management
//! - Constants fixing the preprocessing contract
//! - Error handling
//! - ONNX Runtime inference plumbing
//!
//! It also provides re-exports of commonly used types for convenience.

pub mod batch;
pub mod config;
pub mod constants;
pub mod errors;
pub mod inference;

pub use batch::{Tensor2D, Tensor4D};
pub use config::{ConfigError, ConfigValidator, EngineConfig, OrtSessionConfig};
pub use constants::*;
pub use errors::{ProcessingStage, SmearError, SmearResult};
pub use inference::OrtInfer;
