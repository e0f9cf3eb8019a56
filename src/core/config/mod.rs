//! Configuration types for the classification engine.

pub mod engine;
pub mod errors;
pub mod onnx;

pub use engine::{EngineConfig, MODEL_PATH_ENV};
pub use errors::{ConfigError, ConfigValidator};
pub use onnx::{OrtExecutionProvider, OrtGraphOptimizationLevel, OrtSessionConfig};
