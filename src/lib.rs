//! # bloodsmear
//!
//! Classifies microscope images of blood smears into disease categories with
//! an ONNX-exported convolutional classifier, and records each classification
//! as an auditable analysis for later retrieval and statistics.
//!
//! ## Features
//!
//! - Deterministic preprocessing matching the training transform
//!   (224×224 bilinear resize, ImageNet mean/std normalization)
//! - Softmax output ranked by confidence with stable tie-breaking
//! - Lazy model loading that builds the model at most once, even under
//!   concurrent first requests, with caller-side load timeouts
//! - Append-only analysis stores (in-memory and JSON lines) with weekly and
//!   monthly statistics
//! - ONNX Runtime integration with session pooling and optional CUDA
//!
//! ## Modules
//!
//! * [`core`] - Errors, configuration, constants and ONNX Runtime plumbing
//! * [`domain`] - Prediction results and analysis records
//! * [`models`] - Classifier trait, checkpoint loading and the model handle
//! * [`predictor`] - The inference engine and health check
//! * [`processors`] - Decoding, preprocessing and ranking
//! * [`storage`] - Analysis stores
//! * [`pipeline`] - Analyze-and-record service and statistics
//! * [`utils`] - Image encoding helpers and logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bloodsmear::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::new("models/best_model.json").with_env_overrides();
//! let engine = Arc::new(InferenceEngine::from_config(&config));
//! let analyzer = Analyzer::new(engine, MemoryAnalysisStore::new());
//!
//! let image = std::fs::read("smear.png")?;
//! let payload = bloodsmear::utils::encode_png_base64(&image::load_from_memory(&image)?.to_rgb8())?;
//! let receipt = analyzer.analyze(AnalysisRequest::new(payload).subject("patient-17"))?;
//! println!(
//!     "{} ({:.1}%)",
//!     receipt.result.predicted_class(),
//!     receipt.result.confidence() * 100.0
//! );
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod domain;
pub mod models;
pub mod pipeline;
pub mod predictor;
pub mod processors;
pub mod storage;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use bloodsmear::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::config::{EngineConfig, OrtExecutionProvider, OrtSessionConfig};
    pub use crate::core::errors::{SmearError, SmearResult};
    pub use crate::domain::{AnalysisRecord, DiseaseScore, PredictionResult, PredictionStatus};
    pub use crate::models::{CheckpointLoader, ClassLabelSet, ModelHandle, ModelLoader};
    pub use crate::pipeline::{AnalysisReceipt, AnalysisRequest, AnalysisStats, Analyzer};
    pub use crate::predictor::{HealthReport, InferenceEngine, health_check};
    pub use crate::storage::{AnalysisStore, JsonlAnalysisStore, MemoryAnalysisStore};
}
