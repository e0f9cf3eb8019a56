//! Domain-level structures shared across the classification pipeline.
//!
//! This module groups the prediction result produced by the inference engine
//! and the analysis record persisted for every successful classification.

pub mod prediction;
pub mod record;

pub use prediction::{DiseaseScore, PredictionResult, PredictionStatus};
pub use record::AnalysisRecord;
