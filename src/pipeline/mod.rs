//! The analyze-and-record service and the statistics computed over its records.
//!
//! An [`Analyzer`] ties an [`InferenceEngine`](crate::predictor::InferenceEngine)
//! to an [`AnalysisStore`](crate::storage::AnalysisStore): every successful
//! prediction becomes an [`AnalysisRecord`](crate::domain::AnalysisRecord),
//! failed predictions leave the store untouched.

pub mod analyzer;
pub mod stats;

pub use analyzer::{AnalysisReceipt, AnalysisRequest, Analyzer};
pub use stats::{AnalysisStats, StatsAggregator, month_start, week_start};
