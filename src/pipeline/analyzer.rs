//! Classify-then-record service.

use super::stats::{AnalysisStats, StatsAggregator};
use crate::core::constants::DEFAULT_LIST_LIMIT;
use crate::core::errors::{SmearError, SmearResult};
use crate::domain::{AnalysisRecord, PredictionResult};
use crate::predictor::{HealthReport, InferenceEngine, health_check};
use crate::storage::AnalysisStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// One image to analyze.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Base64 image, optionally `data:<mime>;base64,` prefixed.
    pub image: String,
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub notes: String,
}

impl AnalysisRequest {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    pub fn subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// What the caller gets back for a recorded analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReceipt {
    pub analysis_id: Uuid,
    pub result: PredictionResult,
}

/// Runs predictions and records the successful ones.
#[derive(Debug)]
pub struct Analyzer<S> {
    engine: Arc<InferenceEngine>,
    store: S,
}

impl<S: AnalysisStore> Analyzer<S> {
    pub fn new(engine: Arc<InferenceEngine>, store: S) -> Self {
        Self { engine, store }
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Classifies `request.image` and appends the result to the store.
    ///
    /// # Errors
    ///
    /// - [`SmearError::InvalidInput`] when the image is empty.
    /// - [`SmearError::PredictionFailed`] when the prediction has status
    ///   error; nothing is appended.
    /// - Service faults from [`InferenceEngine::predict`] and store failures
    ///   from [`AnalysisStore::append`].
    pub fn analyze(&self, request: AnalysisRequest) -> SmearResult<AnalysisReceipt> {
        if request.image.trim().is_empty() {
            return Err(SmearError::invalid_input("No image data provided"));
        }

        let result = self.engine.predict(&request.image)?;
        if !result.is_success() {
            return Err(SmearError::PredictionFailed {
                message: result
                    .error_message()
                    .unwrap_or("prediction failed")
                    .to_string(),
            });
        }

        let record = AnalysisRecord::new(request.subject_id, request.notes, result.clone());
        let analysis_id = record.analysis_id;
        self.store.append(record).inspect_err(|e| {
            error!(%analysis_id, "Failed to record analysis: {}", e);
        })?;

        info!(
            %analysis_id,
            predicted_class = result.predicted_class(),
            confidence = result.confidence(),
            "Analysis recorded"
        );
        Ok(AnalysisReceipt {
            analysis_id,
            result,
        })
    }

    /// The newest recorded analyses of `subject_id`.
    pub fn results(&self, subject_id: Option<&str>) -> SmearResult<Vec<AnalysisRecord>> {
        self.store.list(subject_id, DEFAULT_LIST_LIMIT)
    }

    pub fn stats(&self, subject_id: Option<&str>) -> SmearResult<AnalysisStats> {
        self.stats_at(subject_id, Utc::now())
    }

    pub fn stats_at(
        &self,
        subject_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> SmearResult<AnalysisStats> {
        StatsAggregator::new(&self.store).stats(subject_id, now)
    }

    pub fn health(&self) -> HealthReport {
        health_check(&self.engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelHandle;
    use crate::models::testing::intensity_handle;
    use crate::storage::{JsonlAnalysisStore, MemoryAnalysisStore};
    use crate::utils::{encode_png_base64, solid_rgb_image};

    fn analyzer() -> Analyzer<MemoryAnalysisStore> {
        let engine = InferenceEngine::new(Arc::new(|| intensity_handle(10)));
        Analyzer::new(Arc::new(engine), MemoryAnalysisStore::new())
    }

    fn image_payload() -> String {
        let png = encode_png_base64(&solid_rgb_image(64, 48, [200, 30, 120])).unwrap();
        format!("data:image/png;base64,{png}")
    }

    #[test]
    fn test_analyze_records_success() {
        let analyzer = analyzer();
        let receipt = analyzer
            .analyze(AnalysisRequest::new(image_payload()).subject("u1").notes("slide 4"))
            .unwrap();

        assert!(receipt.result.is_success());
        let stored = analyzer.results(Some("u1")).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].analysis_id, receipt.analysis_id);
        assert_eq!(stored[0].notes, "slide 4");
        assert_eq!(stored[0].result, receipt.result);
    }

    #[test]
    fn test_malformed_image_appends_nothing() {
        let analyzer = analyzer();
        let err = analyzer
            .analyze(AnalysisRequest::new("not//valid==base64!!").subject("u1"))
            .unwrap_err();
        assert!(matches!(err, SmearError::PredictionFailed { .. }));
        assert!(analyzer.store().is_empty());
    }

    #[test]
    fn test_empty_image_rejected() {
        let analyzer = analyzer();
        let err = analyzer.analyze(AnalysisRequest::new("  ")).unwrap_err();
        assert_eq!(err.to_string(), "invalid input: No image data provided");
        assert!(analyzer.store().is_empty());
    }

    #[test]
    fn test_unavailable_model_surfaces_distinctly() {
        let engine = InferenceEngine::new(Arc::new(|| -> SmearResult<ModelHandle> {
            Err(SmearError::config_error("missing weights"))
        }));
        let analyzer = Analyzer::new(Arc::new(engine), MemoryAnalysisStore::new());
        let err = analyzer.analyze(AnalysisRequest::new(image_payload())).unwrap_err();
        assert!(err.is_service_fault());
        assert!(analyzer.store().is_empty());
    }

    #[test]
    fn test_store_failure_is_signaled() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlAnalysisStore::new(dir.path().join("gone").join("log.jsonl"));
        let engine = InferenceEngine::new(Arc::new(|| intensity_handle(10)));
        let analyzer = Analyzer::new(Arc::new(engine), store);
        let err = analyzer.analyze(AnalysisRequest::new(image_payload())).unwrap_err();
        assert!(matches!(err, SmearError::StoreUnavailable { .. }));
    }

    #[test]
    fn test_results_return_newest_hundred() {
        use crate::storage::test_support::{at, record};
        let analyzer = analyzer();
        for day in 0..(DEFAULT_LIST_LIMIT as i64 + 5) {
            let created = at(2024, 1, 1, 0) + chrono::Duration::days(day);
            analyzer.store().append(record(Some("u1"), created)).unwrap();
        }

        let listed = analyzer.results(Some("u1")).unwrap();
        assert_eq!(listed.len(), DEFAULT_LIST_LIMIT);
        assert_eq!(listed[0].created_at, at(2024, 1, 1, 0) + chrono::Duration::days(104));
        assert_eq!(listed[99].created_at, at(2024, 1, 1, 0) + chrono::Duration::days(5));
    }

    #[test]
    fn test_stats_follow_recorded_analyses() {
        let analyzer = analyzer();
        for _ in 0..3 {
            analyzer
                .analyze(AnalysisRequest::new(image_payload()).subject("u1"))
                .unwrap();
        }
        analyzer
            .analyze(AnalysisRequest::new(image_payload()).subject("u2"))
            .unwrap();

        let stats = analyzer.stats(Some("u1")).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.this_month, 3);
        assert_eq!(stats.this_week, 3);
        assert!(analyzer.health().is_healthy());
    }
}
