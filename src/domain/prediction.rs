//! Structured output of a single classification.

use crate::core::constants::PROBABILITY_SUM_TOLERANCE;
use crate::core::errors::{SmearError, SmearResult};
use serde::{Deserialize, Serialize};

/// Outcome of a predict call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Success,
    Error,
}

/// Probability assigned to one disease category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseScore {
    /// Class name from the label set.
    pub disease: String,
    /// Softmax probability in `[0, 1]`.
    pub confidence: f32,
}

/// Result of classifying one image.
///
/// A successful result carries one [`DiseaseScore`] per known class, sorted by
/// descending confidence, and `predicted_class`/`confidence` mirror the first
/// entry. A failed result carries only `error_message`. Fields are private so
/// a constructed result cannot be edited afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    predicted_class: String,
    confidence: f32,
    all_predictions: Vec<DiseaseScore>,
    status: PredictionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl PredictionResult {
    /// Builds a successful result from scores already ranked best-first.
    pub fn from_ranked(all_predictions: Vec<DiseaseScore>) -> SmearResult<Self> {
        let Some(top) = all_predictions.first() else {
            return Err(SmearError::invalid_input(
                "a prediction needs at least one class score",
            ));
        };
        let result = Self {
            predicted_class: top.disease.clone(),
            confidence: top.confidence,
            all_predictions,
            status: PredictionStatus::Success,
            error_message: None,
        };
        result.validate()?;
        Ok(result)
    }

    /// Builds a failed result carrying `message`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            predicted_class: String::new(),
            confidence: 0.0,
            all_predictions: Vec::new(),
            status: PredictionStatus::Error,
            error_message: Some(message.into()),
        }
    }

    pub fn predicted_class(&self) -> &str {
        &self.predicted_class
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn all_predictions(&self) -> &[DiseaseScore] {
        &self.all_predictions
    }

    pub fn status(&self) -> PredictionStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.status == PredictionStatus::Success
    }

    /// Checks the invariants of a successful result.
    ///
    /// Confidences must lie in `[0, 1]`, be sorted non-increasing, sum to one
    /// within tolerance, and the head entry must match
    /// `predicted_class`/`confidence`.
    pub fn validate(&self) -> SmearResult<()> {
        if !self.is_success() {
            return Err(SmearError::invalid_input(format!(
                "prediction has status error: {}",
                self.error_message.as_deref().unwrap_or("no message")
            )));
        }
        let Some(top) = self.all_predictions.first() else {
            return Err(SmearError::invalid_input("all_predictions is empty"));
        };
        if self.predicted_class.is_empty() {
            return Err(SmearError::invalid_input("predicted_class is empty"));
        }
        if top.disease != self.predicted_class || top.confidence != self.confidence {
            return Err(SmearError::validation_error(
                "PredictionResult",
                "predicted_class",
                &format!("{} ({})", top.disease, top.confidence),
                &format!("{} ({})", self.predicted_class, self.confidence),
            ));
        }
        for score in &self.all_predictions {
            if !(0.0..=1.0).contains(&score.confidence) {
                return Err(SmearError::validation_error(
                    "PredictionResult",
                    "confidence",
                    "a value in [0, 1]",
                    &score.confidence.to_string(),
                ));
            }
        }
        if self
            .all_predictions
            .windows(2)
            .any(|pair| pair[0].confidence < pair[1].confidence)
        {
            return Err(SmearError::invalid_input(
                "all_predictions is not sorted by descending confidence",
            ));
        }
        let total: f32 = self.all_predictions.iter().map(|s| s.confidence).sum();
        if (total - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(SmearError::validation_error(
                "PredictionResult",
                "all_predictions",
                "confidences summing to 1.0",
                &total.to_string(),
            ));
        }
        Ok(())
    }
}
