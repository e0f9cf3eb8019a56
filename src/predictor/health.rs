//! Health check that pushes a synthetic image through the full predict cycle.

use super::InferenceEngine;
use crate::core::constants::INPUT_SIZE;
use crate::domain::PredictionStatus;
use crate::utils::{encode_jpeg_base64, solid_rgb_image};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Outcome of [`health_check`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub model_loaded: bool,
    pub device: String,
    /// Status of the synthetic prediction, absent when it never ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_prediction_status: Option<PredictionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Classifies a black 224×224 JPEG and reports whether the engine works.
///
/// Loads the model if it is still cold.
pub fn health_check(engine: &InferenceEngine) -> HealthReport {
    let sample = solid_rgb_image(INPUT_SIZE, INPUT_SIZE, [0, 0, 0]);
    let outcome = encode_jpeg_base64(&sample).and_then(|payload| engine.predict(&payload));

    let (status, test_prediction_status, error) = match outcome {
        Ok(result) if result.is_success() => (HealthStatus::Healthy, Some(result.status()), None),
        Ok(result) => (
            HealthStatus::Unhealthy,
            Some(result.status()),
            result.error_message().map(str::to_string),
        ),
        Err(e) => (HealthStatus::Unhealthy, None, Some(e.to_string())),
    };

    if status == HealthStatus::Unhealthy {
        tracing::warn!(error = error.as_deref().unwrap_or(""), "Health check failed");
    }

    HealthReport {
        status,
        model_loaded: engine.is_loaded(),
        device: engine.device(),
        test_prediction_status,
        error,
    }
}
