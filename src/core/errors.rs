//! Error types for the classification pipeline.
//!
//! This module defines the errors that can occur while decoding an image
//! payload, preprocessing it, running the classifier, loading the model and
//! persisting analysis records. It also provides constructor helpers so call
//! sites can attach context without spelling out every field.

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Stage of the pipeline in which a processing error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Error occurred during tensor operations.
    TensorOperation,
    /// Error occurred during image normalization.
    Normalization,
    /// Error occurred during image resizing.
    Resize,
    /// Error occurred while turning raw scores into ranked predictions.
    PostProcessing,
    /// Generic processing error.
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::TensorOperation => write!(f, "tensor operation"),
            ProcessingStage::Normalization => write!(f, "normalization"),
            ProcessingStage::Resize => write!(f, "resize"),
            ProcessingStage::PostProcessing => write!(f, "post-processing"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// A plain message usable as the `source` of another error.
#[derive(Debug)]
pub struct SimpleError {
    message: String,
}

impl SimpleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SimpleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SimpleError {}

/// Errors produced by the blood smear classification pipeline.
#[derive(Error, Debug)]
pub enum SmearError {
    /// The image payload is not valid base64 or not a decodable image.
    #[error("decode failed: {context}")]
    Decode {
        /// What was being decoded when the failure happened.
        context: String,
        /// The underlying decoder error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred during preprocessing or postprocessing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred while evaluating the classifier.
    #[error("inference failed for model '{model_name}': {context}")]
    Inference {
        /// Name of the model being evaluated.
        model_name: String,
        /// Additional context about the failure.
        context: String,
        /// The underlying runtime error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The checkpoint or model artifact could not be loaded.
    #[error("model load failed for '{}': {reason}", .path.display())]
    ModelLoad {
        /// Checkpoint or model path that failed to load.
        path: PathBuf,
        /// Why loading failed.
        reason: String,
        /// Hint for resolving the failure.
        suggestion: Option<String>,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A previous model load failed; the engine will not retry until restart.
    #[error("model unavailable: {reason}")]
    ModelUnavailable {
        /// Message of the load failure that made the model unavailable.
        reason: String,
    },

    /// The caller stopped waiting for model construction.
    #[error("timed out after {waited:?} waiting for the model to load")]
    LoadTimeout {
        /// How long the caller waited.
        waited: Duration,
    },

    /// A prediction finished with `status == error`.
    #[error("prediction failed: {message}")]
    PredictionFailed {
        /// The error message carried by the prediction result.
        message: String,
    },

    /// The analysis store could not be reached.
    #[error("analysis store unavailable: {context}")]
    StoreUnavailable {
        /// What the store was doing.
        context: String,
        /// The underlying I/O or lock error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

/// Convenient result alias for pipeline operations.
pub type SmearResult<T> = Result<T, SmearError>;

impl SmearError {
    /// Creates a decode error for a malformed image payload.
    pub fn decode(context: &str, error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Decode {
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an error for tensor operations.
    pub fn tensor_operation(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_error(ProcessingStage::TensorOperation, context, error)
    }

    /// Creates an error for normalization operations.
    pub fn normalization(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_error(ProcessingStage::Normalization, context, error)
    }

    /// Creates an error for post-processing operations.
    pub fn post_processing(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_error(ProcessingStage::PostProcessing, context, error)
    }

    /// Creates an error for processing operations.
    ///
    /// # Arguments
    ///
    /// * `kind` - The stage of processing where the error occurred.
    /// * `context` - Additional context about the error.
    /// * `error` - The underlying error that caused this error.
    pub fn processing_error(
        kind: ProcessingStage,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an error for a failed classifier evaluation.
    pub fn inference_error(
        model_name: &str,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.to_string(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates a model loading error.
    ///
    /// # Arguments
    ///
    /// * `path` - The checkpoint or model path being loaded.
    /// * `reason` - Why loading failed.
    /// * `suggestion` - Optional hint for the operator.
    /// * `error` - Optional underlying error.
    pub fn model_load_error<E>(
        path: impl AsRef<Path>,
        reason: impl Into<String>,
        suggestion: Option<&str>,
        error: Option<E>,
    ) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ModelLoad {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
            suggestion: suggestion.map(str::to_string),
            source: error.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Creates a store error for a backend that cannot be reached.
    pub fn store_unavailable(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::StoreUnavailable {
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an error for invalid input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates an error for configuration errors.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates an error for validation errors.
    pub fn validation_error(component: &str, field: &str, expected: &str, actual: &str) -> Self {
        Self::InvalidInput {
            message: format!(
                "Validation failed in {}: field '{}' expected {}, but got '{}'",
                component, field, expected, actual
            ),
        }
    }

    /// Returns true when the error means the service itself is not operational,
    /// as opposed to a failure confined to one request.
    pub fn is_service_fault(&self) -> bool {
        matches!(
            self,
            Self::ModelLoad { .. } | Self::ModelUnavailable { .. } | Self::LoadTimeout { .. }
        )
    }
}

impl From<image::ImageError> for SmearError {
    fn from(error: image::ImageError) -> Self {
        Self::decode("image data could not be decoded", error)
    }
}

impl From<crate::core::config::ConfigError> for SmearError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}
