//! Configuration for the inference engine.

use super::errors::{ConfigError, ConfigValidator};
use super::onnx::OrtSessionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides [`EngineConfig::checkpoint_path`].
pub const MODEL_PATH_ENV: &str = "MODEL_PATH";

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("models/best_model.json")
}

fn default_session_pool_size() -> usize {
    1
}

/// Settings used to build an [`InferenceEngine`](crate::predictor::InferenceEngine).
///
/// The preprocessing contract is deliberately absent: it is fixed in
/// [`crate::core::constants`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the checkpoint manifest.
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,
    /// Number of ONNX Runtime sessions kept for concurrent predictions.
    #[serde(default = "default_session_pool_size")]
    pub session_pool_size: usize,
    /// Optional ONNX Runtime session tuning.
    #[serde(default)]
    pub ort_session: Option<OrtSessionConfig>,
    /// How long a predict call waits for a cold model before giving up.
    /// `None` waits until loading finishes.
    #[serde(default)]
    pub load_timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: default_checkpoint_path(),
            session_pool_size: default_session_pool_size(),
            ort_session: None,
            load_timeout_ms: None,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration pointing at the given checkpoint manifest.
    pub fn new(checkpoint_path: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_path: checkpoint_path.into(),
            ..Self::default()
        }
    }

    /// Reads a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the number of pooled sessions.
    pub fn session_pool_size(mut self, size: usize) -> Self {
        self.session_pool_size = size;
        self
    }

    /// Sets the ONNX Runtime session configuration.
    pub fn ort_session(mut self, config: OrtSessionConfig) -> Self {
        self.ort_session = Some(config);
        self
    }

    /// Sets the default load timeout for predict calls.
    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Default load timeout as a [`Duration`].
    pub fn load_timeout_duration(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }

    /// Applies overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(MODEL_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            self.checkpoint_path = PathBuf::from(path);
        }
        self
    }

    /// Label of the device the classifier runs on.
    pub fn device_label(&self) -> String {
        self.ort_session
            .as_ref()
            .map(OrtSessionConfig::device_label)
            .unwrap_or_else(|| "cpu".to_string())
    }
}

impl ConfigValidator for EngineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.checkpoint_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidConfig {
                message: "checkpoint_path must not be empty".to_string(),
            });
        }
        self.validate_positive_usize(self.session_pool_size, "session_pool_size")?;
        if let Some(ort) = &self.ort_session {
            if let Some(intra) = ort.intra_threads {
                self.validate_thread_count(intra)?;
            }
            if let Some(inter) = ort.inter_threads {
                self.validate_thread_count(inter)?;
            }
        }
        if self.load_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidConfig {
                message: "load_timeout_ms must be greater than 0 when set".to_string(),
            });
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}
