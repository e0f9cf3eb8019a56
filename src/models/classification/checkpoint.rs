//! Checkpoint manifests and the loader that turns them into a [`ModelHandle`].
//!
//! A checkpoint is a JSON document next to an ONNX export:
//!
//! ```json
//! {
//!   "class_names": ["babesia", "basophil", "..."],
//!   "model_state": "best_model.onnx",
//!   "val_acc": 97.4
//! }
//! ```
//!
//! `model_state` is resolved relative to the manifest's directory.

use super::{ClassLabelSet, ModelHandle, ModelLoader, OnnxClassifier};
use crate::core::config::{EngineConfig, OrtSessionConfig};
use crate::core::errors::{SmearError, SmearResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Contents of a checkpoint manifest. Every key is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub class_names: ClassLabelSet,
    pub model_state: PathBuf,
    pub val_acc: f32,
}

impl Checkpoint {
    /// Reads and parses a manifest.
    ///
    /// # Errors
    ///
    /// [`SmearError::ModelLoad`] when the file is missing, is not JSON, lacks
    /// a key, or lists no classes.
    pub fn from_file(path: impl AsRef<Path>) -> SmearResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SmearError::model_load_error(
                path,
                "checkpoint not found or unreadable",
                Some("set MODEL_PATH to the checkpoint manifest"),
                Some(e),
            )
        })?;
        serde_json::from_str(&text).map_err(|e| {
            SmearError::model_load_error(
                path,
                format!("malformed checkpoint: {e}"),
                Some("the manifest needs class_names, model_state and val_acc"),
                Some(e),
            )
        })
    }

    /// Path of the ONNX export, relative paths anchored at `manifest_path`'s
    /// directory.
    pub fn resolve_model_path(&self, manifest_path: &Path) -> PathBuf {
        if self.model_state.is_absolute() {
            return self.model_state.clone();
        }
        manifest_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(&self.model_state)
    }
}

/// Loads a [`Checkpoint`] and its ONNX export.
#[derive(Debug, Clone)]
pub struct CheckpointLoader {
    checkpoint_path: PathBuf,
    ort_config: Option<OrtSessionConfig>,
    session_pool_size: usize,
}

impl CheckpointLoader {
    pub fn new(checkpoint_path: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_path: checkpoint_path.into(),
            ort_config: None,
            session_pool_size: 1,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            checkpoint_path: config.checkpoint_path.clone(),
            ort_config: config.ort_session.clone(),
            session_pool_size: config.session_pool_size,
        }
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    fn device_label(&self) -> String {
        self.ort_config
            .as_ref()
            .map(OrtSessionConfig::device_label)
            .unwrap_or_else(|| "cpu".to_string())
    }
}

impl ModelLoader for CheckpointLoader {
    fn load(&self) -> SmearResult<ModelHandle> {
        let checkpoint = Checkpoint::from_file(&self.checkpoint_path)?;
        let model_path = checkpoint.resolve_model_path(&self.checkpoint_path);
        if !model_path.is_file() {
            return Err(SmearError::model_load_error(
                &model_path,
                "model_state does not point to an existing file",
                Some("keep the ONNX export next to the checkpoint manifest"),
                None::<std::io::Error>,
            ));
        }

        let classifier = OnnxClassifier::load(
            &model_path,
            checkpoint.class_names.len(),
            self.ort_config.as_ref(),
            self.session_pool_size,
        )?;
        let device = self.device_label();
        let handle = ModelHandle::new(Box::new(classifier), checkpoint.class_names, &device)?
            .with_val_acc(checkpoint.val_acc);

        tracing::info!(
            classes = handle.labels().len(),
            device = %device,
            "Model loaded: {:.2}% accuracy",
            checkpoint.val_acc
        );
        Ok(handle)
    }
}
