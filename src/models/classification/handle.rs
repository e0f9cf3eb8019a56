//! A loaded classifier together with its labels and device context.

use super::{ClassLabelSet, ClassifierModel};
use crate::core::errors::{SmearError, SmearResult};

/// The loaded classifier plus the label set and device it runs on.
///
/// Built once by a [`ModelLoader`] and shared read-only afterwards.
#[derive(Debug)]
pub struct ModelHandle {
    model: Box<dyn ClassifierModel>,
    labels: ClassLabelSet,
    device: String,
    val_acc: Option<f32>,
}

impl ModelHandle {
    /// Pairs a model with its labels.
    ///
    /// # Errors
    ///
    /// Returns [`SmearError::ModelLoad`] when the label count differs from
    /// the classifier's output dimension.
    pub fn new(
        model: Box<dyn ClassifierModel>,
        labels: ClassLabelSet,
        device: impl Into<String>,
    ) -> SmearResult<Self> {
        if model.num_classes() != labels.len() {
            return Err(SmearError::model_load_error(
                model.name(),
                format!(
                    "classifier outputs {} classes but the label set has {}",
                    model.num_classes(),
                    labels.len()
                ),
                Some("export the checkpoint with class_names matching the classifier head"),
                None::<std::io::Error>,
            ));
        }
        Ok(Self {
            model,
            labels,
            device: device.into(),
            val_acc: None,
        })
    }

    /// Attaches the validation accuracy reported by the checkpoint.
    pub fn with_val_acc(mut self, val_acc: f32) -> Self {
        self.val_acc = Some(val_acc);
        self
    }

    pub fn model(&self) -> &dyn ClassifierModel {
        self.model.as_ref()
    }

    pub fn labels(&self) -> &ClassLabelSet {
        &self.labels
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Validation accuracy recorded at training time, informational only.
    pub fn val_acc(&self) -> Option<f32> {
        self.val_acc
    }
}

/// Builds a [`ModelHandle`]; called at most once per engine.
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> SmearResult<ModelHandle>;
}

impl<F> ModelLoader for F
where
    F: Fn() -> SmearResult<ModelHandle> + Send + Sync,
{
    fn load(&self) -> SmearResult<ModelHandle> {
        self()
    }
}
