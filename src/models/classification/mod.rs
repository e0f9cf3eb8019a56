//! Blood smear classification models.

pub mod checkpoint;
pub mod classifier;
pub mod handle;
pub mod labels;
pub mod onnx_classifier;

pub use checkpoint::{Checkpoint, CheckpointLoader};
pub use classifier::ClassifierModel;
pub use handle::{ModelHandle, ModelLoader};
pub use labels::ClassLabelSet;
pub use onnx_classifier::OnnxClassifier;
