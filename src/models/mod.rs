//! Classifier models and their loading.
//!
//! The engine only depends on the [`ClassifierModel`] and [`ModelLoader`]
//! traits; [`CheckpointLoader`] and [`OnnxClassifier`] are the production
//! implementations backed by ONNX Runtime.

pub mod classification;
#[cfg(test)]
pub(crate) mod testing;

pub use classification::*;
