//! The classifier seam used by the inference engine.

use crate::core::batch::{Tensor2D, Tensor4D};
use crate::core::errors::SmearResult;

/// A trained classifier producing raw per-class scores.
///
/// Implementations run in evaluation mode: the same input tensor must always
/// produce the same scores. `forward` takes `&self` and may be called from
/// several threads at once; implementations backed by a runtime that is not
/// safe for concurrent evaluation must serialize internally.
pub trait ClassifierModel: Send + Sync + std::fmt::Debug {
    /// Human readable model name used in logs and errors.
    fn name(&self) -> &str;

    /// Output dimension of the classifier head.
    fn num_classes(&self) -> usize;

    /// Evaluates a `[N, 3, 224, 224]` batch and returns `[N, num_classes]`
    /// raw scores (logits).
    fn forward(&self, input: &Tensor4D) -> SmearResult<Tensor2D>;
}
