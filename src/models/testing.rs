//! Deterministic stand-ins for a trained classifier, used by unit tests.

use super::{ClassLabelSet, ClassifierModel, ModelHandle};
use crate::core::batch::{Tensor2D, Tensor4D};
use crate::core::errors::{SimpleError, SmearError, SmearResult};
use crate::core::constants::INPUT_CHANNELS;

/// The ten categories of the reference blood smear dataset.
pub const SMEAR_CLASSES: [&str; 10] = [
    "babesia",
    "basophil",
    "eosinophil",
    "leishmania",
    "lymphocyte",
    "malaria_parasitized",
    "malaria_uninfected",
    "monocyte",
    "neutrophil",
    "trypanosome",
];

/// First `n` class names, falling back to `class_<i>` past the reference set.
pub fn labels(n: usize) -> ClassLabelSet {
    let names = (0..n)
        .map(|i| {
            SMEAR_CLASSES
                .get(i)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("class_{i}"))
        })
        .collect();
    ClassLabelSet::new(names).expect("test labels are valid")
}

/// Scores class `k` as `(k + 1) * mean(channel k % 3)`, a pure function of
/// the input tensor.
#[derive(Debug)]
pub struct IntensityClassifier {
    num_classes: usize,
}

impl IntensityClassifier {
    pub fn new(num_classes: usize) -> Self {
        Self { num_classes }
    }
}

impl ClassifierModel for IntensityClassifier {
    fn name(&self) -> &str {
        "intensity"
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn forward(&self, input: &Tensor4D) -> SmearResult<Tensor2D> {
        let batch = input.shape()[0];
        let mut out = Tensor2D::zeros((batch, self.num_classes));
        for n in 0..batch {
            let sample = input.index_axis(ndarray::Axis(0), n);
            let means: Vec<f32> = (0..INPUT_CHANNELS)
                .map(|c| sample.index_axis(ndarray::Axis(0), c).mean().unwrap_or(0.0))
                .collect();
            for k in 0..self.num_classes {
                out[[n, k]] = (k + 1) as f32 * means[k % INPUT_CHANNELS];
            }
        }
        Ok(out)
    }
}

/// Returns the same scores for every input.
#[derive(Debug)]
pub struct FixedClassifier {
    pub scores: Vec<f32>,
}

impl ClassifierModel for FixedClassifier {
    fn name(&self) -> &str {
        "fixed"
    }

    fn num_classes(&self) -> usize {
        self.scores.len()
    }

    fn forward(&self, input: &Tensor4D) -> SmearResult<Tensor2D> {
        let batch = input.shape()[0];
        let flat: Vec<f32> = (0..batch).flat_map(|_| self.scores.clone()).collect();
        Ok(Tensor2D::from_shape_vec((batch, self.scores.len()), flat)?)
    }
}

/// Always fails inside the forward pass.
#[derive(Debug)]
pub struct FailingClassifier {
    pub num_classes: usize,
}

impl ClassifierModel for FailingClassifier {
    fn name(&self) -> &str {
        "failing"
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn forward(&self, _input: &Tensor4D) -> SmearResult<Tensor2D> {
        Err(SmearError::inference_error(
            "failing",
            "forward pass",
            SimpleError::new("device lost"),
        ))
    }
}

pub fn intensity_handle(n: usize) -> SmearResult<ModelHandle> {
    ModelHandle::new(Box::new(IntensityClassifier::new(n)), labels(n), "cpu")
}

pub fn fixed_handle(scores: Vec<f32>) -> SmearResult<ModelHandle> {
    let n = scores.len();
    ModelHandle::new(Box::new(FixedClassifier { scores }), labels(n), "cpu")
}
