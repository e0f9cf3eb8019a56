//! ONNX Runtime backed classifier.

use super::ClassifierModel;
use crate::core::batch::{Tensor2D, Tensor4D};
use crate::core::config::OrtSessionConfig;
use crate::core::constants::{INPUT_CHANNELS, INPUT_SIZE};
use crate::core::errors::{SmearError, SmearResult};
use crate::core::inference::OrtInfer;
use std::path::Path;

/// Image classifier exported to ONNX with a `[N, 3, 224, 224]` input and a
/// `[N, num_classes]` logits output.
#[derive(Debug)]
pub struct OnnxClassifier {
    inference: OrtInfer,
    num_classes: usize,
}

impl OnnxClassifier {
    /// Loads the model and checks its declared shapes against the input
    /// contract and the expected class count.
    ///
    /// Dynamic dimensions (`-1`) are accepted anywhere.
    pub fn load(
        model_path: impl AsRef<Path>,
        num_classes: usize,
        ort_config: Option<&OrtSessionConfig>,
        session_pool_size: usize,
    ) -> SmearResult<Self> {
        let path = model_path.as_ref();
        let inference = OrtInfer::from_config(ort_config, session_pool_size, path)?;

        if let Some(shape) = inference.primary_input_shape() {
            let expected = [-1, INPUT_CHANNELS as i64, INPUT_SIZE as i64, INPUT_SIZE as i64];
            let compatible = shape.len() == expected.len()
                && shape
                    .iter()
                    .zip(expected.iter())
                    .skip(1)
                    .all(|(&actual, &want)| actual < 0 || actual == want);
            if !compatible {
                return Err(SmearError::model_load_error(
                    path,
                    format!("model input shape {shape:?} is not [N, 3, 224, 224]"),
                    Some("export the classifier at 224x224 RGB resolution"),
                    None::<std::io::Error>,
                ));
            }
        }

        if let Some(shape) = inference.primary_output_shape() {
            let classes = shape.get(1).copied();
            let compatible = shape.len() == 2
                && classes.is_some_and(|c| c < 0 || c as usize == num_classes);
            if !compatible {
                return Err(SmearError::model_load_error(
                    path,
                    format!("model output shape {shape:?} does not produce {num_classes} classes"),
                    Some("check that class_names matches the exported classifier head"),
                    None::<std::io::Error>,
                ));
            }
        }

        Ok(Self {
            inference,
            num_classes,
        })
    }
}

impl ClassifierModel for OnnxClassifier {
    fn name(&self) -> &str {
        self.inference.model_name()
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn forward(&self, input: &Tensor4D) -> SmearResult<Tensor2D> {
        let scores = self.inference.infer_2d(input)?;
        if scores.ncols() != self.num_classes {
            return Err(SmearError::inference_error(
                self.name(),
                &format!(
                    "expected {} scores per image, got {}",
                    self.num_classes,
                    scores.ncols()
                ),
                crate::core::errors::SimpleError::new("class count mismatch"),
            ));
        }
        Ok(scores)
    }
}
