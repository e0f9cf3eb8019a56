//! The fixed resize and normalize contract of the classifier input.

use crate::core::batch::Tensor4D;
use crate::core::constants::{INPUT_CHANNELS, INPUT_SIZE};
use crate::core::errors::{SmearError, SmearResult};
use crate::processors::{NormalizeImage, resize_bilinear};
use image::RgbImage;
use std::borrow::Cow;

/// Resizes an RGB image to 224×224 and normalizes it into a
/// `[1, 3, 224, 224]` tensor.
///
/// Resizing uses [`resize_bilinear`], the fixed-point two-pass bilinear
/// resampler of PIL that torchvision's `Resize` applies during training.
/// The output is a pure function of the input buffer.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    input_size: u32,
    normalizer: NormalizeImage,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor {
    pub fn new() -> Self {
        Self {
            input_size: INPUT_SIZE,
            normalizer: NormalizeImage::default(),
        }
    }

    /// Shape of the tensor produced by [`Preprocessor::preprocess`].
    pub fn output_shape(&self) -> [usize; 4] {
        [
            1,
            INPUT_CHANNELS,
            self.input_size as usize,
            self.input_size as usize,
        ]
    }

    /// Resizes `img` to the model resolution, skipping the resize when the
    /// image already has it.
    pub fn resize<'a>(&self, img: &'a RgbImage) -> SmearResult<Cow<'a, RgbImage>> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(SmearError::invalid_input(format!(
                "cannot preprocess an empty {width}x{height} image"
            )));
        }
        if (width, height) == (self.input_size, self.input_size) {
            return Ok(Cow::Borrowed(img));
        }
        Ok(Cow::Owned(resize_bilinear(
            img,
            self.input_size,
            self.input_size,
        )))
    }

    /// Produces the `[1, 3, 224, 224]` input tensor for one image.
    pub fn preprocess(&self, img: &RgbImage) -> SmearResult<Tensor4D> {
        let resized = self.resize(img)?;
        let tensor = self.normalizer.normalize_to(&resized)?;
        tracing::trace!(
            source_width = img.width(),
            source_height = img.height(),
            shape = ?tensor.shape(),
            "preprocessed image"
        );
        Ok(tensor)
    }
}
