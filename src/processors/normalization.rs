//! Image normalization into model-ready tensors.
//!
//! Intensities are mapped as `((v / 255) - mean[c]) / std[c]` and laid out in
//! CHW order. The operations are performed in that order so the result matches
//! the `ToTensor` + `Normalize` transform the classifier was trained with.

use crate::core::batch::Tensor4D;
use crate::core::constants::{INPUT_CHANNELS, NORMALIZE_MEAN, NORMALIZE_STD, PIXEL_MAX};
use crate::core::errors::SmearError;
use image::RgbImage;

/// Normalizes RGB images into CHW float tensors.
#[derive(Debug, Clone)]
pub struct NormalizeImage {
    /// Mean values for each channel (RGB order)
    mean: [f32; 3],
    /// Standard deviation values for each channel (RGB order)
    std: [f32; 3],
}

impl Default for NormalizeImage {
    fn default() -> Self {
        Self {
            mean: NORMALIZE_MEAN,
            std: NORMALIZE_STD,
        }
    }
}

impl NormalizeImage {
    /// Creates a normalizer with explicit statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is not finite or any standard deviation
    /// is not strictly positive.
    pub fn new(mean: [f32; 3], std: [f32; 3]) -> Result<Self, SmearError> {
        for (i, &m) in mean.iter().enumerate() {
            if !m.is_finite() {
                return Err(SmearError::ConfigError {
                    message: format!("Mean value at index {i} is not finite: {m}"),
                });
            }
        }
        for (i, &s) in std.iter().enumerate() {
            if !s.is_finite() || s <= 0.0 {
                return Err(SmearError::ConfigError {
                    message: format!(
                        "Standard deviation at index {i} must be greater than 0, got {s}"
                    ),
                });
            }
        }
        Ok(Self { mean, std })
    }

    pub fn mean(&self) -> [f32; 3] {
        self.mean
    }

    pub fn std(&self) -> [f32; 3] {
        self.std
    }

    #[inline]
    fn normalize_value(&self, value: u8, channel: usize) -> f32 {
        (value as f32 / PIXEL_MAX - self.mean[channel]) / self.std[channel]
    }

    /// Writes one image in CHW order into `dst`, which must hold exactly
    /// `3 * width * height` values.
    fn write_chw(&self, img: &RgbImage, dst: &mut [f32]) {
        let (width, height) = img.dimensions();
        let plane = (width * height) as usize;
        for (idx, pixel) in img.pixels().enumerate() {
            for c in 0..INPUT_CHANNELS {
                dst[c * plane + idx] = self.normalize_value(pixel[c], c);
            }
        }
    }

    /// Normalizes a single image into a `[1, 3, H, W]` tensor.
    pub fn normalize_to(&self, img: &RgbImage) -> Result<Tensor4D, SmearError> {
        let (width, height) = img.dimensions();
        let mut result = vec![0.0f32; INPUT_CHANNELS * (width * height) as usize];
        self.write_chw(img, &mut result);

        ndarray::Array4::from_shape_vec(
            (1, INPUT_CHANNELS, height as usize, width as usize),
            result,
        )
        .map_err(|e| {
            SmearError::tensor_operation(
                &format!("Failed to create CHW normalization tensor for {width}x{height} image"),
                e,
            )
        })
    }

}
