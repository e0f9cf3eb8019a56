//! Image and score processing for the classification pipeline.
//!
//! # Modules
//!
//! * `decode` - Base64 / data-URI payloads to RGB pixel buffers
//! * `normalization` - Per-channel affine normalization into CHW tensors
//! * `preprocess` - The fixed resize + normalize contract the classifier expects
//! * `resample` - PIL-compatible fixed-point bilinear resizing
//! * `ranking` - Softmax and confidence ranking of raw class scores

mod decode;
mod normalization;
mod preprocess;
mod ranking;
mod resample;

pub use decode::*;
pub use normalization::*;
pub use preprocess::*;
pub use ranking::*;
pub use resample::resize_bilinear;
