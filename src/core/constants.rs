//! Constants used throughout the classification pipeline.
//!
//! The preprocessing values below must match the transform the classifier was
//! trained with. Changing any of them does not raise an error; it silently
//! lowers accuracy.

/// Side length (pixels) of the square classifier input.
pub const INPUT_SIZE: u32 = 224;

/// Number of color channels fed to the classifier.
pub const INPUT_CHANNELS: usize = 3;

/// Divisor mapping 8-bit intensities into `[0, 1]` before normalization.
pub const PIXEL_MAX: f32 = 255.0;

/// Per-channel mean (RGB order) subtracted after scaling.
pub const NORMALIZE_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel standard deviation (RGB order) divided after mean subtraction.
pub const NORMALIZE_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Number of newest records returned by `Analyzer::results`.
///
/// Stores apply whatever limit their caller passes.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// The default threshold for parallel processing.
///
/// Batches with at least this many items are spread over the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4;

/// Tolerance used when checking that probabilities sum to one.
pub const PROBABILITY_SUM_TOLERANCE: f32 = 1e-4;
