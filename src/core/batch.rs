//! Tensor aliases shared by the preprocessing and inference layers.

/// Type alias for 2D tensors (batch x classes).
pub type Tensor2D = ndarray::Array2<f32>;

/// Type alias for 4D tensors (batch x channels x height x width).
pub type Tensor4D = ndarray::Array4<f32>;
