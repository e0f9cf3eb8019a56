//! Structures and helpers for ONNX Runtime inference.
//!
//! This module holds the low level session pool that the ONNX-backed
//! classifier evaluates through.

pub mod ort_infer;

pub use ort_infer::OrtInfer;
