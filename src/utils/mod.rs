//! Utility functions shared by the engine, the demo and the tests.
//!
//! This module provides image encoding helpers for building request payloads
//! and the logging setup.

pub mod image;

pub use image::{encode_base64, encode_jpeg_base64, encode_png_base64, solid_rgb_image};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// It's typically called at the start of an application to enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
