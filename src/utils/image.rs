//! Helpers that turn pixel buffers into the base64 payloads the engine accepts.

use crate::core::errors::{SmearError, SmearResult};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// Creates an image filled with a single color.
pub fn solid_rgb_image(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(color))
}

/// Encodes `img` in `format` and returns it as standard base64.
pub fn encode_base64(img: &RgbImage, format: ImageFormat) -> SmearResult<String> {
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, format).map_err(|e| {
        SmearError::invalid_input(format!("failed to encode {format:?} image: {e}"))
    })?;
    Ok(STANDARD.encode(bytes.into_inner()))
}

/// PNG keeps pixels exact, so a decoded payload equals `img`.
pub fn encode_png_base64(img: &RgbImage) -> SmearResult<String> {
    encode_base64(img, ImageFormat::Png)
}

pub fn encode_jpeg_base64(img: &RgbImage) -> SmearResult<String> {
    encode_base64(img, ImageFormat::Jpeg)
}
