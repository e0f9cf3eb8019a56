//! Decoding of encoded image payloads.

use crate::core::errors::{SmearError, SmearResult};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use image::RgbImage;

/// Standard alphabet with required padding. Non-zero bits left over in the
/// final symbol are ignored.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Turns a base64 image payload into an RGB pixel buffer.
///
/// Payloads may carry a data-URI header (`data:image/png;base64,<data>`);
/// everything up to and including the first comma is dropped. ASCII
/// whitespace inside the base64 text (line wrapping) is ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecoder;

impl ImageDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decodes `payload` into an image of its native dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`SmearError::Decode`] when the text is not valid base64 or the
    /// bytes are not a supported image format.
    pub fn decode(&self, payload: &str) -> SmearResult<RgbImage> {
        let bytes = self.decode_bytes(payload)?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| SmearError::decode("payload is not a decodable image", e))?;
        Ok(image.to_rgb8())
    }

    /// Decodes the base64 portion of `payload` to raw bytes.
    pub fn decode_bytes(&self, payload: &str) -> SmearResult<Vec<u8>> {
        let data = strip_data_uri(payload);
        let result = if data.bytes().any(|b| b.is_ascii_whitespace()) {
            let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            PAYLOAD_ENGINE.decode(compact)
        } else {
            PAYLOAD_ENGINE.decode(data)
        };
        result.map_err(|e| SmearError::decode("payload is not valid base64", e))
    }
}

/// Returns the part of `payload` after the first comma, or all of it when
/// there is no comma.
pub fn strip_data_uri(payload: &str) -> &str {
    match payload.split_once(',') {
        Some((_, data)) => data,
        None => payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_base64(width: u32, height: u32, color: [u8; 3]) -> String {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        general_purpose::STANDARD.encode(buffer.into_inner())
    }

    #[test]
    fn test_strip_data_uri() {
        assert_eq!(strip_data_uri("data:image/png;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_uri("QUJD"), "QUJD");
        assert_eq!(strip_data_uri(","), "");
    }

    #[test]
    fn test_decode_plain_and_prefixed() {
        let decoder = ImageDecoder::new();
        let encoded = png_base64(7, 5, [200, 10, 30]);

        let plain = decoder.decode(&encoded).unwrap();
        assert_eq!(plain.dimensions(), (7, 5));
        assert_eq!(plain.get_pixel(3, 2), &Rgb([200, 10, 30]));

        let prefixed = decoder
            .decode(&format!("data:image/png;base64,{encoded}"))
            .unwrap();
        assert_eq!(prefixed, plain);
    }

    #[test]
    fn test_decode_ignores_line_wrapping() {
        let decoder = ImageDecoder::new();
        let encoded = png_base64(4, 4, [1, 2, 3]);
        let wrapped: String = encoded
            .as_bytes()
            .chunks(16)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(decoder.decode(&wrapped).unwrap().dimensions(), (4, 4));
    }

    #[test]
    fn test_decode_converts_grayscale_to_rgb() {
        let gray = image::GrayImage::from_pixel(3, 3, image::Luma([90]));
        let mut buffer = Cursor::new(Vec::new());
        gray.write_to(&mut buffer, ImageFormat::Png).unwrap();
        let encoded = general_purpose::STANDARD.encode(buffer.into_inner());

        let rgb = ImageDecoder::new().decode(&encoded).unwrap();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([90, 90, 90]));
    }

    #[test]
    fn test_non_canonical_trailing_bits_accepted() {
        let decoder = ImageDecoder::new();
        assert_eq!(decoder.decode_bytes("QUJ=").unwrap(), b"AB");
        assert_eq!(decoder.decode_bytes("QUI=").unwrap(), b"AB");
    }

    #[test]
    fn test_malformed_base64_is_decode_error() {
        let err = ImageDecoder::new().decode("not*base64!").unwrap_err();
        assert!(matches!(err, SmearError::Decode { .. }));
    }

    #[test]
    fn test_non_image_bytes_is_decode_error() {
        let encoded = general_purpose::STANDARD.encode(b"plain text, not pixels");
        let err = ImageDecoder::new().decode(&encoded).unwrap_err();
        assert!(matches!(err, SmearError::Decode { .. }));
    }
}
