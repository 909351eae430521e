//! Baseline JPEG compression of 8-bit RGB rasters.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use thiserror::Error;

use crate::icc::srgb_profile;

/// Errors that can occur while rasterizing or compressing.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The integral output rectangle is too small to encode
    #[error("Degenerate output extent {width}x{height}: both sides must exceed 1px")]
    DegenerateExtent { width: u32, height: u32 },

    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 3), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// JPEG encoding failed
    #[error("JPEG encoding failed: {0}")]
    EncodingFailed(String),
}

/// Map a unit-interval quality onto the JPEG 1-100 scale.
///
/// The input is clamped to [0, 1] first, so `1.5` behaves as `1.0` and
/// `-1.0` as `0.0`. NaN maps to the lowest quality.
pub fn quality_to_jpeg(quality: f32) -> u8 {
    let q = if quality.is_nan() {
        0.0
    } else {
        quality.clamp(0.0, 1.0)
    };
    ((q * 100.0).round() as u8).clamp(1, 100)
}

/// Encode sRGB pixel data to JPEG bytes tagged with the sRGB ICC profile.
///
/// # Arguments
///
/// * `pixels` - RGB pixel data (3 bytes per pixel, row-major order)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `quality` - JPEG quality (1-100); out-of-range values are clamped
pub fn encode_jpeg(
    pixels: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected = (width as usize) * (height as usize) * 3;
    if pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: pixels.len(),
        });
    }

    let mut buffer = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    encoder
        .set_icc_profile(srgb_profile().to_vec())
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;
    encoder
        .write_image(pixels, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;

    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegDecoder;
    use image::ImageDecoder;

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[
                    (x * 255 / width) as u8,
                    (y * 255 / height) as u8,
                    ((x + y) * 127 / (width + height)) as u8,
                ]);
            }
        }
        pixels
    }

    fn assert_jpeg_markers(bytes: &[u8]) {
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8], "missing SOI");
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9], "missing EOI");
    }

    #[test]
    fn test_quality_mapping() {
        assert_eq!(quality_to_jpeg(0.82), 82);
        assert_eq!(quality_to_jpeg(0.92), 92);
        assert_eq!(quality_to_jpeg(1.0), 100);
        assert_eq!(quality_to_jpeg(0.0), 1);
        assert_eq!(quality_to_jpeg(0.004), 1);
    }

    #[test]
    fn test_quality_mapping_clamps() {
        assert_eq!(quality_to_jpeg(1.5), quality_to_jpeg(1.0));
        assert_eq!(quality_to_jpeg(-1.0), quality_to_jpeg(0.0));
        assert_eq!(quality_to_jpeg(f32::NAN), 1);
        assert_eq!(quality_to_jpeg(f32::INFINITY), 100);
    }

    #[test]
    fn test_encode_jpeg_markers() {
        let bytes = encode_jpeg(&gradient(64, 48), 64, 48, 90).unwrap();
        assert_jpeg_markers(&bytes);
    }

    #[test]
    fn test_encode_jpeg_decodes_back() {
        let bytes = encode_jpeg(&gradient(40, 30), 40, 30, 95).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
    }

    #[test]
    fn test_encode_jpeg_embeds_srgb_profile() {
        let bytes = encode_jpeg(&gradient(16, 16), 16, 16, 90).unwrap();
        assert!(bytes.windows(12).any(|w| w == b"ICC_PROFILE\0"));

        let mut decoder = JpegDecoder::new(Cursor::new(&bytes)).unwrap();
        let profile = decoder.icc_profile().unwrap().expect("profile embedded");
        assert_eq!(profile, srgb_profile());
    }

    #[test]
    fn test_encode_jpeg_quality_affects_size() {
        let pixels = gradient(64, 64);
        let low = encode_jpeg(&pixels, 64, 64, 10).unwrap();
        let high = encode_jpeg(&pixels, 64, 64, 100).unwrap();
        assert!(high.len() > low.len());
    }

    #[test]
    fn test_encode_jpeg_pixel_length_mismatch() {
        let result = encode_jpeg(&[0u8; 10], 2, 2, 90);
        assert!(matches!(
            result,
            Err(EncodeError::InvalidPixelData {
                expected: 12,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_encode_jpeg_zero_dimensions() {
        assert!(matches!(
            encode_jpeg(&[], 0, 4, 90),
            Err(EncodeError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            encode_jpeg(&[], 4, 0, 90),
            Err(EncodeError::InvalidDimensions { .. })
        ));
    }
}
