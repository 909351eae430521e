//! Output encoding: rasterize to an explicit color space, then compress.
//!
//! The working image is linear light. Rasterizing always names its target
//! space, so an output can never pick up an implicit device space, and the
//! JPEG carries the matching ICC profile.
//!
//! # Examples
//!
//! ```ignore
//! use luma_core::encode::{encode, rasterize, OutputColorSpace};
//!
//! let bytes = encode(&image, 0.9)?;
//! let raster = rasterize(&image, OutputColorSpace::Srgb)?;
//! ```

mod jpeg;

use rayon::prelude::*;

pub use jpeg::{encode_jpeg, quality_to_jpeg, EncodeError};

use crate::color::{linear_to_srgb, WorkingImage};

/// Color space of the rasterized 8-bit output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputColorSpace {
    /// sRGB primaries with the sRGB transfer curve.
    #[default]
    Srgb,
}

impl OutputColorSpace {
    /// Encode one linear-light value into this space, clamped to [0, 1].
    #[inline]
    fn encode_value(self, linear: f32) -> f32 {
        match self {
            OutputColorSpace::Srgb => linear_to_srgb(linear.clamp(0.0, 1.0)),
        }
    }
}

/// 8-bit RGB raster in a known color space.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub color_space: OutputColorSpace,
    pub pixels: Vec<u8>,
}

/// Quantize a working image into an 8-bit raster in `color_space`.
///
/// The working extent is already an integral pixel rectangle; it must exceed
/// 1px on both sides.
pub fn rasterize(
    image: &WorkingImage,
    color_space: OutputColorSpace,
) -> Result<Raster, EncodeError> {
    let (width, height) = image.dimensions();
    if width <= 1 || height <= 1 {
        return Err(EncodeError::DegenerateExtent { width, height });
    }

    let pixels = image
        .as_raw()
        .par_iter()
        .map(|&v| {
            let encoded = color_space.encode_value(v);
            // NaN casts to 0
            (encoded * 255.0).round().clamp(0.0, 255.0) as u8
        })
        .collect();

    Ok(Raster {
        width,
        height,
        color_space,
        pixels,
    })
}

/// Rasterize to sRGB and compress to JPEG at a unit-interval quality.
pub fn encode(image: &WorkingImage, quality: f32) -> Result<Vec<u8>, EncodeError> {
    let raster = rasterize(image, OutputColorSpace::Srgb)?;
    encode_jpeg(&raster.pixels, raster.width, raster.height, quality_to_jpeg(quality))
}
