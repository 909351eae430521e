//! Decoded source pixels and their stored orientation.

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::icc;

/// Why source bytes could not be turned into pixels.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("No image data")]
    Empty,

    /// Neither JPEG nor PNG
    #[error("Invalid or unsupported image format")]
    InvalidFormat,

    /// Recognized container that failed part way through
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),
}

/// How stored pixels map onto the upright picture, as the eight EXIF
/// orientation tag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    #[default]
    Normal = 1,
    FlipHorizontal = 2,
    Rotate180 = 3,
    FlipVertical = 4,
    /// Mirror, then a quarter turn clockwise
    Transpose = 5,
    Rotate90CW = 6,
    /// Mirror, then a quarter turn counter-clockwise
    Transverse = 7,
    Rotate270CW = 8,
}

impl Orientation {
    /// Map an EXIF tag value; anything outside 1-8 is `Normal`.
    pub fn from_exif(tag: u32) -> Self {
        match tag {
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }

    /// Pure rotation by `turns` clockwise quarter turns, reduced mod 4.
    pub fn from_quarter_turns(turns: i64) -> Self {
        match turns.rem_euclid(4) {
            1 => Orientation::Rotate90CW,
            2 => Orientation::Rotate180,
            3 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}

/// Interleaved 8-bit RGB pixels, row-major, three bytes per pixel.
///
/// Pixels are treated as sRGB. `icc_profile` keeps whatever profile the
/// source carried so a caller can tell a tagged wide-gamut source apart.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub icc_profile: Option<Vec<u8>>,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
            icc_profile: None,
        }
    }

    pub fn from_rgb(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new(width, height, img.into_raw())
    }

    pub fn with_icc_profile(mut self, profile: Option<Vec<u8>>) -> Self {
        self.icc_profile = profile;
        self
    }

    /// False only when the source carried a profile for another space.
    pub fn is_srgb(&self) -> bool {
        self.icc_profile.as_deref().map_or(true, icc::is_srgb)
    }

    /// Byte length a buffer of this extent must have.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// True when `pixels` matches the extent.
    pub fn is_consistent(&self) -> bool {
        self.pixels.len() == self.expected_len()
    }
}
