//! Lossless reorientation: EXIF orientation and quarter-turn rotation.

use image::imageops;

use crate::color::WorkingImage;
use crate::decode::Orientation;

/// Reorient an image according to an EXIF orientation value.
///
/// After this call the pixels are in "upright" layout.
pub fn apply_orientation(image: WorkingImage, orientation: Orientation) -> WorkingImage {
    match orientation {
        Orientation::Normal => image,
        Orientation::FlipHorizontal => imageops::flip_horizontal(&image),
        Orientation::Rotate180 => imageops::rotate180(&image),
        Orientation::FlipVertical => imageops::flip_vertical(&image),
        Orientation::Transpose => imageops::flip_horizontal(&imageops::rotate90(&image)),
        Orientation::Rotate90CW => imageops::rotate90(&image),
        Orientation::Transverse => imageops::flip_horizontal(&imageops::rotate270(&image)),
        Orientation::Rotate270CW => imageops::rotate270(&image),
    }
}

/// Reduce a quarter-turn count to {0, 1, 2, 3}.
#[inline]
pub fn normalize_turns(turns: i64) -> u8 {
    turns.rem_euclid(4) as u8
}

/// Rotate by `turns` clockwise quarter turns (reduced mod 4).
pub fn rotate_quarter_turns(image: WorkingImage, turns: i64) -> WorkingImage {
    apply_orientation(image, Orientation::from_quarter_turns(turns))
}
