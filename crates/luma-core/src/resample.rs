//! Uniform downscaling for bounded preview output.

use image::imageops::{self, FilterType};
use tracing::debug;

use crate::color::WorkingImage;

/// Dimensions that fit within `max_side` while preserving aspect ratio.
///
/// Returns the input dimensions when the image already fits.
pub fn fit_dimensions(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let long_side = width.max(height);
    if max_side == 0 || long_side <= max_side {
        return (width, height);
    }

    let scale = max_side as f64 / long_side as f64;
    let new_width = (width as f64 * scale).round() as u32;
    let new_height = (height as f64 * scale).round() as u32;
    (new_width.max(1), new_height.max(1))
}

/// Downscale so the longest side is at most `max_side`.
///
/// `None`, zero, or a `max_side` at or above the current longest side leave
/// the image unchanged. Uses a triangle (bilinear) filter.
pub fn resize_to_fit(image: WorkingImage, max_side: Option<u32>) -> WorkingImage {
    let Some(max_side) = max_side else {
        return image;
    };
    let (width, height) = image.dimensions();
    let (new_width, new_height) = fit_dimensions(width, height, max_side);
    if (new_width, new_height) == (width, height) {
        return image;
    }

    debug!(width, height, new_width, new_height, "Downscaling");
    imageops::resize(&image, new_width, new_height, FilterType::Triangle)
}
