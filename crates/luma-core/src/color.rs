//! Color space helpers: sRGB transfer, luminance and the working image type.
//!
//! The working buffer holds linear-light sRGB primaries as `f32`. Operators
//! that are defined on display-encoded values (tone curve, contrast, detail)
//! go through [`map_encoded`] or [`to_encoded`]/[`from_encoded`], so the
//! conversion points stay explicit.

use image::{ImageBuffer, Luma, Rgb32FImage};
use rayon::prelude::*;

use crate::decode::DecodedImage;

/// Float RGB image in linear-light sRGB.
pub type WorkingImage = Rgb32FImage;

/// Single-channel float plane, used for luminance masks.
pub type Plane = ImageBuffer<Luma<f32>, Vec<f32>>;

/// ITU-R BT.709 coefficient for red channel in luminance calculation.
pub const LUMINANCE_R: f32 = 0.2126;

/// ITU-R BT.709 coefficient for green channel in luminance calculation.
pub const LUMINANCE_G: f32 = 0.7152;

/// ITU-R BT.709 coefficient for blue channel in luminance calculation.
pub const LUMINANCE_B: f32 = 0.0722;

/// Calculate luminance from RGB values using ITU-R BT.709 coefficients.
#[inline]
pub fn luminance(rgb: [f32; 3]) -> f32 {
    LUMINANCE_R * rgb[0] + LUMINANCE_G * rgb[1] + LUMINANCE_B * rgb[2]
}

/// sRGB electro-optical transfer: encoded value to linear light.
#[inline]
pub fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Inverse sRGB transfer: linear light to encoded value.
#[inline]
pub fn linear_to_srgb(v: f32) -> f32 {
    if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

/// Blend each channel toward the pixel's luminance.
///
/// `amount` of 1.0 is identity, 0.0 is fully desaturated, above 1.0 boosts.
#[inline]
pub fn scale_saturation(rgb: [f32; 3], amount: f32) -> [f32; 3] {
    if amount == 1.0 {
        return rgb;
    }
    let gray = luminance(rgb);
    [
        gray + (rgb[0] - gray) * amount,
        gray + (rgb[1] - gray) * amount,
        gray + (rgb[2] - gray) * amount,
    ]
}

/// Hermite smoothstep: 0 at `edge0`, 1 at `edge1`, smooth in between.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Convert an 8-bit sRGB source into a linear working image.
pub fn to_working(source: &DecodedImage) -> WorkingImage {
    let lut: [f32; 256] = std::array::from_fn(|i| srgb_to_linear(i as f32 / 255.0));
    let data: Vec<f32> = source.pixels.iter().map(|&v| lut[v as usize]).collect();

    // Callers reject inconsistent buffers first; an empty image is the fallback.
    WorkingImage::from_raw(source.width, source.height, data)
        .unwrap_or_else(|| WorkingImage::new(0, 0))
}

/// Apply `f` to every pixel in linear light, in parallel over pixels.
pub fn map_pixels<F>(image: &mut WorkingImage, f: F)
where
    F: Fn([f32; 3]) -> [f32; 3] + Sync + Send,
{
    image.par_chunks_exact_mut(3).for_each(|px| {
        let out = f([px[0], px[1], px[2]]);
        px.copy_from_slice(&out);
    });
}

/// Apply `f` to every pixel in display-encoded sRGB.
pub fn map_encoded<F>(image: &mut WorkingImage, f: F)
where
    F: Fn([f32; 3]) -> [f32; 3] + Sync + Send,
{
    map_pixels(image, |rgb| {
        let out = f([
            linear_to_srgb(rgb[0]),
            linear_to_srgb(rgb[1]),
            linear_to_srgb(rgb[2]),
        ]);
        [
            srgb_to_linear(out[0]),
            srgb_to_linear(out[1]),
            srgb_to_linear(out[2]),
        ]
    });
}

/// Apply `f(x, y, rgb)` to every pixel in linear light, rows in parallel.
pub fn map_pixels_at<F>(image: &mut WorkingImage, f: F)
where
    F: Fn(u32, u32, [f32; 3]) -> [f32; 3] + Sync + Send,
{
    let row_len = image.width() as usize * 3;
    if row_len == 0 {
        return;
    }
    image
        .par_chunks_exact_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(3).enumerate() {
                let out = f(x as u32, y as u32, [px[0], px[1], px[2]]);
                px.copy_from_slice(&out);
            }
        });
}

/// Display-encoded copy of a working image.
pub fn to_encoded(image: &WorkingImage) -> WorkingImage {
    let mut out = image.clone();
    let data: &mut [f32] = &mut out;
    data.par_iter_mut().for_each(|v| *v = linear_to_srgb(*v));
    out
}

/// Write a display-encoded image back into linear light, in place.
pub fn from_encoded(image: &mut WorkingImage) {
    let data: &mut [f32] = image;
    data.par_iter_mut().for_each(|v| *v = srgb_to_linear(*v));
}

/// Luminance plane of an (already encoded) image.
pub fn luminance_plane(image: &WorkingImage) -> Plane {
    let data: Vec<f32> = image
        .par_chunks_exact(3)
        .map(|px| luminance([px[0], px[1], px[2]]))
        .collect();
    Plane::from_raw(image.width(), image.height(), data)
        .unwrap_or_else(|| Plane::new(0, 0))
}
