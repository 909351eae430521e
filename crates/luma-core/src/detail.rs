//! Noise reduction and detail enhancement.
//!
//! All three operators work on display-encoded values and use gaussian blurs
//! from `image::imageops` as their low-pass stage.

use image::imageops;
use tracing::debug;

use crate::color::{self, luminance, scale_saturation, smoothstep, WorkingImage};
use crate::config::OperatorConstants;
use crate::is_neutral;

/// Derived noise reduction settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseReduction {
    /// Differences below this are treated as noise and smoothed away.
    pub noise_level: f32,
    /// Higher keeps more of the original signal in smoothed regions (0 to 1).
    pub sharpness: f32,
    /// Saturation reduction applied for color noise.
    pub chroma_reduction: f32,
}

impl NoiseReduction {
    /// Settings for the given luminance and color noise amounts, or `None`
    /// when both are off.
    pub fn from_amounts(
        noise: f32,
        color_noise: f32,
        constants: &OperatorConstants,
    ) -> Option<Self> {
        let noise = noise.max(0.0);
        let color_noise = color_noise.max(0.0);
        if is_neutral(noise) && is_neutral(color_noise) {
            return None;
        }

        let combined = (noise + color_noise * constants.color_noise_weight).min(1.0);
        let noise_level = constants.noise_level_base + combined * constants.noise_level_range;
        let sharpness =
            constants.sharpness_base + (1.0 - noise.min(1.0)) * constants.sharpness_range;
        let chroma_reduction = if is_neutral(color_noise) {
            0.0
        } else {
            (color_noise * constants.color_noise_desaturation)
                .min(constants.color_noise_desaturation_max)
        };

        Some(Self {
            noise_level,
            sharpness,
            chroma_reduction,
        })
    }
}

/// Edge-aware smoothing: pixels that differ from their blurred neighborhood
/// by less than the noise level are pulled toward it.
pub fn apply_noise_reduction(
    image: &mut WorkingImage,
    noise: f32,
    color_noise: f32,
    constants: &OperatorConstants,
) {
    let Some(nr) = NoiseReduction::from_amounts(noise, color_noise, constants) else {
        return;
    };
    debug!(
        noise_level = nr.noise_level,
        sharpness = nr.sharpness,
        chroma_reduction = nr.chroma_reduction,
        "Noise reduction"
    );

    let mut encoded = color::to_encoded(image);
    let smooth = imageops::blur(&encoded, constants.noise_blur_radius);
    let smoothing = 1.0 - nr.sharpness * 0.5;
    let saturation = 1.0 - nr.chroma_reduction;

    color::map_pixels_at(&mut encoded, |x, y, rgb| {
        let blurred = smooth.get_pixel(x, y).0;
        let diff = (luminance(rgb) - luminance(blurred)).abs();
        // Full smoothing inside the noise band, none past twice its width
        let w = (1.0 - smoothstep(nr.noise_level, 2.0 * nr.noise_level, diff)) * smoothing;
        let mixed: [f32; 3] = std::array::from_fn(|i| rgb[i] + (blurred[i] - rgb[i]) * w);
        scale_saturation(mixed, saturation)
    });

    color::from_encoded(&mut encoded);
    *image = encoded;
}

/// Luminance-only sharpening: adds the high-pass of luminance to every
/// channel, which leaves hue untouched.
pub fn apply_sharpen(image: &mut WorkingImage, sharpen: f32, constants: &OperatorConstants) {
    let amount = sharpen.max(0.0) * constants.sharpen_gain;
    if is_neutral(amount) {
        return;
    }
    debug!(amount, radius = constants.sharpen_radius, "Sharpen");

    let mut encoded = color::to_encoded(image);
    let lum = color::luminance_plane(&encoded);
    let lum_blur = imageops::blur(&lum, constants.sharpen_radius);

    color::map_pixels_at(&mut encoded, |x, y, rgb| {
        let detail = lum.get_pixel(x, y).0[0] - lum_blur.get_pixel(x, y).0[0];
        rgb.map(|c| c + amount * detail)
    });

    color::from_encoded(&mut encoded);
    *image = encoded;
}

/// Unsharp mask intensity from texture and clarity.
pub fn unsharp_intensity(texture: f32, clarity: f32, constants: &OperatorConstants) -> f32 {
    texture.max(0.0) * constants.texture_gain + clarity.max(0.0) * constants.clarity_gain
}

/// Unsharp mask at the configured radius, driven by texture and clarity.
pub fn apply_unsharp_mask(
    image: &mut WorkingImage,
    texture: f32,
    clarity: f32,
    constants: &OperatorConstants,
) {
    let intensity = unsharp_intensity(texture, clarity, constants);
    if is_neutral(intensity) {
        return;
    }
    debug!(intensity, radius = constants.unsharp_radius, "Unsharp mask");

    let mut encoded = color::to_encoded(image);
    let blurred = imageops::blur(&encoded, constants.unsharp_radius);

    color::map_pixels_at(&mut encoded, |x, y, rgb| {
        let low = blurred.get_pixel(x, y).0;
        std::array::from_fn(|i| rgb[i] + intensity * (rgb[i] - low[i]))
    });

    color::from_encoded(&mut encoded);
    *image = encoded;
}
