//! Tone and color operators.
//!
//! Exposure and white balance work in linear light. Highlights/shadows,
//! contrast, saturation, vibrance and dehaze work on display-encoded values.
//! Each operator returns immediately when its driving value is neutral.

use image::imageops;
use tracing::debug;

use crate::color::{self, luminance, scale_saturation, smoothstep, WorkingImage};
use crate::config::OperatorConstants;
use crate::{clamp01, is_neutral};

/// Apply exposure in stops.
///
/// Formula: `output = input * 2^exposure` in linear light.
pub fn apply_exposure(image: &mut WorkingImage, exposure: f32) {
    if is_neutral(exposure) {
        return;
    }
    let multiplier = 2.0_f32.powf(exposure);
    debug!(exposure, multiplier, "Exposure");
    color::map_pixels(image, |[r, g, b]| [r * multiplier, g * multiplier, b * multiplier]);
}

/// Shadow/highlight amounts on a 0..1 scale where 0.5 is neutral.
pub fn tone_amounts(highlights: f32, shadows: f32) -> (f32, f32) {
    let shadow_amount = clamp01(0.5 + shadows * 0.5);
    let highlight_amount = clamp01(0.5 - highlights * 0.5);
    (shadow_amount, highlight_amount)
}

/// Recover highlights and lift shadows through a blurred luminance mask.
///
/// The mask is the encoded luminance blurred with a sigma proportional to the
/// long side, so the adjustment follows regions instead of single pixels.
/// Positive `shadows` brightens dark regions, positive `highlights` darkens
/// bright ones.
pub fn apply_highlights_shadows(
    image: &mut WorkingImage,
    highlights: f32,
    shadows: f32,
    constants: &OperatorConstants,
) {
    if is_neutral(highlights) && is_neutral(shadows) {
        return;
    }
    let (shadow_amount, highlight_amount) = tone_amounts(highlights, shadows);
    let shadow_strength = (shadow_amount - 0.5) * 2.0 * constants.shadow_lift;
    let highlight_strength = (0.5 - highlight_amount) * 2.0 * constants.highlight_compression;

    let long_side = image.width().max(image.height()) as f32;
    let sigma = (constants.tone_mask_radius * long_side).max(1.0);
    debug!(shadow_amount, highlight_amount, sigma, "Highlights/shadows");

    let mut encoded = color::to_encoded(image);
    let mask = imageops::blur(&color::luminance_plane(&encoded), sigma);

    color::map_pixels_at(&mut encoded, |x, y, [r, g, b]| {
        let lum = mask.get_pixel(x, y).0[0];
        let shadow_weight = 1.0 - smoothstep(0.0, 0.5, lum);
        let highlight_weight = smoothstep(0.5, 1.0, lum);
        let gain = (1.0 + shadow_strength * shadow_weight - highlight_strength * highlight_weight)
            .max(0.0);
        [r * gain, g * gain, b * gain]
    });

    color::from_encoded(&mut encoded);
    *image = encoded;
}

// ===== White balance =====

const MIN_KELVIN: f64 = 1667.0;
const MAX_KELVIN: f64 = 25000.0;

/// Tint units map to this many CIE 1960 `v` steps.
const TINT_V_SCALE: f64 = 6000.0;

/// Chromaticity (x, y) of a Planckian radiator, after Kim et al.
///
/// Valid for 1667K to 25000K; the temperature is clamped to that range.
pub fn planckian_xy(kelvin: f64) -> (f64, f64) {
    let t = kelvin.clamp(MIN_KELVIN, MAX_KELVIN);
    let (t2, t3) = (t * t, t * t * t);

    let x = if t <= 4000.0 {
        -0.266_123_9e9 / t3 - 0.234_358_9e6 / t2 + 0.877_695_6e3 / t + 0.179_910
    } else {
        -3.025_846_9e9 / t3 + 2.107_037_9e6 / t2 + 0.222_634_7e3 / t + 0.240_390
    };

    let (x2, x3) = (x * x, x * x * x);
    let y = if t <= 2222.0 {
        -1.106_381_4 * x3 - 1.348_110_20 * x2 + 2.185_558_32 * x - 0.202_196_83
    } else if t <= 4000.0 {
        -0.954_947_6 * x3 - 1.374_185_93 * x2 + 2.091_370_15 * x - 0.167_488_67
    } else {
        3.081_758_0 * x3 - 5.873_386_70 * x2 + 3.751_129_97 * x - 0.370_014_83
    };

    (x, y)
}

/// Linear sRGB of the white point at (`kelvin`, `tint_units`).
///
/// Tint moves the chromaticity along CIE 1960 `v`; positive is greener.
pub fn white_point_rgb(kelvin: f64, tint_units: f64) -> [f64; 3] {
    let (x, y) = planckian_xy(kelvin);

    // xy -> CIE 1960 uv, shift, and back
    let d = -2.0 * x + 12.0 * y + 3.0;
    let u = 4.0 * x / d;
    let v = 6.0 * y / d + tint_units / TINT_V_SCALE;
    let d = 2.0 * u - 8.0 * v + 4.0;
    let (x, y) = (3.0 * u / d, 2.0 * v / d);

    // XYZ with Y = 1
    let big_x = x / y;
    let big_z = (1.0 - x - y) / y;

    [
        3.240_454_2 * big_x - 1.537_138_5 - 0.498_531_4 * big_z,
        -0.969_266_0 * big_x + 1.876_010_8 + 0.041_556_0 * big_z,
        0.055_643_4 * big_x - 0.204_025_9 + 1.057_225_2 * big_z,
    ]
}

/// Per-channel gains that map the target neutral onto the reference white.
///
/// Gains are normalized so a neutral gray keeps its luminance.
pub fn white_balance_gains(
    color_balance: f32,
    tint: f32,
    constants: &OperatorConstants,
) -> [f32; 3] {
    let reference = constants.reference_kelvin as f64;
    let kelvin = reference + (color_balance * constants.kelvin_per_unit) as f64;
    let tint_units = (tint * constants.tint_per_unit) as f64;

    let neutral = white_point_rgb(reference, 0.0);
    let target = white_point_rgb(kelvin, tint_units);

    let raw: [f64; 3] = std::array::from_fn(|i| neutral[i] / target[i].max(1e-6));
    let lum = luminance([raw[0] as f32, raw[1] as f32, raw[2] as f32]).max(1e-6);
    raw.map(|g| g as f32 / lum)
}

/// Shift white balance from the reference white.
///
/// Positive `color_balance` is warmer, positive `tint` is more magenta.
pub fn apply_white_balance(
    image: &mut WorkingImage,
    color_balance: f32,
    tint: f32,
    constants: &OperatorConstants,
) {
    if is_neutral(color_balance) && is_neutral(tint) {
        return;
    }
    let gains = white_balance_gains(color_balance, tint, constants);
    debug!(color_balance, tint, ?gains, "White balance");
    color::map_pixels(image, |[r, g, b]| [r * gains[0], g * gains[1], b * gains[2]]);
}

// ===== Color controls =====

/// Saturation, then contrast about mid-gray, then brightness.
#[inline]
fn color_controls(rgb: [f32; 3], contrast: f32, saturation: f32, brightness: f32) -> [f32; 3] {
    scale_saturation(rgb, saturation).map(|c| (c - 0.5) * contrast + 0.5 + brightness)
}

/// Global contrast and saturation.
pub fn apply_color(
    image: &mut WorkingImage,
    contrast: f32,
    saturation: f32,
    constants: &OperatorConstants,
) {
    if is_neutral(contrast) && is_neutral(saturation) {
        return;
    }
    let contrast_gain = 1.0 + contrast * constants.contrast_gain;
    let saturation_gain = 1.0 + saturation * constants.saturation_gain;
    debug!(contrast_gain, saturation_gain, "Color controls");
    color::map_encoded(image, |rgb| color_controls(rgb, contrast_gain, saturation_gain, 0.0));
}

/// Saturation gain for one pixel under vibrance `amount`.
///
/// Similar to saturation but:
/// - Protects already-saturated colors
/// - Protects skin tones (R > G > B)
#[inline]
fn vibrance_gain(rgb: [f32; 3], amount: f32) -> f32 {
    let [r, g, b] = rgb;

    let max_c = r.max(g).max(b);
    let min_c = r.min(g).min(b);
    let current_sat = if max_c > 0.0 {
        ((max_c - min_c) / max_c).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let is_skin = r > g && g > b && (r - g) > 0.06;
    let skin_protection = if is_skin { 0.5 } else { 1.0 };

    1.0 + amount * skin_protection * (1.0 - current_sat)
}

/// Saturation boost weighted toward muted pixels.
pub fn apply_vibrance(image: &mut WorkingImage, vibrance: f32, constants: &OperatorConstants) {
    if is_neutral(vibrance) {
        return;
    }
    let amount = vibrance * constants.vibrance_gain;
    debug!(amount, "Vibrance");
    color::map_encoded(image, |rgb| scale_saturation(rgb, vibrance_gain(rgb, amount)));
}

/// Haze removal as a joint contrast and saturation lift.
pub fn apply_dehaze(image: &mut WorkingImage, dehaze: f32, constants: &OperatorConstants) {
    if is_neutral(dehaze) {
        return;
    }
    let contrast_gain = 1.0 + dehaze * constants.dehaze_contrast;
    let saturation_gain = 1.0 + dehaze * constants.dehaze_saturation;
    debug!(contrast_gain, saturation_gain, "Dehaze");
    color::map_encoded(image, |rgb| color_controls(rgb, contrast_gain, saturation_gain, 0.0));
}
