//! Stylistic effects: vignette and film grain.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use crate::color::{self, linear_to_srgb, smoothstep, srgb_to_linear, WorkingImage};
use crate::config::OperatorConstants;
use crate::is_neutral;

/// Radial darkening toward the corners, in linear light.
///
/// Distance is measured from the center relative to the half-diagonal, so
/// the falloff follows the image extent. A larger `radius` pushes the
/// falloff outward.
pub fn apply_vignette(image: &mut WorkingImage, vignette: f32, constants: &OperatorConstants) {
    if vignette <= 0.0 || is_neutral(vignette) {
        return;
    }
    let intensity = vignette * constants.vignette_gain;
    let radius = constants.vignette_radius;
    debug!(intensity, radius, "Vignette");

    let cx = image.width() as f32 / 2.0;
    let cy = image.height() as f32 / 2.0;
    let half_diagonal = (cx * cx + cy * cy).sqrt().max(f32::EPSILON);

    color::map_pixels_at(image, |x, y, rgb| {
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        let r = (dx * dx + dy * dy).sqrt() / half_diagonal;
        let t = (r * 2.0 / radius).clamp(0.0, 1.0);
        let factor = (1.0 - intensity * 0.5 * smoothstep(0.0, 1.0, t)).max(0.0);
        rgb.map(|c| c * factor)
    });
}

/// Seed for the grain field.
///
/// The same seed over the same image gives the same grain, independent of
/// how rows are scheduled across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GrainSeed(pub u64);

impl GrainSeed {
    /// Fresh seed from OS entropy.
    pub fn random() -> Self {
        Self(rand::random())
    }

    fn row_rng(self, row: usize) -> StdRng {
        // Golden-ratio stride decorrelates neighboring rows
        StdRng::seed_from_u64(self.0 ^ (row as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }
}

/// Film grain: a uniform random field with black color and alpha
/// `grain * grain_alpha * u`, composited source-over on encoded values.
pub fn apply_grain(
    image: &mut WorkingImage,
    grain: f32,
    seed: GrainSeed,
    constants: &OperatorConstants,
) {
    if grain <= 0.0 || is_neutral(grain) {
        return;
    }
    let alpha = grain * constants.grain_alpha;
    debug!(alpha, seed = seed.0, "Grain");

    let row_len = image.width() as usize * 3;
    if row_len == 0 {
        return;
    }
    image
        .par_chunks_exact_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let mut rng = seed.row_rng(y);
            for px in row.chunks_exact_mut(3) {
                let coverage = alpha * rng.gen::<f32>();
                for c in px.iter_mut() {
                    // Source-over with a black layer: src * (1 - a)
                    *c = srgb_to_linear(linear_to_srgb(*c) * (1.0 - coverage));
                }
            }
        });
}
