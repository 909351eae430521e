//! Fixed-order adjustment chain.
//!
//! ## Operator Order
//! 1. Exposure
//! 2. Highlights / Shadows
//! 3. Tone curve (contrast, blacks, whites)
//! 4. Temperature / Tint
//! 5. Contrast / Saturation
//! 6. Vibrance
//! 7. Noise reduction
//! 8. Sharpen, then Texture / Clarity
//! 9. Dehaze
//! 10. Vignette
//! 11. Grain
//!
//! The order is fixed; it does not depend on how the parameters were given.
//! Each step is skipped when its driving values are neutral, so an all-zero
//! parameter set leaves the image bit-for-bit unchanged.

use tracing::debug;

use crate::adjustments::{
    apply_color, apply_dehaze, apply_exposure, apply_highlights_shadows, apply_vibrance,
    apply_white_balance,
};
use crate::color::WorkingImage;
use crate::config::OperatorConstants;
use crate::curve::apply_tone_curve;
use crate::detail::{apply_noise_reduction, apply_sharpen, apply_unsharp_mask};
use crate::effects::{apply_grain, apply_vignette, GrainSeed};
use crate::AdjustmentParameters;

/// Apply every adjustment to a geometry-normalized image in place.
///
/// `grain_seed` only matters when `grain > 0`.
pub fn apply_adjustments(
    image: &mut WorkingImage,
    params: &AdjustmentParameters,
    constants: &OperatorConstants,
    grain_seed: GrainSeed,
) {
    if params.is_neutral() {
        debug!("All adjustments neutral");
        return;
    }

    apply_exposure(image, params.exposure);
    apply_highlights_shadows(image, params.highlights, params.shadows, constants);
    apply_tone_curve(image, params.contrast, params.blacks, params.whites);
    apply_white_balance(image, params.color_balance, params.tint, constants);
    apply_color(image, params.contrast, params.saturation, constants);
    apply_vibrance(image, params.vibrance, constants);
    apply_noise_reduction(image, params.noise, params.color_noise, constants);
    apply_sharpen(image, params.sharpen, constants);
    apply_unsharp_mask(image, params.texture, params.clarity, constants);
    apply_dehaze(image, params.dehaze, constants);
    apply_vignette(image, params.vignette, constants);
    apply_grain(image, params.grain, grain_seed, constants);
}
