//! Renderer configuration.
//!
//! Every tunable coefficient of the adjustment operators lives in
//! [`OperatorConstants`]; per-tier output settings live in [`TierConfig`].
//! Configuration can be loaded from TOML; every key is optional:
//!
//! ```toml
//! workers = 4
//!
//! [operators]
//! contrast_gain = 0.18
//! unsharp_radius = 1.8
//!
//! [preview]
//! quality = 0.82
//! filter = "bilinear"
//!
//! [export]
//! quality = 0.92
//! filter = "lanczos3"
//! ```
//!
//! Values are sanitized after loading: non-finite or out-of-range entries
//! fall back to their defaults.

use std::ops::RangeInclusive;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::render::Tier;
use crate::transform::InterpolationFilter;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Coefficients of the adjustment operators.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OperatorConstants {
    // Tone
    /// Shadow lift at full `shadows`.
    pub shadow_lift: f32,
    /// Highlight compression at full `highlights`.
    pub highlight_compression: f32,
    /// Blur sigma of the highlight/shadow mask, as a fraction of the long side.
    pub tone_mask_radius: f32,

    // White balance
    pub reference_kelvin: f32,
    /// Kelvin shift per unit of `color_balance`.
    pub kelvin_per_unit: f32,
    /// Tint shift per unit of `tint`.
    pub tint_per_unit: f32,

    // Color
    pub contrast_gain: f32,
    pub saturation_gain: f32,
    pub vibrance_gain: f32,

    // Noise reduction
    pub noise_level_base: f32,
    pub noise_level_range: f32,
    /// Weight of `color_noise` in the noise level.
    pub color_noise_weight: f32,
    pub sharpness_base: f32,
    pub sharpness_range: f32,
    /// Saturation reduction per unit of `color_noise`.
    pub color_noise_desaturation: f32,
    pub color_noise_desaturation_max: f32,
    pub noise_blur_radius: f32,

    // Detail
    pub sharpen_gain: f32,
    pub sharpen_radius: f32,
    pub texture_gain: f32,
    pub clarity_gain: f32,
    pub unsharp_radius: f32,

    // Dehaze
    pub dehaze_contrast: f32,
    pub dehaze_saturation: f32,

    // Effects
    pub vignette_gain: f32,
    pub vignette_radius: f32,
    pub grain_alpha: f32,
}

impl Default for OperatorConstants {
    fn default() -> Self {
        Self {
            shadow_lift: 0.8,
            highlight_compression: 0.35,
            tone_mask_radius: 0.01,

            reference_kelvin: 6500.0,
            kelvin_per_unit: 1800.0,
            tint_per_unit: 120.0,

            contrast_gain: 0.18,
            saturation_gain: 0.85,
            vibrance_gain: 0.9,

            noise_level_base: 0.02,
            noise_level_range: 0.08,
            color_noise_weight: 0.6,
            sharpness_base: 0.4,
            sharpness_range: 0.4,
            color_noise_desaturation: 0.15,
            color_noise_desaturation_max: 0.25,
            noise_blur_radius: 1.0,

            sharpen_gain: 0.9,
            sharpen_radius: 1.0,
            texture_gain: 0.9,
            clarity_gain: 1.2,
            unsharp_radius: 1.8,

            dehaze_contrast: 0.15,
            dehaze_saturation: 0.08,

            vignette_gain: 1.2,
            vignette_radius: 2.0,
            grain_alpha: 0.12,
        }
    }
}

/// Replace a non-finite value, or one outside `range`, with `fallback`.
///
/// Returns `true` when the value was replaced.
fn in_range_or(key: &str, value: &mut f32, range: RangeInclusive<f32>, fallback: f32) -> bool {
    if value.is_finite() && range.contains(&*value) {
        return false;
    }
    warn!(
        key,
        value = *value,
        min = *range.start(),
        max = *range.end(),
        fallback,
        "Invalid operator constant, using default"
    );
    *value = fallback;
    true
}

/// `in_range_or` keyed by the field's own name.
macro_rules! in_range {
    ($this:ident . $field:ident, $range:expr, $defaults:ident) => {
        in_range_or(stringify!($field), &mut $this.$field, $range, $defaults.$field)
    };
}

impl OperatorConstants {
    pub(crate) fn sanitize(&mut self) {
        let d = Self::default();

        in_range!(self.shadow_lift, 0.0..=4.0, d);
        in_range!(self.highlight_compression, 0.0..=1.0, d);
        in_range!(self.tone_mask_radius, 0.0..=0.5, d);

        in_range!(self.reference_kelvin, 1667.0..=25000.0, d);
        in_range!(self.kelvin_per_unit, 0.0..=10000.0, d);
        in_range!(self.tint_per_unit, 0.0..=1000.0, d);

        in_range!(self.contrast_gain, 0.0..=4.0, d);
        in_range!(self.saturation_gain, 0.0..=4.0, d);
        in_range!(self.vibrance_gain, 0.0..=4.0, d);

        in_range!(self.noise_level_base, 0.0..=1.0, d);
        in_range!(self.noise_level_range, 0.0..=1.0, d);
        in_range!(self.color_noise_weight, 0.0..=4.0, d);
        in_range!(self.sharpness_base, 0.0..=1.0, d);
        in_range!(self.sharpness_range, 0.0..=1.0, d);
        in_range!(self.color_noise_desaturation, 0.0..=1.0, d);
        in_range!(self.color_noise_desaturation_max, 0.0..=1.0, d);
        in_range!(self.noise_blur_radius, 0.1..=16.0, d);

        in_range!(self.sharpen_gain, 0.0..=8.0, d);
        in_range!(self.sharpen_radius, 0.1..=16.0, d);
        in_range!(self.texture_gain, 0.0..=8.0, d);
        in_range!(self.clarity_gain, 0.0..=8.0, d);
        in_range!(self.unsharp_radius, 0.1..=16.0, d);

        in_range!(self.dehaze_contrast, 0.0..=4.0, d);
        in_range!(self.dehaze_saturation, 0.0..=4.0, d);

        in_range!(self.vignette_gain, 0.0..=8.0, d);
        in_range!(self.vignette_radius, 0.01..=16.0, d);
        in_range!(self.grain_alpha, 0.0..=1.0, d);
    }
}

/// Output settings for one render tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierConfig {
    /// Default JPEG quality (0 to 1) when the caller gives none.
    pub quality: f32,
    /// Straighten interpolation filter.
    pub filter: InterpolationFilter,
}

impl TierConfig {
    pub fn preview() -> Self {
        Self {
            quality: 0.82,
            filter: InterpolationFilter::Bilinear,
        }
    }

    pub fn export() -> Self {
        Self {
            quality: 0.92,
            filter: InterpolationFilter::Lanczos3,
        }
    }
}

/// Complete renderer configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawRenderConfig")]
pub struct RenderConfig {
    pub operators: OperatorConstants,
    pub preview: TierConfig,
    pub export: TierConfig,
    /// Worker threads for the render service (0 = rayon default).
    pub workers: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            operators: OperatorConstants::default(),
            preview: TierConfig::preview(),
            export: TierConfig::export(),
            workers: 0,
        }
    }
}

impl RenderConfig {
    /// Parse and sanitize a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RenderConfig = toml::from_str(text)?;
        Ok(config.sanitize())
    }

    /// Settings for `tier`.
    pub fn tier(&self, tier: Tier) -> &TierConfig {
        match tier {
            Tier::Preview => &self.preview,
            Tier::Export => &self.export,
        }
    }

    pub fn sanitize(mut self) -> Self {
        self.operators.sanitize();
        for (tier, fallback) in [
            (&mut self.preview, TierConfig::preview()),
            (&mut self.export, TierConfig::export()),
        ] {
            if !tier.quality.is_finite() || !(0.0..=1.0).contains(&tier.quality) {
                warn!(quality = tier.quality, "Invalid tier quality, using default");
                tier.quality = fallback.quality;
            }
        }
        self
    }
}

/// On-disk shape: tier tables may be partial, missing keys take that
/// tier's own defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRenderConfig {
    operators: OperatorConstants,
    preview: RawTier,
    export: RawTier,
    workers: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTier {
    quality: Option<f32>,
    filter: Option<InterpolationFilter>,
}

impl RawTier {
    fn resolve(self, defaults: TierConfig) -> TierConfig {
        TierConfig {
            quality: self.quality.unwrap_or(defaults.quality),
            filter: self.filter.unwrap_or(defaults.filter),
        }
    }
}

impl From<RawRenderConfig> for RenderConfig {
    fn from(raw: RawRenderConfig) -> Self {
        Self {
            operators: raw.operators,
            preview: raw.preview.resolve(TierConfig::preview()),
            export: raw.export.resolve(TierConfig::export()),
            workers: raw.workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_empty_document_is_default() {
        let config = RenderConfig::from_toml_str("").unwrap();
        assert_eq!(config, RenderConfig::default());
    }

    #[test]
    fn test_tier_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.tier(Tier::Preview).quality, 0.82);
        assert_eq!(config.tier(Tier::Preview).filter, InterpolationFilter::Bilinear);
        assert_eq!(config.tier(Tier::Export).quality, 0.92);
        assert_eq!(config.tier(Tier::Export).filter, InterpolationFilter::Lanczos3);
    }

    #[test]
    fn test_partial_tier_keeps_own_defaults() {
        let config = RenderConfig::from_toml_str("[export]\nquality = 0.7\n").unwrap();
        assert_eq!(config.export.quality, 0.7);
        // Filter still the export default, not the preview one
        assert_eq!(config.export.filter, InterpolationFilter::Lanczos3);
        assert_eq!(config.preview, TierConfig::preview());
    }

    #[test]
    fn test_operator_overrides() {
        let text = r#"
workers = 3

[operators]
contrast_gain = 0.25
unsharp_radius = 2.5
"#;
        let config = RenderConfig::from_toml_str(text).unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.operators.contrast_gain, 0.25);
        assert_eq!(config.operators.unsharp_radius, 2.5);
        assert_eq!(config.operators.sharpen_gain, 0.9);
    }

    #[test]
    fn test_out_of_range_falls_back() {
        let text = r#"
[operators]
grain_alpha = 7.0
unsharp_radius = -1.0

[preview]
quality = 3.0
filter = "lanczos3"
"#;
        let config = RenderConfig::from_toml_str(text).unwrap();
        assert_eq!(config.operators.grain_alpha, 0.12);
        assert_eq!(config.operators.unsharp_radius, 1.8);
        assert_eq!(config.preview.quality, 0.82);
        assert_eq!(config.preview.filter, InterpolationFilter::Lanczos3);
    }

    #[test]
    fn test_non_finite_falls_back() {
        let mut constants = OperatorConstants {
            vignette_gain: f32::NAN,
            ..Default::default()
        };
        constants.sanitize();
        assert_eq!(constants.vignette_gain, 1.2);
    }

    #[test]
    fn test_fallback_is_logged_with_key() {
        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mut constants = OperatorConstants {
            contrast_gain: 9.0,
            ..Default::default()
        };
        tracing::subscriber::with_default(subscriber, || constants.sanitize());

        assert_eq!(constants.contrast_gain, OperatorConstants::default().contrast_gain);
        let log = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(log.contains("Invalid operator constant"), "{}", log);
        assert!(log.contains("key=\"contrast_gain\""), "{}", log);
        assert!(!log.contains("saturation_gain"), "{}", log);
    }

    #[test]
    fn test_in_range_or_reports_replacement() {
        let mut value = 0.5;
        assert!(!in_range_or("gain", &mut value, 0.0..=1.0, 0.2));
        assert_eq!(value, 0.5);
        let mut value = f32::INFINITY;
        assert!(in_range_or("gain", &mut value, 0.0..=1.0, 0.2));
        assert_eq!(value, 0.2);
    }

    #[test]
    fn test_invalid_toml() {
        let result = RenderConfig::from_toml_str("[operators\ncontrast_gain = ");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_unknown_filter_is_error() {
        let result = RenderConfig::from_toml_str("[preview]\nfilter = \"nearest\"\n");
        assert!(result.is_err());
    }
}
