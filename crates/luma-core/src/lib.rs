//! Luma Core - Photo adjustment rendering pipeline
//!
//! This crate turns a decoded source photo, an optional geometry edit and a set
//! of named adjustment values into encoded JPEG bytes, at either preview or
//! export resolution.
//!
//! # Pipeline
//!
//! ```text
//! source -> geometry -> adjustments -> (preview) resample -> encode -> bytes
//! ```
//!
//! Pixels are processed as 32-bit float RGB in linear-light sRGB and are only
//! quantized back to 8-bit sRGB by the encoder.

pub mod adjustments;
pub mod color;
pub mod config;
pub mod curve;
pub mod decode;
pub mod detail;
pub mod effects;
pub mod encode;
pub mod error;
pub mod icc;
pub mod pipeline;
pub mod render;
pub mod resample;
pub mod store;
pub mod transform;

pub use color::WorkingImage;
pub use config::{ConfigError, OperatorConstants, RenderConfig, TierConfig};
pub use curve::{apply_tone_curve, evaluate_curve, synthesize_tone_curve, ToneCurveLut};
pub use effects::GrainSeed;
pub use error::RenderError;
pub use pipeline::apply_adjustments;
pub use render::{
    ExportRequest, ExportStatus, PreviewRequest, RenderRequest, Renderer, Tier,
};
pub use store::{AssetRef, AssetStore, MemoryAssetStore, SourceAsset, StoreError};
pub use transform::{normalize_geometry, GeometrySpec, InterpolationFilter, NormalizedRect};

/// Magnitude below which a parameter counts as neutral.
///
/// Every operator is skipped when its driving value is under this threshold,
/// which keeps the all-zero parameter set an exact identity.
pub const NEUTRAL_EPSILON: f32 = 1e-4;

/// Adjustment values for one render.
///
/// All fields default to 0.0, which is neutral. Field names match the keys
/// accepted at the method-channel boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AdjustmentParameters {
    /// Exposure in stops (EV)
    pub exposure: f32,
    /// Contrast (-1 to 1)
    pub contrast: f32,
    /// Saturation (-1 to 1)
    pub saturation: f32,
    /// Vibrance (-1 to 1)
    pub vibrance: f32,
    /// Highlights (-1 to 1), positive recovers highlights
    pub highlights: f32,
    /// Shadows (-1 to 1), positive lifts shadows
    pub shadows: f32,
    /// Whites (-1 to 1)
    pub whites: f32,
    /// Blacks (-1 to 1)
    pub blacks: f32,
    /// White balance temperature shift (-1 to 1), positive is warmer
    pub color_balance: f32,
    /// White balance tint (-1 to 1), positive is more magenta
    pub tint: f32,
    /// Luminance noise reduction (0 to 1)
    pub noise: f32,
    /// Color noise reduction (0 to 1)
    pub color_noise: f32,
    /// Clarity (0 to 1)
    pub clarity: f32,
    /// Texture (0 to 1)
    pub texture: f32,
    /// Sharpening (0 to 1)
    pub sharpen: f32,
    /// Dehaze (-1 to 1)
    pub dehaze: f32,
    /// Vignette (0 to 1)
    pub vignette: f32,
    /// Film grain (0 to 1)
    pub grain: f32,
}

impl AdjustmentParameters {
    /// Every recognized parameter name, in declaration order.
    pub const NAMES: [&'static str; 18] = [
        "exposure",
        "contrast",
        "saturation",
        "vibrance",
        "highlights",
        "shadows",
        "whites",
        "blacks",
        "color_balance",
        "tint",
        "noise",
        "color_noise",
        "clarity",
        "texture",
        "sharpen",
        "dehaze",
        "vignette",
        "grain",
    ];

    /// Create a new AdjustmentParameters with all values neutral
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter by its boundary name.
    ///
    /// Returns `false` (and changes nothing) if the name is not recognized.
    pub fn set(&mut self, name: &str, value: f32) -> bool {
        let slot = match name {
            "exposure" => &mut self.exposure,
            "contrast" => &mut self.contrast,
            "saturation" => &mut self.saturation,
            "vibrance" => &mut self.vibrance,
            "highlights" => &mut self.highlights,
            "shadows" => &mut self.shadows,
            "whites" => &mut self.whites,
            "blacks" => &mut self.blacks,
            "color_balance" => &mut self.color_balance,
            "tint" => &mut self.tint,
            "noise" => &mut self.noise,
            "color_noise" => &mut self.color_noise,
            "clarity" => &mut self.clarity,
            "texture" => &mut self.texture,
            "sharpen" => &mut self.sharpen,
            "dehaze" => &mut self.dehaze,
            "vignette" => &mut self.vignette,
            "grain" => &mut self.grain,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Check if all values are neutral
    pub fn is_neutral(&self) -> bool {
        self.values().iter().all(|v| is_neutral(*v))
    }

    /// All values in `NAMES` order.
    pub fn values(&self) -> [f32; 18] {
        [
            self.exposure,
            self.contrast,
            self.saturation,
            self.vibrance,
            self.highlights,
            self.shadows,
            self.whites,
            self.blacks,
            self.color_balance,
            self.tint,
            self.noise,
            self.color_noise,
            self.clarity,
            self.texture,
            self.sharpen,
            self.dehaze,
            self.vignette,
            self.grain,
        ]
    }
}

/// True when `value` is too small to drive an operator.
#[inline]
pub fn is_neutral(value: f32) -> bool {
    value.abs() < NEUTRAL_EPSILON
}

/// Clamp to the unit interval.
#[inline]
pub fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}
