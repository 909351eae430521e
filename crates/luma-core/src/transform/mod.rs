//! Geometry normalization: orientation, rotation, straighten and crop.
//!
//! Geometry is applied before any adjustment operator runs.
//!
//! # Transform Order
//!
//! 1. Source orientation (EXIF), giving an upright layout
//! 2. Quarter turns (`rotationTurns`, reduced mod 4, clockwise)
//! 3. Straighten (small continuous angle, extent preserved)
//! 4. Crop: an explicit rect wins over an aspect-only request
//!
//! # Coordinate System
//!
//! - Straighten angles are in degrees, positive = counter-clockwise
//! - Crop coordinates are normalized (0.0 to 1.0) relative to image dimensions
//! - Origin is top-left corner

mod crop;
mod orientation;
mod rotation;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use crop::{
    apply_aspect_crop, apply_rect_crop, aspect_region, crop_pixels, rect_region, FloatRect,
    NormalizedRect, PixelRect, MIN_ASPECT, MIN_CROP_EXTENT,
};
pub use orientation::{apply_orientation, normalize_turns, rotate_quarter_turns};
pub use rotation::{apply_straighten, cover_scale, InterpolationFilter, STRAIGHTEN_EPSILON_RAD};

use crate::color::WorkingImage;
use crate::decode::Orientation;

/// Caller-requested geometry edit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometrySpec {
    /// Target aspect ratio (width / height) for a centered crop.
    pub aspect: Option<f64>,
    /// Explicit crop; takes precedence over `aspect`.
    pub rect: Option<NormalizedRect>,
    /// Clockwise quarter turns, any integer.
    pub rotation_turns: i64,
    /// Straighten angle in degrees.
    pub straighten_degrees: f64,
}

impl GeometrySpec {
    /// True when applying this edit leaves an upright image unchanged.
    pub fn is_identity(&self) -> bool {
        normalize_turns(self.rotation_turns) == 0
            && self.straighten_degrees.to_radians().abs() <= STRAIGHTEN_EPSILON_RAD
            && self.rect.is_none()
            && !self.aspect.is_some_and(|a| a.is_finite() && a > MIN_ASPECT)
    }
}

/// Apply source orientation and an optional geometry edit.
pub fn normalize_geometry(
    image: WorkingImage,
    orientation: Orientation,
    geometry: Option<&GeometrySpec>,
    filter: InterpolationFilter,
) -> WorkingImage {
    let image = apply_orientation(image, orientation);
    let Some(geometry) = geometry else {
        return image;
    };
    if geometry.is_identity() {
        debug!("Identity geometry edit");
        return image;
    }

    let turns = normalize_turns(geometry.rotation_turns);
    let mut image = rotate_quarter_turns(image, turns as i64);

    if geometry.straighten_degrees.to_radians().abs() > STRAIGHTEN_EPSILON_RAD {
        debug!(
            degrees = geometry.straighten_degrees,
            ?filter,
            "Straightening"
        );
        image = apply_straighten(&image, geometry.straighten_degrees, filter);
    }

    if let Some(rect) = geometry.rect {
        debug!(?rect, "Rect crop");
        apply_rect_crop(&image, rect)
    } else if let Some(aspect) = geometry.aspect {
        debug!(aspect, "Aspect crop");
        apply_aspect_crop(&image, aspect)
    } else {
        image
    }
}
