//! Image cropping: normalized rectangles and centered aspect crops.
//!
//! # Coordinate System
//!
//! Callers address crops in a top-left-origin convention:
//! - (0.0, 0.0) = top-left corner
//! - (1.0, 1.0) = bottom-right corner
//!
//! Rasters are stored top-down, so `y` addresses rows directly. A
//! bottom-left-origin frame would have to use `1 - y - h` instead.

use image::imageops;
use serde::{Deserialize, Serialize};

use crate::color::WorkingImage;

/// Smallest normalized crop extent per axis.
pub const MIN_CROP_EXTENT: f64 = 0.01;

/// Aspect ratios at or below this value are ignored.
pub const MIN_ASPECT: f64 = 0.001;

/// Crop rectangle in fractional image-relative coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    #[serde(alias = "width")]
    pub w: f64,
    #[serde(alias = "height")]
    pub h: f64,
}

impl NormalizedRect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// The full frame.
    pub fn full() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    /// Clamp the rect fully inside the unit square.
    ///
    /// The origin is clamped to [0, 1], the extent to what is left of the
    /// frame with a floor of [`MIN_CROP_EXTENT`]. If the floor pushes the
    /// rect past the far edge, the origin slides back. Non-finite origins
    /// become 0 and non-finite extents become the full frame.
    pub fn normalized(self) -> Self {
        let finite_or = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };

        let mut x = finite_or(self.x, 0.0).clamp(0.0, 1.0);
        let mut y = finite_or(self.y, 0.0).clamp(0.0, 1.0);
        let w = finite_or(self.w, 1.0).min(1.0 - x).max(MIN_CROP_EXTENT);
        let h = finite_or(self.h, 1.0).min(1.0 - y).max(MIN_CROP_EXTENT);

        if x + w > 1.0 {
            x = 1.0 - w;
        }
        if y + h > 1.0 {
            y = 1.0 - h;
        }

        Self { x, y, w, h }
    }
}

/// Crop rectangle in (fractional) pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Crop rectangle in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FloatRect {
    /// Smallest whole-pixel rectangle containing this one, clipped to the image.
    pub fn integral(&self, image_width: u32, image_height: u32) -> PixelRect {
        // Tolerance keeps 25.000000001 from growing a whole extra pixel.
        const SNAP: f64 = 1e-6;
        let x0 = (self.x + SNAP).floor().clamp(0.0, image_width as f64);
        let y0 = (self.y + SNAP).floor().clamp(0.0, image_height as f64);
        let x1 = (self.x + self.width - SNAP).ceil().clamp(x0, image_width as f64);
        let y1 = (self.y + self.height - SNAP).ceil().clamp(y0, image_height as f64);

        PixelRect {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        }
    }
}

/// Pixel rectangle selected by a normalized rect on a `width x height` image.
pub fn rect_region(width: u32, height: u32, rect: NormalizedRect) -> FloatRect {
    let rect = rect.normalized();
    let (w, h) = (width as f64, height as f64);

    FloatRect {
        x: rect.x * w,
        y: rect.y * h,
        width: rect.w * w,
        height: rect.h * h,
    }
}

/// Centered region with the target aspect ratio (width / height).
pub fn aspect_region(width: u32, height: u32, aspect: f64) -> FloatRect {
    let (w, h) = (width as f64, height as f64);

    let (target_w, target_h) = if w / h > aspect {
        (h * aspect, h)
    } else {
        (w, w / aspect)
    };

    FloatRect {
        x: (w - target_w) / 2.0,
        y: (h - target_h) / 2.0,
        width: target_w,
        height: target_h,
    }
}

/// Copy out a pixel region. An empty region yields an empty image.
pub fn crop_pixels(image: &WorkingImage, region: PixelRect) -> WorkingImage {
    if region.x == 0
        && region.y == 0
        && region.width == image.width()
        && region.height == image.height()
    {
        return image.clone();
    }
    imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image()
}

/// Crop to a normalized rectangle.
///
/// Images with either side of 1px or less are returned unchanged.
pub fn apply_rect_crop(image: &WorkingImage, rect: NormalizedRect) -> WorkingImage {
    let (width, height) = image.dimensions();
    if width <= 1 || height <= 1 {
        return image.clone();
    }
    let region = rect_region(width, height, rect).integral(width, height);
    crop_pixels(image, region)
}

/// Centered crop to an aspect ratio (width / height).
///
/// Aspects at or below [`MIN_ASPECT`] and images with either side of 1px or
/// less are returned unchanged.
pub fn apply_aspect_crop(image: &WorkingImage, aspect: f64) -> WorkingImage {
    let (width, height) = image.dimensions();
    if width <= 1 || height <= 1 || !aspect.is_finite() || aspect <= MIN_ASPECT {
        return image.clone();
    }
    let region = aspect_region(width, height, aspect).integral(width, height);
    crop_pixels(image, region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Each pixel stores its own (x, y).
    fn test_image(width: u32, height: u32) -> WorkingImage {
        WorkingImage::from_fn(width, height, |x, y| Rgb([x as f32, y as f32, 0.0]))
    }

    fn assert_inside_unit_square(r: NormalizedRect) {
        assert!(r.x >= 0.0 && r.y >= 0.0, "{:?}", r);
        assert!(r.x + r.w <= 1.0 + 1e-12, "{:?}", r);
        assert!(r.y + r.h <= 1.0 + 1e-12, "{:?}", r);
        assert!(r.w >= MIN_CROP_EXTENT && r.h >= MIN_CROP_EXTENT, "{:?}", r);
    }

    #[test]
    fn test_oversized_rect_normalizes_inside() {
        let r = NormalizedRect::new(-0.5, 0.0, 2.0, 2.0).normalized();
        assert_inside_unit_square(r);
        assert_eq!(r, NormalizedRect::full());
    }

    #[test]
    fn test_tiny_rect_gets_floor() {
        let r = NormalizedRect::new(0.3, 0.3, 0.0, 0.001).normalized();
        assert_eq!(r.w, MIN_CROP_EXTENT);
        assert_eq!(r.h, MIN_CROP_EXTENT);
    }

    #[test]
    fn test_floor_at_far_edge_slides_origin() {
        let r = NormalizedRect::new(1.0, 0.995, 0.5, 0.5).normalized();
        assert_inside_unit_square(r);
        assert!((r.x - 0.99).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_rect() {
        let r = NormalizedRect::new(f64::NAN, 0.2, f64::INFINITY, 0.5).normalized();
        assert_inside_unit_square(r);
        assert_eq!(r.x, 0.0);
        assert_eq!(r.w, 1.0);
    }

    #[test]
    fn test_rect_region_rows_from_top() {
        let region = rect_region(10, 20, NormalizedRect::new(0.1, 0.25, 0.5, 0.5));
        assert!((region.x - 1.0).abs() < 1e-9);
        assert!((region.y - 5.0).abs() < 1e-9);
        assert!((region.width - 5.0).abs() < 1e-9);
        assert!((region.height - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_rect_crop_top_left_convention() {
        let img = test_image(10, 10);
        let out = apply_rect_crop(&img, NormalizedRect::new(0.2, 0.3, 0.5, 0.4));

        assert_eq!(out.dimensions(), (5, 4));
        // Top-left of the crop is source (2, 3)
        assert_eq!(out.get_pixel(0, 0).0, [2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_full_rect_is_identity() {
        let img = test_image(8, 6);
        assert_eq!(apply_rect_crop(&img, NormalizedRect::full()), img);
    }

    #[test]
    fn test_aspect_crop_wide_source() {
        let img = test_image(200, 100);
        let out = apply_aspect_crop(&img, 1.0);
        assert_eq!(out.dimensions(), (100, 100));
        // Centered: starts at x = 50
        assert_eq!(out.get_pixel(0, 0).0, [50.0, 0.0, 0.0]);
    }

    #[test]
    fn test_aspect_crop_tall_target() {
        let img = test_image(100, 100);
        let out = apply_aspect_crop(&img, 2.0);
        assert_eq!(out.dimensions(), (100, 50));
        assert_eq!(out.get_pixel(0, 0).0, [0.0, 25.0, 0.0]);
    }

    #[test]
    fn test_aspect_crop_ignores_tiny_aspect() {
        let img = test_image(20, 10);
        assert_eq!(apply_aspect_crop(&img, 0.0005), img);
        assert_eq!(apply_aspect_crop(&img, -1.0), img);
    }

    #[test]
    fn test_degenerate_source_unchanged() {
        let img = test_image(1, 10);
        assert_eq!(apply_aspect_crop(&img, 1.0), img);
        assert_eq!(apply_rect_crop(&img, NormalizedRect::new(0.5, 0.5, 0.1, 0.1)), img);
    }

    #[test]
    fn test_integral_rounds_outward() {
        let r = FloatRect {
            x: 1.4,
            y: 2.6,
            width: 3.2,
            height: 1.0,
        };
        assert_eq!(
            r.integral(100, 100),
            PixelRect {
                x: 1,
                y: 2,
                width: 4,
                height: 2
            }
        );
    }

    #[test]
    fn test_integral_clips_to_image() {
        let r = FloatRect {
            x: -5.0,
            y: 8.0,
            width: 50.0,
            height: 50.0,
        };
        assert_eq!(
            r.integral(10, 10),
            PixelRect {
                x: 0,
                y: 8,
                width: 10,
                height: 2
            }
        );
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimensions_strategy() -> impl Strategy<Value = (u32, u32)> {
        (2u32..=80, 2u32..=80)
    }

    proptest! {
        /// Property: any rect normalizes fully inside the unit square.
        #[test]
        fn prop_normalized_rect_inside(
            x in -2.0f64..=2.0,
            y in -2.0f64..=2.0,
            w in -2.0f64..=3.0,
            h in -2.0f64..=3.0,
        ) {
            let r = NormalizedRect::new(x, y, w, h).normalized();
            prop_assert!(r.x >= 0.0 && r.y >= 0.0);
            prop_assert!(r.x + r.w <= 1.0 + 1e-12);
            prop_assert!(r.y + r.h <= 1.0 + 1e-12);
            prop_assert!(r.w >= MIN_CROP_EXTENT - 1e-12);
            prop_assert!(r.h >= MIN_CROP_EXTENT - 1e-12);
        }

        /// Property: normalizing twice changes nothing.
        #[test]
        fn prop_normalize_idempotent(
            x in -1.0f64..=2.0,
            y in -1.0f64..=2.0,
            w in 0.0f64..=2.0,
            h in 0.0f64..=2.0,
        ) {
            let once = NormalizedRect::new(x, y, w, h).normalized();
            prop_assert_eq!(once.normalized(), once);
        }

        /// Property: rect crops stay within the source and are never empty.
        #[test]
        fn prop_rect_crop_bounded(
            (width, height) in dimensions_strategy(),
            x in 0.0f64..=1.0,
            y in 0.0f64..=1.0,
            w in 0.0f64..=1.0,
            h in 0.0f64..=1.0,
        ) {
            let img = WorkingImage::new(width, height);
            let out = apply_rect_crop(&img, NormalizedRect::new(x, y, w, h));
            prop_assert!(out.width() >= 1 && out.width() <= width);
            prop_assert!(out.height() >= 1 && out.height() <= height);
        }

        /// Property: aspect crops keep one full side.
        #[test]
        fn prop_aspect_crop_keeps_a_side(
            (width, height) in dimensions_strategy(),
            aspect in 0.2f64..=5.0,
        ) {
            let img = WorkingImage::new(width, height);
            let out = apply_aspect_crop(&img, aspect);
            prop_assert!(out.width() == width || out.height() == height);
        }
    }
}
