//! Tone curve synthesis, interpolation and LUT application.
//!
//! The contrast, blacks and whites controls are folded into a 5-point curve
//! which is interpolated with a monotonic cubic Hermite spline
//! (Fritsch-Carlson), so the curve never crosses itself and no tone inversion
//! can appear.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::{self, WorkingImage};
use crate::{clamp01, is_neutral};

/// Number of entries in a [`ToneCurveLut`].
pub const LUT_SIZE: usize = 4096;

/// Curve x-positions of the synthesized control points.
pub const CONTROL_X: [f32; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Tone curve control point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Input value (0.0 to 1.0)
    pub x: f32,
    /// Output value (0.0 to 1.0)
    pub y: f32,
}

impl CurvePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Tone curve with control points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneCurve {
    /// Control points for the curve (sorted by x)
    pub points: Vec<CurvePoint>,
}

impl Default for ToneCurve {
    fn default() -> Self {
        Self {
            // Linear curve by default
            points: vec![CurvePoint::new(0.0, 0.0), CurvePoint::new(1.0, 1.0)],
        }
    }
}

impl ToneCurve {
    /// Create a new linear tone curve
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if every control point lies on the diagonal.
    pub fn is_linear(&self) -> bool {
        self.points.len() >= 2
            && self
                .points
                .iter()
                .all(|p| (p.x - p.y).abs() < f32::EPSILON)
            && self.points[0].x.abs() < f32::EPSILON
            && (self.points[self.points.len() - 1].x - 1.0).abs() < f32::EPSILON
    }
}

// ============================================================================
// Synthesis
// ============================================================================

/// Derive the 5 control-point outputs from contrast, blacks and whites.
///
/// Inputs are clamped to [-1, 1]. The returned values are non-decreasing for
/// every input; a running maximum enforces it on top of the formulas.
pub fn synthesize_points(contrast: f32, blacks: f32, whites: f32) -> [f32; 5] {
    let c = contrast.clamp(-1.0, 1.0);
    let b = blacks.clamp(-1.0, 1.0);
    let w = whites.clamp(-1.0, 1.0);

    let black_lift = b.max(0.0) * 0.10;
    let black_crush = (-b).max(0.0) * 0.06;
    let white_lift = w.max(0.0) * 0.08;
    let white_pull = (-w).max(0.0) * 0.12;

    let shadow_bend = -c * 0.10;
    let highlight_bend = c * 0.10;
    let mid_lift = c * 0.03;

    let mut y = [
        (black_lift - black_crush).max(0.0),
        clamp01(0.25 + shadow_bend + black_lift * 0.10 - black_crush * 0.12),
        clamp01(0.50 + mid_lift),
        clamp01(0.75 + highlight_bend + white_lift * 0.12 - white_pull * 0.18),
        clamp01(1.00 - white_pull * 0.35 + white_lift * 0.20),
    ];

    for i in 1..y.len() {
        y[i] = y[i].max(y[i - 1]);
    }
    y
}

/// Build the 5-point tone curve for contrast, blacks and whites.
pub fn synthesize_tone_curve(contrast: f32, blacks: f32, whites: f32) -> ToneCurve {
    let ys = synthesize_points(contrast, blacks, whites);
    ToneCurve {
        points: CONTROL_X
            .iter()
            .zip(ys)
            .map(|(&x, y)| CurvePoint::new(x, y))
            .collect(),
    }
}

// ============================================================================
// LUT Type
// ============================================================================

/// Pre-computed lookup table over [0, 1] for efficient curve application.
#[derive(Debug, Clone)]
pub struct ToneCurveLut {
    /// LUT values: lut[i] = curve(i / (LUT_SIZE - 1))
    pub lut: Vec<f32>,
}

impl ToneCurveLut {
    /// Generate LUT from a tone curve.
    pub fn from_curve(curve: &ToneCurve) -> Self {
        // Fast path for linear curve
        if curve.is_linear() {
            return Self::identity();
        }

        let tangents = compute_monotonic_tangents(&curve.points);
        let scale = (LUT_SIZE - 1) as f32;
        let lut = (0..LUT_SIZE)
            .map(|i| evaluate_with_tangents(&curve.points, &tangents, i as f32 / scale))
            .collect();

        Self { lut }
    }

    /// Create identity LUT (no change).
    pub fn identity() -> Self {
        let scale = (LUT_SIZE - 1) as f32;
        Self {
            lut: (0..LUT_SIZE).map(|i| i as f32 / scale).collect(),
        }
    }

    /// Check if this LUT is identity.
    pub fn is_identity(&self) -> bool {
        let scale = (LUT_SIZE - 1) as f32;
        self.lut
            .iter()
            .enumerate()
            .all(|(i, &v)| (v - i as f32 / scale).abs() < 1e-6)
    }

    /// Look up a value, interpolating linearly between entries.
    ///
    /// Inputs outside [0, 1] are clamped.
    #[inline]
    pub fn sample(&self, value: f32) -> f32 {
        let pos = clamp01(value) * (LUT_SIZE - 1) as f32;
        let i = (pos as usize).min(LUT_SIZE - 2);
        let t = pos - i as f32;
        self.lut[i] + (self.lut[i + 1] - self.lut[i]) * t
    }
}

impl Default for ToneCurveLut {
    fn default() -> Self {
        Self::identity()
    }
}

// ============================================================================
// Curve Application
// ============================================================================

/// Apply the synthesized tone curve to a working image in place.
///
/// The curve acts on display-encoded values. All three controls below the
/// neutral threshold leave the image untouched.
pub fn apply_tone_curve(image: &mut WorkingImage, contrast: f32, blacks: f32, whites: f32) {
    if is_neutral(contrast) && is_neutral(blacks) && is_neutral(whites) {
        return;
    }

    let curve = synthesize_tone_curve(contrast, blacks, whites);
    let lut = ToneCurveLut::from_curve(&curve);
    debug!(contrast, blacks, whites, points = ?curve.points, "tone curve");

    if lut.is_identity() {
        return;
    }

    color::map_encoded(image, |rgb| {
        [lut.sample(rgb[0]), lut.sample(rgb[1]), lut.sample(rgb[2])]
    });
}

// ============================================================================
// Monotonic Cubic Hermite Spline (Fritsch-Carlson)
// ============================================================================

/// Compute monotonic tangents using Fritsch-Carlson algorithm.
fn compute_monotonic_tangents(points: &[CurvePoint]) -> Vec<f32> {
    let n = points.len();
    if n < 2 {
        return vec![0.0; n];
    }

    // Compute secants (slopes between adjacent points)
    let mut h: Vec<f32> = Vec::with_capacity(n - 1);
    let mut delta: Vec<f32> = Vec::with_capacity(n - 1);

    for i in 0..n - 1 {
        h.push(points[i + 1].x - points[i].x);
        delta.push(if h[i].abs() < f32::EPSILON {
            0.0
        } else {
            (points[i + 1].y - points[i].y) / h[i]
        });
    }

    let mut m: Vec<f32> = vec![0.0; n];

    // Interior points: weighted harmonic mean
    for i in 1..n - 1 {
        if delta[i - 1].signum() != delta[i].signum()
            || delta[i - 1].abs() < f32::EPSILON
            || delta[i].abs() < f32::EPSILON
        {
            m[i] = 0.0;
        } else {
            let w1 = 2.0 * h[i] + h[i - 1];
            let w2 = h[i] + 2.0 * h[i - 1];
            m[i] = (w1 + w2) / (w1 / delta[i - 1] + w2 / delta[i]);
        }
    }

    // Endpoint tangents
    m[0] = delta[0];
    m[n - 1] = delta[n - 2];

    // Enforce monotonicity constraints
    for i in 0..n - 1 {
        if delta[i].abs() < f32::EPSILON {
            m[i] = 0.0;
            m[i + 1] = 0.0;
        } else {
            let alpha = m[i] / delta[i];
            let beta = m[i + 1] / delta[i];

            if alpha > 3.0 {
                m[i] = 3.0 * delta[i];
            }
            if beta > 3.0 {
                m[i + 1] = 3.0 * delta[i];
            }
            if alpha < 0.0 {
                m[i] = 0.0;
            }
            if beta < 0.0 {
                m[i + 1] = 0.0;
            }
        }
    }

    m
}

/// Evaluate curve at x with pre-computed tangents.
fn evaluate_with_tangents(points: &[CurvePoint], tangents: &[f32], x: f32) -> f32 {
    let n = points.len();

    if n == 0 {
        return x;
    }
    if n == 1 {
        return points[0].y;
    }

    let x = x.clamp(points[0].x, points[n - 1].x);
    let i = find_interval(points, x);

    let p0 = &points[i];
    let p1 = &points[i + 1];

    let h = p1.x - p0.x;
    if h.abs() < f32::EPSILON {
        return p0.y;
    }

    let t = (x - p0.x) / h;
    let t2 = t * t;
    let t3 = t2 * t;

    // Hermite basis functions
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;

    let y = h00 * p0.y + h10 * h * tangents[i] + h01 * p1.y + h11 * h * tangents[i + 1];

    y.clamp(0.0, 1.0)
}

/// Binary search for interval containing x.
fn find_interval(points: &[CurvePoint], x: f32) -> usize {
    let n = points.len();
    if n <= 2 {
        return 0;
    }

    let mut low = 0;
    let mut high = n - 2;

    while low < high {
        let mid = (low + high).div_ceil(2);
        if points[mid].x <= x {
            low = mid;
        } else {
            high = mid - 1;
        }
    }

    low
}

/// Evaluate tone curve at a given x value.
pub fn evaluate_curve(curve: &ToneCurve, x: f32) -> f32 {
    let tangents = compute_monotonic_tangents(&curve.points);
    evaluate_with_tangents(&curve.points, &tangents, x)
}

// ============================================================================
// Tests
// ============================================================================


// ============================================================================
// Property-Based Tests
// ============================================================================
