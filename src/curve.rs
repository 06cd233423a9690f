//! Parametric 3D curves and their arc-length reparameterization.
//!
//! A [`Curve`] maps a raw parameter `u ∈ [0, 1]` to a point. Raw parameter
//! speed is generally *not* uniform: a Catmull-Rom spline through unevenly
//! spaced control points moves faster on long spans than on short ones.
//! [`ArcLengthTable`] fixes that by tabulating cumulative length so a
//! fraction of total distance can be turned back into a raw parameter.
//!
//! # Curve Types
//!
//! | Type | Closed | Notes |
//! |------|--------|-------|
//! | [`CatmullRomCurve`] | optional | centripetal by default |
//! | [`PolylineCurve`] | optional | straight segments |
//! | [`EllipseCurve`] | always | XY-plane ellipse |
//! | [`CubicBezierCurve`] | never | single cubic segment |

use std::f32::consts::TAU;
use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{validate_control_points, CurveError};

/// Step used for finite-difference derivatives.
const DERIVATIVE_DELTA: f32 = 1e-4;

/// A parametric curve in 3D space.
pub trait Curve: fmt::Debug + Send + Sync {
    /// Point at raw parameter `u ∈ [0, 1]`.
    fn point(&self, u: f32) -> Vec3;

    /// Whether the curve returns to its start at `u = 1`.
    fn is_closed(&self) -> bool {
        false
    }

    /// Derivative with respect to the raw parameter.
    ///
    /// The default is a finite difference clamped to the parameter range.
    fn derivative(&self, u: f32) -> Vec3 {
        let u0 = (u - DERIVATIVE_DELTA).max(0.0);
        let u1 = (u + DERIVATIVE_DELTA).min(1.0);
        if u1 <= u0 {
            return Vec3::ZERO;
        }
        (self.point(u1) - self.point(u0)) / (u1 - u0)
    }
}

/// Cumulative arc-length lookup for a curve.
///
/// Lengths are measured between `divisions + 1` evenly spaced raw parameters
/// and interpolated linearly in between.
#[derive(Clone, Debug)]
pub struct ArcLengthTable {
    lengths: Vec<f32>,
}

impl ArcLengthTable {
    /// Tabulate cumulative length with the given number of divisions (min 1).
    pub fn new(curve: &dyn Curve, divisions: usize) -> Self {
        let divisions = divisions.max(1);
        let mut lengths = Vec::with_capacity(divisions + 1);
        let mut total = 0.0;
        let mut last = curve.point(0.0);
        lengths.push(0.0);

        for i in 1..=divisions {
            let current = curve.point(i as f32 / divisions as f32);
            total += current.distance(last);
            lengths.push(total);
            last = current;
        }

        Self { lengths }
    }

    /// Total measured length of the curve.
    #[inline]
    pub fn total_length(&self) -> f32 {
        // Never empty: `new` always pushes the zero entry.
        self.lengths[self.lengths.len() - 1]
    }

    /// Number of divisions the table was built with.
    #[inline]
    pub fn divisions(&self) -> usize {
        self.lengths.len() - 1
    }

    /// Map a fraction of total length (`0..=1`) to a raw curve parameter.
    ///
    /// Zero-length curves map the fraction through unchanged.
    pub fn param_for_fraction(&self, fraction: f32) -> f32 {
        let fraction = fraction.clamp(0.0, 1.0);
        let total = self.total_length();
        if total <= f32::EPSILON {
            return fraction;
        }

        let target = fraction * total;
        let divisions = self.divisions();

        // Index of the last entry not greater than the target.
        let i = match self
            .lengths
            .binary_search_by(|len| len.partial_cmp(&target).unwrap_or(std::cmp::Ordering::Less))
        {
            Ok(exact) => return exact as f32 / divisions as f32,
            Err(insert) => insert.saturating_sub(1).min(divisions - 1),
        };

        let before = self.lengths[i];
        let segment = self.lengths[i + 1] - before;
        let local = if segment > 0.0 { (target - before) / segment } else { 0.0 };

        (i as f32 + local) / divisions as f32
    }
}

// ============================================================================
// Catmull-Rom
// ============================================================================

/// Catmull-Rom spline through a list of control points.
///
/// `alpha` selects the knot parameterization: `0.0` uniform, `0.5`
/// centripetal (default, no cusps or self-intersections within a segment),
/// `1.0` chordal.
///
/// Deserializing goes through [`CatmullRomCurve::new`], so an empty point list
/// is rejected and `alpha` is clamped the same way.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "CatmullRomParams")]
pub struct CatmullRomCurve {
    points: Vec<Vec3>,
    closed: bool,
    alpha: f32,
}

impl CatmullRomCurve {
    /// Create a centripetal Catmull-Rom spline.
    pub fn new(points: Vec<Vec3>, closed: bool) -> Result<Self, CurveError> {
        validate_control_points(&points)?;
        Ok(Self {
            points,
            closed,
            alpha: 0.5,
        })
    }

    /// Set the knot parameterization exponent (clamped to `0..=1`).
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    /// Control points the spline passes through.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }
}

/// Unchecked serialized form of [`CatmullRomCurve`].
#[derive(Deserialize)]
struct CatmullRomParams {
    points: Vec<Vec3>,
    #[serde(default)]
    closed: bool,
    #[serde(default = "centripetal_alpha")]
    alpha: f32,
}

fn centripetal_alpha() -> f32 {
    0.5
}

impl TryFrom<CatmullRomParams> for CatmullRomCurve {
    type Error = CurveError;

    fn try_from(params: CatmullRomParams) -> Result<Self, Self::Error> {
        let alpha = if params.alpha.is_finite() {
            params.alpha
        } else {
            log::warn!("Catmull-Rom alpha {} is not finite, using 0.5", params.alpha);
            centripetal_alpha()
        };
        Ok(Self::new(params.points, params.closed)?.with_alpha(alpha))
    }
}

impl Curve for CatmullRomCurve {
    fn point(&self, u: f32) -> Vec3 {
        let points = &self.points;
        let n = points.len();
        match n {
            0 => return Vec3::ZERO,
            1 => return points[0],
            _ => {}
        }

        let span = if self.closed { n } else { n - 1 };
        let p = span as f32 * u.clamp(0.0, 1.0);
        let mut index = p.floor() as usize;
        let mut weight = p - index as f32;

        if self.closed {
            index %= n;
        } else if index >= n - 1 {
            index = n - 2;
            weight = 1.0;
        }

        let p1 = points[index];
        let p2 = points[(index + 1) % n];

        let p0 = if self.closed || index > 0 {
            points[(index + n - 1) % n]
        } else {
            // Extrapolate a phantom point before the first one.
            points[0] * 2.0 - points[1]
        };

        let p3 = if self.closed || index + 2 < n {
            points[(index + 2) % n]
        } else {
            points[n - 1] * 2.0 - points[n - 2]
        };

        let exponent = self.alpha * 0.5;
        let mut dt0 = p0.distance_squared(p1).powf(exponent);
        let mut dt1 = p1.distance_squared(p2).powf(exponent);
        let mut dt2 = p2.distance_squared(p3).powf(exponent);

        // Coincident control points
        if dt1 < 1e-4 {
            dt1 = 1.0;
        }
        if dt0 < 1e-4 {
            dt0 = dt1;
        }
        if dt2 < 1e-4 {
            dt2 = dt1;
        }

        let mut t1 = (p1 - p0) / dt0 - (p2 - p0) / (dt0 + dt1) + (p2 - p1) / dt1;
        let mut t2 = (p2 - p1) / dt1 - (p3 - p1) / (dt1 + dt2) + (p3 - p2) / dt2;
        t1 *= dt1;
        t2 *= dt1;

        let c0 = p1;
        let c1 = t1;
        let c2 = -3.0 * p1 + 3.0 * p2 - 2.0 * t1 - t2;
        let c3 = 2.0 * p1 - 2.0 * p2 + t1 + t2;

        let w = weight;
        c0 + c1 * w + c2 * (w * w) + c3 * (w * w * w)
    }

    fn is_closed(&self) -> bool {
        self.closed && self.points.len() > 1
    }
}

// ============================================================================
// Polyline
// ============================================================================

/// Straight segments between control points, parameter-uniform per segment.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "PolylineParams")]
pub struct PolylineCurve {
    points: Vec<Vec3>,
    closed: bool,
}

impl PolylineCurve {
    /// Create a polyline. A closed polyline adds a segment back to the start.
    pub fn new(points: Vec<Vec3>, closed: bool) -> Result<Self, CurveError> {
        validate_control_points(&points)?;
        Ok(Self { points, closed })
    }

    /// Vertices of the polyline.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }
}

#[derive(Deserialize)]
struct PolylineParams {
    points: Vec<Vec3>,
    #[serde(default)]
    closed: bool,
}

impl TryFrom<PolylineParams> for PolylineCurve {
    type Error = CurveError;

    fn try_from(params: PolylineParams) -> Result<Self, Self::Error> {
        Self::new(params.points, params.closed)
    }
}

impl Curve for PolylineCurve {
    fn point(&self, u: f32) -> Vec3 {
        let n = self.points.len();
        match n {
            0 => return Vec3::ZERO,
            1 => return self.points[0],
            _ => {}
        }

        let segments = if self.closed { n } else { n - 1 };
        let p = segments as f32 * u.clamp(0.0, 1.0);
        let index = (p.floor() as usize).min(segments - 1);
        let local = p - index as f32;

        let a = self.points[index];
        let b = self.points[(index + 1) % n];
        a.lerp(b, local)
    }

    fn is_closed(&self) -> bool {
        self.closed && self.points.len() > 1
    }
}

// ============================================================================
// Ellipse
// ============================================================================

/// Full ellipse in the XY plane, traversed counter-clockwise from +X.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EllipseCurve {
    /// Center of the ellipse.
    pub center: Vec3,
    /// Radius along X.
    pub radius_x: f32,
    /// Radius along Y.
    pub radius_y: f32,
}

impl EllipseCurve {
    /// Create an ellipse. Negative radii are taken by magnitude.
    pub fn new(center: Vec3, radius_x: f32, radius_y: f32) -> Self {
        Self {
            center,
            radius_x: radius_x.abs(),
            radius_y: radius_y.abs(),
        }
    }
}

impl Curve for EllipseCurve {
    fn point(&self, u: f32) -> Vec3 {
        let angle = u * TAU;
        self.center + Vec3::new(self.radius_x * angle.cos(), self.radius_y * angle.sin(), 0.0)
    }

    fn is_closed(&self) -> bool {
        true
    }

    fn derivative(&self, u: f32) -> Vec3 {
        let angle = u * TAU;
        Vec3::new(-self.radius_x * angle.sin(), self.radius_y * angle.cos(), 0.0) * TAU
    }
}

// ============================================================================
// Cubic Bezier
// ============================================================================

/// Single cubic Bezier segment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CubicBezierCurve {
    pub p0: Vec3,
    pub p1: Vec3,
    pub p2: Vec3,
    pub p3: Vec3,
}

impl CubicBezierCurve {
    pub fn new(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3) -> Self {
        Self { p0, p1, p2, p3 }
    }
}

impl Curve for CubicBezierCurve {
    fn point(&self, u: f32) -> Vec3 {
        let t = u.clamp(0.0, 1.0);
        let k = 1.0 - t;
        self.p0 * (k * k * k) + self.p1 * (3.0 * k * k * t) + self.p2 * (3.0 * k * t * t) + self.p3 * (t * t * t)
    }

    fn derivative(&self, u: f32) -> Vec3 {
        let t = u.clamp(0.0, 1.0);
        let k = 1.0 - t;
        (self.p1 - self.p0) * (3.0 * k * k) + (self.p2 - self.p1) * (6.0 * k * t) + (self.p3 - self.p2) * (3.0 * t * t)
    }
}
