//! Soft area constraints that keep agents inside a volume.
//!
//! A constraint never clamps positions. It adds a linear spring-back force
//! proportional to how far the agent has strayed, so an agent can overshoot
//! briefly and is pulled back harder the deeper it goes.
//!
//! Constraints are immutable once built and are meant to be shared: many
//! agents hold the same `Arc<AreaConstraint>`.
//!
//! | Variant | Legal region |
//! |---------|--------------|
//! | [`AreaConstraint::Cubic`] | axis-aligned box `|p[a]| <= bounds[a]` |
//! | [`AreaConstraint::Donut`] | annular cylinder around Z, `|z| <= height / 2` |

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Strength used when a non-positive or non-finite one is supplied.
pub const DEFAULT_STRENGTH: f32 = 0.1;

/// Radial distances below this are treated as "on the axis".
const AXIS_EPSILON: f32 = 1e-6;

/// Box-shaped legal region centered at the origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "CubicParams")]
pub struct CubicConstraint {
    /// Half-extent per axis.
    pub bounds: Vec3,
    /// Force per unit of penetration.
    pub strength: f32,
}

/// Annular cylinder around the Z axis, centered at the origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "DonutParams")]
pub struct DonutConstraint {
    pub inner_radius: f32,
    pub outer_radius: f32,
    /// Full height; the legal band is `-height / 2 ..= height / 2`.
    pub height: f32,
    pub strength: f32,
}

// Presets are loaded through these and corrected like the constructors.
#[derive(Deserialize)]
struct CubicParams {
    bounds: Vec3,
    strength: f32,
}

#[derive(Deserialize)]
struct DonutParams {
    inner_radius: f32,
    outer_radius: f32,
    height: f32,
    strength: f32,
}

impl From<CubicParams> for CubicConstraint {
    fn from(params: CubicParams) -> Self {
        CubicConstraint::new(params.bounds, params.strength)
    }
}

impl From<DonutParams> for DonutConstraint {
    fn from(params: DonutParams) -> Self {
        DonutConstraint::new(params.inner_radius, params.outer_radius, params.height, params.strength)
    }
}

/// Closed set of soft constraints.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AreaConstraint {
    Cubic(CubicConstraint),
    Donut(DonutConstraint),
}

impl AreaConstraint {
    /// Box constraint with half-extents `bounds`.
    ///
    /// Negative bounds are taken by magnitude.
    pub fn cubic(bounds: Vec3, strength: f32) -> Self {
        AreaConstraint::Cubic(CubicConstraint::new(bounds, strength))
    }

    /// Annular cylinder constraint.
    ///
    /// If `inner_radius >= outer_radius` the inner radius is pulled to just
    /// below the outer one and a warning is logged.
    pub fn donut(inner_radius: f32, outer_radius: f32, height: f32, strength: f32) -> Self {
        AreaConstraint::Donut(DonutConstraint::new(inner_radius, outer_radius, height, strength))
    }

    /// Corrective force for an agent at `position`. Zero inside the region.
    pub fn force(&self, position: Vec3) -> Vec3 {
        match self {
            AreaConstraint::Cubic(c) => c.force(position),
            AreaConstraint::Donut(d) => d.force(position),
        }
    }

    /// Add the corrective force for `position` to `acceleration`.
    #[inline]
    pub fn constrain(&self, position: Vec3, acceleration: &mut Vec3) {
        *acceleration += self.force(position);
    }

    /// Whether `position` lies inside the legal region.
    pub fn contains(&self, position: Vec3) -> bool {
        self.force(position) == Vec3::ZERO
    }

    pub fn strength(&self) -> f32 {
        match self {
            AreaConstraint::Cubic(c) => c.strength,
            AreaConstraint::Donut(d) => d.strength,
        }
    }
}

impl CubicConstraint {
    pub fn new(bounds: Vec3, strength: f32) -> Self {
        Self {
            bounds: bounds.abs(),
            strength: checked_strength(strength),
        }
    }

    /// Per-axis spring-back, no interaction between axes.
    pub fn force(&self, position: Vec3) -> Vec3 {
        Vec3::new(
            axis_spring(position.x, self.bounds.x, self.strength),
            axis_spring(position.y, self.bounds.y, self.strength),
            axis_spring(position.z, self.bounds.z, self.strength),
        )
    }
}

impl DonutConstraint {
    /// See [`AreaConstraint::donut`].
    pub fn new(inner_radius: f32, outer_radius: f32, height: f32, strength: f32) -> Self {
        let outer_radius = outer_radius.abs();
        let mut inner_radius = inner_radius.abs();
        if inner_radius >= outer_radius {
            let clamped = outer_radius * 0.99;
            log::warn!(
                "Donut inner radius {} must be below outer radius {}, using {}",
                inner_radius,
                outer_radius,
                clamped
            );
            inner_radius = clamped;
        }

        Self {
            inner_radius,
            outer_radius,
            height: height.abs(),
            strength: checked_strength(strength),
        }
    }

    pub fn force(&self, position: Vec3) -> Vec3 {
        let planar = Vec2::new(position.x, position.y);
        let r = planar.length();
        let mut force = Vec3::ZERO;

        // Radial direction is undefined on the axis: skip rather than NaN.
        if r > AXIS_EPSILON {
            let outward = planar / r;
            let radial = if r > self.outer_radius {
                -(r - self.outer_radius) * self.strength
            } else if r < self.inner_radius {
                (self.inner_radius - r) * self.strength
            } else {
                0.0
            };
            force.x = outward.x * radial;
            force.y = outward.y * radial;
        }

        force.z = axis_spring(position.z, self.height * 0.5, self.strength);
        force
    }
}

/// Linear pull back toward `±bound` once `|value|` exceeds it.
#[inline]
fn axis_spring(value: f32, bound: f32, strength: f32) -> f32 {
    let depth = value.abs() - bound;
    if depth > 0.0 {
        -value.signum() * depth * strength
    } else {
        0.0
    }
}

fn checked_strength(strength: f32) -> f32 {
    if strength.is_finite() && strength > 0.0 {
        strength
    } else {
        log::warn!(
            "Constraint strength {} must be positive, using {}",
            strength,
            DEFAULT_STRENGTH
        );
        DEFAULT_STRENGTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cubic_zero_inside_and_on_bound() {
        let c = AreaConstraint::cubic(Vec3::splat(10.0), 0.1);
        assert_eq!(c.force(Vec3::new(3.0, -4.0, 9.0)), Vec3::ZERO);
        assert_eq!(c.force(Vec3::new(10.0, -10.0, 10.0)), Vec3::ZERO);
        assert!(c.contains(Vec3::ZERO));
    }

    #[test]
    fn test_cubic_force_points_inward_per_axis() {
        let c = AreaConstraint::cubic(Vec3::splat(10.0), 0.5);
        let f = c.force(Vec3::new(14.0, 0.0, -12.0));
        assert!((f.x - -2.0).abs() < 1e-6);
        assert_eq!(f.y, 0.0);
        assert!((f.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cubic_force_monotonic_in_depth() {
        let c = AreaConstraint::cubic(Vec3::new(5.0, 5.0, 5.0), 0.2);
        let mut last = 0.0;
        for i in 1..50 {
            let magnitude = c.force(Vec3::new(5.0 + i as f32 * 0.5, 0.0, 0.0)).length();
            assert!(magnitude > last);
            last = magnitude;
        }
    }

    #[test]
    fn test_donut_outside_pushes_toward_center() {
        let d = AreaConstraint::donut(50.0, 100.0, 30.0, 0.1);
        let position = Vec3::new(120.0 * 0.6, 120.0 * 0.8, 0.0);
        let force = d.force(position);
        let expected_dir = -Vec3::new(0.6, 0.8, 0.0);
        assert!(force.normalize().distance(expected_dir) < 1e-5);
        assert!((force.length() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_donut_inside_hole_pushes_outward() {
        let d = AreaConstraint::donut(50.0, 100.0, 30.0, 0.1);
        let force = d.force(Vec3::new(0.0, 20.0, 0.0));
        assert!(force.y > 0.0);
        assert!((force.y - 3.0).abs() < 1e-4);
        assert_eq!(force.x, 0.0);
    }

    #[test]
    fn test_donut_height_band() {
        let d = AreaConstraint::donut(50.0, 100.0, 30.0, 0.1);
        let force = d.force(Vec3::new(75.0, 0.0, 25.0));
        assert_eq!(force.x, 0.0);
        assert!((force.z - -1.0).abs() < 1e-5);
        assert!(d.contains(Vec3::new(75.0, 0.0, 15.0)));
    }

    #[test]
    fn test_donut_axis_is_finite() {
        let d = AreaConstraint::donut(50.0, 100.0, 30.0, 0.1);
        let force = d.force(Vec3::new(0.0, 0.0, 0.0));
        assert!(force.is_finite());
        assert_eq!(force, Vec3::ZERO);
    }

    #[test]
    fn test_donut_inverted_radii_are_clamped() {
        match AreaConstraint::donut(120.0, 100.0, 10.0, 0.1) {
            AreaConstraint::Donut(d) => {
                assert!(d.inner_radius < d.outer_radius);
                assert!((d.inner_radius - 99.0).abs() < 1e-4);
            }
            other => panic!("unexpected variant {:?}", other),
        }
    }

    #[test]
    fn test_invalid_strength_defaults() {
        let c = AreaConstraint::cubic(Vec3::ONE, 0.0);
        assert_eq!(c.strength(), DEFAULT_STRENGTH);
        let c = AreaConstraint::donut(1.0, 2.0, 1.0, f32::NAN);
        assert_eq!(c.strength(), DEFAULT_STRENGTH);
    }

    #[test]
    fn test_constrain_adds_to_acceleration() {
        let c = AreaConstraint::cubic(Vec3::splat(1.0), 1.0);
        let mut acceleration = Vec3::new(0.0, 1.0, 0.0);
        c.constrain(Vec3::new(3.0, 0.0, 0.0), &mut acceleration);
        assert_eq!(acceleration, Vec3::new(-2.0, 1.0, 0.0));
    }
}
