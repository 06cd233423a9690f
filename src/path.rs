//! Arc-length-correct curve sampling and closest-point queries.
//!
//! A [`PathController`] owns a [`Curve`] and resamples it at uniform
//! *distance* intervals, so sample density does not depend on how fast the
//! raw curve parameter moves. Samples are indexed in a [`SpatialGrid`] for
//! closest-point lookups that only touch nearby cells.
//!
//! # Closest-point search
//!
//! 1. Scan the 27 cells around the query.
//! 2. If the best hit there is farther than one cell size, widen once to the
//!    5×5×5 block and accept a hit within two cell sizes.
//! 3. Otherwise scan every sample.
//!
//! A window of `rings` cells around the query holds every sample within
//! `rings * cell_size` of it, so an accepted hit is the true nearest sample.
//! Step 3 is the rare O(n) worst case for queries far away from the path.
//!
//! ```ignore
//! let curve = CatmullRomCurve::new(control_points, true)?;
//! let path = PathController::new(curve);
//!
//! let hit = path.closest_point(agent_position);
//! let ahead = path.point_at(hit.t + 0.01);
//! ```

use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::curve::{ArcLengthTable, Curve};
use crate::spatial::SpatialGrid;
use crate::trail::TrailRenderer;
use crate::MotionSource;

/// Window widening used before falling back to a full scan.
const WIDENED_RINGS: u32 = 2;

/// Direction reported when a tangent cannot be derived.
const DEFAULT_TANGENT: Vec3 = Vec3::X;

/// Sampling configuration for a [`PathController`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathControllerConfig {
    /// Number of arc-length-uniform samples (minimum 2 for non-degenerate curves).
    pub sample_count: usize,
    /// Resolution of the arc-length table used to reparameterize the curve.
    pub arc_length_divisions: usize,
    /// Grid cell size. `None` picks twice the sample spacing.
    pub cell_size: Option<f32>,
}

impl Default for PathControllerConfig {
    fn default() -> Self {
        Self {
            sample_count: 1000,
            arc_length_divisions: 4000,
            cell_size: None,
        }
    }
}

impl PathControllerConfig {
    pub fn with_sample_count(mut self, count: usize) -> Self {
        self.sample_count = count;
        self
    }

    pub fn with_arc_length_divisions(mut self, divisions: usize) -> Self {
        self.arc_length_divisions = divisions;
        self
    }

    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = Some(cell_size);
        self
    }
}

/// Result of a closest-point query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClosestPoint {
    /// Nearest sampled point on the path.
    pub point: Vec3,
    /// Normalized progress of that sample.
    pub t: f32,
    /// Distance from the query to `point`.
    pub distance: f32,
}

/// Curve wrapper answering progress and proximity queries.
#[derive(Debug)]
pub struct PathController {
    curve: Box<dyn Curve>,
    config: PathControllerConfig,
    table: ArcLengthTable,
    points: Vec<Vec3>,
    params: Vec<f32>,
    grid: SpatialGrid<f32>,
}

impl PathController {
    /// Sample `curve` with the default configuration.
    pub fn new<C: Curve + 'static>(curve: C) -> Self {
        Self::with_config(curve, PathControllerConfig::default())
    }

    /// Sample `curve` with an explicit configuration.
    pub fn with_config<C: Curve + 'static>(curve: C, config: PathControllerConfig) -> Self {
        Self::from_boxed(Box::new(curve), config)
    }

    /// Sample an already boxed curve.
    pub fn from_boxed(curve: Box<dyn Curve>, config: PathControllerConfig) -> Self {
        let table = ArcLengthTable::new(curve.as_ref(), config.arc_length_divisions);
        let mut controller = Self {
            curve,
            config,
            table,
            points: Vec::new(),
            params: Vec::new(),
            grid: SpatialGrid::default(),
        };
        controller.rebuild();
        controller
    }

    /// Replace the curve and rebuild samples and index.
    pub fn set_curve<C: Curve + 'static>(&mut self, curve: C) {
        self.curve = Box::new(curve);
        self.table = ArcLengthTable::new(self.curve.as_ref(), self.config.arc_length_divisions);
        self.rebuild();
    }

    /// Change the sample count and rebuild.
    pub fn set_sample_count(&mut self, count: usize) {
        self.config.sample_count = count;
        self.rebuild();
    }

    /// Resample the curve and rebuild the spatial index from scratch.
    fn rebuild(&mut self) {
        let length = self.table.total_length();
        self.points.clear();
        self.params.clear();

        if length <= f32::EPSILON {
            // Degenerate curve: a single sample at its only location.
            self.points.push(self.curve.point(0.0));
            self.params.push(0.0);
        } else {
            let count = self.config.sample_count.max(2);
            if self.config.sample_count < 2 {
                log::warn!(
                    "PathController sample count {} too small, using 2",
                    self.config.sample_count
                );
            }

            // Closed curves skip t = 1, which coincides with t = 0.
            let denominator = if self.curve.is_closed() { count } else { count - 1 };
            self.points.reserve(count);
            self.params.reserve(count);
            for i in 0..count {
                let t = i as f32 / denominator as f32;
                let u = self.table.param_for_fraction(t);
                self.points.push(self.curve.point(u));
                self.params.push(t);
            }
        }

        let cell_size = self.resolve_cell_size(length);
        let mut grid = SpatialGrid::new(cell_size);
        for (point, t) in self.points.iter().zip(&self.params) {
            grid.add(*point, *t);
        }
        self.grid = grid;

        log::debug!(
            "PathController rebuilt: {} samples, length {:.3}, cell size {:.3}",
            self.points.len(),
            length,
            cell_size
        );
    }

    fn resolve_cell_size(&self, length: f32) -> f32 {
        match self.config.cell_size {
            Some(size) if size.is_finite() && size > 0.0 => size,
            Some(size) => {
                log::warn!("PathController cell size {} is not positive, deriving one", size);
                self.derived_cell_size(length)
            }
            None => self.derived_cell_size(length),
        }
    }

    fn derived_cell_size(&self, length: f32) -> f32 {
        let spacing = length / self.points.len().max(1) as f32;
        if spacing > f32::EPSILON {
            spacing * 2.0
        } else {
            1.0
        }
    }

    /// Wrap (closed) or clamp (open) normalized progress.
    #[inline]
    pub fn normalize_t(&self, t: f32) -> f32 {
        if !t.is_finite() {
            return 0.0;
        }
        if self.curve.is_closed() {
            let wrapped = t.rem_euclid(1.0);
            // rem_euclid can round up to exactly 1.0 for tiny negative inputs
            if wrapped >= 1.0 {
                0.0
            } else {
                wrapped
            }
        } else {
            t.clamp(0.0, 1.0)
        }
    }

    /// Point at normalized arc-length progress `t`.
    pub fn point_at(&self, t: f32) -> Vec3 {
        if self.is_degenerate() {
            return self.points[0];
        }
        let u = self.table.param_for_fraction(self.normalize_t(t));
        self.curve.point(u)
    }

    /// Unit tangent at normalized arc-length progress `t`.
    ///
    /// Falls back to a finite difference along the path and then to `+X` when
    /// the curve has no usable direction at `t`.
    pub fn tangent_at(&self, t: f32) -> Vec3 {
        if self.is_degenerate() {
            return DEFAULT_TANGENT;
        }
        let t = self.normalize_t(t);
        let u = self.table.param_for_fraction(t);
        if let Some(tangent) = self.curve.derivative(u).try_normalize() {
            return tangent;
        }

        let step = 1.0 / self.points.len() as f32;
        (self.point_at(t + step) - self.point_at(t - step))
            .try_normalize()
            .unwrap_or(DEFAULT_TANGENT)
    }

    /// Sampled point nearest to `query`.
    pub fn closest_point(&self, query: Vec3) -> ClosestPoint {
        self.closest_within_rings(query, 1)
            .or_else(|| self.closest_within_rings(query, WIDENED_RINGS))
            .unwrap_or_else(|| self.closest_point_linear(query))
    }

    /// Nearest sample in the window, if it lies within the window's reach.
    fn closest_within_rings(&self, query: Vec3, rings: u32) -> Option<ClosestPoint> {
        let mut best: Option<(Vec3, f32, f32)> = None;
        self.grid.for_each_within_rings(query, rings, |point, t| {
            let d = point.distance_squared(query);
            if best.map_or(true, |(_, _, best_d)| d < best_d) {
                best = Some((point, *t, d));
            }
        });

        let reach = rings as f32 * self.grid.cell_size();
        best.map(|(point, t, distance_sq)| ClosestPoint {
            point,
            t,
            distance: distance_sq.sqrt(),
        })
        .filter(|hit| hit.distance <= reach)
    }

    /// Brute-force closest sample, ignoring the spatial index.
    pub fn closest_point_linear(&self, query: Vec3) -> ClosestPoint {
        let mut best_index = 0;
        let mut best_d = f32::INFINITY;
        for (i, point) in self.points.iter().enumerate() {
            let d = point.distance_squared(query);
            if d < best_d {
                best_d = d;
                best_index = i;
            }
        }
        ClosestPoint {
            point: self.points[best_index],
            t: self.params[best_index],
            distance: best_d.sqrt(),
        }
    }

    /// Feed the sampled shape to a renderer as one static point sequence.
    pub fn render_into<R: TrailRenderer + ?Sized>(&self, renderer: &mut R) {
        renderer.render(&self.points);
    }

    /// Total arc length of the curve.
    #[inline]
    pub fn length(&self) -> f32 {
        self.table.total_length()
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.curve.is_closed()
    }

    /// Arc-length-uniform sample positions, in progress order.
    #[inline]
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Progress value of each sample, parallel to [`points`](Self::points).
    #[inline]
    pub fn params(&self) -> &[f32] {
        &self.params
    }

    /// `(point, t)` pairs in progress order.
    pub fn samples(&self) -> impl ExactSizeIterator<Item = (Vec3, f32)> + '_ {
        self.points.iter().copied().zip(self.params.iter().copied())
    }

    #[inline]
    pub fn sample_count(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.grid.cell_size()
    }

    #[inline]
    pub fn config(&self) -> &PathControllerConfig {
        &self.config
    }

    /// The wrapped curve.
    pub fn curve(&self) -> &dyn Curve {
        self.curve.as_ref()
    }

    #[inline]
    fn is_degenerate(&self) -> bool {
        self.table.total_length() <= f32::EPSILON
    }
}

// ============================================================================
// Follower
// ============================================================================

/// Motion source travelling along a shared path at constant world speed.
///
/// Closed paths loop forever; open paths stop at the end and set
/// [`is_finished`](Self::is_finished).
#[derive(Clone, Debug)]
pub struct PathFollower {
    path: Arc<PathController>,
    t: f32,
    start_t: f32,
    speed: f32,
    finished: bool,
    laps: u32,
}

impl PathFollower {
    /// Start at progress `start_t` moving at `speed` world units per second.
    pub fn new(path: Arc<PathController>, start_t: f32, speed: f32) -> Self {
        let start_t = path.normalize_t(start_t);
        Self {
            path,
            t: start_t,
            start_t,
            speed,
            finished: false,
            laps: 0,
        }
    }

    /// Advance along the path by `speed * delta_time` world units.
    pub fn advance(&mut self, delta_time: f32) {
        let length = self.path.length();
        if self.finished || length <= f32::EPSILON {
            return;
        }

        let next = self.t + self.speed * delta_time / length;
        if self.path.is_closed() {
            if next >= 1.0 || next < 0.0 {
                self.laps += 1;
            }
            self.t = self.path.normalize_t(next);
        } else if next >= 1.0 {
            self.t = 1.0;
            self.finished = true;
        } else {
            self.t = next.max(0.0);
        }
    }

    /// Return to the starting progress.
    pub fn reset(&mut self) {
        self.t = self.start_t;
        self.finished = false;
        self.laps = 0;
    }

    /// Current normalized progress.
    #[inline]
    pub fn progress(&self) -> f32 {
        self.t
    }

    /// Heading along the path.
    pub fn direction(&self) -> Vec3 {
        let tangent = self.path.tangent_at(self.t);
        if self.speed < 0.0 {
            -tangent
        } else {
            tangent
        }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Whether an open path has been run to its end.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Completed circuits of a closed path.
    #[inline]
    pub fn laps(&self) -> u32 {
        self.laps
    }

    pub fn path(&self) -> &Arc<PathController> {
        &self.path
    }
}

impl MotionSource for PathFollower {
    fn position(&self) -> Vec3 {
        self.path.point_at(self.t)
    }

    fn update(&mut self, delta_time: f32, _elapsed_time: f32) {
        self.advance(delta_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{CatmullRomCurve, EllipseCurve, PolylineCurve};
    use crate::trail::PointCollector;

    fn uneven_spline() -> CatmullRomCurve {
        // Spans of very different lengths make raw-parameter speed uneven.
        CatmullRomCurve::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.5, 0.0),
                Vec3::new(2.0, 0.0, 0.5),
                Vec3::new(20.0, 5.0, 0.0),
                Vec3::new(40.0, 0.0, -3.0),
            ],
            false,
        )
        .unwrap()
    }

    fn spacing_stats(points: &[Vec3]) -> (f32, f32) {
        let gaps: Vec<f32> = points.windows(2).map(|w| w[0].distance(w[1])).collect();
        let mean = gaps.iter().sum::<f32>() / gaps.len() as f32;
        let var = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f32>() / gaps.len() as f32;
        (mean, var.sqrt())
    }

    #[test]
    fn test_samples_are_arc_length_uniform() {
        let path = PathController::with_config(uneven_spline(), PathControllerConfig::default().with_sample_count(400));
        let (mean, std_dev) = spacing_stats(path.points());
        assert!(std_dev / mean < 0.1, "std/mean = {}", std_dev / mean);
    }

    #[test]
    fn test_parameter_uniform_sampling_is_not_uniform() {
        // Sanity check that the curve used above really has uneven speed.
        let curve = uneven_spline();
        let naive: Vec<Vec3> = (0..400).map(|i| curve.point(i as f32 / 399.0)).collect();
        let (mean, std_dev) = spacing_stats(&naive);
        assert!(std_dev / mean > 0.1);
    }

    #[test]
    fn test_closed_curve_skips_duplicate_endpoint() {
        let path = PathController::with_config(
            EllipseCurve::new(Vec3::ZERO, 10.0, 4.0),
            PathControllerConfig::default().with_sample_count(100),
        );
        assert_eq!(path.sample_count(), 100);
        let first = path.points()[0];
        let last = path.points()[99];
        assert!(first.distance(last) > 1e-3);
        assert!(path.params()[99] < 1.0);
    }

    #[test]
    fn test_point_at_wraps_on_closed_curve() {
        let path = PathController::new(EllipseCurve::new(Vec3::ZERO, 5.0, 5.0));
        assert!(path.point_at(1.25).distance(path.point_at(0.25)) < 1e-3);
        assert!(path.point_at(-0.25).distance(path.point_at(0.75)) < 1e-3);
        assert!(path.point_at(1.0).distance(path.point_at(0.0)) < 1e-3);
    }

    #[test]
    fn test_point_at_clamps_on_open_curve() {
        let line = PolylineCurve::new(vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)], false).unwrap();
        let path = PathController::new(line);
        assert!(path.point_at(2.0).distance(Vec3::new(10.0, 0.0, 0.0)) < 1e-3);
        assert!(path.point_at(-1.0).distance(Vec3::ZERO) < 1e-3);
    }

    #[test]
    fn test_tangent_is_unit_and_follows_circle() {
        let path = PathController::new(EllipseCurve::new(Vec3::ZERO, 5.0, 5.0));
        let tangent = path.tangent_at(0.0);
        assert!((tangent.length() - 1.0).abs() < 1e-4);
        assert!(tangent.distance(Vec3::Y) < 1e-2);
    }

    #[test]
    fn test_degenerate_curve_has_one_sample() {
        let dot = CatmullRomCurve::new(vec![Vec3::new(1.0, 2.0, 3.0)], false).unwrap();
        let path = PathController::new(dot);
        assert_eq!(path.sample_count(), 1);
        assert_eq!(path.point_at(0.7), Vec3::new(1.0, 2.0, 3.0));
        let tangent = path.tangent_at(0.7);
        assert!(tangent.is_finite());
        assert_eq!(tangent, Vec3::X);
        let hit = path.closest_point(Vec3::splat(100.0));
        assert_eq!(hit.point, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_closest_point_matches_brute_force_near_path() {
        let path = PathController::new(uneven_spline());
        let cell = path.cell_size();
        for i in 0..50 {
            let t = i as f32 / 50.0;
            let query = path.point_at(t) + Vec3::new(0.3, -0.2, 0.1) * cell;
            let fast = path.closest_point(query);
            let slow = path.closest_point_linear(query);
            assert!(fast.distance <= slow.distance + cell, "t = {}", t);
        }
    }

    #[test]
    fn test_closest_point_ignores_far_hit_inside_window() {
        // Two samples only: one diagonal neighbour cell away but far, the
        // true nearest two cells away along X.
        let line = PolylineCurve::new(vec![Vec3::new(-1.01, 0.01, 0.01), Vec3::splat(1.99)], false).unwrap();
        let path = PathController::with_config(
            line,
            PathControllerConfig::default().with_sample_count(2).with_cell_size(1.0),
        );
        assert_eq!(path.sample_count(), 2);

        let query = Vec3::splat(0.01);
        let fast = path.closest_point(query);
        let slow = path.closest_point_linear(query);
        assert_eq!(fast, slow);
        assert!(fast.point.distance(Vec3::new(-1.01, 0.01, 0.01)) < 1e-5);
        assert!(fast.distance < 1.1);
    }

    #[test]
    fn test_closest_point_exact_across_cell_offsets() {
        let path = PathController::with_config(
            uneven_spline(),
            PathControllerConfig::default().with_sample_count(60).with_cell_size(0.5),
        );
        for i in 0..40 {
            let t = i as f32 / 40.0;
            for offset in [0.4f32, 0.9, 1.7, 3.0] {
                let query = path.point_at(t) + Vec3::new(0.0, offset, -offset * 0.5);
                let fast = path.closest_point(query);
                let slow = path.closest_point_linear(query);
                assert!((fast.distance - slow.distance).abs() < 1e-5, "t = {}, offset = {}", t, offset);
            }
        }
    }

    #[test]
    fn test_closest_point_far_query_uses_fallback() {
        let path = PathController::new(EllipseCurve::new(Vec3::ZERO, 5.0, 5.0));
        let query = Vec3::new(500.0, 0.0, 0.0);
        let hit = path.closest_point(query);
        let slow = path.closest_point_linear(query);
        assert_eq!(hit.point, slow.point);
        assert!(hit.point.x > 4.9);
    }

    #[test]
    fn test_set_curve_rebuilds_index() {
        let mut path = PathController::new(EllipseCurve::new(Vec3::ZERO, 5.0, 5.0));
        path.set_curve(EllipseCurve::new(Vec3::new(100.0, 0.0, 0.0), 5.0, 5.0));
        let hit = path.closest_point(Vec3::new(105.0, 0.0, 0.0));
        assert!(hit.distance < 0.1);
        path.set_sample_count(50);
        assert_eq!(path.sample_count(), 50);
    }

    #[test]
    fn test_render_into_passes_all_samples() {
        let path = PathController::with_config(
            EllipseCurve::new(Vec3::ZERO, 5.0, 5.0),
            PathControllerConfig::default().with_sample_count(64),
        );
        let mut collector = PointCollector::default();
        path.render_into(&mut collector);
        assert_eq!(collector.points().len(), 64);
    }

    #[test]
    fn test_follower_moves_at_world_speed() {
        let line = PolylineCurve::new(vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)], false).unwrap();
        let path = Arc::new(PathController::new(line));
        let mut follower = PathFollower::new(path, 0.0, 2.0);

        follower.update(1.0, 1.0);
        assert!(follower.position().distance(Vec3::new(2.0, 0.0, 0.0)) < 1e-2);

        for _ in 0..10 {
            follower.update(1.0, 0.0);
        }
        assert!(follower.is_finished());
        assert!(follower.position().distance(Vec3::new(10.0, 0.0, 0.0)) < 1e-2);
    }

    #[test]
    fn test_follower_loops_closed_path() {
        let path = Arc::new(PathController::new(EllipseCurve::new(Vec3::ZERO, 5.0, 5.0)));
        let length = path.length();
        let mut follower = PathFollower::new(path, 0.0, length / 4.0);
        for _ in 0..5 {
            follower.advance(1.0);
        }
        assert_eq!(follower.laps(), 1);
        assert!((follower.progress() - 0.25).abs() < 1e-3);
        assert!(!follower.is_finished());
    }
}
