//! # ribbon-motion
//!
//! Motion and guidance core for animated ribbon trails.
//!
//! Every trail in a scene is driven by a motion source: a flocking [`Boid`],
//! a waypoint-following [`PathGuide`] or a [`PathFollower`] gliding along an
//! arc-length sampled curve. Each frame the sources move, and a
//! [`TrailRecorder`] per source appends the new position to a fixed ring of
//! history that renderers read back in order.
//!
//! ## Quick Start
//!
//! ```ignore
//! use ribbon_motion::prelude::*;
//!
//! let mut scene = TrailScene::new(SceneConfig::default());
//! scene.add_guide(PathGuide::circular_loop(Vec3::ZERO, 15.0, 32, 5.0, true));
//!
//! let constraint = Arc::new(AreaConstraint::cubic(Vec3::splat(10.0), 0.1));
//! scene
//!     .flock_mut()
//!     .spawn_boids(200, Vec3::ZERO, 8.0, BoidConfig::default(), Some(constraint));
//!
//! let mut clock = FrameClock::fixed(1.0 / 60.0);
//! loop {
//!     let (delta, elapsed) = clock.tick();
//!     scene.update(delta, elapsed);
//!     scene.render(&mut my_ribbon_renderer);
//! }
//! ```
//!
//! ## Core Concepts
//!
//! | Module | Provides |
//! |--------|----------|
//! | [`spatial`] | [`SpatialGrid`], uniform-bucket spatial hash with 27-cell queries |
//! | [`curve`] | [`Curve`] shapes and the [`ArcLengthTable`] reparameterization |
//! | [`path`] | [`PathController`] arc-length sampling, closest-point lookup, [`PathFollower`] |
//! | [`guide`] | [`PathGuide`] waypoint state machine and loop builders |
//! | [`constraint`] | [`AreaConstraint`] soft spring-back volumes |
//! | [`boid`] | [`Boid`] steering and integration |
//! | [`flocking`] | [`FlockingSystem`] with wander, attraction, avoidance and lanes |
//! | [`trail`] | [`TrailRecorder`] ring buffer and the [`TrailRenderer`] contract |
//! | [`scene`] | [`TrailScene`] fixed-order frame driver |
//! | [`time`] | [`FrameClock`] wall or fixed-step deltas |
//!
//! ## Configuration
//!
//! All tunables are plain structs with `Default`, `with_*` builders and serde
//! derives, so presets can be loaded from JSON or any other serde format.
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade and installs no logger.
//! Misconfiguration that gets corrected (zero capacities, inverted radii,
//! non-positive strengths) is reported with `warn!`.

pub mod boid;
pub mod constraint;
pub mod curve;
mod error;
pub mod flocking;
pub mod guide;
pub mod path;
pub mod scene;
pub mod spatial;
pub mod time;
pub mod trail;

pub use bytemuck;
pub use glam::Vec3;

pub use boid::{Boid, BoidConfig, FlockWeights};
pub use constraint::{AreaConstraint, CubicConstraint, DonutConstraint};
pub use curve::{ArcLengthTable, CatmullRomCurve, CubicBezierCurve, Curve, EllipseCurve, PolylineCurve};
pub use error::CurveError;
pub use flocking::{FlockingConfig, FlockingSystem, ForcePoint, NeighborSearch, SteeringAgent, WanderConfig};
pub use guide::{GuideState, PathGuide, Waypoint};
pub use path::{ClosestPoint, PathController, PathControllerConfig, PathFollower};
pub use scene::{SceneConfig, TrailScene};
pub use spatial::SpatialGrid;
pub use time::FrameClock;
pub use trail::{PointCollector, TrailConfig, TrailRecorder, TrailRenderer};

/// Anything that moves and can leave a trail.
///
/// The frame driver calls [`update`](Self::update) once per frame, then a
/// [`TrailRecorder`] reads [`position`](Self::position).
pub trait MotionSource {
    /// Current world position.
    fn position(&self) -> Vec3;

    /// Advance by `delta_time` seconds. `elapsed_time` is the total since start.
    fn update(&mut self, delta_time: f32, elapsed_time: f32);
}

/// A motion source that never moves.
///
/// Handy for anchored trails and tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StaticPoint {
    pub position: Vec3,
}

impl StaticPoint {
    pub fn new(position: Vec3) -> Self {
        Self { position }
    }
}

impl MotionSource for StaticPoint {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn update(&mut self, _delta_time: f32, _elapsed_time: f32) {}
}

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use ribbon_motion::prelude::*;
/// ```
pub mod prelude {
    pub use crate::boid::{Boid, BoidConfig, FlockWeights};
    pub use crate::constraint::AreaConstraint;
    pub use crate::curve::{CatmullRomCurve, CubicBezierCurve, Curve, EllipseCurve, PolylineCurve};
    pub use crate::flocking::{FlockingConfig, FlockingSystem, ForcePoint, NeighborSearch, WanderConfig};
    pub use crate::guide::{GuideState, PathGuide, Waypoint};
    pub use crate::path::{PathController, PathControllerConfig, PathFollower};
    pub use crate::scene::{SceneConfig, TrailScene};
    pub use crate::time::FrameClock;
    pub use crate::trail::{PointCollector, TrailConfig, TrailRecorder, TrailRenderer};
    pub use crate::{MotionSource, StaticPoint, Vec3};
    pub use std::sync::Arc;
}
