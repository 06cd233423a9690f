//! Reynolds-style flocking agent.
//!
//! Each tick a [`Boid`] gathers steering contributions from its neighbors,
//! accumulates them in `acceleration`, then integrates:
//!
//! ```text
//! position     += velocity
//! velocity     += acceleration
//! velocity      = clamp_length(velocity, max_speed)
//! acceleration  = 0
//! acceleration += constraint.force(position)   // felt next tick
//! ```
//!
//! Every steering term follows the same pattern: compute a desired heading,
//! scale it to `max_speed`, subtract the current velocity and clamp the
//! result to `max_force`.
//!
//! Neighbors are addressed by index into the flock slice so the same slice
//! can hold the boid being steered; it is simply left out of its own
//! neighbor list.

use std::f32::consts::TAU;
use std::sync::Arc;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constraint::AreaConstraint;
use crate::flocking::SteeringAgent;
use crate::MotionSource;

/// Per-agent tunables.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoidConfig {
    /// Upper bound on speed after every integration step.
    pub max_speed: f32,
    /// Upper bound on each individual steering contribution.
    pub max_force: f32,
    /// Radius within which other agents count as neighbors.
    pub perception_radius: f32,
}

impl Default for BoidConfig {
    fn default() -> Self {
        Self {
            max_speed: 0.5,
            max_force: 0.03,
            perception_radius: 5.0,
        }
    }
}

impl BoidConfig {
    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }

    pub fn with_max_force(mut self, max_force: f32) -> Self {
        self.max_force = max_force;
        self
    }

    pub fn with_perception_radius(mut self, radius: f32) -> Self {
        self.perception_radius = radius;
        self
    }
}

/// Relative weights of the three flocking rules.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockWeights {
    pub separation: f32,
    pub alignment: f32,
    pub cohesion: f32,
    /// Separation radius as a fraction of the perception radius.
    pub separation_radius_factor: f32,
}

impl Default for FlockWeights {
    fn default() -> Self {
        Self {
            separation: 1.5,
            alignment: 1.0,
            cohesion: 1.0,
            separation_radius_factor: 0.8,
        }
    }
}

/// A single flocking agent.
#[derive(Clone, Debug)]
pub struct Boid {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Per-tick force accumulator, zeroed by [`update`](Self::update).
    pub acceleration: Vec3,
    pub max_speed: f32,
    pub max_force: f32,
    pub perception_radius: f32,
    constraint: Option<Arc<AreaConstraint>>,
}

impl Boid {
    /// Spawn at `position` heading in a random direction at full speed.
    pub fn new<R: Rng + ?Sized>(position: Vec3, config: BoidConfig, rng: &mut R) -> Self {
        let heading = random_unit_vector(rng);
        Self::with_velocity(position, heading * config.max_speed, config)
    }

    /// Spawn with an explicit initial velocity.
    pub fn with_velocity(position: Vec3, velocity: Vec3, config: BoidConfig) -> Self {
        let max_speed = config.max_speed.max(0.0);
        Self {
            position,
            velocity: velocity.clamp_length_max(max_speed),
            acceleration: Vec3::ZERO,
            max_speed,
            max_force: config.max_force.max(0.0),
            perception_radius: config.perception_radius.max(0.0),
            constraint: None,
        }
    }

    /// Attach a shared area constraint.
    pub fn with_constraint(mut self, constraint: Arc<AreaConstraint>) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn set_constraint(&mut self, constraint: Option<Arc<AreaConstraint>>) {
        self.constraint = constraint;
    }

    pub fn constraint(&self) -> Option<&Arc<AreaConstraint>> {
        self.constraint.as_ref()
    }

    /// Accumulate a force for this tick.
    #[inline]
    pub fn apply_force(&mut self, force: Vec3) {
        self.acceleration += force;
    }

    /// Integrate one tick, then apply the area constraint.
    pub fn update(&mut self) {
        self.position += self.velocity;
        self.velocity += self.acceleration;
        self.velocity = self.velocity.clamp_length_max(self.max_speed);
        self.acceleration = Vec3::ZERO;
        self.apply_constraint();
    }

    /// Integrate scaled by elapsed frame time, normalized to 60 fps.
    ///
    /// `update_scaled(1.0 / 60.0)` is identical to [`update`](Self::update).
    pub fn update_scaled(&mut self, delta_time: f32) {
        let frames = (delta_time * 60.0).max(0.0);
        self.position += self.velocity * frames;
        self.velocity += self.acceleration * frames;
        self.velocity = self.velocity.clamp_length_max(self.max_speed);
        self.acceleration = Vec3::ZERO;
        self.apply_constraint();
    }

    fn apply_constraint(&mut self) {
        if let Some(constraint) = &self.constraint {
            constraint.constrain(self.position, &mut self.acceleration);
        }
    }

    /// Steer toward the average heading of neighbors within `radius`.
    pub fn align(&self, flock: &[Boid], neighbors: &[usize], radius: f32) -> Vec3 {
        let mut sum = Vec3::ZERO;
        let mut count = 0;
        for other in within(self.position, flock, neighbors, radius) {
            sum += other.velocity;
            count += 1;
        }
        if count == 0 {
            return Vec3::ZERO;
        }
        self.steer_along(sum / count as f32)
    }

    /// Steer toward the centroid of neighbors within `radius`.
    pub fn cohere(&self, flock: &[Boid], neighbors: &[usize], radius: f32) -> Vec3 {
        let mut sum = Vec3::ZERO;
        let mut count = 0;
        for other in within(self.position, flock, neighbors, radius) {
            sum += other.position;
            count += 1;
        }
        if count == 0 {
            return Vec3::ZERO;
        }
        self.seek(sum / count as f32)
    }

    /// Inverse-square repulsion from neighbors within `radius`.
    ///
    /// Neighbors at exactly the same position have no defined direction and
    /// are ignored.
    pub fn separate(&self, flock: &[Boid], neighbors: &[usize], radius: f32) -> Vec3 {
        let mut sum = Vec3::ZERO;
        let mut count = 0;
        for other in within(self.position, flock, neighbors, radius) {
            let offset = self.position - other.position;
            let d2 = offset.length_squared();
            if d2 <= f32::EPSILON {
                continue;
            }
            sum += offset / d2;
            count += 1;
        }
        if count == 0 {
            return Vec3::ZERO;
        }
        self.steer_along(sum / count as f32)
    }

    /// Steering force toward a world point.
    pub fn seek(&self, target: Vec3) -> Vec3 {
        self.steer_along(target - self.position)
    }

    /// Weighted sum of separation, alignment and cohesion.
    ///
    /// Separation uses `perception_radius * weights.separation_radius_factor`.
    pub fn flock_force(&self, flock: &[Boid], neighbors: &[usize], weights: &FlockWeights) -> Vec3 {
        let radius = self.perception_radius;
        let separation_radius = radius * weights.separation_radius_factor;

        self.separate(flock, neighbors, separation_radius) * weights.separation
            + self.align(flock, neighbors, radius) * weights.alignment
            + self.cohere(flock, neighbors, radius) * weights.cohesion
    }

    /// Reynolds steering: desired velocity at full speed minus current velocity.
    fn steer_along(&self, desired_direction: Vec3) -> Vec3 {
        match desired_direction.try_normalize() {
            Some(direction) => {
                (direction * self.max_speed - self.velocity).clamp_length_max(self.max_force)
            }
            None => Vec3::ZERO,
        }
    }

    /// Unit heading, or `None` when standing still.
    pub fn heading(&self) -> Option<Vec3> {
        self.velocity.try_normalize()
    }
}

/// Neighbors of `position` strictly within `radius`.
fn within<'a>(
    position: Vec3,
    flock: &'a [Boid],
    neighbors: &'a [usize],
    radius: f32,
) -> impl Iterator<Item = &'a Boid> + 'a {
    let radius_sq = radius * radius;
    neighbors
        .iter()
        .filter_map(move |&j| flock.get(j))
        .filter(move |other| position.distance_squared(other.position) < radius_sq)
}

/// Uniformly distributed direction on the unit sphere.
pub(crate) fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let theta = rng.gen_range(0.0..TAU);
    let z: f32 = rng.gen_range(-1.0..1.0);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * theta.cos(), r * theta.sin(), z)
}

impl SteeringAgent for Boid {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn perception_radius(&self) -> f32 {
        self.perception_radius
    }

    fn separate(&self, flock: &[Self], neighbors: &[usize], radius: f32) -> Vec3 {
        Boid::separate(self, flock, neighbors, radius)
    }

    fn align(&self, flock: &[Self], neighbors: &[usize], radius: f32) -> Vec3 {
        Boid::align(self, flock, neighbors, radius)
    }

    fn cohere(&self, flock: &[Self], neighbors: &[usize], radius: f32) -> Vec3 {
        Boid::cohere(self, flock, neighbors, radius)
    }

    fn seek(&self, target: Vec3) -> Vec3 {
        Boid::seek(self, target)
    }

    fn apply_force(&mut self, force: Vec3) {
        Boid::apply_force(self, force);
    }

    fn integrate(&mut self, delta_time: Option<f32>) {
        match delta_time {
            Some(dt) => self.update_scaled(dt),
            None => Boid::update(self),
        }
    }
}

impl MotionSource for Boid {
    fn position(&self) -> Vec3 {
        self.position
    }

    /// One integration tick; time arguments are unused.
    fn update(&mut self, _delta_time: f32, _elapsed_time: f32) {
        Boid::update(self);
    }
}
