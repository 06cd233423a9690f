//! Waypoint-following guides.
//!
//! A [`PathGuide`] flies through an ordered list of [`Waypoint`]s. It heads
//! straight at the current target until it is within the arrival threshold,
//! then snaps to the waypoint's exit direction and speed and moves on to the
//! next one.
//!
//! ```text
//! FollowingWaypoint(i) --arrive--> FollowingWaypoint(i + 1)
//! FollowingWaypoint(last) --arrive, closed--> FollowingWaypoint(0)
//! FollowingWaypoint(last) --arrive, open--> FreeForward
//! ```
//!
//! In `FreeForward` the guide keeps its last heading and speed forever.
//!
//! The loop builders sample in the XZ plane. "Clockwise" is as seen from
//! above (+Y), i.e. turning from +X toward +Z.

use std::f32::consts::TAU;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::MotionSource;

/// Arrival distance used unless overridden.
pub const DEFAULT_ARRIVAL_THRESHOLD: f32 = 0.5;

/// Heading used when no waypoint provides one.
const DEFAULT_DIRECTION: Vec3 = Vec3::X;

/// Fewest segments a generated loop may have.
const MIN_LOOP_SEGMENTS: usize = 3;

/// A point to pass through, with the heading and speed to leave it at.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Vec3,
    /// Exit heading, unit length.
    pub direction: Vec3,
    pub speed: f32,
}

impl Waypoint {
    /// Waypoint with `direction` normalized (falling back to +X when zero).
    pub fn new(position: Vec3, direction: Vec3, speed: f32) -> Self {
        Self {
            position,
            direction: direction.try_normalize().unwrap_or(DEFAULT_DIRECTION),
            speed,
        }
    }
}

/// Where the guide is in its waypoint sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuideState {
    /// Heading for the waypoint at this index.
    FollowingWaypoint(usize),
    /// Past the last waypoint of an open path, flying straight.
    FreeForward,
}

/// Agent that steers through a waypoint list.
#[derive(Clone, Debug)]
pub struct PathGuide {
    waypoints: Vec<Waypoint>,
    closed_loop: bool,
    arrival_threshold: f32,
    state: GuideState,
    position: Vec3,
    direction: Vec3,
    speed: f32,
    loops_completed: u32,
}

impl PathGuide {
    /// Guide starting on the first waypoint.
    ///
    /// An empty list is accepted with a warning: the guide starts in
    /// [`GuideState::FreeForward`] at the origin, standing still.
    pub fn new(waypoints: Vec<Waypoint>, closed_loop: bool) -> Self {
        let mut guide = Self {
            waypoints,
            closed_loop,
            arrival_threshold: DEFAULT_ARRIVAL_THRESHOLD,
            state: GuideState::FreeForward,
            position: Vec3::ZERO,
            direction: DEFAULT_DIRECTION,
            speed: 0.0,
            loops_completed: 0,
        };
        if guide.waypoints.is_empty() {
            log::warn!("PathGuide created without waypoints, flying free");
        }
        guide.reset();
        guide
    }

    /// Closed circle of `segments` steps around `center`.
    ///
    /// Produces `segments + 1` waypoints; the last one repeats the first so
    /// the loop has no seam.
    pub fn circular_loop(center: Vec3, radius: f32, segments: usize, speed: f32, clockwise: bool) -> Self {
        Self::race_track(center, radius, radius, segments, speed, clockwise)
    }

    /// Closed ellipse with semi-axes `radius_x` along X and `radius_z` along Z.
    pub fn race_track(
        center: Vec3,
        radius_x: f32,
        radius_z: f32,
        segments: usize,
        speed: f32,
        clockwise: bool,
    ) -> Self {
        let segments = if segments < MIN_LOOP_SEGMENTS {
            log::warn!("Loop needs at least {} segments, got {}", MIN_LOOP_SEGMENTS, segments);
            MIN_LOOP_SEGMENTS
        } else {
            segments
        };
        let turn = if clockwise { 1.0 } else { -1.0 };

        let mut waypoints: Vec<Waypoint> = (0..segments)
            .map(|i| {
                let angle = turn * TAU * i as f32 / segments as f32;
                let (sin, cos) = angle.sin_cos();
                let position = center + Vec3::new(radius_x * cos, 0.0, radius_z * sin);
                let tangent = Vec3::new(-radius_x * sin, 0.0, radius_z * cos) * turn;
                Waypoint::new(position, tangent, speed)
            })
            .collect();
        waypoints.push(waypoints[0]);

        Self::new(waypoints, true)
    }

    /// Waypoints through `points`, each heading toward the next one.
    ///
    /// The last point of a closed path heads back to the first; on an open
    /// path it keeps the previous heading.
    pub fn from_points(points: &[Vec3], speed: f32, closed: bool) -> Self {
        let mut waypoints = Vec::with_capacity(points.len());
        let mut previous = DEFAULT_DIRECTION;
        for (i, &position) in points.iter().enumerate() {
            let next = match points.get(i + 1) {
                Some(&next) => Some(next),
                None if closed => points.first().copied(),
                None => None,
            };
            let direction = next
                .and_then(|next| (next - position).try_normalize())
                .unwrap_or(previous);
            previous = direction;
            waypoints.push(Waypoint::new(position, direction, speed));
        }
        Self::new(waypoints, closed)
    }

    /// Override the arrival distance. Non-positive values are ignored.
    pub fn with_arrival_threshold(mut self, threshold: f32) -> Self {
        if threshold.is_finite() && threshold > 0.0 {
            self.arrival_threshold = threshold;
        } else {
            log::warn!(
                "Arrival threshold {} must be positive, keeping {}",
                threshold,
                self.arrival_threshold
            );
        }
        self
    }

    /// Back to the first waypoint with its heading and speed.
    pub fn reset(&mut self) {
        self.loops_completed = 0;
        match self.waypoints.first() {
            Some(first) => {
                self.position = first.position;
                self.direction = first.direction;
                self.speed = first.speed;
                self.state = GuideState::FollowingWaypoint(0);
            }
            None => {
                self.position = Vec3::ZERO;
                self.direction = DEFAULT_DIRECTION;
                self.speed = 0.0;
                self.state = GuideState::FreeForward;
            }
        }
    }

    /// Steer toward the current target, then move.
    pub fn advance(&mut self, delta_time: f32) {
        if let GuideState::FollowingWaypoint(index) = self.state {
            match self.waypoints.get(index).copied() {
                Some(target) => {
                    let offset = target.position - self.position;
                    if offset.length() < self.arrival_threshold {
                        self.direction = target.direction;
                        self.speed = target.speed;
                        self.state = self.after(index);
                    } else if let Some(heading) = offset.try_normalize() {
                        self.direction = heading;
                    }
                }
                None => self.state = GuideState::FreeForward,
            }
        }

        self.position += self.direction * self.speed * delta_time;
    }

    fn after(&mut self, index: usize) -> GuideState {
        if index + 1 < self.waypoints.len() {
            GuideState::FollowingWaypoint(index + 1)
        } else if self.closed_loop {
            self.loops_completed += 1;
            log::debug!("PathGuide completed loop {}", self.loops_completed);
            GuideState::FollowingWaypoint(0)
        } else {
            GuideState::FreeForward
        }
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    #[inline]
    pub fn state(&self) -> GuideState {
        self.state
    }

    /// Index of the waypoint being approached, if any.
    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            GuideState::FollowingWaypoint(index) => Some(index),
            GuideState::FreeForward => None,
        }
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn is_closed_loop(&self) -> bool {
        self.closed_loop
    }

    pub fn arrival_threshold(&self) -> f32 {
        self.arrival_threshold
    }

    /// Times a closed loop wrapped back to its first waypoint.
    pub fn loops_completed(&self) -> u32 {
        self.loops_completed
    }
}

impl MotionSource for PathGuide {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn update(&mut self, delta_time: f32, _elapsed_time: f32) {
        self.advance(delta_time);
    }
}
