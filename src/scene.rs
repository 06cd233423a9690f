//! Frame driver tying motion sources to their trails.
//!
//! A [`TrailScene`] owns every motion source in the scene together with one
//! [`TrailRecorder`] per source, and advances them in a fixed order:
//!
//! 1. guides, path followers and static points
//! 2. flocking forces across the whole flock
//! 3. per-agent integration and constraint forces
//! 4. trail recording
//!
//! Given the same seed and the same sequence of deltas, two scenes produce
//! identical trails.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::boid::Boid;
use crate::flocking::{FlockingConfig, FlockingSystem};
use crate::guide::PathGuide;
use crate::path::PathFollower;
use crate::trail::{TrailConfig, TrailRecorder, TrailRenderer};
use crate::{MotionSource, StaticPoint};

/// Everything needed to build a [`TrailScene`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub trail: TrailConfig,
    pub flocking: FlockingConfig,
    /// Seed for every random draw in the flock.
    pub seed: u64,
}

/// A motion source and the trail it leaves.
#[derive(Clone, Debug)]
struct Tracked<S> {
    source: S,
    trail: TrailRecorder,
}

impl<S: MotionSource> Tracked<S> {
    fn new(source: S, config: TrailConfig) -> Self {
        let trail = TrailRecorder::new(config, source.position());
        Self { source, trail }
    }
}

/// Owns the scene's motion sources and their trails.
pub struct TrailScene {
    trail_config: TrailConfig,
    guides: Vec<Tracked<PathGuide>>,
    followers: Vec<Tracked<PathFollower>>,
    statics: Vec<Tracked<StaticPoint>>,
    flock: FlockingSystem<Boid>,
    flock_trails: Vec<TrailRecorder>,
    frame: u64,
}

impl TrailScene {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            trail_config: config.trail,
            guides: Vec::new(),
            followers: Vec::new(),
            statics: Vec::new(),
            flock: FlockingSystem::new(config.flocking, config.seed),
            flock_trails: Vec::new(),
            frame: 0,
        }
    }

    /// Add a guide and start its trail. Returns its index.
    pub fn add_guide(&mut self, guide: PathGuide) -> usize {
        self.guides.push(Tracked::new(guide, self.trail_config));
        self.guides.len() - 1
    }

    pub fn add_follower(&mut self, follower: PathFollower) -> usize {
        self.followers.push(Tracked::new(follower, self.trail_config));
        self.followers.len() - 1
    }

    pub fn add_static(&mut self, position: Vec3) -> usize {
        self.statics.push(Tracked::new(StaticPoint::new(position), self.trail_config));
        self.statics.len() - 1
    }

    /// The flock. Agents added through it get trails on the next update.
    pub fn flock(&self) -> &FlockingSystem<Boid> {
        &self.flock
    }

    pub fn flock_mut(&mut self) -> &mut FlockingSystem<Boid> {
        &mut self.flock
    }

    pub fn guide(&self, index: usize) -> Option<&PathGuide> {
        self.guides.get(index).map(|t| &t.source)
    }

    pub fn follower(&self, index: usize) -> Option<&PathFollower> {
        self.followers.get(index).map(|t| &t.source)
    }

    /// Frames advanced so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Advance one frame.
    pub fn update(&mut self, delta_time: f32, elapsed_time: f32) {
        self.sync_flock_trails();

        for tracked in &mut self.guides {
            tracked.source.update(delta_time, elapsed_time);
        }
        for tracked in &mut self.followers {
            tracked.source.update(delta_time, elapsed_time);
        }
        for tracked in &mut self.statics {
            tracked.source.update(delta_time, elapsed_time);
        }

        self.flock.compute_forces();
        self.flock.integrate(delta_time);

        self.record();
        self.frame += 1;
    }

    fn record(&mut self) {
        for tracked in &mut self.guides {
            tracked.trail.update(&tracked.source);
        }
        for tracked in &mut self.followers {
            tracked.trail.update(&tracked.source);
        }
        for tracked in &mut self.statics {
            tracked.trail.update(&tracked.source);
        }
        for (trail, boid) in self.flock_trails.iter_mut().zip(self.flock.agents()) {
            trail.update(boid);
        }
    }

    /// Give agents added since the last frame a trail of their own.
    fn sync_flock_trails(&mut self) {
        let known = self.flock_trails.len();
        let agents = self.flock.agents();
        if agents.len() > known {
            log::debug!("Adding trails for {} new flock agents", agents.len() - known);
            let config = self.trail_config;
            self.flock_trails
                .extend(agents[known..].iter().map(|boid| TrailRecorder::new(config, boid.position)));
        }
    }

    /// Feed every trail to `renderer`: guides, followers, statics, then the flock.
    pub fn render<R: TrailRenderer + ?Sized>(&mut self, renderer: &mut R) {
        self.sync_flock_trails();
        for trail in self.trails_mut() {
            trail.render(renderer);
        }
    }

    /// Change the visible fraction of every trail.
    pub fn set_trail_ratio(&mut self, ratio: f32) {
        self.trail_config.trail_ratio = ratio;
        for trail in self.trails_mut() {
            trail.set_trail_ratio(ratio);
        }
    }

    /// Every trail in render order.
    pub fn trails(&self) -> impl Iterator<Item = &TrailRecorder> + '_ {
        self.guides
            .iter()
            .map(|t| &t.trail)
            .chain(self.followers.iter().map(|t| &t.trail))
            .chain(self.statics.iter().map(|t| &t.trail))
            .chain(self.flock_trails.iter())
    }

    fn trails_mut(&mut self) -> impl Iterator<Item = &mut TrailRecorder> + '_ {
        self.guides
            .iter_mut()
            .map(|t| &mut t.trail)
            .chain(self.followers.iter_mut().map(|t| &mut t.trail))
            .chain(self.statics.iter_mut().map(|t| &mut t.trail))
            .chain(self.flock_trails.iter_mut())
    }

    pub fn trail_count(&self) -> usize {
        self.guides.len() + self.followers.len() + self.statics.len() + self.flock.len()
    }
}
