//! Flock management and auxiliary steering forces.
//!
//! [`FlockingSystem`] owns a set of agents and, once per tick, computes every
//! agent's steering against its neighbors before integrating any of them, so
//! all agents see the same snapshot of the flock.
//!
//! On top of the three core rules it can layer independent, additive forces
//! for visual variety:
//!
//! | Force | Effect |
//! |-------|--------|
//! | Wander | seek a slowly drifting random point ahead of the agent |
//! | Attraction | pull toward world points within a radius |
//! | Avoidance | push away from world points within a radius |
//! | Lanes | agent `i` seeks `lane_targets[i % lanes]` |
//!
//! # Neighbor search
//!
//! [`NeighborSearch::BruteForce`] checks every pair, O(n²), fine for tens to
//! low hundreds of agents. [`NeighborSearch::Grid`] buckets agents in a
//! [`SpatialGrid`] each tick and only considers the 27 cells around each
//! agent; the cell size must be at least the largest perception radius for
//! the result to match the brute-force scan.

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::boid::{random_unit_vector, Boid, BoidConfig, FlockWeights};
use crate::constraint::AreaConstraint;
use crate::spatial::SpatialGrid;

use std::sync::Arc;

/// Distances below this are treated as coincident.
const MIN_DISTANCE: f32 = 1e-4;

/// Anything the flocking system can steer.
pub trait SteeringAgent: Sized {
    fn position(&self) -> Vec3;
    fn velocity(&self) -> Vec3;
    fn perception_radius(&self) -> f32;

    /// Heading used to place wander targets. `None` when standing still.
    fn heading(&self) -> Option<Vec3> {
        self.velocity().try_normalize()
    }

    fn separate(&self, flock: &[Self], neighbors: &[usize], radius: f32) -> Vec3;
    fn align(&self, flock: &[Self], neighbors: &[usize], radius: f32) -> Vec3;
    fn cohere(&self, flock: &[Self], neighbors: &[usize], radius: f32) -> Vec3;
    fn seek(&self, target: Vec3) -> Vec3;

    /// Accumulate a force for the current tick.
    fn apply_force(&mut self, force: Vec3);

    /// Integrate accumulated forces. `None` means one fixed tick.
    fn integrate(&mut self, delta_time: Option<f32>);
}

/// How neighbor candidates are gathered each tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum NeighborSearch {
    /// Every agent against every other agent.
    #[default]
    BruteForce,
    /// Spatial-hash candidates from the surrounding 27 cells.
    Grid {
        /// Cell edge length; should be >= the largest perception radius.
        cell_size: f32,
    },
}

/// Random wander target parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WanderConfig {
    /// How far ahead of the agent the target is placed.
    pub distance: f32,
    /// Random jitter around the point ahead.
    pub radius: f32,
    /// Weight of the wander seek force.
    pub weight: f32,
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            distance: 10.0,
            radius: 3.0,
            weight: 0.1,
        }
    }
}

/// World point that attracts or repels agents within `radius`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForcePoint {
    pub position: Vec3,
    pub radius: f32,
    pub strength: f32,
}

impl ForcePoint {
    pub fn new(position: Vec3, radius: f32, strength: f32) -> Self {
        Self {
            position,
            radius: radius.abs(),
            strength,
        }
    }

    /// Inverse-distance pull toward the point, zero outside `radius`.
    fn pull(&self, position: Vec3) -> Vec3 {
        let offset = self.position - position;
        let distance = offset.length();
        if distance >= self.radius || distance < MIN_DISTANCE {
            return Vec3::ZERO;
        }
        offset / distance * (self.strength / distance.max(1.0))
    }
}

/// Flock-wide tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockingConfig {
    pub weights: FlockWeights,
    pub neighbor_search: NeighborSearch,
    /// `None` disables wandering.
    pub wander: Option<WanderConfig>,
    /// Seek targets for lane grouping. Empty disables lanes.
    pub lane_targets: Vec<Vec3>,
    pub lane_weight: f32,
    /// Scale integration by frame time instead of stepping one tick per update.
    pub frame_rate_independent: bool,
}

impl Default for FlockingConfig {
    fn default() -> Self {
        Self {
            weights: FlockWeights::default(),
            neighbor_search: NeighborSearch::BruteForce,
            wander: None,
            lane_targets: Vec::new(),
            lane_weight: 0.5,
            frame_rate_independent: false,
        }
    }
}

impl FlockingConfig {
    pub fn with_weights(mut self, weights: FlockWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_neighbor_search(mut self, search: NeighborSearch) -> Self {
        self.neighbor_search = search;
        self
    }

    pub fn with_wander(mut self, wander: WanderConfig) -> Self {
        self.wander = Some(wander);
        self
    }

    pub fn with_lanes(mut self, targets: Vec<Vec3>, weight: f32) -> Self {
        self.lane_targets = targets;
        self.lane_weight = weight;
        self
    }

    pub fn with_frame_rate_independence(mut self, enabled: bool) -> Self {
        self.frame_rate_independent = enabled;
        self
    }
}

/// Per-agent wander memory.
#[derive(Clone, Copy, Debug, Default)]
struct WanderState {
    target: Option<Vec3>,
}

/// Owns a flock and advances it one tick at a time.
pub struct FlockingSystem<A: SteeringAgent = Boid> {
    agents: Vec<A>,
    config: FlockingConfig,
    attractors: Vec<ForcePoint>,
    avoiders: Vec<ForcePoint>,
    wander: Vec<WanderState>,
    rng: SmallRng,
    // Per-tick scratch, reused across frames.
    forces: Vec<Vec3>,
    neighbors: Vec<usize>,
    grid: Option<SpatialGrid<usize>>,
    // Set once a perception radius wider than the grid cell was reported.
    cell_size_warned: bool,
}

impl<A: SteeringAgent> FlockingSystem<A> {
    /// Empty flock. `seed` drives every random draw the system makes.
    pub fn new(config: FlockingConfig, seed: u64) -> Self {
        let mut system = Self {
            agents: Vec::new(),
            config: FlockingConfig::default(),
            attractors: Vec::new(),
            avoiders: Vec::new(),
            wander: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
            forces: Vec::new(),
            neighbors: Vec::new(),
            grid: None,
            cell_size_warned: false,
        };
        system.set_config(config);
        system
    }

    /// Replace the flock-wide configuration.
    pub fn set_config(&mut self, config: FlockingConfig) {
        self.grid = match config.neighbor_search {
            NeighborSearch::BruteForce => None,
            NeighborSearch::Grid { cell_size } => Some(SpatialGrid::new(cell_size)),
        };
        self.cell_size_warned = false;
        self.config = config;
    }

    pub fn config(&self) -> &FlockingConfig {
        &self.config
    }

    pub fn set_weights(&mut self, weights: FlockWeights) {
        self.config.weights = weights;
    }

    pub fn set_neighbor_search(&mut self, search: NeighborSearch) {
        let mut config = self.config.clone();
        config.neighbor_search = search;
        self.set_config(config);
    }

    pub fn add_agent(&mut self, agent: A) {
        self.agents.push(agent);
        self.wander.push(WanderState::default());
        self.forces.push(Vec3::ZERO);
    }

    pub fn agents(&self) -> &[A] {
        &self.agents
    }

    pub fn agents_mut(&mut self) -> &mut [A] {
        &mut self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn add_attractor(&mut self, point: ForcePoint) {
        self.attractors.push(point);
    }

    pub fn add_avoider(&mut self, point: ForcePoint) {
        self.avoiders.push(point);
    }

    pub fn clear_force_points(&mut self) {
        self.attractors.clear();
        self.avoiders.clear();
    }

    /// Compute forces for the whole flock, then integrate every agent.
    pub fn update(&mut self, delta_time: f32, _elapsed_time: f32) {
        self.compute_forces();
        self.integrate(delta_time);
    }

    /// Steering for every agent against the current snapshot.
    ///
    /// Results are kept until [`integrate`](Self::integrate) applies them.
    pub fn compute_forces(&mut self) {
        if let Some(grid) = self.grid.as_mut() {
            grid.clear();
            for (i, agent) in self.agents.iter().enumerate() {
                grid.add(agent.position(), i);
            }
        }

        let weights = self.config.weights;
        for i in 0..self.agents.len() {
            let agent = &self.agents[i];

            self.neighbors.clear();
            match &self.grid {
                Some(grid) => {
                    if !self.cell_size_warned && agent.perception_radius() > grid.cell_size() {
                        log::warn!(
                            "Grid cell size {} is below perception radius {}, some neighbours will be missed",
                            grid.cell_size(),
                            agent.perception_radius()
                        );
                        self.cell_size_warned = true;
                    }
                    let neighbors = &mut self.neighbors;
                    grid.for_each_nearby(agent.position(), |_, &j| {
                        if j != i {
                            neighbors.push(j);
                        }
                    });
                    // Index order keeps the sums independent of hash layout.
                    neighbors.sort_unstable();
                }
                None => self.neighbors.extend((0..self.agents.len()).filter(|&j| j != i)),
            }

            let radius = agent.perception_radius();
            let mut force = agent.separate(&self.agents, &self.neighbors, radius * weights.separation_radius_factor)
                * weights.separation
                + agent.align(&self.agents, &self.neighbors, radius) * weights.alignment
                + agent.cohere(&self.agents, &self.neighbors, radius) * weights.cohesion;

            if let Some(wander) = &self.config.wander {
                force += wander_force(agent, &mut self.wander[i], wander, &mut self.rng);
            }

            let position = agent.position();
            for point in &self.attractors {
                force += point.pull(position);
            }
            for point in &self.avoiders {
                force -= point.pull(position);
            }

            if !self.config.lane_targets.is_empty() && self.config.lane_weight != 0.0 {
                let lane = i % self.config.lane_targets.len();
                force += agent.seek(self.config.lane_targets[lane]) * self.config.lane_weight;
            }

            self.forces[i] = force;
        }
    }

    /// Apply the computed forces and integrate every agent.
    pub fn integrate(&mut self, delta_time: f32) {
        let step = self.config.frame_rate_independent.then_some(delta_time);
        for (agent, force) in self.agents.iter_mut().zip(self.forces.iter_mut()) {
            agent.apply_force(*force);
            agent.integrate(step);
            *force = Vec3::ZERO;
        }
    }

    /// Lane assigned to agent `index`, if lanes are configured.
    pub fn lane_of(&self, index: usize) -> Option<usize> {
        match self.config.lane_targets.len() {
            0 => None,
            lanes => Some(index % lanes),
        }
    }
}

impl FlockingSystem<Boid> {
    /// Spawn `count` boids uniformly inside a sphere around `center`.
    ///
    /// Positions and headings come from the system's seeded RNG.
    pub fn spawn_boids(
        &mut self,
        count: usize,
        center: Vec3,
        spawn_radius: f32,
        config: BoidConfig,
        constraint: Option<Arc<AreaConstraint>>,
    ) {
        self.agents.reserve(count);
        for _ in 0..count {
            let offset = random_unit_vector(&mut self.rng) * spawn_radius * self.rng.gen::<f32>().cbrt();
            let mut boid = Boid::new(center + offset, config, &mut self.rng);
            boid.set_constraint(constraint.clone());
            self.add_agent(boid);
        }
    }
}

/// Seek toward a random point ahead of the agent, re-picked once the agent
/// reaches it or turns away from it.
fn wander_force<A: SteeringAgent>(
    agent: &A,
    state: &mut WanderState,
    config: &WanderConfig,
    rng: &mut SmallRng,
) -> Vec3 {
    let position = agent.position();
    let needs_target = match state.target {
        None => true,
        Some(target) => {
            let distance = target.distance(position);
            distance < config.radius * 0.5 || distance > config.distance + config.radius * 2.0
        }
    };

    if needs_target {
        let heading = agent.heading().unwrap_or_else(|| random_unit_vector(rng));
        let jitter = random_unit_vector(rng) * config.radius * rng.gen::<f32>();
        state.target = Some(position + heading * config.distance + jitter);
    }

    match state.target {
        Some(target) => agent.seek(target) * config.weight,
        None => Vec3::ZERO,
    }
}
