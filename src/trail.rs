//! Trail recording for motion history.
//!
//! A [`TrailRecorder`] keeps the most recent positions of one motion source in
//! a fixed ring of slots. Every slot is allocated up front and pre-filled with
//! the starting position, so recording a frame is an index bump and a copy.
//!
//! # Ordering
//!
//! Visible points are always produced **oldest → newest**: the first point is
//! the tail of the ribbon and the last point is the source's current
//! position. Renderers can rely on this matching the direction of travel.
//!
//! ```ignore
//! let mut trail = TrailRecorder::new(TrailConfig::default(), boid.position());
//!
//! // Once per frame, after the source moved:
//! trail.update(&boid);
//! trail.render(&mut ribbon);
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::MotionSource;

/// Consumer of ordered point sequences (ribbon meshes, line strips, debug views).
///
/// Implementations must tolerate sequences shorter than two points by
/// drawing nothing.
pub trait TrailRenderer {
    /// Draw one ordered point sequence.
    fn render(&mut self, points: &[Vec3]);
}

/// Renderer that keeps a copy of the last sequence it was given.
///
/// Useful for headless runs and tests.
#[derive(Clone, Debug, Default)]
pub struct PointCollector {
    points: Vec<Vec3>,
    frames: usize,
}

impl PointCollector {
    /// The last sequence rendered.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Number of `render` calls received.
    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl TrailRenderer for PointCollector {
    fn render(&mut self, points: &[Vec3]) {
        self.frames += 1;
        self.points.clear();
        if points.len() < 2 {
            return;
        }
        self.points.extend_from_slice(points);
    }
}

/// Trail recording parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    /// Number of history slots.
    pub max_points: usize,
    /// Fraction of the history shown (`0 < ratio <= 1`).
    pub trail_ratio: f32,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            max_points: 100,
            trail_ratio: 1.0,
        }
    }
}

impl TrailConfig {
    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    pub fn with_trail_ratio(mut self, ratio: f32) -> Self {
        self.trail_ratio = ratio;
        self
    }
}

/// Fixed-capacity circular history of positions.
#[derive(Clone, Debug)]
pub struct TrailRecorder {
    /// Ring of history slots, always `capacity` long.
    buffer: Vec<Vec3>,
    /// Ordered copy handed to renderers, always `capacity` long.
    scratch: Vec<Vec3>,
    /// Next slot to write.
    head: usize,
    trail_ratio: f32,
}

impl TrailRecorder {
    /// Allocate the ring, filling every slot with `initial_position`.
    pub fn new(config: TrailConfig, initial_position: Vec3) -> Self {
        let capacity = if config.max_points == 0 {
            log::warn!("TrailRecorder max_points is 0, using 1");
            1
        } else {
            config.max_points
        };

        Self {
            buffer: vec![initial_position; capacity],
            scratch: vec![initial_position; capacity],
            head: 0,
            trail_ratio: checked_ratio(config.trail_ratio),
        }
    }

    /// Record the current position of `source`.
    #[inline]
    pub fn update<S: MotionSource + ?Sized>(&mut self, source: &S) {
        self.record(source.position());
    }

    /// Write `position` into the next slot.
    #[inline]
    pub fn record(&mut self, position: Vec3) {
        self.buffer[self.head] = position;
        self.head = (self.head + 1) % self.buffer.len();
    }

    /// Overwrite every slot with `position`, collapsing the trail.
    pub fn reset(&mut self, position: Vec3) {
        self.buffer.fill(position);
        self.head = 0;
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn trail_ratio(&self) -> f32 {
        self.trail_ratio
    }

    /// Change the visible fraction. Clamped to `(0, 1]`.
    pub fn set_trail_ratio(&mut self, ratio: f32) {
        self.trail_ratio = checked_ratio(ratio);
    }

    /// Most recently recorded position.
    #[inline]
    pub fn latest(&self) -> Vec3 {
        let capacity = self.buffer.len();
        self.buffer[(self.head + capacity - 1) % capacity]
    }

    /// Number of points shown for `ratio`: `floor(capacity * ratio)`.
    ///
    /// This is zero when the ratio is below `1 / capacity`.
    pub fn visible_len(&self, ratio: f32) -> usize {
        let capacity = self.buffer.len();
        let len = (capacity as f32 * clamp_ratio(ratio)).floor() as usize;
        len.min(capacity)
    }

    /// Visible window for `ratio`, oldest to newest. Does not allocate.
    pub fn visible_points(&self, ratio: f32) -> impl ExactSizeIterator<Item = Vec3> + '_ {
        let capacity = self.buffer.len();
        let len = self.visible_len(ratio);
        // Oldest visible slot sits `len` steps behind the head.
        let start = (self.head + capacity - len) % capacity;
        (0..len).map(move |i| self.buffer[(start + i) % capacity])
    }

    /// Fill the scratch slots with the configured window and return them.
    pub fn ordered(&mut self) -> &[Vec3] {
        let len = self.visible_len(self.trail_ratio);
        let capacity = self.buffer.len();
        let start = (self.head + capacity - len) % capacity;
        for i in 0..len {
            self.scratch[i] = self.buffer[(start + i) % capacity];
        }
        &self.scratch[..len]
    }

    /// Hand the configured window to a renderer.
    pub fn render<R: TrailRenderer + ?Sized>(&mut self, renderer: &mut R) {
        let points = self.ordered();
        renderer.render(points);
    }

    /// The configured window as raw bytes, for GPU buffer uploads.
    pub fn visible_bytes(&mut self) -> &[u8] {
        bytemuck::cast_slice(self.ordered())
    }

    /// Raw ring storage in slot order (not chronological).
    pub fn raw_slots(&self) -> &[Vec3] {
        &self.buffer
    }
}

/// Clamp a configured ratio, warning when it had to be replaced.
fn checked_ratio(ratio: f32) -> f32 {
    if !(ratio.is_finite() && ratio > 0.0 && ratio <= 1.0) {
        log::warn!("Trail ratio {} outside (0, 1], using {}", ratio, clamp_ratio(ratio));
    }
    clamp_ratio(ratio)
}

/// Per-query clamp. Silent: it runs every frame.
#[inline]
fn clamp_ratio(ratio: f32) -> f32 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio.min(1.0)
    } else {
        1.0
    }
}
