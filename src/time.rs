//! Frame timing for driving the simulation.
//!
//! Every component advances through `update(delta_time, elapsed_time)`. A
//! [`FrameClock`] produces those pairs, either from wall time or as a fixed
//! step for reproducible runs.
//!
//! # Example
//!
//! ```ignore
//! use ribbon_motion::time::FrameClock;
//!
//! let mut clock = FrameClock::fixed(1.0 / 60.0);
//!
//! loop {
//!     let (delta, elapsed) = clock.tick();
//!     scene.update(delta, elapsed);
//! }
//! ```

use std::time::Instant;

/// Step used when a non-positive fixed step is requested.
pub const DEFAULT_STEP: f32 = 1.0 / 60.0;

/// Largest wall-clock delta handed out, so a stalled frame cannot launch agents.
pub const MAX_WALL_DELTA: f32 = 0.25;

#[derive(Debug, Clone, Copy)]
enum Source {
    Wall { last: Instant },
    Fixed { step: f32 },
}

/// Produces `(delta, elapsed)` pairs once per frame.
#[derive(Debug, Clone)]
pub struct FrameClock {
    source: Source,
    /// Simulated seconds since the first tick, after scaling.
    elapsed: f32,
    /// Last delta handed out.
    delta: f32,
    frame: u64,
    paused: bool,
    time_scale: f32,
}

impl FrameClock {
    /// Clock driven by wall time.
    pub fn new() -> Self {
        Self::from_source(Source::Wall {
            last: Instant::now(),
        })
    }

    /// Deterministic clock advancing exactly `step` seconds per tick.
    pub fn fixed(step: f32) -> Self {
        let step = if step.is_finite() && step > 0.0 {
            step
        } else {
            log::warn!("Fixed clock step {} must be positive, using {}", step, DEFAULT_STEP);
            DEFAULT_STEP
        };
        Self::from_source(Source::Fixed { step })
    }

    fn from_source(source: Source) -> Self {
        Self {
            source,
            elapsed: 0.0,
            delta: 0.0,
            frame: 0,
            paused: false,
            time_scale: 1.0,
        }
    }

    /// Advance one frame and return `(delta, elapsed)`.
    ///
    /// While paused the delta is zero and elapsed time does not move.
    pub fn tick(&mut self) -> (f32, f32) {
        let raw = match &mut self.source {
            Source::Wall { last } => {
                let now = Instant::now();
                let raw = now.duration_since(*last).as_secs_f32().min(MAX_WALL_DELTA);
                *last = now;
                raw
            }
            Source::Fixed { step } => *step,
        };

        self.delta = if self.paused { 0.0 } else { raw * self.time_scale };
        self.elapsed += self.delta;
        self.frame += 1;
        (self.delta, self.elapsed)
    }

    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta
    }

    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Ticks since creation or the last [`reset`](Self::reset).
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[inline]
    pub fn is_fixed(&self) -> bool {
        matches!(self.source, Source::Fixed { .. })
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            // Wall time spent paused must not show up as one huge delta.
            if let Source::Wall { last } = &mut self.source {
                *last = Instant::now();
            }
        }
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Multiplier applied to every delta. Negative values clamp to 0.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    /// Back to frame zero, keeping the time source and scale.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.delta = 0.0;
        self.frame = 0;
        self.paused = false;
        if let Source::Wall { last } = &mut self.source {
            *last = Instant::now();
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
