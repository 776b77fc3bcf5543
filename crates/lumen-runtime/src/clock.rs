//! Frame clock and fixed-timestep accumulator

use std::time::{Duration, Instant};

/// Fraction of a step treated as a whole one. Covers `Duration`'s
/// nanosecond truncation: `1/30 s` becomes 33_333_333 ns, which is just
/// under two `1/60 s` steps.
const STEP_EPSILON: f64 = 1e-6;

/// Measures the time between frames.
///
/// Hosts either call `tick` once per frame to sample the wall clock, or feed
/// an explicit delta with `advance` for reproducible runs.
#[derive(Debug, Clone)]
pub struct FrameClock {
    /// Total elapsed time in seconds
    pub total_time: f64,
    /// Time since last frame
    delta_time: Duration,
    /// Last tick instant
    last_instant: Option<Instant>,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self {
            total_time: 0.0,
            delta_time: Duration::ZERO,
            last_instant: None,
        }
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample the wall clock. The first tick yields a zero delta.
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.delta_time = match self.last_instant {
            Some(last) => now.duration_since(last),
            None => Duration::ZERO,
        };
        self.last_instant = Some(now);
        self.total_time += self.delta_time.as_secs_f64();
    }

    /// Advance by an explicit amount instead of sampling the wall clock
    pub fn advance(&mut self, delta: Duration) {
        self.delta_time = delta;
        self.total_time += delta.as_secs_f64();
    }

    /// Delta of the last frame
    pub fn delta_time(&self) -> Duration {
        self.delta_time
    }

    /// Delta of the last frame in milliseconds
    pub fn delta_time_ms(&self) -> f64 {
        self.delta_time.as_secs_f64() * 1000.0
    }
}

/// Fixed-step accumulator for deterministic simulation.
///
/// Each frame's delta is added to the accumulator and split into as many
/// whole `time_step` steps as fit, capped at `max_steps`. Time left over
/// stays in the accumulator for the next frame.
#[derive(Debug, Clone)]
pub struct LockstepStepper {
    /// Fixed step length in seconds
    pub time_step: f64,
    /// Maximum number of steps taken in one frame
    pub max_steps: u32,
    accumulator: f64,
    current_step_id: u64,
    current_internal_step: u32,
}

impl Default for LockstepStepper {
    fn default() -> Self {
        Self::new(1.0 / 60.0, 4)
    }
}

impl LockstepStepper {
    pub fn new(time_step: f64, max_steps: u32) -> Self {
        Self {
            time_step,
            max_steps,
            accumulator: 0.0,
            current_step_id: 0,
            current_internal_step: 0,
        }
    }

    /// Add `delta_seconds` to the accumulator and return how many steps to run now
    pub fn accumulate(&mut self, delta_seconds: f64) -> u32 {
        let total = self.accumulator + delta_seconds.max(0.0);
        self.current_internal_step = 0;

        if self.time_step <= 0.0 {
            self.accumulator = 0.0;
            return 0;
        }

        let whole = (total / self.time_step + STEP_EPSILON).floor();
        let steps = (whole as u64).min(self.max_steps as u64) as u32;
        self.accumulator = (total - steps as f64 * self.time_step).max(0.0);
        if self.accumulator < STEP_EPSILON * self.time_step {
            self.accumulator = 0.0;
        }
        steps
    }

    /// Record that one step has finished
    pub fn complete_step(&mut self) {
        self.current_step_id += 1;
        self.current_internal_step += 1;
    }

    /// Total steps completed since creation
    pub fn current_step_id(&self) -> u64 {
        self.current_step_id
    }

    /// Steps completed within the current frame
    pub fn current_internal_step(&self) -> u32 {
        self.current_internal_step
    }

    /// Time waiting in the accumulator, in seconds
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Get the interpolation alpha for rendering between fixed steps
    pub fn interpolation_alpha(&self) -> f64 {
        if self.time_step <= 0.0 {
            return 0.0;
        }
        self.accumulator / self.time_step
    }

    /// Drop any accumulated time
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.current_internal_step = 0;
    }
}
