//! The engine context a scene renders through
//!
//! Passed explicitly to `Scene::render`; there is no process-wide engine
//! registry, so several engines and scenes can coexist.

use crate::config::EngineOptions;
use crate::device::GraphicsDevice;
use lumen_core::Viewport;
use lumen_runtime::FrameClock;
use std::time::Duration;

/// A graphics device plus the frame clock and timing options
#[derive(Debug)]
pub struct Engine<D: GraphicsDevice> {
    device: D,
    clock: FrameClock,
    options: EngineOptions,
}

impl<D: GraphicsDevice> Engine<D> {
    pub fn new(device: D, options: EngineOptions) -> Self {
        Self {
            device,
            clock: FrameClock::new(),
            options,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut EngineOptions {
        &mut self.options
    }

    /// Sample the wall clock; call once per host frame before rendering
    pub fn begin_frame(&mut self) {
        self.clock.tick();
    }

    /// Feed an explicit frame delta instead of sampling the wall clock
    pub fn advance_time(&mut self, delta: Duration) {
        self.clock.advance(delta);
    }

    pub fn delta_time_ms(&self) -> f64 {
        self.clock.delta_time_ms()
    }

    pub fn total_time(&self) -> f64 {
        self.clock.total_time
    }

    pub fn render_size(&self) -> (u32, u32) {
        self.options.render_size()
    }

    /// Width over height of a camera viewport on the current render target
    pub fn aspect_ratio(&self, viewport: &Viewport) -> f32 {
        let (width, height) = self.render_size();
        let global = viewport.to_global(width, height);
        if global.height <= 0.0 {
            return 1.0;
        }
        global.width / global.height
    }

    pub fn is_deterministic_lockstep(&self) -> bool {
        self.options.deterministic_lockstep
    }

    pub fn lockstep_max_steps(&self) -> u32 {
        self.options.lockstep_max_steps
    }

    /// Fixed step length in seconds
    pub fn time_step(&self) -> f64 {
        self.options.time_step
    }

    pub fn into_device(self) -> D {
        self.device
    }
}
