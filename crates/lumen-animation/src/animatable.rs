//! One in-flight run of a set of animations against a target

use crate::clip::{Animation, AnimationValue, LoopMode};
use crate::sampler::sample;

/// Identifies an animatable within its engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimatableId(pub(crate) u64);

impl AnimatableId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Playback state of one animation inside an `Animatable`
#[derive(Debug, Clone)]
struct RuntimeAnimation {
    animation: Animation,
    current_frame: f32,
    current_value: Option<AnimationValue>,
    cycle: u64,
    fired_events: Vec<bool>,
}

impl RuntimeAnimation {
    fn new(animation: Animation) -> Self {
        let fired_events = vec![false; animation.events.len()];
        Self {
            animation,
            current_frame: 0.0,
            current_value: None,
            cycle: 0,
            fired_events,
        }
    }

    /// Compute the value `elapsed_ms` after the run started.
    ///
    /// Returns whether the animation is still running together with the
    /// value to write and the events crossed.
    fn animate(
        &mut self,
        elapsed_ms: f64,
        from: f32,
        to: f32,
        looping: bool,
        speed_ratio: f32,
        events: &mut Vec<String>,
    ) -> (bool, Option<AnimationValue>) {
        let fps = self.animation.frames_per_second as f64 * speed_ratio as f64;
        let range = (to - from) as f64;
        let ratio = elapsed_ms * fps / 1000.0;

        let mut running = true;
        let mut cycles = 0u64;
        let frame = if range <= 0.0 {
            running = false;
            from as f64
        } else if ratio >= range && (!looping || self.animation.loop_mode == LoopMode::Constant) {
            running = false;
            to as f64
        } else if looping {
            cycles = (ratio / range).floor().max(0.0) as u64;
            from as f64 + ratio.rem_euclid(range)
        } else {
            from as f64 + ratio.max(0.0)
        };
        let frame = frame as f32;

        if cycles != self.cycle {
            self.cycle = cycles;
            for (fired, event) in self.fired_events.iter_mut().zip(&self.animation.events) {
                if !event.only_once {
                    *fired = false;
                }
            }
        }
        for (fired, event) in self.fired_events.iter_mut().zip(&self.animation.events) {
            if !*fired && event.frame <= frame {
                *fired = true;
                events.push(event.name.clone());
            }
        }

        let mut value = sample(&self.animation, frame);
        if cycles > 0 && self.animation.loop_mode == LoopMode::Relative {
            let delta = match (sample(&self.animation, to), sample(&self.animation, from)) {
                (Some(end), Some(start)) => end.difference(&start),
                _ => None,
            };
            if let (Some(v), Some(delta)) = (value, delta) {
                value = Some(v.add_scaled(&delta, cycles as f32));
            }
        }

        self.current_frame = frame;
        self.current_value = value;
        (running, value)
    }
}

/// A run of one or more animations against a single target.
///
/// Time is measured from the first `animate` call, so an animatable created
/// mid-session starts at `from_frame` regardless of the engine's clock.
pub struct Animatable<K> {
    id: AnimatableId,
    target: K,
    pub from_frame: f32,
    pub to_frame: f32,
    pub looping: bool,
    pub speed_ratio: f32,
    animations: Vec<RuntimeAnimation>,
    paused: bool,
    local_delay_offset: Option<f64>,
    paused_delay: Option<f64>,
    on_animation_end: Option<Box<dyn FnOnce()>>,
}

impl<K> Animatable<K> {
    pub(crate) fn new(
        id: AnimatableId,
        target: K,
        animations: Vec<Animation>,
        from_frame: f32,
        to_frame: f32,
        looping: bool,
        speed_ratio: f32,
    ) -> Self {
        Self {
            id,
            target,
            from_frame,
            to_frame,
            looping,
            speed_ratio,
            animations: animations.into_iter().map(RuntimeAnimation::new).collect(),
            paused: false,
            local_delay_offset: None,
            paused_delay: None,
            on_animation_end: None,
        }
    }

    pub fn id(&self) -> AnimatableId {
        self.id
    }

    pub fn target(&self) -> &K {
        &self.target
    }

    /// Names of the animations this run drives
    pub fn animation_names(&self) -> Vec<&str> {
        self.animations.iter().map(|a| a.animation.name.as_str()).collect()
    }

    /// Frame reached by the first animation
    pub fn master_frame(&self) -> f32 {
        self.animations.first().map(|a| a.current_frame).unwrap_or(self.from_frame)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume after `pause`; the paused span is not counted
    pub fn restart(&mut self) {
        self.paused = false;
    }

    /// Restart playback from `from_frame` on the next tick
    pub fn reset(&mut self) {
        self.local_delay_offset = None;
        self.paused_delay = None;
    }

    /// Run `callback` once when the animatable completes or is stopped
    pub fn set_on_animation_end(&mut self, callback: impl FnOnce() + 'static) {
        self.on_animation_end = Some(Box::new(callback));
    }

    pub(crate) fn take_on_animation_end(&mut self) -> Option<Box<dyn FnOnce()>> {
        self.on_animation_end.take()
    }

    /// Drop the animation with the given name. Returns true if none remain.
    pub(crate) fn remove_animation(&mut self, name: &str) -> bool {
        self.animations.retain(|a| a.animation.name != name);
        self.animations.is_empty()
    }

    /// Advance to the engine time `delay_ms`, writing values through `write`.
    ///
    /// Returns false once every animation has finished.
    pub(crate) fn animate(
        &mut self,
        delay_ms: f64,
        write: &mut dyn FnMut(&K, &str, &AnimationValue),
        events: &mut Vec<String>,
    ) -> bool {
        if self.paused {
            self.paused_delay.get_or_insert(delay_ms);
            return true;
        }

        let offset = match self.local_delay_offset {
            None => {
                self.paused_delay = None;
                delay_ms
            }
            Some(offset) => match self.paused_delay.take() {
                Some(paused_at) => offset + (delay_ms - paused_at),
                None => offset,
            },
        };
        self.local_delay_offset = Some(offset);
        let elapsed = delay_ms - offset;

        let mut running = false;
        for runtime in &mut self.animations {
            let (is_running, value) = runtime.animate(
                elapsed,
                self.from_frame,
                self.to_frame,
                self.looping,
                self.speed_ratio,
                events,
            );
            if let Some(value) = value {
                write(&self.target, &runtime.animation.target_property, &value);
            }
            running |= is_running;
        }
        running
    }
}
