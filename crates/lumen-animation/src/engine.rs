//! Scene-level collection of running animatables

use crate::animatable::{Animatable, AnimatableId};
use crate::clip::{Animation, AnimationValue};
use log::debug;

/// What happened during one `animate` call
#[derive(Debug)]
pub struct AnimationOutcome<K> {
    /// Animatables that completed this tick and were removed
    pub finished: Vec<(AnimatableId, K)>,
    /// Events crossed this tick, in run order
    pub events: Vec<(K, String)>,
}

impl<K> Default for AnimationOutcome<K> {
    fn default() -> Self {
        Self {
            finished: Vec::new(),
            events: Vec::new(),
        }
    }
}

/// Holds the active animatables and the shared animation clock.
///
/// `K` identifies a target (a scene handle, typically). Values are written
/// back through the closure passed to `animate`, so the engine never holds
/// a reference into the objects it animates.
pub struct AnimationEngine<K> {
    animatables: Vec<Animatable<K>>,
    animation_time_ms: f64,
    next_id: u64,
}

impl<K: Clone + PartialEq> Default for AnimationEngine<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + PartialEq> AnimationEngine<K> {
    pub fn new() -> Self {
        Self {
            animatables: Vec::new(),
            animation_time_ms: 0.0,
            next_id: 0,
        }
    }

    /// Start `animations` on `target`, stopping whatever was running on it
    pub fn begin_animation(
        &mut self,
        target: K,
        animations: Vec<Animation>,
        from_frame: f32,
        to_frame: f32,
        looping: bool,
        speed_ratio: f32,
    ) -> AnimatableId {
        self.stop_animation(&target, None);
        self.begin_direct_animation(target, animations, from_frame, to_frame, looping, speed_ratio)
    }

    /// Start `animations` on `target` alongside any existing runs
    pub fn begin_direct_animation(
        &mut self,
        target: K,
        animations: Vec<Animation>,
        from_frame: f32,
        to_frame: f32,
        looping: bool,
        speed_ratio: f32,
    ) -> AnimatableId {
        self.next_id += 1;
        let id = AnimatableId(self.next_id);
        self.animatables.push(Animatable::new(
            id,
            target,
            animations,
            from_frame,
            to_frame,
            looping,
            speed_ratio,
        ));
        id
    }

    /// Stop runs on `target`. With a name, only that animation is removed.
    ///
    /// Returns true if anything was stopped. End callbacks run for every
    /// animatable that ends up empty.
    pub fn stop_animation(&mut self, target: &K, animation_name: Option<&str>) -> bool {
        let mut stopped = false;
        let mut index = 0;
        while index < self.animatables.len() {
            if self.animatables[index].target() != target {
                index += 1;
                continue;
            }
            let now_empty = match animation_name {
                Some(name) => {
                    let before = self.animatables[index].animation_names().len();
                    let empty = self.animatables[index].remove_animation(name);
                    stopped |= before != self.animatables[index].animation_names().len();
                    empty
                }
                None => {
                    stopped = true;
                    true
                }
            };
            if now_empty {
                let mut removed = self.animatables.remove(index);
                if let Some(callback) = removed.take_on_animation_end() {
                    callback();
                }
            } else {
                index += 1;
            }
        }
        stopped
    }

    /// Stop one animatable by id
    pub fn stop_animatable(&mut self, id: AnimatableId) -> bool {
        match self.animatables.iter().position(|a| a.id() == id) {
            Some(index) => {
                let mut removed = self.animatables.remove(index);
                if let Some(callback) = removed.take_on_animation_end() {
                    callback();
                }
                true
            }
            None => false,
        }
    }

    /// Stop everything
    pub fn stop_all(&mut self) {
        debug!("stopping {} animatables", self.animatables.len());
        for mut animatable in self.animatables.drain(..) {
            if let Some(callback) = animatable.take_on_animation_end() {
                callback();
            }
        }
    }

    pub fn animatable(&self, id: AnimatableId) -> Option<&Animatable<K>> {
        self.animatables.iter().find(|a| a.id() == id)
    }

    pub fn animatable_mut(&mut self, id: AnimatableId) -> Option<&mut Animatable<K>> {
        self.animatables.iter_mut().find(|a| a.id() == id)
    }

    /// First animatable running on `target`
    pub fn animatable_by_target(&self, target: &K) -> Option<&Animatable<K>> {
        self.animatables.iter().find(|a| a.target() == target)
    }

    /// Ids of every animatable running on `target`
    pub fn animatables_for_target(&self, target: &K) -> Vec<AnimatableId> {
        self.animatables
            .iter()
            .filter(|a| a.target() == target)
            .map(|a| a.id())
            .collect()
    }

    pub fn is_animating(&self, target: &K) -> bool {
        self.animatables.iter().any(|a| a.target() == target)
    }

    /// Active animatables in start order
    pub fn animatables(&self) -> &[Animatable<K>] {
        &self.animatables
    }

    pub fn len(&self) -> usize {
        self.animatables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animatables.is_empty()
    }

    /// Engine time in milliseconds
    pub fn animation_time_ms(&self) -> f64 {
        self.animation_time_ms
    }

    /// Advance the clock by `delta_ms` and tick every animatable in start order
    pub fn animate(
        &mut self,
        delta_ms: f64,
        mut write: impl FnMut(&K, &str, &AnimationValue),
    ) -> AnimationOutcome<K> {
        self.animation_time_ms += delta_ms.max(0.0);
        let now = self.animation_time_ms;

        let mut outcome = AnimationOutcome::default();
        let mut index = 0;
        while index < self.animatables.len() {
            let mut events = Vec::new();
            let running = self.animatables[index].animate(now, &mut write, &mut events);
            let target = self.animatables[index].target().clone();
            outcome
                .events
                .extend(events.into_iter().map(|name| (target.clone(), name)));

            if running {
                index += 1;
            } else {
                let mut done = self.animatables.remove(index);
                if let Some(callback) = done.take_on_animation_end() {
                    callback();
                }
                outcome.finished.push((done.id(), target));
            }
        }
        outcome
    }
}
