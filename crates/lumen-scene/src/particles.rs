//! Particle systems, animated and drawn by the render loop

use crate::device::{EffectDescriptor, EffectHandle, GraphicsDevice, PrimitiveType, UniformValue};
use crate::handle::NodeHandle;
use crate::mesh::DEFAULT_LAYER_MASK;
use crate::node::Identified;
use glam::Vec3;
use log::warn;
use lumen_core::UniqueId;

/// A particle system as seen by the render loop
pub trait ParticleSystem: Send + Sync {
    fn name(&self) -> &str;

    fn is_started(&self) -> bool;

    fn is_ready(&self) -> bool;

    fn rendering_group_id(&self) -> usize {
        0
    }

    fn layer_mask(&self) -> u32 {
        DEFAULT_LAYER_MASK
    }

    /// Live particles after the last `animate`
    fn active_count(&self) -> usize;

    /// Advance the simulation; `emitter` is the emitter's world position
    fn animate(&mut self, delta_ms: f64, emitter: Vec3);

    /// Issue draw calls, returning how many were made
    fn render(&mut self, device: &mut dyn GraphicsDevice) -> usize;

    fn dispose(&mut self) {}
}

/// A particle system stored in the scene
pub struct ParticleSystemEntry {
    pub name: String,
    pub id: String,
    /// Node the particles are emitted from; the origin when unset or removed
    pub emitter: Option<NodeHandle>,
    pub system: Box<dyn ParticleSystem>,
    pub(crate) unique_id: Option<UniqueId>,
    /// Render id of the last `animate`, so several cameras share one step
    pub(crate) last_animated_render_id: Option<u64>,
}

impl ParticleSystemEntry {
    pub fn new(system: impl ParticleSystem + 'static) -> Self {
        let name = system.name().to_string();
        Self {
            id: name.clone(),
            name,
            emitter: None,
            system: Box::new(system),
            unique_id: None,
            last_animated_render_id: None,
        }
    }

    pub fn with_emitter(mut self, emitter: impl Into<NodeHandle>) -> Self {
        self.emitter = Some(emitter.into());
        self
    }
}

impl std::fmt::Debug for ParticleSystemEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticleSystemEntry")
            .field("name", &self.name)
            .field("emitter", &self.emitter)
            .field("unique_id", &self.unique_id)
            .finish_non_exhaustive()
    }
}

impl Identified for ParticleSystemEntry {
    fn name(&self) -> &str {
        &self.name
    }
    fn id(&self) -> &str {
        &self.id
    }
    fn unique_id(&self) -> Option<UniqueId> {
        self.unique_id
    }
}

#[derive(Debug, Clone, Copy)]
struct Particle {
    position: Vec3,
    velocity: Vec3,
    age_ms: f64,
}

/// Emits particles at a fixed rate along one direction, pulled by gravity
#[derive(Debug, Clone)]
pub struct PointParticleSystem {
    pub name: String,
    /// Particles per second
    pub emit_rate: f64,
    pub lifetime_ms: f64,
    pub capacity: usize,
    pub direction: Vec3,
    pub gravity: Vec3,
    pub rendering_group_id: usize,
    pub layer_mask: u32,
    particles: Vec<Particle>,
    emit_accumulator: f64,
    started: bool,
    effect: Option<EffectHandle>,
}

impl PointParticleSystem {
    pub fn new(name: &str, capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            emit_rate: 10.0,
            lifetime_ms: 1000.0,
            capacity,
            direction: Vec3::Y,
            gravity: Vec3::ZERO,
            rendering_group_id: 0,
            layer_mask: DEFAULT_LAYER_MASK,
            particles: Vec::new(),
            emit_accumulator: 0.0,
            started: false,
            effect: None,
        }
    }

    pub fn start(&mut self) {
        self.started = true;
    }

    pub fn stop(&mut self) {
        self.started = false;
    }

    pub fn reset(&mut self) {
        self.particles.clear();
        self.emit_accumulator = 0.0;
    }
}

impl ParticleSystem for PointParticleSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_started(&self) -> bool {
        self.started
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn rendering_group_id(&self) -> usize {
        self.rendering_group_id
    }

    fn layer_mask(&self) -> u32 {
        self.layer_mask
    }

    fn active_count(&self) -> usize {
        self.particles.len()
    }

    fn animate(&mut self, delta_ms: f64, emitter: Vec3) {
        let dt = (delta_ms / 1000.0) as f32;
        let lifetime = self.lifetime_ms;
        for p in &mut self.particles {
            p.age_ms += delta_ms;
            p.velocity += self.gravity * dt;
            p.position += p.velocity * dt;
        }
        self.particles.retain(|p| p.age_ms < lifetime);

        if !self.started {
            return;
        }
        self.emit_accumulator += self.emit_rate * delta_ms / 1000.0;
        while self.emit_accumulator >= 1.0 && self.particles.len() < self.capacity {
            self.emit_accumulator -= 1.0;
            self.particles.push(Particle {
                position: emitter,
                velocity: self.direction,
                age_ms: 0.0,
            });
        }
        if self.particles.len() >= self.capacity {
            self.emit_accumulator = self.emit_accumulator.min(1.0);
        }
    }

    fn render(&mut self, device: &mut dyn GraphicsDevice) -> usize {
        if self.particles.is_empty() {
            return 0;
        }
        let effect = match self.effect {
            Some(effect) => effect,
            None => match device.create_effect(&EffectDescriptor::new("particles", Vec::new())) {
                Ok(effect) => *self.effect.insert(effect),
                Err(e) => {
                    warn!("particle system '{}' has no effect: {e}", self.name);
                    return 0;
                }
            },
        };
        if !device.is_effect_ready(effect) {
            return 0;
        }
        device.bind_effect(effect);
        device.set_uniform("particleCount", UniformValue::Float(self.particles.len() as f32));
        device.draw_arrays(PrimitiveType::Points, 0, self.particles.len());
        1
    }

    fn dispose(&mut self) {
        self.reset();
        self.started = false;
        self.effect = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::RecordingDevice;

    #[test]
    fn emits_only_when_started() {
        let mut system = PointParticleSystem::new("sparks", 100);
        system.animate(1000.0, Vec3::ZERO);
        assert_eq!(system.active_count(), 0);
        system.start();
        system.animate(500.0, Vec3::ZERO);
        assert_eq!(system.active_count(), 5);
    }

    #[test]
    fn capacity_and_lifetime() {
        let mut system = PointParticleSystem::new("sparks", 3);
        system.start();
        system.animate(1000.0, Vec3::ZERO);
        assert_eq!(system.active_count(), 3);
        system.stop();
        system.animate(1500.0, Vec3::ZERO);
        assert_eq!(system.active_count(), 0);
    }

    #[test]
    fn renders_one_draw() {
        let mut device = RecordingDevice::new();
        let mut system = PointParticleSystem::new("sparks", 10);
        assert_eq!(system.render(&mut device), 0);
        system.start();
        system.animate(200.0, Vec3::ZERO);
        assert_eq!(system.render(&mut device), 1);
        assert_eq!(device.draw_count(), 1);
    }
}
