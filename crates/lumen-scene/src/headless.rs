//! Headless graphics device that records what the scene asks it to do

use crate::device::{
    AlphaMode, EffectDescriptor, EffectHandle, GraphicsDevice, PrimitiveType, RenderState, UniformValue,
};
use glam::Mat4;
use lumen_core::{Color, LumenError, Result, Viewport};
use std::collections::{HashMap, HashSet};

/// One call made on a [`RecordingDevice`]
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    CreateEffect { effect: EffectHandle, name: String },
    BindEffect(EffectHandle),
    SetUniform { name: String, value: UniformValue },
    DrawIndexed { primitive: PrimitiveType, index_start: usize, index_count: usize },
    DrawArrays { primitive: PrimitiveType, vertex_start: usize, vertex_count: usize },
    SetState(RenderState),
    SetAlphaMode(AlphaMode),
    SetColorWrite(bool),
    SetViewport(Viewport),
    Clear { color: Option<Color>, depth: bool, stencil: bool },
    UpdateSceneUniforms { transform: Mat4 },
    UpdateAlternateSceneUniforms { transform: Mat4 },
    ReleaseEffect(EffectHandle),
}

impl DeviceCommand {
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::DrawIndexed { .. } | Self::DrawArrays { .. })
    }
}

/// A `GraphicsDevice` without a GPU.
///
/// Effects are cached per descriptor. By default they are ready as soon as
/// they are created; with deferred compilation they stay pending until
/// `finish_compilation` is called.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    commands: Vec<DeviceCommand>,
    effects: HashMap<EffectDescriptor, EffectHandle>,
    effect_names: HashMap<EffectHandle, String>,
    ready: HashSet<EffectHandle>,
    failing: HashSet<String>,
    next_effect: u64,
    deferred_compilation: bool,
    context_lost: bool,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newly created effects stay pending until `finish_compilation`
    pub fn with_deferred_compilation(mut self) -> Self {
        self.deferred_compilation = true;
        self
    }

    /// Mark every pending effect as compiled
    pub fn finish_compilation(&mut self) {
        self.ready.extend(self.effect_names.keys().copied());
    }

    /// Make effects with this base name fail to compile
    pub fn fail_effect(&mut self, name: &str) {
        self.failing.insert(name.to_string());
    }

    pub fn set_context_lost(&mut self, lost: bool) {
        self.context_lost = lost;
    }

    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_draw()).count()
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    pub fn effect_name(&self, effect: EffectHandle) -> Option<&str> {
        self.effect_names.get(&effect).map(String::as_str)
    }

    /// Base names of the effects bound right before each draw, in draw order
    pub fn drawn_effect_names(&self) -> Vec<String> {
        let mut bound = None;
        let mut names = Vec::new();
        for command in &self.commands {
            match command {
                DeviceCommand::BindEffect(effect) => bound = Some(*effect),
                c if c.is_draw() => {
                    let name = bound
                        .and_then(|e| self.effect_name(e))
                        .unwrap_or_default()
                        .to_string();
                    names.push(name);
                }
                _ => {}
            }
        }
        names
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_effect(&mut self, descriptor: &EffectDescriptor) -> Result<EffectHandle> {
        if self.failing.contains(&descriptor.name) {
            return Err(LumenError::EffectCompilation(descriptor.name.clone()));
        }
        if let Some(effect) = self.effects.get(descriptor) {
            return Ok(*effect);
        }
        self.next_effect += 1;
        let effect = EffectHandle(self.next_effect);
        self.effects.insert(descriptor.clone(), effect);
        self.effect_names.insert(effect, descriptor.name.clone());
        if !self.deferred_compilation {
            self.ready.insert(effect);
        }
        self.commands.push(DeviceCommand::CreateEffect {
            effect,
            name: descriptor.name.clone(),
        });
        Ok(effect)
    }

    fn is_effect_ready(&self, effect: EffectHandle) -> bool {
        self.ready.contains(&effect)
    }

    fn bind_effect(&mut self, effect: EffectHandle) {
        self.commands.push(DeviceCommand::BindEffect(effect));
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.commands.push(DeviceCommand::SetUniform {
            name: name.to_string(),
            value,
        });
    }

    fn draw_indexed(&mut self, primitive: PrimitiveType, index_start: usize, index_count: usize) {
        self.commands.push(DeviceCommand::DrawIndexed {
            primitive,
            index_start,
            index_count,
        });
    }

    fn draw_arrays(&mut self, primitive: PrimitiveType, vertex_start: usize, vertex_count: usize) {
        self.commands.push(DeviceCommand::DrawArrays {
            primitive,
            vertex_start,
            vertex_count,
        });
    }

    fn set_state(&mut self, state: RenderState) {
        self.commands.push(DeviceCommand::SetState(state));
    }

    fn set_alpha_mode(&mut self, mode: AlphaMode) {
        self.commands.push(DeviceCommand::SetAlphaMode(mode));
    }

    fn set_color_write(&mut self, enabled: bool) {
        self.commands.push(DeviceCommand::SetColorWrite(enabled));
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.commands.push(DeviceCommand::SetViewport(viewport));
    }

    fn clear(&mut self, color: Option<Color>, depth: bool, stencil: bool) {
        self.commands.push(DeviceCommand::Clear { color, depth, stencil });
    }

    fn update_scene_uniforms(&mut self, _view: &Mat4, _projection: &Mat4, transform: &Mat4) {
        self.commands.push(DeviceCommand::UpdateSceneUniforms { transform: *transform });
    }

    fn update_alternate_scene_uniforms(&mut self, _view: &Mat4, _projection: &Mat4, transform: &Mat4) {
        self.commands
            .push(DeviceCommand::UpdateAlternateSceneUniforms { transform: *transform });
    }

    fn release_effect(&mut self, effect: EffectHandle) {
        self.ready.remove(&effect);
        self.effect_names.remove(&effect);
        self.effects.retain(|_, e| *e != effect);
        self.commands.push(DeviceCommand::ReleaseEffect(effect));
    }

    fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    fn wipe_caches(&mut self) {
        self.commands.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effects_are_cached_per_descriptor() {
        let mut device = RecordingDevice::new();
        let a = device.create_effect(&EffectDescriptor::new("basic", vec![])).unwrap();
        let b = device.create_effect(&EffectDescriptor::new("basic", vec![])).unwrap();
        let c = device
            .create_effect(&EffectDescriptor::new("basic", vec!["ALPHATEST".into()]))
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(device.effect_count(), 2);
        assert!(device.is_effect_ready(a));
    }

    #[test]
    fn deferred_compilation() {
        let mut device = RecordingDevice::new().with_deferred_compilation();
        let effect = device.create_effect(&EffectDescriptor::new("slow", vec![])).unwrap();
        assert!(!device.is_effect_ready(effect));
        device.finish_compilation();
        assert!(device.is_effect_ready(effect));
    }

    #[test]
    fn failing_effect() {
        let mut device = RecordingDevice::new();
        device.fail_effect("broken");
        let err = device.create_effect(&EffectDescriptor::new("broken", vec![]));
        assert!(matches!(err, Err(LumenError::EffectCompilation(_))));
    }

    #[test]
    fn drawn_effect_names_follow_binds() {
        let mut device = RecordingDevice::new();
        let a = device.create_effect(&EffectDescriptor::new("a", vec![])).unwrap();
        let b = device.create_effect(&EffectDescriptor::new("b", vec![])).unwrap();
        device.bind_effect(a);
        device.draw_indexed(PrimitiveType::Triangles, 0, 3);
        device.bind_effect(b);
        device.draw_arrays(PrimitiveType::Points, 0, 10);
        device.draw_arrays(PrimitiveType::Points, 0, 10);
        assert_eq!(device.draw_count(), 3);
        assert_eq!(device.drawn_effect_names(), vec!["a", "b", "b"]);
    }

    #[test]
    fn release_forgets_effect() {
        let mut device = RecordingDevice::new();
        let effect = device.create_effect(&EffectDescriptor::new("temp", vec![])).unwrap();
        device.release_effect(effect);
        assert!(!device.is_effect_ready(effect));
        assert_eq!(device.effect_count(), 0);
    }
}
