//! The graphics device the scene drives
//!
//! The scene never talks to a GPU API directly. Every effect compile, state
//! change, uniform upload and draw goes through [`GraphicsDevice`], which a
//! host implements on top of its real backend. [`crate::RecordingDevice`] is
//! the headless implementation.

use glam::{Mat4, Vec3, Vec4};
use lumen_core::{Color, Result, Viewport};

/// Handle to a compiled (or compiling) shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectHandle(pub u64);

/// What to compile: a base shader plus the defines selecting its code paths
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EffectDescriptor {
    pub name: String,
    pub defines: Vec<String>,
}

impl EffectDescriptor {
    pub fn new(name: &str, defines: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            defines,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Color(Color),
    Mat4(Mat4),
}

/// Blend equation used for the following draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    #[default]
    Disable,
    Combine,
    Add,
    Multiply,
    PremultipliedAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    None,
    #[default]
    Back,
    Front,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub cull: CullMode,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            cull: CullMode::Back,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveType {
    #[default]
    Triangles,
    Lines,
    Points,
}

/// Operations the scene needs from a GPU backend
pub trait GraphicsDevice {
    /// Start compiling an effect. Compilation may finish later; poll with `is_effect_ready`.
    fn create_effect(&mut self, descriptor: &EffectDescriptor) -> Result<EffectHandle>;

    fn is_effect_ready(&self, effect: EffectHandle) -> bool;

    fn bind_effect(&mut self, effect: EffectHandle);

    fn set_uniform(&mut self, name: &str, value: UniformValue);

    fn draw_indexed(&mut self, primitive: PrimitiveType, index_start: usize, index_count: usize);

    fn draw_arrays(&mut self, primitive: PrimitiveType, vertex_start: usize, vertex_count: usize);

    fn set_state(&mut self, state: RenderState);

    fn set_alpha_mode(&mut self, mode: AlphaMode);

    fn set_color_write(&mut self, enabled: bool);

    /// Viewport in pixels
    fn set_viewport(&mut self, viewport: Viewport);

    fn clear(&mut self, color: Option<Color>, depth: bool, stencil: bool);

    /// Upload the per-camera matrices shared by every draw
    fn update_scene_uniforms(&mut self, view: &Mat4, projection: &Mat4, transform: &Mat4);

    /// Upload the second set of matrices used by mirror and reflection passes
    fn update_alternate_scene_uniforms(&mut self, view: &Mat4, projection: &Mat4, transform: &Mat4);

    fn release_effect(&mut self, effect: EffectHandle);

    fn is_context_lost(&self) -> bool {
        false
    }

    /// Forget any state the device caches between draws
    fn wipe_caches(&mut self) {}
}
