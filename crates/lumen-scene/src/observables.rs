//! Lifecycle events a scene publishes

use crate::handle::{
    CameraHandle, LightHandle, MaterialHandle, MeshHandle, NodeHandle, ParticleSystemHandle, SkeletonHandle,
    TextureHandle, TransformNodeHandle,
};
use crate::pointer::PointerInfo;
use lumen_core::LumenError;
use lumen_runtime::Observable;

/// Payload of the per-frame render events
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub frame_id: u64,
    pub render_id: u64,
    pub delta_time_ms: f64,
    /// Frame delta relative to the reference frame rate (1.0 at 60 fps)
    pub animation_ratio: f64,
}

/// Payload of the fixed-step events
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepInfo {
    pub step_id: u64,
    /// Step within the current frame, starting at 0
    pub internal_step: u32,
    /// Step length in seconds
    pub time_step: f64,
}

/// Payload of the per-camera events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraRenderInfo {
    pub camera: CameraHandle,
    pub render_id: u64,
}

/// Payload of the rendering-group and particle events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderingGroupInfo {
    pub rendering_group_id: usize,
    pub camera: Option<CameraHandle>,
}

/// A named event keyed into an animation fired during `animate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationEventInfo {
    pub target: NodeHandle,
    pub name: String,
}

/// Every observable a scene exposes
#[derive(Default)]
pub struct SceneObservables {
    pub on_dispose: Observable<()>,
    pub on_before_render: Observable<FrameInfo>,
    pub on_after_render: Observable<FrameInfo>,
    pub on_before_animations: Observable<FrameInfo>,
    pub on_after_animations: Observable<FrameInfo>,
    pub on_before_step: Observable<StepInfo>,
    pub on_after_step: Observable<StepInfo>,
    pub on_before_camera_render: Observable<CameraRenderInfo>,
    pub on_after_camera_render: Observable<CameraRenderInfo>,
    pub on_before_active_meshes_evaluation: Observable<CameraRenderInfo>,
    pub on_after_active_meshes_evaluation: Observable<CameraRenderInfo>,
    pub on_before_particles_rendering: Observable<RenderingGroupInfo>,
    pub on_after_particles_rendering: Observable<RenderingGroupInfo>,
    pub on_before_draw_phase: Observable<CameraRenderInfo>,
    pub on_after_draw_phase: Observable<CameraRenderInfo>,
    /// Notified with mask `1 << rendering_group_id`
    pub on_before_rendering_group: Observable<RenderingGroupInfo>,
    /// Notified with mask `1 << rendering_group_id`
    pub on_after_rendering_group: Observable<RenderingGroupInfo>,
    pub on_ready: Observable<()>,
    pub on_data_loaded: Observable<()>,
    pub on_active_camera_changed: Observable<Option<CameraHandle>>,
    pub on_new_camera_added: Observable<CameraHandle>,
    pub on_camera_removed: Observable<CameraHandle>,
    pub on_new_light_added: Observable<LightHandle>,
    pub on_light_removed: Observable<LightHandle>,
    pub on_new_mesh_added: Observable<MeshHandle>,
    pub on_mesh_removed: Observable<MeshHandle>,
    pub on_new_transform_node_added: Observable<TransformNodeHandle>,
    pub on_transform_node_removed: Observable<TransformNodeHandle>,
    pub on_new_material_added: Observable<MaterialHandle>,
    pub on_material_removed: Observable<MaterialHandle>,
    pub on_new_texture_added: Observable<TextureHandle>,
    pub on_texture_removed: Observable<TextureHandle>,
    pub on_new_skeleton_added: Observable<SkeletonHandle>,
    pub on_skeleton_removed: Observable<SkeletonHandle>,
    pub on_new_particle_system_added: Observable<ParticleSystemHandle>,
    pub on_particle_system_removed: Observable<ParticleSystemHandle>,
    pub on_animation_event: Observable<AnimationEventInfo>,
    pub on_pointer: Observable<PointerInfo>,
    /// Device-level failures; the frame that detected them was skipped
    pub on_error: Observable<LumenError>,
}

impl SceneObservables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every observer
    pub fn clear_all(&self) {
        self.on_dispose.clear();
        self.on_before_render.clear();
        self.on_after_render.clear();
        self.on_before_animations.clear();
        self.on_after_animations.clear();
        self.on_before_step.clear();
        self.on_after_step.clear();
        self.on_before_camera_render.clear();
        self.on_after_camera_render.clear();
        self.on_before_active_meshes_evaluation.clear();
        self.on_after_active_meshes_evaluation.clear();
        self.on_before_particles_rendering.clear();
        self.on_after_particles_rendering.clear();
        self.on_before_draw_phase.clear();
        self.on_after_draw_phase.clear();
        self.on_before_rendering_group.clear();
        self.on_after_rendering_group.clear();
        self.on_ready.clear();
        self.on_data_loaded.clear();
        self.on_active_camera_changed.clear();
        self.on_new_camera_added.clear();
        self.on_camera_removed.clear();
        self.on_new_light_added.clear();
        self.on_light_removed.clear();
        self.on_new_mesh_added.clear();
        self.on_mesh_removed.clear();
        self.on_new_transform_node_added.clear();
        self.on_transform_node_removed.clear();
        self.on_new_material_added.clear();
        self.on_material_removed.clear();
        self.on_new_texture_added.clear();
        self.on_texture_removed.clear();
        self.on_new_skeleton_added.clear();
        self.on_skeleton_removed.clear();
        self.on_new_particle_system_added.clear();
        self.on_particle_system_removed.clear();
        self.on_animation_event.clear();
        self.on_pointer.clear();
        self.on_error.clear();
    }
}

impl std::fmt::Debug for SceneObservables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneObservables")
            .field("on_before_render", &self.on_before_render.observer_count())
            .field("on_after_render", &self.on_after_render.observer_count())
            .finish_non_exhaustive()
    }
}
