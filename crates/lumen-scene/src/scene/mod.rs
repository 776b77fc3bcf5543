//! The scene: owner of every entity and the per-frame render loop
//!
//! Entities live in a `hecs::World`. The scene keeps one insertion-ordered
//! `Vec` of handles per entity kind next to it, so iteration order is the
//! order things were added, and handles stay cheap to copy around.

mod active_meshes;
mod animation;
mod dispose;
mod picking;
mod query;
mod readiness;
mod registry;
mod render;
mod transform;

pub use dispose::DisposeRequest;
pub use picking::MeshPredicate;
pub use registry::Removed;

use crate::camera::Camera;
use crate::config::SceneConfig;
use crate::handle::{
    CameraHandle, LightHandle, MaterialHandle, MeshHandle, ParticleSystemHandle, SkeletonHandle, TextureHandle,
    TransformNodeHandle,
};
use crate::light::Light;
use crate::material::MaterialEntry;
use crate::mesh::Mesh;
use crate::node::TransformNode;
use crate::observables::SceneObservables;
use crate::octree::SelectionOctree;
use crate::particles::ParticleSystemEntry;
use crate::pointer::PointerState;
use crate::rendering::{MaterialCache, RenderingManager};
use crate::skeleton::Skeleton;
use crate::sprites::SpriteManager;
use crate::texture::Texture;
use hecs::{Ref, RefMut, World};
use lumen_animation::AnimationEngine;
use lumen_core::{LumenError, PerfCounter, Result, UniqueIdGenerator};
use lumen_runtime::{LockstepStepper, ReadinessGate, ReadinessToken, RenderPhase, SimulationSystem};
use std::collections::HashMap;
use transform::TransformState;
use uuid::Uuid;

use crate::handle::NodeHandle;

/// Per-frame diagnostics
#[derive(Debug, Default, Clone)]
pub struct PerfCounters {
    pub total_vertices: PerfCounter,
    pub active_indices: PerfCounter,
    pub active_particles: PerfCounter,
    pub active_bones: PerfCounter,
    pub active_meshes: PerfCounter,
    pub draw_calls: PerfCounter,
    pub frame_time: PerfCounter,
    pub render_time: PerfCounter,
    pub animation_time: PerfCounter,
    pub camera_render_time: PerfCounter,
    pub evaluate_active_meshes_time: PerfCounter,
}

impl PerfCounters {
    fn fetch_new_frame(&mut self) {
        self.total_vertices.fetch_new_frame();
        self.active_indices.fetch_new_frame();
        self.active_particles.fetch_new_frame();
        self.active_bones.fetch_new_frame();
        self.active_meshes.fetch_new_frame();
        self.draw_calls.fetch_new_frame();
    }

    /// Fold this frame's counts into the running statistics
    fn fold_counts(&mut self) {
        for counter in [
            &mut self.total_vertices,
            &mut self.active_indices,
            &mut self.active_particles,
            &mut self.active_bones,
            &mut self.active_meshes,
            &mut self.draw_calls,
        ] {
            counter.add_count(0.0, true);
        }
    }
}

/// Root aggregate owning every mesh, camera, light, material and the frame loop
pub struct Scene {
    uid: Uuid,
    pub config: SceneConfig,
    world: World,
    unique_ids: UniqueIdGenerator,

    meshes: Vec<MeshHandle>,
    cameras: Vec<CameraHandle>,
    lights: Vec<LightHandle>,
    transform_nodes: Vec<TransformNodeHandle>,
    materials: Vec<MaterialHandle>,
    textures: Vec<TextureHandle>,
    skeletons: Vec<SkeletonHandle>,
    particle_systems: Vec<ParticleSystemHandle>,
    sprite_managers: Vec<Box<dyn SpriteManager>>,
    texture_tokens: HashMap<TextureHandle, ReadinessToken>,

    active_camera: Option<CameraHandle>,
    active_cameras: Vec<CameraHandle>,
    default_material: Option<MaterialHandle>,

    transform: TransformState,
    rendering_manager: RenderingManager,
    material_cache: MaterialCache,
    active_meshes: Vec<MeshHandle>,
    active_particle_systems: Vec<ParticleSystemHandle>,
    active_meshes_frozen: bool,
    skip_evaluate_completely: bool,
    octree: Option<SelectionOctree<MeshHandle>>,

    animations: AnimationEngine<NodeHandle>,
    physics: Option<Box<dyn SimulationSystem>>,
    stepper: LockstepStepper,
    readiness: ReadinessGate,

    render_id: u64,
    frame_id: u64,
    phase: RenderPhase,
    animation_ratio: f64,
    last_delta_ms: f64,
    observables: SceneObservables,
    counters: PerfCounters,
    pointer: PointerState,
    device_lost_reported: bool,
    dispose_request: DisposeRequest,
    disposed: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}

impl Scene {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            uid: Uuid::new_v4(),
            config,
            world: World::new(),
            unique_ids: UniqueIdGenerator::new(),
            meshes: Vec::new(),
            cameras: Vec::new(),
            lights: Vec::new(),
            transform_nodes: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            skeletons: Vec::new(),
            particle_systems: Vec::new(),
            sprite_managers: Vec::new(),
            texture_tokens: HashMap::new(),
            active_camera: None,
            active_cameras: Vec::new(),
            default_material: None,
            transform: TransformState::default(),
            rendering_manager: RenderingManager::new(),
            material_cache: MaterialCache::default(),
            active_meshes: Vec::new(),
            active_particle_systems: Vec::new(),
            active_meshes_frozen: false,
            skip_evaluate_completely: false,
            octree: None,
            animations: AnimationEngine::new(),
            physics: None,
            stepper: LockstepStepper::new(1.0 / 60.0, 4),
            readiness: ReadinessGate::new(),
            render_id: 0,
            frame_id: 0,
            phase: RenderPhase::Idle,
            animation_ratio: 1.0,
            last_delta_ms: 0.0,
            observables: SceneObservables::new(),
            counters: PerfCounters::default(),
            pointer: PointerState::default(),
            device_lost_reported: false,
            dispose_request: DisposeRequest::default(),
            disposed: false,
        }
    }

    /// Random identity of this scene instance
    pub fn uid(&self) -> Uuid {
        self.uid
    }

    /// Number of completed `render()` calls
    pub fn render_id(&self) -> u64 {
        self.render_id
    }

    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    /// Ratio of the last frame's delta to a 60 fps frame
    pub fn animation_ratio(&self) -> f64 {
        self.animation_ratio
    }

    pub fn observables(&self) -> &SceneObservables {
        &self.observables
    }

    pub fn perf_counters(&self) -> &PerfCounters {
        &self.counters
    }

    pub fn rendering_manager(&self) -> &RenderingManager {
        &self.rendering_manager
    }

    pub fn rendering_manager_mut(&mut self) -> &mut RenderingManager {
        &mut self.rendering_manager
    }

    pub fn material_cache(&self) -> &MaterialCache {
        &self.material_cache
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn set_physics(&mut self, physics: Box<dyn SimulationSystem>) {
        self.physics = Some(physics);
    }

    pub fn physics(&self) -> Option<&dyn SimulationSystem> {
        self.physics.as_deref()
    }

    /// Lockstep step counters: (total steps, steps this frame)
    pub fn step_ids(&self) -> (u64, u32) {
        (self.stepper.current_step_id(), self.stepper.current_internal_step())
    }

    /// Seconds waiting in the lockstep accumulator
    pub fn time_accumulator(&self) -> f64 {
        self.stepper.accumulator()
    }

    pub fn meshes(&self) -> &[MeshHandle] {
        &self.meshes
    }

    pub fn cameras(&self) -> &[CameraHandle] {
        &self.cameras
    }

    pub fn lights(&self) -> &[LightHandle] {
        &self.lights
    }

    pub fn transform_nodes(&self) -> &[TransformNodeHandle] {
        &self.transform_nodes
    }

    pub fn materials(&self) -> &[MaterialHandle] {
        &self.materials
    }

    pub fn textures(&self) -> &[TextureHandle] {
        &self.textures
    }

    pub fn skeletons(&self) -> &[SkeletonHandle] {
        &self.skeletons
    }

    pub fn particle_systems(&self) -> &[ParticleSystemHandle] {
        &self.particle_systems
    }

    pub fn sprite_managers(&self) -> &[Box<dyn SpriteManager>] {
        &self.sprite_managers
    }

    /// Raw entity storage, for host-side queries
    pub fn world(&self) -> &World {
        &self.world
    }
}

macro_rules! component_access {
    ($($get:ident, $get_mut:ident, $handle:ty => $component:ty;)*) => {
        impl Scene {
            $(
                pub fn $get(&self, handle: $handle) -> Result<Ref<'_, $component>> {
                    self.world
                        .get::<&$component>(handle.0)
                        .map_err(|_| LumenError::StaleHandle(format!("{handle:?}")))
                }

                pub fn $get_mut(&mut self, handle: $handle) -> Result<RefMut<'_, $component>> {
                    self.world
                        .get::<&mut $component>(handle.0)
                        .map_err(|_| LumenError::StaleHandle(format!("{handle:?}")))
                }
            )*
        }
    };
}

component_access! {
    mesh, mesh_mut, MeshHandle => Mesh;
    camera, camera_mut, CameraHandle => Camera;
    light, light_mut, LightHandle => Light;
    transform_node, transform_node_mut, TransformNodeHandle => TransformNode;
    material, material_mut, MaterialHandle => MaterialEntry;
    texture, texture_mut, TextureHandle => Texture;
    skeleton, skeleton_mut, SkeletonHandle => Skeleton;
    particle_system, particle_system_mut, ParticleSystemHandle => ParticleSystemEntry;
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::EngineOptions;
    use crate::engine::Engine;
    use crate::headless::RecordingDevice;
    use std::time::Duration;

    /// Headless engine whose clock advances by a fixed 16 ms per frame
    pub fn engine() -> Engine<RecordingDevice> {
        Engine::new(RecordingDevice::new(), EngineOptions::default())
    }

    pub fn frame(engine: &mut Engine<RecordingDevice>, ms: u64) {
        engine.advance_time(Duration::from_millis(ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Geometry;

    #[test]
    fn new_scene_is_idle_and_empty() {
        let scene = Scene::default();
        assert_eq!(scene.render_id(), 0);
        assert_eq!(scene.phase(), RenderPhase::Idle);
        assert!(scene.meshes().is_empty());
        assert!(scene.active_camera().is_none());
    }

    #[test]
    fn each_scene_gets_its_own_uid() {
        assert_ne!(Scene::default().uid(), Scene::default().uid());
    }

    #[test]
    fn component_access_rejects_stale_handles() {
        let mut scene = Scene::default();
        let mesh = scene.add_mesh(Mesh::new("box").with_geometry(Geometry::cube(1.0)));
        assert_eq!(scene.mesh(mesh).unwrap().node.name, "box");
        scene.mesh_mut(mesh).unwrap().visibility = 0.5;
        assert_eq!(scene.mesh(mesh).unwrap().visibility, 0.5);

        scene.remove_mesh(mesh);
        assert!(matches!(scene.mesh(mesh), Err(LumenError::StaleHandle(_))));
    }
}
