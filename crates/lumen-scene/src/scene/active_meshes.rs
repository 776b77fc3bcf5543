//! Choosing what the current camera draws and bucketing it into rendering groups

use super::Scene;
use crate::camera::Camera;
use crate::device::GraphicsDevice;
use crate::engine::Engine;
use crate::handle::{CameraHandle, MaterialHandle, MeshHandle};
use crate::material::{prepare_sub_mesh, MaterialEntry};
use crate::mesh::Mesh;
use crate::node::{compute_world_matrix, current_world_matrix, is_enabled_in_hierarchy};
use crate::observables::CameraRenderInfo;
use crate::octree::SelectionOctree;
use crate::particles::ParticleSystemEntry;
use crate::rendering::{RenderBucket, SubMeshEntry};
use crate::skeleton::Skeleton;
use glam::Vec3;
use log::{debug, trace};
use lumen_core::{LumenError, Result};

/// What evaluation needs to know about the camera
#[derive(Debug, Clone, Copy)]
struct CameraView {
    eye: Vec3,
    layer_mask: u32,
}

impl Scene {
    /// Meshes selected for the camera rendered last, in evaluation order
    pub fn active_meshes(&self) -> &[MeshHandle] {
        &self.active_meshes
    }

    pub fn active_particle_systems(&self) -> &[crate::handle::ParticleSystemHandle] {
        &self.active_particle_systems
    }

    /// Evaluate once for the active camera, then keep that selection until unfrozen.
    ///
    /// With `skip_evaluate_completely`, world matrices of frozen meshes are not refreshed either.
    pub fn freeze_active_meshes<D: GraphicsDevice>(
        &mut self,
        engine: &mut Engine<D>,
        skip_evaluate_completely: bool,
    ) -> Result<()> {
        let camera = self.active_camera.ok_or(LumenError::NoActiveCamera)?;
        let size = engine.render_size();
        self.active_meshes_frozen = false;
        self.update_transform_for_camera(camera, engine.device_mut(), size, false);
        self.evaluate_active_meshes(camera, engine.device_mut());
        self.active_meshes_frozen = true;
        self.skip_evaluate_completely = skip_evaluate_completely;
        debug!("froze {} active meshes", self.active_meshes.len());
        Ok(())
    }

    pub fn unfreeze_active_meshes(&mut self) {
        if self.active_meshes_frozen {
            debug!("unfroze active meshes");
        }
        self.active_meshes_frozen = false;
        self.skip_evaluate_completely = false;
    }

    pub fn is_active_meshes_frozen(&self) -> bool {
        self.active_meshes_frozen
    }

    /// Build (or rebuild) the spatial index used for candidate selection
    pub fn create_or_update_selection_octree(&mut self, max_capacity: usize, max_depth: usize) {
        let mut items = Vec::with_capacity(self.meshes.len());
        for &handle in &self.meshes {
            let world_matrix = current_world_matrix(&self.world, handle.0);
            if let Ok(mut mesh) = self.world.get::<&mut Mesh>(handle.0) {
                mesh.update_bounds(&world_matrix);
                let bbox = &mesh.bounding_info.bounding_box;
                items.push((handle, bbox.minimum_world, bbox.maximum_world));
            }
        }
        let (min, max) = extents_of(items.iter().map(|(_, min, max)| (*min, *max)));

        let octree = self
            .octree
            .get_or_insert_with(|| SelectionOctree::new(max_capacity, max_depth));
        if octree.max_capacity() != max_capacity || octree.max_depth() != max_depth {
            *octree = SelectionOctree::new(max_capacity, max_depth);
        }
        octree.update(min, max, items);
        debug!("selection octree rebuilt with {} meshes", octree.entry_count());
    }

    pub fn remove_selection_octree(&mut self) {
        self.octree = None;
    }

    pub fn selection_octree(&self) -> Option<&SelectionOctree<MeshHandle>> {
        self.octree.as_ref()
    }

    /// World-space box around every mesh, from the current local transforms.
    ///
    /// Zero-sized at the origin for a scene without meshes.
    pub fn get_world_extends(&self) -> (Vec3, Vec3) {
        let boxes = self.meshes.iter().filter_map(|handle| {
            let world_matrix = current_world_matrix(&self.world, handle.0);
            let mesh = self.world.get::<&Mesh>(handle.0).ok()?;
            let corners = mesh.bounding_info.bounding_box.corners();
            let first = world_matrix.transform_point3(corners[0]);
            Some(corners.iter().skip(1).fold((first, first), |(min, max), c| {
                let p = world_matrix.transform_point3(*c);
                (min.min(p), max.max(p))
            }))
        });
        extents_of(boxes)
    }

    /// Material used for a mesh: its own while it resolves, else the default one
    pub(super) fn effective_material(&mut self, material: Option<MaterialHandle>) -> MaterialHandle {
        match material {
            Some(handle) if self.world.contains(handle.0) => handle,
            _ => self.default_material(),
        }
    }

    fn camera_view(&self, camera: CameraHandle) -> Option<CameraView> {
        let eye = compute_world_matrix(&self.world, camera.0, self.render_id).w_axis.truncate();
        let layer_mask = self.world.get::<&Camera>(camera.0).ok()?.layer_mask;
        Some(CameraView { eye, layer_mask })
    }

    pub(crate) fn evaluate_active_meshes(&mut self, camera: CameraHandle, device: &mut dyn GraphicsDevice) {
        let info = CameraRenderInfo {
            camera,
            render_id: self.render_id,
        };
        self.observables.on_before_active_meshes_evaluation.notify_observers(&info);
        self.counters.evaluate_active_meshes_time.begin_monitoring();

        if let Some(view) = self.camera_view(camera) {
            if self.active_meshes_frozen && !self.active_meshes.is_empty() {
                if !self.skip_evaluate_completely {
                    self.refresh_frozen_meshes();
                }
            } else {
                self.select_active_meshes(view, device);
            }
            self.evaluate_particle_systems(view);
        }

        self.counters.evaluate_active_meshes_time.end_monitoring(false);
        trace!(
            "render {}: {} active meshes, {} active particle systems",
            self.render_id,
            self.active_meshes.len(),
            self.active_particle_systems.len()
        );
        self.observables.on_after_active_meshes_evaluation.notify_observers(&info);
    }

    fn refresh_frozen_meshes(&mut self) {
        for &handle in &self.active_meshes {
            let world_matrix = compute_world_matrix(&self.world, handle.0, self.render_id);
            if let Ok(mut mesh) = self.world.get::<&mut Mesh>(handle.0) {
                mesh.update_bounds(&world_matrix);
                mesh.render_id = Some(self.render_id);
            }
        }
    }

    fn candidates(&self) -> Vec<MeshHandle> {
        match &self.octree {
            Some(octree) => {
                let selected = octree.select(self.frustum_planes());
                self.meshes.iter().copied().filter(|m| selected.contains(m)).collect()
            }
            None => self.meshes.clone(),
        }
    }

    fn select_active_meshes(&mut self, view: CameraView, device: &mut dyn GraphicsDevice) {
        self.active_meshes.clear();
        self.rendering_manager.reset();
        let planes = *self.frustum_planes();
        let render_id = self.render_id;

        for handle in self.candidates() {
            let entity = handle.0;
            let Some((vertices, ready, zero_scaling)) = self
                .world
                .get::<&Mesh>(entity)
                .ok()
                .map(|m| (m.total_vertices(), m.is_ready(), m.node.transform.has_zero_scaling()))
            else {
                continue;
            };
            self.counters.total_vertices.add_count(vertices as f64, false);
            if !ready || zero_scaling || !is_enabled_in_hierarchy(&self.world, entity) {
                continue;
            }

            let world_matrix = compute_world_matrix(&self.world, entity, render_id);
            let Ok(mut mesh) = self.world.get::<&mut Mesh>(entity) else {
                continue;
            };
            mesh.update_bounds(&world_matrix);

            let in_layer = mesh.layer_mask & view.layer_mask != 0;
            let in_frustum = self.config.skip_frustum_clipping || mesh.bounding_info.is_in_frustum(&planes);
            let always = mesh.always_select_as_active_mesh;
            if !(mesh.is_visible && mesh.visibility > 0.0 && (always || (in_layer && in_frustum))) {
                continue;
            }

            mesh.render_id = Some(render_id);
            let single = mesh.sub_meshes.len() == 1;
            let dispatch_all = single || always || self.config.dispatch_all_sub_meshes_of_active_meshes;
            let sub_meshes: Vec<usize> = mesh
                .sub_meshes
                .iter()
                .enumerate()
                .filter(|(_, sub)| dispatch_all || sub.bounding_info.is_in_frustum(&planes))
                .map(|(index, _)| index)
                .collect();
            let material = mesh.material;
            let skeleton = mesh.skeleton;
            self.counters.active_indices.add_count(mesh.total_indices() as f64, false);
            drop(mesh);

            self.active_meshes.push(handle);
            self.counters.active_meshes.add_count(1.0, false);

            if let Some(skeleton) = skeleton {
                if let Ok(mut skeleton) = self.world.get::<&mut Skeleton>(skeleton.0) {
                    if skeleton.prepare(render_id) {
                        self.counters.active_bones.add_count(skeleton.bone_count() as f64, false);
                    }
                }
            }

            let material = self.effective_material(material);
            for sub_mesh_index in sub_meshes {
                self.evaluate_sub_mesh(handle, sub_mesh_index, material, view.eye, device);
            }
        }
    }

    /// Put one submesh in its rendering group's bucket, if its material is ready for it
    fn evaluate_sub_mesh(
        &mut self,
        handle: MeshHandle,
        sub_mesh_index: usize,
        material: MaterialHandle,
        eye: Vec3,
        device: &mut dyn GraphicsDevice,
    ) {
        let Some(effect) = prepare_sub_mesh(&self.world, device, handle, sub_mesh_index, material, false) else {
            return;
        };
        let Ok(mesh) = self.world.get::<&Mesh>(handle.0) else {
            return;
        };
        let Some(sub_mesh) = mesh.sub_meshes.get(sub_mesh_index) else {
            return;
        };
        let Ok(entry) = self.world.get::<&MaterialEntry>(material.0) else {
            return;
        };
        let material_impl = &entry.material;

        let (bucket, depth_pre_pass) = if material_impl.need_alpha_blending_for_mesh(&mesh) {
            (RenderBucket::Transparent, material_impl.need_depth_pre_pass())
        } else if material_impl.need_alpha_testing() {
            (RenderBucket::AlphaTest, false)
        } else {
            (RenderBucket::Opaque, false)
        };
        let dispatched = SubMeshEntry {
            mesh: handle,
            sub_mesh_index,
            material,
            effect,
            alpha_index: mesh.alpha_index,
            distance_to_camera: sub_mesh.bounding_info.bounding_sphere.center_world.distance(eye),
        };
        self.rendering_manager
            .dispatch(mesh.rendering_group_id, dispatched, bucket, depth_pre_pass);
    }

    fn evaluate_particle_systems(&mut self, view: CameraView) {
        self.active_particle_systems.clear();
        if !self.config.particles_enabled {
            return;
        }
        let render_id = self.render_id;
        let delta_ms = self.last_delta_ms;

        for &handle in &self.particle_systems {
            let emitter = self
                .world
                .get::<&ParticleSystemEntry>(handle.0)
                .ok()
                .and_then(|entry| entry.emitter);
            if let Some(node) = emitter {
                if !is_enabled_in_hierarchy(&self.world, node.0) {
                    continue;
                }
            }
            let origin = emitter
                .map(|node| compute_world_matrix(&self.world, node.0, render_id).w_axis.truncate())
                .unwrap_or(Vec3::ZERO);

            let Ok(mut entry) = self.world.get::<&mut ParticleSystemEntry>(handle.0) else {
                continue;
            };
            if !entry.system.is_started() || !entry.system.is_ready() || entry.system.layer_mask() & view.layer_mask == 0 {
                continue;
            }
            if entry.last_animated_render_id != Some(render_id) {
                entry.system.animate(delta_ms, origin);
                entry.last_animated_render_id = Some(render_id);
            }
            self.counters.active_particles.add_count(entry.system.active_count() as f64, false);
            self.active_particle_systems.push(handle);
            self.rendering_manager
                .dispatch_particles(entry.system.rendering_group_id(), handle);
        }
    }
}

fn extents_of(boxes: impl IntoIterator<Item = (Vec3, Vec3)>) -> (Vec3, Vec3) {
    boxes
        .into_iter()
        .fold(None, |acc: Option<(Vec3, Vec3)>, (min, max)| match acc {
            Some((lo, hi)) => Some((lo.min(min), hi.max(max))),
            None => Some((min, max)),
        })
        .unwrap_or((Vec3::ZERO, Vec3::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::BasicMaterial;
    use crate::mesh::Geometry;
    use crate::particles::PointParticleSystem;
    use crate::scene::test_support::engine;

    fn setup() -> (Scene, crate::engine::Engine<crate::headless::RecordingDevice>) {
        let mut scene = Scene::default();
        scene.add_camera(Camera::new("cam", Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO));
        (scene, engine())
    }

    fn cube_at(name: &str, position: Vec3) -> Mesh {
        let mut mesh = Mesh::new(name).with_geometry(Geometry::cube(1.0));
        mesh.node.transform.position = position;
        mesh
    }

    #[test]
    fn culls_meshes_outside_the_frustum() {
        let (mut scene, mut engine) = setup();
        let visible = scene.add_mesh(cube_at("visible", Vec3::ZERO));
        scene.add_mesh(cube_at("behind", Vec3::new(0.0, 0.0, 50.0)));
        scene.render(&mut engine);
        assert_eq!(scene.active_meshes(), &[visible]);
        assert_eq!(scene.mesh(visible).unwrap().render_id(), Some(0));
    }

    #[test]
    fn always_selected_meshes_bypass_culling() {
        let (mut scene, mut engine) = setup();
        let mut behind = cube_at("behind", Vec3::new(0.0, 0.0, 50.0));
        behind.always_select_as_active_mesh = true;
        let behind = scene.add_mesh(behind);
        scene.render(&mut engine);
        assert_eq!(scene.active_meshes(), &[behind]);
    }

    #[test]
    fn skips_hidden_disabled_and_collapsed_meshes() {
        let (mut scene, mut engine) = setup();
        let mut hidden = cube_at("hidden", Vec3::ZERO);
        hidden.is_visible = false;
        let mut disabled = cube_at("disabled", Vec3::ZERO);
        disabled.node.enabled = false;
        let mut collapsed = cube_at("collapsed", Vec3::ZERO);
        collapsed.node.transform.scaling = Vec3::new(1.0, 0.0, 1.0);
        let mut faded = cube_at("faded", Vec3::ZERO);
        faded.visibility = 0.0;
        let mut other_layer = cube_at("other layer", Vec3::ZERO);
        other_layer.layer_mask = 0x1000_0000;
        for mesh in [hidden, disabled, collapsed, faded, other_layer] {
            scene.add_mesh(mesh);
        }

        scene.render(&mut engine);
        assert!(scene.active_meshes().is_empty());
        assert_eq!(scene.perf_counters().total_vertices.current(), 40.0);
    }

    #[test]
    fn mesh_without_submeshes_is_active_but_draws_nothing() {
        let (mut scene, mut engine) = setup();
        let empty = scene.add_mesh(Mesh::new("empty").with_bounds(Vec3::splat(-1.0), Vec3::splat(1.0)));
        scene.render(&mut engine);
        assert_eq!(scene.active_meshes(), &[empty]);
        assert!(scene.rendering_manager().groups().iter().all(|g| g.is_empty()));
        assert_eq!(engine.device().draw_count(), 0);
    }

    #[test]
    fn not_ready_material_keeps_mesh_active_without_dispatch() {
        let mut scene = Scene::default();
        scene.add_camera(Camera::new("cam", Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO));
        let mut engine = crate::engine::Engine::new(
            crate::headless::RecordingDevice::new().with_deferred_compilation(),
            crate::config::EngineOptions::default(),
        );
        let mesh = scene.add_mesh(cube_at("box", Vec3::ZERO));

        scene.render(&mut engine);
        assert_eq!(scene.active_meshes(), &[mesh]);
        assert!(scene.rendering_manager().group(0).unwrap().opaque().is_empty());
        assert_eq!(engine.device().draw_count(), 0);

        engine.device_mut().finish_compilation();
        scene.render(&mut engine);
        assert_eq!(scene.rendering_manager().group(0).unwrap().opaque().len(), 1);
        assert_eq!(engine.device().draw_count(), 1);
    }

    #[test]
    fn freeze_is_idempotent_and_ignores_new_meshes() {
        let (mut scene, mut engine) = setup();
        scene.add_mesh(cube_at("a", Vec3::ZERO));
        scene.freeze_active_meshes(&mut engine, false).unwrap();
        let frozen = scene.active_meshes().to_vec();

        let late = scene.add_mesh(cube_at("late", Vec3::ZERO));
        for _ in 0..3 {
            scene.render(&mut engine);
            assert_eq!(scene.active_meshes(), frozen.as_slice());
        }

        scene.unfreeze_active_meshes();
        scene.render(&mut engine);
        assert!(scene.active_meshes().contains(&late));
    }

    #[test]
    fn freeze_requires_a_camera() {
        let mut scene = Scene::default();
        let mut engine = engine();
        assert!(matches!(
            scene.freeze_active_meshes(&mut engine, false),
            Err(LumenError::NoActiveCamera)
        ));
        assert!(!scene.is_active_meshes_frozen());
    }

    #[test]
    fn removed_meshes_are_pruned_from_frozen_list() {
        let (mut scene, mut engine) = setup();
        let a = scene.add_mesh(cube_at("a", Vec3::ZERO));
        let b = scene.add_mesh(cube_at("b", Vec3::ZERO));
        scene.freeze_active_meshes(&mut engine, true).unwrap();
        scene.remove_mesh(a);
        scene.render(&mut engine);
        assert_eq!(scene.active_meshes(), &[b]);
    }

    #[test]
    fn octree_selection_matches_linear_scan() {
        let (mut scene, mut engine) = setup();
        let near = scene.add_mesh(cube_at("near", Vec3::ZERO));
        scene.add_mesh(cube_at("far behind", Vec3::new(0.0, 0.0, 80.0)));
        let side = scene.add_mesh(cube_at("side", Vec3::new(2.0, 0.0, 0.0)));

        scene.create_or_update_selection_octree(1, 2);
        scene.render(&mut engine);
        assert_eq!(scene.active_meshes(), &[near, side]);

        scene.remove_selection_octree();
        scene.render(&mut engine);
        assert_eq!(scene.active_meshes(), &[near, side]);
    }

    #[test]
    fn world_extends_cover_all_meshes() {
        let mut scene = Scene::default();
        assert_eq!(scene.get_world_extends(), (Vec3::ZERO, Vec3::ZERO));
        scene.add_mesh(cube_at("a", Vec3::new(-5.0, 0.0, 0.0)));
        scene.add_mesh(cube_at("b", Vec3::new(5.0, 2.0, 0.0)));
        let (min, max) = scene.get_world_extends();
        assert_eq!(min, Vec3::new(-5.5, -0.5, -0.5));
        assert_eq!(max, Vec3::new(5.5, 2.5, 0.5));
    }

    #[test]
    fn started_particle_systems_are_animated_once_per_frame() {
        let (mut scene, mut engine) = setup();
        let mut system = PointParticleSystem::new("sparks", 100);
        system.start();
        let handle = scene.add_particle_system(crate::particles::ParticleSystemEntry::new(system));
        scene.add_particle_system(crate::particles::ParticleSystemEntry::new(PointParticleSystem::new("idle", 10)));

        crate::scene::test_support::frame(&mut engine, 100);
        scene.render(&mut engine);
        assert_eq!(scene.active_particle_systems(), &[handle]);
        assert_eq!(scene.rendering_manager().group(0).unwrap().particles(), &[handle]);
    }

    #[test]
    fn material_buckets_follow_alpha() {
        let (mut scene, mut engine) = setup();
        let glass = scene.add_material(BasicMaterial::new("glass").with_alpha(0.5));
        let cutout = scene.add_material(BasicMaterial::new("cutout").with_alpha_test());
        scene.add_mesh(cube_at("solid", Vec3::ZERO));
        scene.add_mesh(cube_at("glass", Vec3::ZERO).with_material(glass));
        scene.add_mesh(cube_at("cutout", Vec3::ZERO).with_material(cutout));

        scene.render(&mut engine);
        let group = scene.rendering_manager().group(0).unwrap();
        assert_eq!(group.opaque().len(), 1);
        assert_eq!(group.transparent().len(), 1);
        assert_eq!(group.alpha_test().len(), 1);
    }
}
