//! Adding and removing entities

use super::Scene;
use crate::camera::Camera;
use crate::handle::{
    CameraHandle, LightHandle, MaterialHandle, MeshHandle, NodeHandle, ParticleSystemHandle, SkeletonHandle,
    TextureHandle, TransformNodeHandle,
};
use crate::light::{compare_lights_priority, Light};
use crate::material::{Material, MaterialEntry};
use crate::mesh::Mesh;
use crate::node::{Node, NodeKind, TransformNode};
use crate::particles::ParticleSystemEntry;
use crate::skeleton::Skeleton;
use crate::sprites::SpriteManager;
use crate::texture::{Texture, TextureLoadState};
use log::{debug, warn};
use lumen_core::{LumenError, Result};
use std::cmp::Ordering;

/// An entity taken out of the scene, with the registry index it had
#[derive(Debug)]
pub struct Removed<T> {
    pub index: usize,
    pub value: T,
}

fn take_from<H: PartialEq + Copy>(list: &mut Vec<H>, handle: H) -> Option<usize> {
    let index = list.iter().position(|h| *h == handle)?;
    list.remove(index);
    Some(index)
}

impl Scene {
    /// Unique ids are scene-assigned, so a copied entity still gets its own
    fn assign_node_id(&mut self, node: &mut Node) {
        node.unique_id = Some(self.unique_ids.next_id());
    }

    pub fn add_mesh(&mut self, mut mesh: Mesh) -> MeshHandle {
        self.assign_node_id(&mut mesh.node);
        let handle = MeshHandle(self.world.spawn((mesh, NodeKind::Mesh)));
        self.meshes.push(handle);
        self.observables.on_new_mesh_added.notify_observers(&handle);
        handle
    }

    pub fn remove_mesh(&mut self, handle: MeshHandle) -> Option<Removed<Mesh>> {
        let index = take_from(&mut self.meshes, handle)?;
        let mut mesh = self.world.remove_one::<Mesh>(handle.0).ok()?;
        let _ = self.world.despawn(handle.0);
        mesh.node.unique_id = None;

        self.active_meshes.retain(|m| *m != handle);
        self.rendering_manager.remove_mesh(handle);
        self.pointer.forget_mesh(handle);
        self.animations.stop_animation(&NodeHandle::from(handle), None);

        self.observables.on_mesh_removed.notify_observers(&handle);
        Some(Removed { index, value: mesh })
    }

    /// The first camera added becomes the active one
    pub fn add_camera(&mut self, mut camera: Camera) -> CameraHandle {
        self.assign_node_id(&mut camera.node);
        let handle = CameraHandle(self.world.spawn((camera, NodeKind::Camera)));
        self.cameras.push(handle);
        self.observables.on_new_camera_added.notify_observers(&handle);

        if self.active_camera.is_none() {
            self.active_camera = Some(handle);
            self.observables.on_active_camera_changed.notify_observers(&self.active_camera);
        }
        handle
    }

    pub fn remove_camera(&mut self, handle: CameraHandle) -> Option<Removed<Camera>> {
        let index = take_from(&mut self.cameras, handle)?;
        let mut camera = self.world.remove_one::<Camera>(handle.0).ok()?;
        let _ = self.world.despawn(handle.0);
        camera.node.unique_id = None;

        self.active_cameras.retain(|c| *c != handle);
        self.animations.stop_animation(&NodeHandle::from(handle), None);
        self.observables.on_camera_removed.notify_observers(&handle);

        if self.active_camera == Some(handle) {
            self.active_camera = None;
            self.observables.on_active_camera_changed.notify_observers(&None);
        }
        Some(Removed { index, value: camera })
    }

    pub fn active_camera(&self) -> Option<CameraHandle> {
        self.active_camera
    }

    /// Make `handle` the active camera; it must be registered in this scene
    pub fn switch_active_camera(&mut self, handle: CameraHandle) -> Result<()> {
        if !self.cameras.contains(&handle) {
            return Err(LumenError::StaleHandle(format!("{handle:?}")));
        }
        if self.active_camera != Some(handle) {
            self.active_camera = Some(handle);
            self.observables.on_active_camera_changed.notify_observers(&self.active_camera);
        }
        Ok(())
    }

    pub fn set_active_camera_by_id(&mut self, id: &str) -> Option<CameraHandle> {
        let handle = self.get_camera_by_id(id)?;
        self.switch_active_camera(handle).ok()?;
        Some(handle)
    }

    pub fn set_active_camera_by_name(&mut self, name: &str) -> Option<CameraHandle> {
        let handle = self.get_camera_by_name(name)?;
        self.switch_active_camera(handle).ok()?;
        Some(handle)
    }

    /// Cameras rendered each frame, in order; empty means "the active camera"
    pub fn active_cameras(&self) -> &[CameraHandle] {
        &self.active_cameras
    }

    /// Replace the multi-camera list. Handles not registered here are dropped.
    pub fn set_active_cameras(&mut self, cameras: Vec<CameraHandle>) {
        self.active_cameras = cameras
            .into_iter()
            .filter(|c| {
                let known = self.cameras.contains(c);
                if !known {
                    warn!("ignoring unregistered camera {c:?} in active camera list");
                }
                known
            })
            .collect();
    }

    pub fn add_light(&mut self, mut light: Light) -> LightHandle {
        self.assign_node_id(&mut light.node);
        let handle = LightHandle(self.world.spawn((light, NodeKind::Light)));
        self.lights.push(handle);
        if self.config.require_light_sorting {
            self.sort_lights_by_priority();
        }
        self.observables.on_new_light_added.notify_observers(&handle);
        handle
    }

    pub fn remove_light(&mut self, handle: LightHandle) -> Option<Removed<Light>> {
        let index = take_from(&mut self.lights, handle)?;
        let mut light = self.world.remove_one::<Light>(handle.0).ok()?;
        let _ = self.world.despawn(handle.0);
        light.node.unique_id = None;

        self.animations.stop_animation(&NodeHandle::from(handle), None);
        self.observables.on_light_removed.notify_observers(&handle);
        Some(Removed { index, value: light })
    }

    /// Shadow casters first, then descending render priority; ties keep insertion order
    pub fn sort_lights_by_priority(&mut self) {
        let world = &self.world;
        self.lights.sort_by(|a, b| match (world.get::<&Light>(a.0), world.get::<&Light>(b.0)) {
            (Ok(a), Ok(b)) => compare_lights_priority(&a, &b),
            _ => Ordering::Equal,
        });
    }

    pub fn add_transform_node(&mut self, mut node: TransformNode) -> TransformNodeHandle {
        self.assign_node_id(&mut node.node);
        let handle = TransformNodeHandle(self.world.spawn((node, NodeKind::TransformNode)));
        self.transform_nodes.push(handle);
        self.observables.on_new_transform_node_added.notify_observers(&handle);
        handle
    }

    pub fn remove_transform_node(&mut self, handle: TransformNodeHandle) -> Option<Removed<TransformNode>> {
        let index = take_from(&mut self.transform_nodes, handle)?;
        let mut node = self.world.remove_one::<TransformNode>(handle.0).ok()?;
        let _ = self.world.despawn(handle.0);
        node.node.unique_id = None;

        self.animations.stop_animation(&NodeHandle::from(handle), None);
        self.observables.on_transform_node_removed.notify_observers(&handle);
        Some(Removed { index, value: node })
    }

    pub fn add_material(&mut self, material: impl Material + 'static) -> MaterialHandle {
        self.add_material_entry(MaterialEntry::new(material))
    }

    pub fn add_material_entry(&mut self, mut entry: MaterialEntry) -> MaterialHandle {
        entry.unique_id = Some(self.unique_ids.next_id());
        let handle = MaterialHandle(self.world.spawn((entry,)));
        self.materials.push(handle);
        self.observables.on_new_material_added.notify_observers(&handle);
        handle
    }

    /// Meshes still pointing at a removed material draw with the default one
    pub fn remove_material(&mut self, handle: MaterialHandle) -> Option<Removed<MaterialEntry>> {
        let index = take_from(&mut self.materials, handle)?;
        let mut entry = self.world.remove_one::<MaterialEntry>(handle.0).ok()?;
        let _ = self.world.despawn(handle.0);
        entry.unique_id = None;

        if self.material_cache.material() == Some(handle) {
            self.material_cache.reset();
        }
        self.observables.on_material_removed.notify_observers(&handle);
        Some(Removed { index, value: entry })
    }

    /// A texture still loading holds the scene's readiness until it is marked loaded
    pub fn add_texture(&mut self, mut texture: Texture) -> TextureHandle {
        texture.unique_id = Some(self.unique_ids.next_id());
        let loading = texture.load_state() == TextureLoadState::Loading;
        let label = format!("texture:{}", texture.name);
        let handle = TextureHandle(self.world.spawn((texture,)));
        self.textures.push(handle);
        if loading {
            let token = self.add_pending_data(&label);
            self.texture_tokens.insert(handle, token);
        }
        self.observables.on_new_texture_added.notify_observers(&handle);
        handle
    }

    pub fn remove_texture(&mut self, handle: TextureHandle) -> Option<Removed<Texture>> {
        let index = take_from(&mut self.textures, handle)?;
        let mut texture = self.world.remove_one::<Texture>(handle.0).ok()?;
        let _ = self.world.despawn(handle.0);
        texture.unique_id = None;

        if let Some(token) = self.texture_tokens.remove(&handle) {
            self.remove_pending_data(&token);
        }
        self.observables.on_texture_removed.notify_observers(&handle);
        Some(Removed { index, value: texture })
    }

    /// Finish loading a texture and release its pending-data token
    pub fn mark_texture_loaded(&mut self, handle: TextureHandle) -> Result<()> {
        self.finish_texture(handle, TextureLoadState::Loaded)
    }

    /// A failed texture stops blocking readiness; materials decide how to cope
    pub fn mark_texture_failed(&mut self, handle: TextureHandle) -> Result<()> {
        warn!("texture {handle:?} failed to load");
        self.finish_texture(handle, TextureLoadState::Failed)
    }

    fn finish_texture(&mut self, handle: TextureHandle, state: TextureLoadState) -> Result<()> {
        self.texture_mut(handle)?.load_state = state;
        if let Some(token) = self.texture_tokens.remove(&handle) {
            self.remove_pending_data(&token);
        }
        Ok(())
    }

    pub fn add_skeleton(&mut self, mut skeleton: Skeleton) -> SkeletonHandle {
        skeleton.unique_id = Some(self.unique_ids.next_id());
        let handle = SkeletonHandle(self.world.spawn((skeleton,)));
        self.skeletons.push(handle);
        self.observables.on_new_skeleton_added.notify_observers(&handle);
        handle
    }

    pub fn remove_skeleton(&mut self, handle: SkeletonHandle) -> Option<Removed<Skeleton>> {
        let index = take_from(&mut self.skeletons, handle)?;
        let mut skeleton = self.world.remove_one::<Skeleton>(handle.0).ok()?;
        let _ = self.world.despawn(handle.0);
        skeleton.unique_id = None;
        self.observables.on_skeleton_removed.notify_observers(&handle);
        Some(Removed { index, value: skeleton })
    }

    pub fn add_particle_system(&mut self, mut entry: ParticleSystemEntry) -> ParticleSystemHandle {
        entry.unique_id = Some(self.unique_ids.next_id());
        let handle = ParticleSystemHandle(self.world.spawn((entry,)));
        self.particle_systems.push(handle);
        self.observables.on_new_particle_system_added.notify_observers(&handle);
        handle
    }

    pub fn remove_particle_system(&mut self, handle: ParticleSystemHandle) -> Option<Removed<ParticleSystemEntry>> {
        let index = take_from(&mut self.particle_systems, handle)?;
        let mut entry = self.world.remove_one::<ParticleSystemEntry>(handle.0).ok()?;
        let _ = self.world.despawn(handle.0);
        entry.unique_id = None;

        self.active_particle_systems.retain(|p| *p != handle);
        self.rendering_manager.remove_particle_system(handle);
        self.observables.on_particle_system_removed.notify_observers(&handle);
        Some(Removed { index, value: entry })
    }

    /// Returns the manager's index, used by sprite picking results
    pub fn add_sprite_manager(&mut self, manager: Box<dyn SpriteManager>) -> usize {
        debug!("adding sprite manager '{}'", manager.name());
        self.sprite_managers.push(manager);
        self.sprite_managers.len() - 1
    }

    /// Lazily created material for meshes without one; not part of the material registry
    pub fn default_material(&mut self) -> MaterialHandle {
        if let Some(handle) = self.default_material.filter(|h| self.world.contains(h.0)) {
            return handle;
        }
        let mut entry = MaterialEntry::new(crate::material::BasicMaterial::new("default material"));
        entry.unique_id = Some(self.unique_ids.next_id());
        let handle = MaterialHandle(self.world.spawn((entry,)));
        self.default_material = Some(handle);
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Geometry;
    use glam::Vec3;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn cube(name: &str) -> Mesh {
        Mesh::new(name).with_geometry(Geometry::cube(1.0))
    }

    #[test]
    fn add_remove_round_trip() {
        let mut scene = Scene::default();
        let a = scene.add_mesh(cube("a"));
        let c = scene.add_mesh(cube("c"));
        let before = scene.meshes().to_vec();

        let added = Rc::new(RefCell::new(Vec::new()));
        let removed = Rc::new(RefCell::new(Vec::new()));
        let log = added.clone();
        scene.observables().on_new_mesh_added.add(move |h, _| log.borrow_mut().push(*h));
        let log = removed.clone();
        scene.observables().on_mesh_removed.add(move |h, _| log.borrow_mut().push(*h));

        let b = scene.add_mesh(cube("b"));
        let taken = scene.remove_mesh(b).unwrap();
        assert_eq!(taken.index, 2);
        assert_eq!(taken.value.node.name, "b");
        assert!(taken.value.node.unique_id().is_none());

        assert_eq!(scene.meshes(), before.as_slice());
        assert_eq!(scene.meshes(), &[a, c]);
        assert_eq!(*added.borrow(), vec![b]);
        assert_eq!(*removed.borrow(), vec![b]);
    }

    #[test]
    fn particle_system_round_trip_notifies() {
        use crate::particles::PointParticleSystem;

        let mut scene = Scene::default();
        let added = Rc::new(RefCell::new(Vec::new()));
        let removed = Rc::new(RefCell::new(Vec::new()));
        let log = added.clone();
        scene
            .observables()
            .on_new_particle_system_added
            .add(move |h, _| log.borrow_mut().push(*h));
        let log = removed.clone();
        scene
            .observables()
            .on_particle_system_removed
            .add(move |h, _| log.borrow_mut().push(*h));

        let sparks = scene.add_particle_system(ParticleSystemEntry::new(PointParticleSystem::new("sparks", 8)));
        let smoke = scene.add_particle_system(ParticleSystemEntry::new(PointParticleSystem::new("smoke", 8)));
        let taken = scene.remove_particle_system(sparks).unwrap();
        assert_eq!(taken.index, 0);
        assert!(scene.remove_particle_system(sparks).is_none());

        assert_eq!(scene.particle_systems(), &[smoke]);
        assert_eq!(*added.borrow(), vec![sparks, smoke]);
        assert_eq!(*removed.borrow(), vec![sparks]);
    }

    #[test]
    fn removing_a_non_member_is_a_no_op() {
        let mut scene = Scene::default();
        let mesh = scene.add_mesh(cube("a"));
        assert!(scene.remove_mesh(mesh).is_some());
        assert!(scene.remove_mesh(mesh).is_none());
    }

    #[test]
    fn remove_keeps_order_of_the_rest() {
        let mut scene = Scene::default();
        let a = scene.add_mesh(cube("a"));
        let b = scene.add_mesh(cube("b"));
        let c = scene.add_mesh(cube("c"));
        assert_eq!(scene.remove_mesh(b).unwrap().index, 1);
        assert_eq!(scene.meshes(), &[a, c]);
    }

    #[test]
    fn unique_ids_never_repeat_across_re_adds() {
        let mut scene = Scene::default();
        let mut seen = Vec::new();
        let mut mesh = cube("a");
        for _ in 0..3 {
            let handle = scene.add_mesh(mesh);
            seen.push(scene.mesh(handle).unwrap().node.unique_id().unwrap());
            let camera = scene.add_camera(Camera::new("cam", Vec3::Z, Vec3::ZERO));
            seen.push(scene.camera(camera).unwrap().node.unique_id().unwrap());
            let material = scene.add_material(crate::material::BasicMaterial::new("m"));
            seen.push(scene.material(material).unwrap().unique_id.unwrap());
            mesh = scene.remove_mesh(handle).unwrap().value;
        }
        let mut deduped = seen.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), seen.len());
    }

    #[test]
    fn copied_mesh_gets_a_fresh_unique_id() {
        let mut scene = Scene::default();
        let first = scene.add_mesh(cube("a"));
        let copy = Mesh::clone(&scene.mesh(first).unwrap());
        let second = scene.add_mesh(copy);
        assert_ne!(
            scene.mesh(first).unwrap().node.unique_id(),
            scene.mesh(second).unwrap().node.unique_id()
        );
    }

    #[test]
    fn first_camera_becomes_active() {
        let mut scene = Scene::default();
        let changes = Rc::new(RefCell::new(Vec::new()));
        let log = changes.clone();
        scene.observables().on_active_camera_changed.add(move |c, _| log.borrow_mut().push(*c));

        let first = scene.add_camera(Camera::new("first", Vec3::Z, Vec3::ZERO));
        let second = scene.add_camera(Camera::new("second", Vec3::Z, Vec3::ZERO));
        assert_eq!(scene.active_camera(), Some(first));

        scene.switch_active_camera(second).unwrap();
        assert_eq!(scene.active_camera(), Some(second));
        assert_eq!(*changes.borrow(), vec![Some(first), Some(second)]);
    }

    #[test]
    fn removing_active_camera_clears_it() {
        let mut scene = Scene::default();
        let camera = scene.add_camera(Camera::new("cam", Vec3::Z, Vec3::ZERO));
        scene.set_active_cameras(vec![camera]);
        scene.remove_camera(camera);
        assert!(scene.active_camera().is_none());
        assert!(scene.active_cameras().is_empty());
        assert!(scene.switch_active_camera(camera).is_err());
    }

    #[test]
    fn active_camera_by_id_and_name() {
        let mut scene = Scene::default();
        scene.add_camera(Camera::new("main", Vec3::Z, Vec3::ZERO));
        let side = scene.add_camera(Camera::new("side", Vec3::X, Vec3::ZERO));
        assert_eq!(scene.set_active_camera_by_name("side"), Some(side));
        assert_eq!(scene.active_camera(), Some(side));
        assert_eq!(scene.set_active_camera_by_id("missing"), None);
        assert_eq!(scene.active_camera(), Some(side));
    }

    #[test]
    fn lights_sort_by_descending_priority() {
        let mut scene = Scene::default();
        let light1 = scene.add_light(Light::point("light1", Vec3::ZERO).with_priority(1));
        let light2 = scene.add_light(Light::point("light2", Vec3::ZERO).with_priority(5));
        assert_eq!(scene.lights(), &[light1, light2]);

        scene.sort_lights_by_priority();
        assert_eq!(scene.lights(), &[light2, light1]);
    }

    #[test]
    fn light_sorting_on_add_when_required() {
        let mut scene = Scene::default();
        scene.config.require_light_sorting = true;
        let low = scene.add_light(Light::point("low", Vec3::ZERO));
        let mut caster = Light::point("caster", Vec3::ZERO);
        caster.shadow_enabled = true;
        let caster = scene.add_light(caster);
        assert_eq!(scene.lights(), &[caster, low]);
    }

    #[test]
    fn loading_texture_holds_pending_data() {
        let mut scene = Scene::default();
        let texture = scene.add_texture(Texture::loading("albedo", "albedo.png"));
        assert!(scene.is_loading());
        scene.mark_texture_loaded(texture).unwrap();
        assert!(!scene.is_loading());
        assert!(scene.texture(texture).unwrap().is_ready());
    }

    #[test]
    fn default_material_is_created_once() {
        let mut scene = Scene::default();
        let first = scene.default_material();
        let second = scene.default_material();
        assert_eq!(first, second);
        assert!(scene.materials().is_empty());
    }
}
