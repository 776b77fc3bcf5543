//! Picking meshes and sprites, and the pointer events built on it

use super::Scene;
use crate::camera::Camera;
use crate::device::GraphicsDevice;
use crate::engine::Engine;
use crate::handle::{CameraHandle, MeshHandle};
use crate::mesh::Mesh;
use crate::node::{current_world_matrix, is_enabled_in_hierarchy};
use crate::picking::{PickingInfo, Ray};
use crate::pointer::{PointerEventKind, PointerInfo};
use crate::sprites::Sprite;
use glam::{Mat4, Vec3};
use log::debug;
use lumen_core::{LumenError, Result};

/// Mesh filter used by the pick calls
pub type MeshPredicate<'a> = &'a dyn Fn(MeshHandle, &Mesh) -> bool;

fn default_pick_predicate(world: &hecs::World, handle: MeshHandle, mesh: &Mesh) -> bool {
    mesh.is_visible && mesh.is_pickable && is_enabled_in_hierarchy(world, handle.0)
}

impl Scene {
    /// World-space ray through pixel (`x`, `y`) of the host surface.
    ///
    /// `world` re-expresses the ray in another space; `camera` defaults to the active one.
    pub fn create_picking_ray<D: GraphicsDevice>(
        &self,
        engine: &Engine<D>,
        x: f32,
        y: f32,
        world: Option<&Mat4>,
        camera: Option<CameraHandle>,
    ) -> Result<Ray> {
        self.picking_ray(engine, x, y, world, camera, false)
    }

    /// Same as `create_picking_ray`, but with the camera at the origin looking down its own axis
    pub fn create_picking_ray_in_camera_space<D: GraphicsDevice>(
        &self,
        engine: &Engine<D>,
        x: f32,
        y: f32,
        camera: Option<CameraHandle>,
    ) -> Result<Ray> {
        self.picking_ray(engine, x, y, None, camera, true)
    }

    fn picking_ray<D: GraphicsDevice>(
        &self,
        engine: &Engine<D>,
        x: f32,
        y: f32,
        world: Option<&Mat4>,
        camera: Option<CameraHandle>,
        camera_space: bool,
    ) -> Result<Ray> {
        let camera = camera.or(self.active_camera).ok_or(LumenError::NoActiveCamera)?;
        let eye = current_world_matrix(&self.world, camera.0).w_axis.truncate();
        let (width, height) = engine.render_size();
        let scale = engine.options().hardware_scaling_level.max(0.01);

        let (viewport, view, projection) = {
            let camera = self.camera(camera)?;
            let viewport = camera.viewport.to_global(width, height);
            let aspect = if viewport.height > 0.0 { viewport.width / viewport.height } else { 1.0 };
            let view = if camera_space { Mat4::IDENTITY } else { camera.compute_view_matrix(eye) };
            (viewport, view, camera.compute_projection_matrix(aspect))
        };

        let x = x / scale - viewport.x;
        let y = y / scale - (height as f32 - viewport.y - viewport.height);
        Ok(Ray::from_screen(
            x,
            y,
            viewport.width,
            viewport.height,
            world.unwrap_or(&Mat4::IDENTITY),
            &view,
            &projection,
        ))
    }

    /// Nearest mesh under pixel (`x`, `y`).
    ///
    /// Without a camera the result is a miss. The default predicate keeps
    /// enabled, visible, pickable meshes.
    pub fn pick<D: GraphicsDevice>(
        &self,
        engine: &Engine<D>,
        x: f32,
        y: f32,
        predicate: Option<MeshPredicate<'_>>,
        fast_check: bool,
        camera: Option<CameraHandle>,
    ) -> PickingInfo {
        match self.create_picking_ray(engine, x, y, None, camera) {
            Ok(ray) => self.pick_with_ray(&ray, predicate, fast_check),
            Err(e) => {
                debug!("pick at ({x}, {y}) skipped: {e}");
                PickingInfo::default()
            }
        }
    }

    /// Nearest hit along `ray`; with `fast_check` the first bounding-box hit
    pub fn pick_with_ray(&self, ray: &Ray, predicate: Option<MeshPredicate<'_>>, fast_check: bool) -> PickingInfo {
        let mut best: Option<PickingInfo> = None;
        for handle in self.pick_candidates(predicate) {
            let Some(info) = self.intersect_mesh(handle, ray, fast_check) else {
                continue;
            };
            if fast_check {
                return info;
            }
            if best.as_ref().map_or(true, |b| info.distance < b.distance) {
                best = Some(info);
            }
        }
        best.unwrap_or_else(|| PickingInfo::miss(*ray))
    }

    /// Every mesh under pixel (`x`, `y`), nearest first
    pub fn multi_pick<D: GraphicsDevice>(
        &self,
        engine: &Engine<D>,
        x: f32,
        y: f32,
        predicate: Option<MeshPredicate<'_>>,
        camera: Option<CameraHandle>,
    ) -> Vec<PickingInfo> {
        match self.create_picking_ray(engine, x, y, None, camera) {
            Ok(ray) => self.multi_pick_with_ray(&ray, predicate),
            Err(e) => {
                debug!("multi pick at ({x}, {y}) skipped: {e}");
                Vec::new()
            }
        }
    }

    pub fn multi_pick_with_ray(&self, ray: &Ray, predicate: Option<MeshPredicate<'_>>) -> Vec<PickingInfo> {
        let mut hits: Vec<PickingInfo> = self
            .pick_candidates(predicate)
            .into_iter()
            .filter_map(|handle| self.intersect_mesh(handle, ray, false))
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Nearest sprite under pixel (`x`, `y`) across every pickable sprite manager
    pub fn pick_sprite<D: GraphicsDevice>(
        &self,
        engine: &Engine<D>,
        x: f32,
        y: f32,
        predicate: Option<&dyn Fn(&Sprite) -> bool>,
        fast_check: bool,
        camera: Option<CameraHandle>,
    ) -> PickingInfo {
        let Ok(ray) = self.create_picking_ray(engine, x, y, None, camera) else {
            return PickingInfo::default();
        };
        let layer_mask = camera
            .or(self.active_camera)
            .and_then(|c| self.world.get::<&Camera>(c.0).ok().map(|c| c.layer_mask))
            .unwrap_or(u32::MAX);
        let accept_all = |_: &Sprite| true;
        let predicate = predicate.unwrap_or(&accept_all);

        let mut best = PickingInfo::miss(ray);
        for (manager_index, manager) in self.sprite_managers.iter().enumerate() {
            if !manager.is_pickable() || manager.layer_mask() & layer_mask == 0 {
                continue;
            }
            let Some(hit) = manager.intersects(&ray, predicate, fast_check) else {
                continue;
            };
            if best.hit && hit.distance >= best.distance {
                continue;
            }
            best = PickingInfo {
                hit: true,
                distance: hit.distance,
                picked_point: Some(hit.point),
                picked_sprite: Some((manager_index, hit.sprite_index)),
                ray: Some(ray),
                ..PickingInfo::default()
            };
            if fast_check {
                break;
            }
        }
        best
    }

    /// Face normal of a triangle hit, in world space or mesh space
    pub fn get_normal(&self, info: &PickingInfo, use_world_coordinates: bool) -> Option<Vec3> {
        let handle = info.picked_mesh.filter(|_| info.hit && info.face_id >= 0)?;
        let mesh = self.world.get::<&Mesh>(handle.0).ok()?;
        let geometry = mesh.geometry.as_ref()?;
        let sub_mesh = mesh.sub_meshes.get(info.sub_mesh_id)?;
        let first = sub_mesh.index_start + info.face_id as usize * 3;
        let corners = geometry.indices.get(first..first + 3)?;
        let [v0, v1, v2] = [corners[0], corners[1], corners[2]].map(|i| geometry.positions.get(i as usize).copied());
        let normal = (v1? - v0?).cross(v2? - v0?).try_normalize()?;
        drop(mesh);

        if !use_world_coordinates {
            return Some(normal);
        }
        let normal_matrix = current_world_matrix(&self.world, handle.0).inverse().transpose();
        normal_matrix.transform_vector3(normal).try_normalize()
    }

    pub fn simulate_pointer_move(&mut self, pick_info: PickingInfo) {
        self.pointer.on_move(&pick_info);
        self.notify_pointer(PointerEventKind::Move, pick_info);
    }

    pub fn simulate_pointer_down(&mut self, pick_info: PickingInfo) {
        self.pointer.on_down(&pick_info);
        self.notify_pointer(PointerEventKind::Down, pick_info);
    }

    /// Release the pointer; a release on the pressed mesh also raises a tap
    pub fn simulate_pointer_up(&mut self, pick_info: PickingInfo) {
        let tapped = self.pointer.on_up(&pick_info);
        if tapped {
            self.notify_pointer(PointerEventKind::Up, pick_info.clone());
            self.notify_pointer(PointerEventKind::Tap, pick_info);
        } else {
            self.notify_pointer(PointerEventKind::Up, pick_info);
        }
    }

    fn notify_pointer(&self, kind: PointerEventKind, pick_info: PickingInfo) {
        self.observables
            .on_pointer
            .notify_observers(&PointerInfo { kind, pick_info });
    }

    fn pick_candidates(&self, predicate: Option<MeshPredicate<'_>>) -> Vec<MeshHandle> {
        self.meshes
            .iter()
            .copied()
            .filter(|&handle| {
                self.world.get::<&Mesh>(handle.0).is_ok_and(|mesh| match predicate {
                    Some(predicate) => predicate(handle, &*mesh),
                    None => default_pick_predicate(&self.world, handle, &*mesh),
                })
            })
            .collect()
    }

    /// Hit test in mesh space so bounds and triangles need no transforming
    fn intersect_mesh(&self, handle: MeshHandle, ray: &Ray, fast_check: bool) -> Option<PickingInfo> {
        let world = current_world_matrix(&self.world, handle.0);
        let local = ray.transform(&world.inverse());
        let mesh = self.world.get::<&Mesh>(handle.0).ok()?;

        let bounds = mesh.bounding_info();
        if !local.intersects_sphere(bounds.bounding_sphere.center, bounds.bounding_sphere.radius) {
            return None;
        }
        let box_distance =
            local.intersects_box(bounds.bounding_box.minimum, bounds.bounding_box.maximum)?;

        let hit = |distance: f32, sub_mesh_id: usize, face_id: i64, bu: f32, bv: f32| PickingInfo {
            hit: true,
            distance,
            picked_point: Some(ray.at(distance)),
            picked_mesh: Some(handle),
            sub_mesh_id,
            face_id,
            bu,
            bv,
            ray: Some(*ray),
            picked_sprite: None,
        };

        let geometry = match &mesh.geometry {
            Some(geometry) if !fast_check && !geometry.indices.is_empty() => geometry,
            _ => return Some(hit(box_distance, 0, -1, 0.0, 0.0)),
        };

        let mut nearest: Option<PickingInfo> = None;
        for (sub_mesh_id, sub_mesh) in mesh.sub_meshes.iter().enumerate() {
            let end = (sub_mesh.index_start + sub_mesh.index_count).min(geometry.indices.len());
            let Some(indices) = geometry.indices.get(sub_mesh.index_start..end) else {
                continue;
            };
            for (face_id, face) in indices.chunks_exact(3).enumerate() {
                let corner = |i: usize| geometry.positions.get(face[i] as usize).copied();
                let (Some(v0), Some(v1), Some(v2)) = (corner(0), corner(1), corner(2)) else {
                    continue;
                };
                let Some(triangle) = local.intersects_triangle(v0, v1, v2) else {
                    continue;
                };
                if nearest.as_ref().map_or(true, |n| triangle.distance < n.distance) {
                    nearest = Some(hit(triangle.distance, sub_mesh_id, face_id as i64, triangle.bu, triangle.bv));
                }
            }
        }
        nearest
    }
}
