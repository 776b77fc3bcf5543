//! Scene teardown

use super::Scene;
use crate::material::MaterialEntry;
use log::{debug, warn};
use std::cell::Cell;
use std::rc::Rc;

/// Handle that asks a scene to dispose itself once the current frame ends.
///
/// Observer callbacks cannot borrow the scene while `render()` runs, so they
/// keep one of these instead.
#[derive(Debug, Clone, Default)]
pub struct DisposeRequest(Rc<Cell<bool>>);

impl DisposeRequest {
    pub fn request(&self) {
        self.0.set(true);
    }

    pub fn is_requested(&self) -> bool {
        self.0.get()
    }
}

impl Scene {
    pub fn dispose_request(&self) -> DisposeRequest {
        self.dispose_request.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release every entity and observer. Later calls to `render` do nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        debug!("disposing scene {}", self.uid);
        self.observables.on_dispose.notify_observers(&());

        self.stop_all_animations();
        self.material_cache.reset();
        self.rendering_manager.reset();
        self.active_meshes.clear();
        self.active_particle_systems.clear();
        self.active_meshes_frozen = false;
        self.octree = None;

        for camera in self.cameras.clone() {
            self.remove_camera(camera);
        }
        for mesh in self.meshes.clone() {
            self.remove_mesh(mesh);
        }
        for light in self.lights.clone() {
            self.remove_light(light);
        }
        for node in self.transform_nodes.clone() {
            self.remove_transform_node(node);
        }
        for material in self.materials.clone() {
            if let Some(mut removed) = self.remove_material(material) {
                removed.value.material.dispose();
            }
        }
        if let Some(default) = self.default_material.take() {
            if let Ok(mut entry) = self.world.remove_one::<MaterialEntry>(default.0) {
                entry.material.dispose();
            }
            let _ = self.world.despawn(default.0);
        }
        for system in self.particle_systems.clone() {
            if let Some(mut removed) = self.remove_particle_system(system) {
                removed.value.system.dispose();
            }
        }
        for skeleton in self.skeletons.clone() {
            self.remove_skeleton(skeleton);
        }
        for texture in self.textures.clone() {
            self.remove_texture(texture);
        }
        self.sprite_managers.clear();

        if let Some(mut physics) = self.physics.take() {
            if let Err(e) = physics.shutdown() {
                warn!("physics system '{}' failed to shut down: {e}", physics.name());
            }
        }

        self.readiness.clear();
        self.texture_tokens.clear();
        self.observables.clear_all();
        self.world.clear();
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::material::BasicMaterial;
    use crate::mesh::{Geometry, Mesh};
    use crate::scene::test_support::engine;
    use glam::Vec3;
    use lumen_core::Result;
    use lumen_runtime::SimulationSystem;

    fn populated() -> Scene {
        let mut scene = Scene::default();
        scene.add_camera(Camera::new("cam", Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO));
        let material = scene.add_material(BasicMaterial::new("red"));
        scene.add_mesh(Mesh::new("box").with_geometry(Geometry::cube(1.0)).with_material(material));
        scene.add_mesh(Mesh::new("plain").with_geometry(Geometry::cube(1.0)));
        scene
    }

    #[test]
    fn dispose_releases_everything() {
        let mut scene = populated();
        let mut engine = engine();
        scene.render(&mut engine);

        let disposed = Rc::new(Cell::new(false));
        let flag = disposed.clone();
        scene.observables().on_dispose.add(move |_, _| flag.set(true));

        scene.dispose();
        assert!(disposed.get());
        assert!(scene.is_disposed());
        assert!(scene.meshes().is_empty());
        assert!(scene.cameras().is_empty());
        assert!(scene.materials().is_empty());
        assert!(scene.active_camera().is_none());
        assert!(scene.active_meshes().is_empty());
        assert_eq!(scene.world().len(), 0);
        assert!(!scene.observables().on_before_render.has_observers());
    }

    #[test]
    fn render_after_dispose_is_a_no_op() {
        let mut scene = populated();
        let mut engine = engine();
        scene.dispose();
        scene.render(&mut engine);
        assert_eq!(scene.render_id(), 0);
        assert_eq!(engine.device().draw_count(), 0);
    }

    #[test]
    fn observer_can_request_dispose_mid_frame() {
        let mut scene = populated();
        let mut engine = engine();
        let request = scene.dispose_request();
        scene
            .observables()
            .on_before_camera_render
            .add(move |_, _| request.request());

        scene.render(&mut engine);
        assert!(scene.is_disposed());
        assert_eq!(scene.render_id(), 1);
        assert_eq!(engine.device().draw_count(), 2);
    }

    struct Shutdown(Rc<Cell<bool>>);

    impl SimulationSystem for Shutdown {
        fn name(&self) -> &str {
            "shutdown"
        }

        fn fixed_update(&mut self, _dt: f64) -> Result<()> {
            Ok(())
        }

        fn shutdown(&mut self) -> Result<()> {
            self.0.set(true);
            Ok(())
        }
    }

    #[test]
    fn dispose_shuts_physics_down() {
        let mut scene = Scene::default();
        let shut = Rc::new(Cell::new(false));
        scene.set_physics(Box::new(Shutdown(shut.clone())));
        scene.dispose();
        assert!(shut.get());
        assert!(scene.physics().is_none());
    }
}
