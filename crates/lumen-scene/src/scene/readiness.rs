//! Pending data and the "everything can be drawn" check

use super::Scene;
use crate::device::GraphicsDevice;
use crate::engine::Engine;
use crate::material::prepare_sub_mesh;
use crate::mesh::Mesh;
use crate::node::is_enabled_in_hierarchy;
use crate::particles::ParticleSystemEntry;
use log::debug;
use lumen_runtime::ReadinessToken;

impl Scene {
    /// Hold readiness until the returned token is removed or resolved
    pub fn add_pending_data(&mut self, label: &str) -> ReadinessToken {
        self.readiness.add(label)
    }

    /// Release a pending item; fires `on_data_loaded` when nothing is left
    pub fn remove_pending_data(&mut self, token: &ReadinessToken) {
        if self.readiness.remove(token) {
            debug!("all pending data loaded");
            self.observables.on_data_loaded.notify_observers(&());
        }
    }

    pub fn pending_data_count(&self) -> usize {
        self.readiness.pending_count()
    }

    pub fn is_loading(&self) -> bool {
        !self.readiness.is_empty()
    }

    /// Queue `callback` for the first readiness check that passes.
    ///
    /// Never runs synchronously, even when the scene is already ready.
    pub fn execute_when_ready(&mut self, callback: impl FnOnce() + 'static) {
        self.readiness.defer(callback);
    }

    /// True when nothing is pending and every enabled mesh, material and
    /// particle system can be drawn. Compiles effects that are not built yet.
    pub fn is_ready<D: GraphicsDevice>(&mut self, engine: &mut Engine<D>) -> bool {
        self.is_ready_on(engine.device_mut())
    }

    /// Run the readiness check; when it passes fire `on_ready` and flush
    /// the callbacks queued by `execute_when_ready`
    pub fn check_is_ready<D: GraphicsDevice>(&mut self, engine: &mut Engine<D>) -> bool {
        if !self.is_ready_on(engine.device_mut()) {
            return false;
        }
        self.observables.on_ready.notify_observers(&());
        for callback in self.readiness.take_deferred() {
            callback();
        }
        true
    }

    fn is_ready_on(&mut self, device: &mut dyn GraphicsDevice) -> bool {
        if self.disposed {
            return false;
        }
        if self.readiness.poll() {
            self.observables.on_data_loaded.notify_observers(&());
        }
        if !self.readiness.is_empty() {
            return false;
        }

        for handle in self.meshes.clone() {
            if !is_enabled_in_hierarchy(&self.world, handle.0) {
                continue;
            }
            let Some((ready, material, sub_mesh_count)) = self
                .world
                .get::<&Mesh>(handle.0)
                .ok()
                .map(|m| (m.is_ready(), m.material, m.sub_meshes.len()))
            else {
                continue;
            };
            if sub_mesh_count == 0 {
                continue;
            }
            if !ready {
                return false;
            }
            let material = self.effective_material(material);
            let all_ready = (0..sub_mesh_count)
                .all(|index| prepare_sub_mesh(&self.world, device, handle, index, material, false).is_some());
            if !all_ready {
                return false;
            }
        }

        self.particle_systems.iter().all(|handle| {
            self.world
                .get::<&ParticleSystemEntry>(handle.0)
                .map_or(true, |entry| entry.system.is_ready())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::RecordingDevice;
    use crate::material::BasicMaterial;
    use crate::mesh::{DelayLoadState, Geometry};
    use crate::scene::test_support::engine;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn callback_waits_for_pending_data() {
        let mut scene = Scene::default();
        let mut engine = engine();
        let token = scene.add_pending_data("level.bin");
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        scene.execute_when_ready(move || flag.set(true));

        scene.render(&mut engine);
        assert!(!fired.get());

        scene.remove_pending_data(&token);
        assert!(!fired.get(), "must not run inside the removal");
        scene.render(&mut engine);
        assert!(fired.get());
    }

    #[test]
    fn already_ready_still_defers() {
        let mut scene = Scene::default();
        let mut engine = engine();
        let fired = Rc::new(Cell::new(0));
        let count = fired.clone();
        scene.execute_when_ready(move || count.set(count.get() + 1));
        assert_eq!(fired.get(), 0);

        assert!(scene.check_is_ready(&mut engine));
        assert_eq!(fired.get(), 1);
        scene.check_is_ready(&mut engine);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn resolved_tokens_are_collected() {
        let mut scene = Scene::default();
        let mut engine = engine();
        let loaded = Rc::new(Cell::new(0));
        let count = loaded.clone();
        scene.observables().on_data_loaded.add(move |_, _| count.set(count.get() + 1));

        let token = scene.add_pending_data("sound");
        assert!(!scene.is_ready(&mut engine));
        token.resolve();
        assert!(scene.is_ready(&mut engine));
        assert_eq!(loaded.get(), 1);
        assert_eq!(scene.pending_data_count(), 0);
    }

    #[test]
    fn uncompiled_materials_block_readiness() {
        let mut scene = Scene::default();
        let mut engine = Engine::new(
            RecordingDevice::new().with_deferred_compilation(),
            crate::config::EngineOptions::default(),
        );
        let material = scene.add_material(BasicMaterial::new("slow"));
        scene.add_mesh(Mesh::new("box").with_geometry(Geometry::cube(1.0)).with_material(material));

        assert!(!scene.is_ready(&mut engine));
        engine.device_mut().finish_compilation();
        assert!(scene.is_ready(&mut engine));
    }

    #[test]
    fn delay_loaded_meshes_block_readiness() {
        let mut scene = Scene::default();
        let mut engine = engine();
        let mut mesh = Mesh::new("streamed").with_geometry(Geometry::cube(1.0));
        mesh.delay_load_state = DelayLoadState::Loading;
        let mesh = scene.add_mesh(mesh);

        assert!(!scene.is_ready(&mut engine));
        scene.mesh_mut(mesh).unwrap().delay_load_state = DelayLoadState::Loaded;
        assert!(scene.is_ready(&mut engine));
    }

    #[test]
    fn on_ready_fires_from_render_when_callbacks_wait() {
        let mut scene = Scene::default();
        let mut engine = engine();
        let ready = Rc::new(Cell::new(0));
        let count = ready.clone();
        scene.observables().on_ready.add(move |_, _| count.set(count.get() + 1));
        scene.execute_when_ready(|| {});

        scene.render(&mut engine);
        scene.render(&mut engine);
        assert_eq!(ready.get(), 1);
    }
}
