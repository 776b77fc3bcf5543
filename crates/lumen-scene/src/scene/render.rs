//! One frame: animation and stepping, then per-camera evaluation and drawing

use super::{PerfCounters, Scene};
use crate::camera::Camera;
use crate::device::{AlphaMode, GraphicsDevice, PrimitiveType};
use crate::engine::Engine;
use crate::handle::{CameraHandle, ParticleSystemHandle};
use crate::material::{MaterialBindContext, MaterialEntry};
use crate::mesh::Mesh;
use crate::observables::{CameraRenderInfo, FrameInfo, RenderingGroupInfo, SceneObservables, StepInfo};
use crate::particles::ParticleSystemEntry;
use crate::rendering::{DrawPass, MaterialCache, SubMeshDrawer, SubMeshEntry};
use hecs::World;
use log::{trace, warn};
use lumen_core::LumenError;
use lumen_runtime::RenderPhase;

/// Frame delta used when the scene runs on a constant animation step
const CONSTANT_DELTA_MS: f64 = 16.0;

/// Submits the sorted buckets to the device, eliding redundant material binds
struct FrameDrawer<'a> {
    world: &'a World,
    device: &'a mut dyn GraphicsDevice,
    cache: &'a mut MaterialCache,
    observables: &'a SceneObservables,
    counters: &'a mut PerfCounters,
    camera: CameraHandle,
}

impl FrameDrawer<'_> {
    fn group_info(&self, group_id: usize) -> RenderingGroupInfo {
        RenderingGroupInfo {
            rendering_group_id: group_id,
            camera: Some(self.camera),
        }
    }
}

impl SubMeshDrawer for FrameDrawer<'_> {
    fn draw_sub_mesh(&mut self, entry: &SubMeshEntry, pass: DrawPass) {
        let Ok(mesh) = self.world.get::<&Mesh>(entry.mesh.0) else {
            return;
        };
        let Some(sub_mesh) = mesh.sub_meshes.get(entry.sub_mesh_index) else {
            return;
        };
        let Ok(mut material_entry) = self.world.get::<&mut MaterialEntry>(entry.material.0) else {
            return;
        };
        let material = &mut material_entry.material;
        let effect = entry.effect;
        if !self.device.is_effect_ready(effect) {
            return;
        }

        if pass == DrawPass::Transparent {
            self.device.set_alpha_mode(material.alpha_mode());
        }

        let world_matrix = mesh.node.world_matrix();
        if self.cache.is_invalid(entry.material, effect, mesh.visibility) {
            let context = MaterialBindContext {
                world: world_matrix,
                mesh: &mesh,
                sub_mesh_index: entry.sub_mesh_index,
                effect,
            };
            if let Err(e) = material.bind(self.device, &context) {
                warn!(
                    "skipping submesh {} of '{}': {e}",
                    entry.sub_mesh_index, mesh.node.name
                );
                self.cache.reset();
                return;
            }
            self.cache.set(entry.material, effect, mesh.visibility);
        } else {
            material.bind_only_world_matrix(self.device, &world_matrix);
        }

        match &mesh.geometry {
            Some(geometry) if !geometry.indices.is_empty() => {
                self.device
                    .draw_indexed(PrimitiveType::Triangles, sub_mesh.index_start, sub_mesh.index_count)
            }
            Some(_) => self
                .device
                .draw_arrays(PrimitiveType::Triangles, sub_mesh.vertex_start, sub_mesh.vertex_count),
            None => return,
        }
        self.counters.draw_calls.add_count(1.0, false);
    }

    fn draw_particles(&mut self, group_id: usize, systems: &[ParticleSystemHandle]) {
        let info = self.group_info(group_id);
        self.observables.on_before_particles_rendering.notify_observers(&info);
        for handle in systems {
            if let Ok(mut entry) = self.world.get::<&mut ParticleSystemEntry>(handle.0) {
                let draws = entry.system.render(self.device);
                self.counters.draw_calls.add_count(draws as f64, false);
            }
        }
        // particle effects replace whatever material was bound
        self.cache.reset();
        self.observables.on_after_particles_rendering.notify_observers(&info);
    }

    fn set_color_write(&mut self, enabled: bool) {
        self.device.set_color_write(enabled);
    }

    fn set_alpha_mode(&mut self, mode: AlphaMode) {
        self.device.set_alpha_mode(mode);
    }

    fn clear_depth_stencil(&mut self, depth: bool, stencil: bool) {
        self.device.clear(None, depth, stencil);
    }

    fn before_rendering_group(&mut self, group_id: usize) {
        let info = self.group_info(group_id);
        self.observables
            .on_before_rendering_group
            .notify_observers_with_mask(&info, 1u32 << group_id);
    }

    fn after_rendering_group(&mut self, group_id: usize) {
        let info = self.group_info(group_id);
        self.observables
            .on_after_rendering_group
            .notify_observers_with_mask(&info, 1u32 << group_id);
    }
}

impl Scene {
    /// Render one frame with every active camera.
    ///
    /// Never fails: per-entity problems are logged and skipped, and a lost
    /// device is reported through `on_error` with the frame skipped.
    pub fn render<D: GraphicsDevice>(&mut self, engine: &mut Engine<D>) {
        if self.disposed {
            return;
        }
        if engine.device().is_context_lost() {
            if !self.device_lost_reported {
                warn!("graphics device lost, skipping frames until it is restored");
                self.observables.on_error.notify_observers(&LumenError::DeviceLost);
                self.device_lost_reported = true;
            }
            return;
        }
        self.device_lost_reported = false;
        self.counters.frame_time.begin_monitoring();

        self.phase = RenderPhase::PreparingFrame;
        if self.readiness.poll() {
            self.observables.on_data_loaded.notify_observers(&());
        }
        if self.readiness.has_deferred() {
            self.check_is_ready(engine);
        }
        self.frame_id += 1;
        self.counters.fetch_new_frame();
        self.material_cache.reset();

        let delta_ms = self.frame_delta_ms(engine.delta_time_ms());
        self.last_delta_ms = delta_ms;
        self.animation_ratio = delta_ms * self.config.default_frame_rate / 1000.0;
        let frame = self.frame_info(delta_ms);
        self.observables.on_before_render.notify_observers(&frame);

        self.phase = RenderPhase::Animating;
        self.observables.on_before_animations.notify_observers(&frame);
        self.phase = RenderPhase::Stepping;
        if engine.is_deterministic_lockstep() {
            self.run_lockstep(engine, delta_ms);
        } else {
            self.animate(delta_ms * self.config.animation_time_scale);
            self.observables.on_after_animations.notify_observers(&self.frame_info(delta_ms));
            self.step_physics(delta_ms / 1000.0, false);
        }

        self.phase = RenderPhase::PerCameraRendering;
        self.counters.render_time.begin_monitoring();
        let cameras = if self.active_cameras.is_empty() {
            self.active_camera.into_iter().collect()
        } else {
            self.active_cameras.clone()
        };
        if cameras.is_empty() {
            warn!("no camera defined, nothing rendered");
        }
        for camera in cameras {
            self.render_for_camera(camera, engine);
        }
        self.counters.render_time.end_monitoring(true);

        self.phase = RenderPhase::Done;
        self.observables.on_after_render.notify_observers(&self.frame_info(delta_ms));
        self.render_id += 1;
        self.counters.fold_counts();
        self.counters.frame_time.end_monitoring(true);
        trace!(
            "frame {} done: {} draw calls, {} active meshes",
            self.frame_id,
            self.counters.draw_calls.current(),
            self.counters.active_meshes.current()
        );
        self.phase = RenderPhase::Idle;

        if self.dispose_request.is_requested() {
            self.dispose();
        }
    }

    fn frame_delta_ms(&self, measured_ms: f64) -> f64 {
        if self.config.use_constant_animation_delta_time {
            CONSTANT_DELTA_MS
        } else {
            measured_ms.clamp(self.config.min_delta_time_ms, self.config.max_delta_time_ms)
        }
    }

    fn frame_info(&self, delta_ms: f64) -> FrameInfo {
        FrameInfo {
            frame_id: self.frame_id,
            render_id: self.render_id,
            delta_time_ms: delta_ms,
            animation_ratio: self.animation_ratio,
        }
    }

    /// Fixed steps for this frame's delta; the remainder waits in the accumulator
    fn run_lockstep<D: GraphicsDevice>(&mut self, engine: &Engine<D>, delta_ms: f64) {
        self.stepper.time_step = engine.time_step();
        self.stepper.max_steps = engine.lockstep_max_steps();
        let time_step = self.stepper.time_step;
        let steps = self.stepper.accumulate(delta_ms / 1000.0);

        for _ in 0..steps {
            let step = StepInfo {
                step_id: self.stepper.current_step_id(),
                internal_step: self.stepper.current_internal_step(),
                time_step,
            };
            self.observables.on_before_step.notify_observers(&step);
            self.animation_ratio = time_step * self.config.default_frame_rate;
            self.animate(time_step * 1000.0 * self.config.animation_time_scale);
            self.observables.on_after_animations.notify_observers(&self.frame_info(delta_ms));
            self.step_physics(time_step, true);
            self.observables.on_after_step.notify_observers(&step);
            self.stepper.complete_step();
        }
    }

    fn step_physics(&mut self, dt: f64, fixed: bool) {
        if !self.config.physics_enabled {
            return;
        }
        let Some(physics) = self.physics.as_mut() else {
            return;
        };
        let result = if fixed { physics.fixed_update(dt) } else { physics.update(dt) };
        if let Err(e) = result {
            warn!("physics system '{}' failed to step: {e}", physics.name());
        }
    }

    fn render_for_camera<D: GraphicsDevice>(&mut self, camera: CameraHandle, engine: &mut Engine<D>) {
        let Ok(viewport) = self.world.get::<&Camera>(camera.0).map(|c| c.viewport) else {
            warn!("skipping stale camera {camera:?}");
            return;
        };
        let info = CameraRenderInfo {
            camera,
            render_id: self.render_id,
        };
        let (width, height) = engine.render_size();
        let device = engine.device_mut();

        device.set_viewport(viewport.to_global(width, height));
        self.material_cache.reset();
        self.update_transform_for_camera(camera, device, (width, height), false);
        self.observables.on_before_camera_render.notify_observers(&info);
        self.counters.camera_render_time.begin_monitoring();

        self.evaluate_active_meshes(camera, device);

        self.observables.on_before_draw_phase.notify_observers(&info);
        let clear_color = self.config.auto_clear.then_some(self.config.clear_color);
        let clear_depth = self.config.auto_clear_depth_and_stencil;
        if clear_color.is_some() || clear_depth {
            device.clear(clear_color, clear_depth, clear_depth);
        }

        let Self {
            world,
            rendering_manager,
            material_cache,
            observables,
            counters,
            ..
        } = self;
        let mut drawer = FrameDrawer {
            world,
            device,
            cache: material_cache,
            observables,
            counters,
            camera,
        };
        rendering_manager.render(&mut drawer);

        self.observables.on_after_draw_phase.notify_observers(&info);
        self.counters.camera_render_time.end_monitoring(false);
        self.observables.on_after_camera_render.notify_observers(&info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineOptions;
    use crate::headless::{DeviceCommand, RecordingDevice};
    use crate::material::BasicMaterial;
    use crate::mesh::Geometry;
    use crate::scene::test_support::{engine, frame};
    use glam::Vec3;
    use lumen_core::Result;
    use lumen_runtime::SimulationSystem;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn cube(name: &str) -> Mesh {
        Mesh::new(name).with_geometry(Geometry::cube(1.0))
    }

    fn camera() -> Camera {
        Camera::new("cam", Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO)
    }

    fn record(log: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> impl FnMut(&FrameInfo, &mut lumen_runtime::EventState) {
        let log = log.clone();
        move |_, _| log.borrow_mut().push(label)
    }

    #[test]
    fn single_mesh_frame() {
        let mut scene = Scene::default();
        let mut engine = engine();
        scene.add_camera(camera());
        let mesh = scene.add_mesh(cube("box"));

        let order = Rc::new(RefCell::new(Vec::new()));
        scene.observables().on_before_render.add(record(&order, "before"));
        scene.observables().on_after_render.add(record(&order, "after"));

        let before = scene.render_id();
        scene.render(&mut engine);
        assert_eq!(scene.render_id(), before + 1);
        assert_eq!(scene.active_meshes(), &[mesh]);
        assert_eq!(*order.borrow(), vec!["before", "after"]);
        assert_eq!(engine.device().draw_count(), 1);
        assert_eq!(scene.phase(), RenderPhase::Idle);
    }

    #[test]
    fn opaque_then_transparent() {
        let mut scene = Scene::default();
        let mut engine = engine();
        scene.add_camera(camera());
        let solid = scene.add_material(BasicMaterial::new("solid"));
        let glass = scene.add_material(BasicMaterial::new("glass").with_alpha(0.5));
        let glass_mesh = scene.add_mesh(cube("glass").with_material(glass));
        let solid_mesh = scene.add_mesh(cube("solid").with_material(solid));

        scene.render(&mut engine);

        let group = scene.rendering_manager().group(0).unwrap();
        assert_eq!(group.opaque().iter().map(|e| e.mesh).collect::<Vec<_>>(), vec![solid_mesh]);
        assert_eq!(group.transparent().iter().map(|e| e.mesh).collect::<Vec<_>>(), vec![glass_mesh]);
        assert_eq!(engine.device().drawn_effect_names(), vec!["solid".to_string(), "glass".to_string()]);
    }

    #[test]
    fn render_id_is_strictly_increasing() {
        let mut scene = Scene::default();
        let mut engine = engine();
        scene.add_camera(camera());
        scene.add_mesh(cube("box"));
        let mut last = scene.render_id();
        for _ in 0..5 {
            frame(&mut engine, 16);
            scene.render(&mut engine);
            assert!(scene.render_id() > last);
            last = scene.render_id();
        }
    }

    #[test]
    fn empty_scene_still_fires_and_advances() {
        let mut scene = Scene::default();
        let mut engine = engine();
        let fired = Rc::new(Cell::new(0));
        let count = fired.clone();
        scene.observables().on_before_render.add(move |_, _| count.set(count.get() + 1));
        let count = fired.clone();
        scene.observables().on_after_render.add(move |_, _| count.set(count.get() + 1));

        scene.render(&mut engine);
        assert_eq!(fired.get(), 2);
        assert_eq!(scene.render_id(), 1);
        assert_eq!(engine.device().draw_count(), 0);
    }

    struct CountingPhysics {
        fixed_steps: Rc<Cell<u32>>,
    }

    impl SimulationSystem for CountingPhysics {
        fn name(&self) -> &str {
            "counting"
        }

        fn fixed_update(&mut self, dt: f64) -> Result<()> {
            assert!((dt - 1.0 / 60.0).abs() < 1e-9);
            self.fixed_steps.set(self.fixed_steps.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn lockstep_runs_whole_steps() {
        let mut scene = Scene::default();
        let options = EngineOptions {
            deterministic_lockstep: true,
            ..EngineOptions::default()
        };
        let mut engine = Engine::new(RecordingDevice::new(), options);
        let fixed_steps = Rc::new(Cell::new(0));
        scene.set_physics(Box::new(CountingPhysics {
            fixed_steps: fixed_steps.clone(),
        }));

        let before = Rc::new(Cell::new(0));
        let after = Rc::new(Cell::new(0));
        let count = before.clone();
        scene.observables().on_before_step.add(move |_, _| count.set(count.get() + 1));
        let count = after.clone();
        scene.observables().on_after_step.add(move |_, _| count.set(count.get() + 1));

        engine.advance_time(std::time::Duration::from_secs_f64(1.0 / 30.0));
        scene.render(&mut engine);

        assert_eq!(before.get(), 2);
        assert_eq!(after.get(), 2);
        assert_eq!(fixed_steps.get(), 2);
        assert!(scene.time_accumulator() < 1e-6);
        assert_eq!(scene.step_ids(), (2, 2));
    }

    #[test]
    fn lockstep_caps_steps_and_keeps_remainder() {
        let mut scene = Scene::default();
        let options = EngineOptions {
            deterministic_lockstep: true,
            lockstep_max_steps: 2,
            ..EngineOptions::default()
        };
        let mut engine = Engine::new(RecordingDevice::new(), options);
        let steps = Rc::new(Cell::new(0));
        let count = steps.clone();
        scene.observables().on_before_step.add(move |_, _| count.set(count.get() + 1));

        engine.advance_time(std::time::Duration::from_millis(100));
        scene.render(&mut engine);
        assert_eq!(steps.get(), 2);
        assert!(scene.time_accumulator() > 0.06);
    }

    #[test]
    fn variable_step_updates_physics_once() {
        let mut scene = Scene::default();
        let mut engine = engine();
        let fixed_steps = Rc::new(Cell::new(0));
        scene.set_physics(Box::new(CountingPhysics {
            fixed_steps: fixed_steps.clone(),
        }));
        engine.advance_time(std::time::Duration::from_secs_f64(1.0 / 60.0));
        scene.render(&mut engine);
        assert_eq!(fixed_steps.get(), 1);
        assert!((scene.animation_ratio() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn device_loss_is_reported_once_and_skips_frames() {
        let mut scene = Scene::default();
        let mut engine = engine();
        scene.add_camera(camera());
        scene.add_mesh(cube("box"));
        let errors = Rc::new(Cell::new(0));
        let count = errors.clone();
        scene.observables().on_error.add(move |e, _| {
            assert!(matches!(e, LumenError::DeviceLost));
            count.set(count.get() + 1);
        });

        engine.device_mut().set_context_lost(true);
        scene.render(&mut engine);
        scene.render(&mut engine);
        assert_eq!(errors.get(), 1);
        assert_eq!(scene.render_id(), 0);

        engine.device_mut().set_context_lost(false);
        scene.render(&mut engine);
        assert_eq!(scene.render_id(), 1);
        assert_eq!(engine.device().draw_count(), 1);
    }

    #[test]
    fn failing_material_skips_only_its_submesh() {
        let mut scene = Scene::default();
        let mut engine = engine();
        scene.add_camera(camera());
        let broken = scene.add_material(BasicMaterial::new("broken"));
        scene.add_mesh(cube("broken").with_material(broken));
        scene.add_mesh(cube("fine"));
        engine.device_mut().fail_effect("broken");

        scene.render(&mut engine);
        assert_eq!(scene.render_id(), 1);
        assert_eq!(engine.device().drawn_effect_names(), vec!["default material".to_string()]);
    }

    #[test]
    fn same_material_binds_once() {
        let mut scene = Scene::default();
        let mut engine = engine();
        scene.add_camera(camera());
        let shared = scene.add_material(BasicMaterial::new("shared"));
        scene.add_mesh(cube("a").with_material(shared));
        scene.add_mesh(cube("b").with_material(shared));

        scene.render(&mut engine);
        let binds = engine
            .device()
            .commands()
            .iter()
            .filter(|c| matches!(c, DeviceCommand::BindEffect(_)))
            .count();
        assert_eq!(binds, 1);
        assert_eq!(engine.device().draw_count(), 2);
    }

    #[test]
    fn shared_material_keeps_a_variant_per_sub_mesh() {
        let mut scene = Scene::default();
        let mut engine = engine();
        scene.add_camera(camera());
        let shared = scene.add_material(BasicMaterial::new("shared"));
        let solid = scene.add_mesh(cube("solid").with_material(shared));
        let mut faded = cube("faded").with_material(shared);
        faded.visibility = 0.5;
        let faded = scene.add_mesh(faded);

        scene.render(&mut engine);
        let binds: Vec<_> = engine
            .device()
            .commands()
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::BindEffect(effect) => Some(*effect),
                _ => None,
            })
            .collect();
        let solid_effect = scene.mesh(solid).unwrap().sub_meshes[0].effect();
        let faded_effect = scene.mesh(faded).unwrap().sub_meshes[0].effect();
        assert_eq!(binds.len(), 2);
        assert_ne!(binds[0], binds[1]);
        assert_eq!(Some(binds[0]), solid_effect);
        assert_eq!(Some(binds[1]), faded_effect);
        assert_eq!(engine.device().draw_count(), 2);

        // a second frame recompiles nothing
        let creates = |engine: &Engine<RecordingDevice>| {
            engine
                .device()
                .commands()
                .iter()
                .filter(|c| matches!(c, DeviceCommand::CreateEffect { .. }))
                .count()
        };
        let before = creates(&engine);
        frame(&mut engine, 16);
        scene.render(&mut engine);
        assert_eq!(creates(&engine), before);
    }

    #[test]
    fn compiling_variant_does_not_hide_ready_sibling() {
        let mut scene = Scene::default();
        let mut engine = Engine::new(
            RecordingDevice::new().with_deferred_compilation(),
            EngineOptions::default(),
        );
        scene.add_camera(camera());
        let shared = scene.add_material(BasicMaterial::new("shared"));
        scene.add_mesh(cube("solid").with_material(shared));
        scene.render(&mut engine);
        engine.device_mut().finish_compilation();

        let mut faded = cube("faded").with_material(shared);
        faded.visibility = 0.5;
        scene.add_mesh(faded);
        frame(&mut engine, 16);
        scene.render(&mut engine);
        assert_eq!(engine.device().draw_count(), 1);
        assert_eq!(scene.active_meshes().len(), 2);
    }

    #[test]
    fn multi_camera_renders_each_viewport() {
        let mut scene = Scene::default();
        let mut engine = engine();
        let left = scene.add_camera(camera().with_viewport(lumen_core::Viewport::new(0.0, 0.0, 0.5, 1.0)));
        let right = scene.add_camera(camera().with_viewport(lumen_core::Viewport::new(0.5, 0.0, 0.5, 1.0)));
        scene.set_active_cameras(vec![left, right]);
        scene.add_mesh(cube("box"));

        let cameras = Rc::new(RefCell::new(Vec::new()));
        let log = cameras.clone();
        scene
            .observables()
            .on_before_camera_render
            .add(move |info, _| log.borrow_mut().push(info.camera));

        scene.render(&mut engine);
        assert_eq!(*cameras.borrow(), vec![left, right]);
        assert_eq!(engine.device().draw_count(), 2);
        let viewports = engine
            .device()
            .commands()
            .iter()
            .filter(|c| matches!(c, DeviceCommand::SetViewport(_)))
            .count();
        assert_eq!(viewports, 2);
    }

    #[test]
    fn group_observers_filter_by_mask() {
        let mut scene = Scene::default();
        let mut engine = engine();
        scene.add_camera(camera());
        scene.add_mesh(cube("ground"));
        let mut overlay = cube("overlay");
        overlay.rendering_group_id = 1;
        scene.add_mesh(overlay);

        let groups = Rc::new(RefCell::new(Vec::new()));
        let log = groups.clone();
        scene.observables().on_before_rendering_group.add_with_mask(
            move |info, _| log.borrow_mut().push(info.rendering_group_id),
            1 << 1,
            false,
        );

        scene.render(&mut engine);
        assert_eq!(*groups.borrow(), vec![1]);
    }

    #[test]
    fn auto_clear_clears_color_and_depth() {
        let mut scene = Scene::default();
        let mut engine = engine();
        scene.add_camera(camera());
        scene.render(&mut engine);
        let color = scene.config.clear_color;
        assert!(engine.device().commands().contains(&DeviceCommand::Clear {
            color: Some(color),
            depth: true,
            stencil: true,
        }));
    }
}
