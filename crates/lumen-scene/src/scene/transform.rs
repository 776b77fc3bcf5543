//! View, projection and combined transform for the camera being rendered

use super::Scene;
use crate::camera::Camera;
use crate::device::GraphicsDevice;
use crate::engine::Engine;
use crate::frustum::{frustum_planes, unbounded_planes, FrustumPlanes};
use crate::handle::CameraHandle;
use crate::node::compute_world_matrix;
use glam::Mat4;

/// One view/projection pair plus the camera flags it was computed from
#[derive(Debug, Clone, Copy)]
struct MatrixSet {
    view: Mat4,
    projection: Mat4,
    transform: Mat4,
    planes: FrustumPlanes,
    camera: Option<CameraHandle>,
    view_update_flag: Option<u64>,
    projection_update_flag: Option<u64>,
}

impl Default for MatrixSet {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            transform: Mat4::IDENTITY,
            planes: unbounded_planes(),
            camera: None,
            view_update_flag: None,
            projection_update_flag: None,
        }
    }
}

impl MatrixSet {
    fn set(&mut self, view: Mat4, projection: Mat4) {
        self.view = view;
        self.projection = projection;
        self.transform = projection * view;
        self.planes = frustum_planes(&self.transform);
    }

    /// Store matrices computed from `camera`; false when its flags have not moved
    fn set_from_camera(&mut self, camera: CameraHandle, matrices: CameraMatrices, force: bool) -> bool {
        let stale = force
            || self.camera != Some(camera)
            || self.view_update_flag != Some(matrices.view_flag)
            || self.projection_update_flag != Some(matrices.projection_flag);
        if !stale {
            return false;
        }
        self.set(matrices.view, matrices.projection);
        self.camera = Some(camera);
        self.view_update_flag = Some(matrices.view_flag);
        self.projection_update_flag = Some(matrices.projection_flag);
        true
    }

    fn forget_camera(&mut self) {
        self.camera = None;
        self.view_update_flag = None;
        self.projection_update_flag = None;
    }
}

#[derive(Debug, Clone, Copy)]
struct CameraMatrices {
    view: Mat4,
    projection: Mat4,
    view_flag: u64,
    projection_flag: u64,
}

/// Primary and alternate matrix sets and which one reads go to
#[derive(Debug, Clone, Default)]
pub(crate) struct TransformState {
    primary: MatrixSet,
    alternate: MatrixSet,
    use_alternate: bool,
}

impl TransformState {
    fn current(&self) -> &MatrixSet {
        if self.use_alternate {
            &self.alternate
        } else {
            &self.primary
        }
    }
}

impl Scene {
    pub fn view_matrix(&self) -> Mat4 {
        self.transform.current().view
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.transform.current().projection
    }

    /// `projection * view`
    pub fn transform_matrix(&self) -> Mat4 {
        self.transform.current().transform
    }

    pub fn frustum_planes(&self) -> &FrustumPlanes {
        &self.transform.current().planes
    }

    /// Recompute matrices from the active camera when its update flags moved, or when forced
    pub fn update_transform_matrix<D: GraphicsDevice>(&mut self, engine: &mut Engine<D>, force: bool) {
        let size = engine.render_size();
        match self.active_camera {
            Some(camera) => self.update_transform_for_camera(camera, engine.device_mut(), size, force),
            None => self.set_transform_matrix(Mat4::IDENTITY, Mat4::IDENTITY),
        }
    }

    /// Fill the alternate set from `camera` (a mirror or reflection camera) and
    /// upload it when the camera's flags moved. Reads still go to the primary
    /// set until `switch_to_alternate_camera_configuration(true)`.
    pub fn update_alternate_transform_matrix<D: GraphicsDevice>(&mut self, engine: &mut Engine<D>, camera: CameraHandle) {
        let size = engine.render_size();
        let Some(matrices) = self.camera_matrices(camera, size) else {
            return;
        };
        let alternate = &mut self.transform.alternate;
        if alternate.set_from_camera(camera, matrices, false) {
            engine
                .device_mut()
                .update_alternate_scene_uniforms(&alternate.view, &alternate.projection, &alternate.transform);
        }
    }

    pub(crate) fn update_transform_for_camera(
        &mut self,
        camera: CameraHandle,
        device: &mut dyn GraphicsDevice,
        render_size: (u32, u32),
        force: bool,
    ) {
        let Some(matrices) = self.camera_matrices(camera, render_size) else {
            self.set_transform_matrix(Mat4::IDENTITY, Mat4::IDENTITY);
            return;
        };
        let primary = &mut self.transform.primary;
        if primary.set_from_camera(camera, matrices, force) {
            device.update_scene_uniforms(&primary.view, &primary.projection, &primary.transform);
        }
    }

    fn camera_matrices(&mut self, camera: CameraHandle, render_size: (u32, u32)) -> Option<CameraMatrices> {
        let entity = camera.0;
        let viewport = self.world.get::<&Camera>(entity).ok()?.viewport;
        let eye = compute_world_matrix(&self.world, entity, self.render_id).w_axis.truncate();
        let global = viewport.to_global(render_size.0, render_size.1);
        let aspect = if global.height > 0.0 { global.width / global.height } else { 1.0 };

        let mut camera = self.world.get::<&mut Camera>(entity).ok()?;
        let view = camera.update_view_matrix(eye);
        let projection = camera.update_projection_matrix(aspect);
        Some(CameraMatrices {
            view,
            projection,
            view_flag: camera.view_update_flag(),
            projection_flag: camera.projection_update_flag(),
        })
    }

    /// Override the primary matrices, e.g. for a render-to-texture pass with its own camera.
    ///
    /// Always writes the primary set, whichever configuration reads go to.
    /// The next camera update recomputes from the camera again.
    pub fn set_transform_matrix(&mut self, view: Mat4, projection: Mat4) {
        self.transform.primary.set(view, projection);
        self.transform.primary.forget_camera();
    }

    /// Override the alternate matrices; the next alternate camera update recomputes them
    pub fn set_alternate_transform_matrix(&mut self, view: Mat4, projection: Mat4) {
        self.transform.alternate.set(view, projection);
        self.transform.alternate.forget_camera();
    }

    /// Route matrix reads to the alternate set without touching the primary camera
    pub fn switch_to_alternate_camera_configuration(&mut self, active: bool) {
        self.transform.use_alternate = active;
    }

    pub fn is_alternate_camera_configuration(&self) -> bool {
        self.transform.use_alternate
    }
}
