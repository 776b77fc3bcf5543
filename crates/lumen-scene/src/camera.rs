//! Scene cameras and their cached view/projection matrices

use crate::mesh::DEFAULT_LAYER_MASK;
use crate::node::Node;
use glam::{Mat4, Vec3};
use lumen_animation::{Animation, AnimationTarget, AnimationValue};
use lumen_core::Viewport;

/// Projection used by a camera
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CameraMode {
    #[default]
    Perspective,
    /// Orthographic box of the given half height; width follows the aspect ratio
    Orthographic { half_height: f32 },
}

/// A camera node looking from its world position towards `target`
#[derive(Debug, Clone)]
pub struct Camera {
    pub node: Node,
    /// World-space point the camera looks at
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov: f32,
    /// Near clipping plane
    pub min_z: f32,
    /// Far clipping plane
    pub max_z: f32,
    pub mode: CameraMode,
    /// Normalized region of the render target this camera draws into
    pub viewport: Viewport,
    /// Meshes are only seen when their layer mask shares a bit with this one
    pub layer_mask: u32,
    view_matrix: Mat4,
    projection_matrix: Mat4,
    view_update_flag: u64,
    projection_update_flag: u64,
}

impl Camera {
    pub fn new(name: &str, position: Vec3, target: Vec3) -> Self {
        let mut node = Node::new(name);
        node.transform.position = position;
        Self {
            node,
            target,
            up: Vec3::Y,
            fov: 0.8,
            min_z: 1.0,
            max_z: 10_000.0,
            mode: CameraMode::Perspective,
            viewport: Viewport::FULL,
            layer_mask: DEFAULT_LAYER_MASK,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_update_flag: 0,
            projection_update_flag: 0,
        }
    }

    pub fn orthographic(mut self, half_height: f32) -> Self {
        self.mode = CameraMode::Orthographic { half_height };
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// View matrix from the last update
    pub fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    /// Projection matrix from the last update
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    /// Bumped every time the view matrix actually changes
    pub fn view_update_flag(&self) -> u64 {
        self.view_update_flag
    }

    /// Bumped every time the projection matrix actually changes
    pub fn projection_update_flag(&self) -> u64 {
        self.projection_update_flag
    }

    /// View matrix for the given world-space eye position, without caching
    pub fn compute_view_matrix(&self, eye: Vec3) -> Mat4 {
        Mat4::look_at_rh(eye, self.target, self.up)
    }

    /// Projection for the given aspect ratio (width / height), without caching
    pub fn compute_projection_matrix(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        match self.mode {
            CameraMode::Perspective => Mat4::perspective_rh_gl(self.fov, aspect, self.min_z, self.max_z),
            CameraMode::Orthographic { half_height } => {
                let half_width = half_height * aspect;
                Mat4::orthographic_rh_gl(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    self.min_z,
                    self.max_z,
                )
            }
        }
    }

    /// Recompute the view matrix for the given world-space eye position
    pub fn update_view_matrix(&mut self, eye: Vec3) -> Mat4 {
        let view = self.compute_view_matrix(eye);
        if view != self.view_matrix {
            self.view_matrix = view;
            self.view_update_flag += 1;
        }
        self.view_matrix
    }

    /// Recompute the projection for the given aspect ratio (width / height)
    pub fn update_projection_matrix(&mut self, aspect: f32) -> Mat4 {
        let projection = self.compute_projection_matrix(aspect);
        if projection != self.projection_matrix {
            self.projection_matrix = projection;
            self.projection_update_flag += 1;
        }
        self.projection_matrix
    }
}

impl AnimationTarget for Camera {
    fn animations(&self) -> &[Animation] {
        &self.node.animations
    }

    fn set_animated_property(&mut self, property: &str, value: &AnimationValue) -> bool {
        match (property, value) {
            ("fov", AnimationValue::Float(f)) => self.fov = *f,
            ("target", AnimationValue::Vector3(v)) => self.target = *v,
            _ => return self.node.set_transform_property(property, value),
        }
        true
    }

    fn animated_property(&self, property: &str) -> Option<AnimationValue> {
        match property {
            "fov" => Some(AnimationValue::Float(self.fov)),
            "target" => Some(AnimationValue::Vector3(self.target)),
            _ => self.node.transform_property(property),
        }
    }
}
