//! Spatial and common types

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Local transform of a scene node: position, rotation and scaling
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    /// Rotation in radians (Euler angles, applied yaw then pitch then roll)
    pub rotation: Vec3,
    pub scaling: Vec3,
    /// Optional quaternion rotation. When present, takes precedence
    /// over Euler angles in to_matrix().
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_quaternion: Option<Quat>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scaling: Vec3::ONE,
        rotation_quaternion: None,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scaling(mut self, scaling: Vec3) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn with_rotation_quaternion(mut self, q: Quat) -> Self {
        self.rotation_quaternion = Some(q);
        self
    }

    /// Effective rotation as a quaternion
    pub fn rotation_quat(&self) -> Quat {
        self.rotation_quaternion.unwrap_or_else(|| {
            Quat::from_euler(EulerRot::YXZ, self.rotation.y, self.rotation.x, self.rotation.z)
        })
    }

    /// Local matrix: scale, then rotate, then translate
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scaling, self.rotation_quat(), self.position)
    }

    /// True when any scaling component is exactly zero (the node collapses to nothing)
    pub fn has_zero_scaling(&self) -> bool {
        self.scaling.x == 0.0 || self.scaling.y == 0.0 || self.scaling.z == 0.0
    }
}

/// RGBA color with components in [0, 1]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    /// Default scene clear color
    pub const CLEAR: Self = Self::rgba(0.2, 0.2, 0.3, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Viewport in normalized coordinates, relative to the render target
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::FULL
    }
}

impl Viewport {
    pub const FULL: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Convert to pixel coordinates for a target of the given size
    pub fn to_global(&self, render_width: u32, render_height: u32) -> Viewport {
        let w = render_width as f32;
        let h = render_height as f32;
        Viewport {
            x: self.x * w,
            y: self.y * h,
            width: self.width * w,
            height: self.height * h,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_matrix() {
        assert_eq!(Transform::IDENTITY.to_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn translation_matrix() {
        let t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        let p = t.to_matrix().transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-6);
    }

    #[test]
    fn quaternion_overrides_euler() {
        let q = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let t = Transform::IDENTITY
            .with_rotation(Vec3::new(1.0, 0.0, 0.0))
            .with_rotation_quaternion(q);
        assert_eq!(t.rotation_quat(), q);
    }

    #[test]
    fn zero_scaling_detected() {
        let t = Transform::IDENTITY.with_scaling(Vec3::new(1.0, 0.0, 1.0));
        assert!(t.has_zero_scaling());
        assert!(!Transform::IDENTITY.has_zero_scaling());
    }

    #[test]
    fn viewport_to_global() {
        let vp = Viewport::new(0.5, 0.0, 0.5, 1.0).to_global(800, 600);
        assert_eq!(vp, Viewport::new(400.0, 0.0, 400.0, 600.0));
    }
}
