//! Frustum planes extracted from a view-projection matrix

use glam::{Mat4, Vec3, Vec4};

/// A plane `normal · p + d = 0`; points with a positive distance are inside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    pub fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self {
            normal: Vec3::new(a, b, c),
            d,
        }
    }

    fn from_vec4(v: Vec4) -> Self {
        Self::new(v.x, v.y, v.z, v.w).normalized()
    }

    pub fn normalized(self) -> Self {
        let len = self.normal.length();
        if len <= f32::EPSILON {
            return self;
        }
        Self {
            normal: self.normal / len,
            d: self.d / len,
        }
    }

    /// Signed distance from the plane
    pub fn dot_coordinate(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// Six planes ordered near, far, left, right, top, bottom
pub type FrustumPlanes = [Plane; 6];

/// Extract planes from a combined `projection * view` matrix (OpenGL clip depth)
pub fn frustum_planes(transform: &Mat4) -> FrustumPlanes {
    let r0 = transform.row(0);
    let r1 = transform.row(1);
    let r2 = transform.row(2);
    let r3 = transform.row(3);

    [
        Plane::from_vec4(r3 + r2),
        Plane::from_vec4(r3 - r2),
        Plane::from_vec4(r3 + r0),
        Plane::from_vec4(r3 - r0),
        Plane::from_vec4(r3 - r1),
        Plane::from_vec4(r3 + r1),
    ]
}

/// True unless every point lies behind a single plane
pub fn points_in_frustum(points: &[Vec3], planes: &FrustumPlanes) -> bool {
    planes
        .iter()
        .all(|plane| points.iter().any(|p| plane.dot_coordinate(*p) >= 0.0))
}

/// Planes that accept every point, used when no camera is available
pub fn unbounded_planes() -> FrustumPlanes {
    [Plane::new(0.0, 0.0, 0.0, 1.0); 6]
}
