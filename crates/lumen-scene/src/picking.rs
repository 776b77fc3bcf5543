//! Ray casting for picking
//!
//! Screen coordinates are unprojected through the inverse of
//! `projection * view * world`, then tested against bounding volumes and
//! triangles.

use crate::handle::MeshHandle;
use glam::{Mat4, Vec3};

/// A ray in 3D space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub length: f32,
}

/// Triangle hit: distance along the ray and barycentric coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub distance: f32,
    pub bu: f32,
    pub bv: f32,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3, length: f32) -> Self {
        Self {
            origin,
            direction,
            length,
        }
    }

    /// Ray through pixel (`x`, `y`) of a `width` x `height` viewport.
    ///
    /// `world` places the ray in a space other than world space; pass the
    /// identity for world-space rays.
    pub fn from_screen(
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        world: &Mat4,
        view: &Mat4,
        projection: &Mat4,
    ) -> Self {
        let inverse = (*projection * *view * *world).inverse();
        let ndc_x = 2.0 * x / width.max(1.0) - 1.0;
        let ndc_y = 1.0 - 2.0 * y / height.max(1.0);

        let near = inverse.project_point3(Vec3::new(ndc_x, ndc_y, -1.0));
        let far = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
        let direction = (far - near).try_normalize().unwrap_or(Vec3::NEG_Z);
        Self::new(near, direction, f32::MAX)
    }

    /// Same ray expressed in another space. The direction is not renormalized,
    /// so hit parameters stay comparable with the original ray.
    pub fn transform(&self, matrix: &Mat4) -> Self {
        Self::new(
            matrix.transform_point3(self.origin),
            matrix.transform_vector3(self.direction),
            self.length,
        )
    }

    /// Point at parameter `t`
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Slab test against an axis-aligned box; nearest non-negative parameter
    pub fn intersects_box(&self, min: Vec3, max: Vec3) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for i in 0..3 {
            if self.direction[i].abs() < 1e-8 {
                if self.origin[i] < min[i] || self.origin[i] > max[i] {
                    return None;
                }
            } else {
                let inv_d = 1.0 / self.direction[i];
                let mut t1 = (min[i] - self.origin[i]) * inv_d;
                let mut t2 = (max[i] - self.origin[i]) * inv_d;
                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }
                t_min = t_min.max(t1);
                t_max = t_max.min(t2);
                if t_min > t_max {
                    return None;
                }
            }
        }

        if t_max < 0.0 {
            return None;
        }
        let t = t_min.max(0.0);
        (t <= self.length).then_some(t)
    }

    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        let to_center = center - self.origin;
        let dir_len_sq = self.direction.length_squared();
        if dir_len_sq <= f32::EPSILON {
            return to_center.length() <= radius;
        }
        let t = (to_center.dot(self.direction) / dir_len_sq).max(0.0);
        let closest = self.at(t);
        closest.distance_squared(center) <= radius * radius
    }

    /// Möller–Trumbore intersection with a double-sided triangle
    pub fn intersects_triangle(&self, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<TriangleHit> {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < 1e-9 {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = self.origin - v0;
        let bu = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&bu) {
            return None;
        }
        let q = s.cross(edge1);
        let bv = self.direction.dot(q) * inv_det;
        if bv < 0.0 || bu + bv > 1.0 {
            return None;
        }
        let distance = edge2.dot(q) * inv_det;
        if distance < 0.0 || distance > self.length {
            return None;
        }
        Some(TriangleHit { distance, bu, bv })
    }
}

/// Result of a pick; `hit == false` when nothing was intersected
#[derive(Debug, Clone, PartialEq)]
pub struct PickingInfo {
    pub hit: bool,
    pub distance: f32,
    pub picked_point: Option<Vec3>,
    pub picked_mesh: Option<MeshHandle>,
    pub sub_mesh_id: usize,
    /// Triangle index within the submesh, -1 for bounding-volume hits
    pub face_id: i64,
    pub bu: f32,
    pub bv: f32,
    pub ray: Option<Ray>,
    /// Index of the picked sprite within its manager
    pub picked_sprite: Option<(usize, usize)>,
}

impl Default for PickingInfo {
    fn default() -> Self {
        Self {
            hit: false,
            distance: 0.0,
            picked_point: None,
            picked_mesh: None,
            sub_mesh_id: 0,
            face_id: -1,
            bu: 0.0,
            bv: 0.0,
            ray: None,
            picked_sprite: None,
        }
    }
}

impl PickingInfo {
    /// A miss that still records the ray that was cast
    pub fn miss(ray: Ray) -> Self {
        Self {
            ray: Some(ray),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_center_ray_points_forward() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh_gl(0.8, 1.0, 1.0, 100.0);
        let ray = Ray::from_screen(50.0, 50.0, 100.0, 100.0, &Mat4::IDENTITY, &view, &proj);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
        assert!((ray.origin.z - 9.0).abs() < 1e-3);
    }

    #[test]
    fn box_hit_and_miss() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z, f32::MAX);
        let hit = ray.intersects_box(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert!((hit.unwrap() - 9.0).abs() < 1e-5);
        assert!(ray.intersects_box(Vec3::splat(5.0), Vec3::splat(6.0)).is_none());
    }

    #[test]
    fn box_behind_ray_misses() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::Z, f32::MAX);
        assert!(ray.intersects_box(Vec3::splat(-1.0), Vec3::splat(1.0)).is_none());
    }

    #[test]
    fn ray_length_limits_hits() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z, 5.0);
        assert!(ray.intersects_box(Vec3::splat(-1.0), Vec3::splat(1.0)).is_none());
    }

    #[test]
    fn sphere_test() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z, f32::MAX);
        assert!(ray.intersects_sphere(Vec3::new(0.5, 0.0, 0.0), 1.0));
        assert!(!ray.intersects_sphere(Vec3::new(3.0, 0.0, 0.0), 1.0));
    }

    #[test]
    fn triangle_barycentrics() {
        let ray = Ray::new(Vec3::new(0.25, 0.25, 5.0), Vec3::NEG_Z, f32::MAX);
        let hit = ray
            .intersects_triangle(Vec3::ZERO, Vec3::X, Vec3::Y)
            .unwrap();
        assert!((hit.distance - 5.0).abs() < 1e-5);
        assert!((hit.bu - 0.25).abs() < 1e-5);
        assert!((hit.bv - 0.25).abs() < 1e-5);

        let miss = Ray::new(Vec3::new(2.0, 2.0, 5.0), Vec3::NEG_Z, f32::MAX);
        assert!(miss.intersects_triangle(Vec3::ZERO, Vec3::X, Vec3::Y).is_none());
    }

    #[test]
    fn transformed_ray_keeps_parameter() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z, f32::MAX);
        let scale = Mat4::from_scale(Vec3::splat(2.0));
        let local = ray.transform(&scale.inverse());
        let hit = local.intersects_box(Vec3::splat(-1.0), Vec3::splat(1.0)).unwrap();
        // world box spans z in [-2, 2], so the world hit is at t = 8
        assert!((hit - 8.0).abs() < 1e-4);
    }

    #[test]
    fn default_is_a_miss() {
        let info = PickingInfo::default();
        assert!(!info.hit);
        assert_eq!(info.face_id, -1);
        assert!(info.picked_mesh.is_none());
    }
}
