//! Bounding volumes used for culling and picking

use crate::frustum::{points_in_frustum, FrustumPlanes};
use glam::{Mat4, Vec3};

/// Axis-aligned box in local space plus its transformed corners
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub minimum: Vec3,
    pub maximum: Vec3,
    pub minimum_world: Vec3,
    pub maximum_world: Vec3,
    pub vectors_world: [Vec3; 8],
}

impl BoundingBox {
    pub fn new(minimum: Vec3, maximum: Vec3) -> Self {
        let mut bbox = Self {
            minimum,
            maximum,
            minimum_world: minimum,
            maximum_world: maximum,
            vectors_world: [Vec3::ZERO; 8],
        };
        bbox.update(&Mat4::IDENTITY);
        bbox
    }

    /// The eight local-space corners
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.minimum, self.maximum);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, b.y, b.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, a.y, b.z),
        ]
    }

    /// Recompute world-space corners and extents
    pub fn update(&mut self, world: &Mat4) {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        let corners = self.corners();
        for (slot, corner) in self.vectors_world.iter_mut().zip(corners) {
            let p = world.transform_point3(corner);
            min = min.min(p);
            max = max.max(p);
            *slot = p;
        }
        self.minimum_world = min;
        self.maximum_world = max;
    }

    pub fn center_world(&self) -> Vec3 {
        (self.minimum_world + self.maximum_world) * 0.5
    }

    pub fn is_in_frustum(&self, planes: &FrustumPlanes) -> bool {
        points_in_frustum(&self.vectors_world, planes)
    }

    /// World-space overlap with another axis-aligned box
    pub fn intersects_min_max(&self, min: Vec3, max: Vec3) -> bool {
        self.maximum_world.cmpge(min).all() && self.minimum_world.cmple(max).all()
    }
}

/// Sphere enclosing the local box
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
    pub center_world: Vec3,
    pub radius_world: f32,
}

impl BoundingSphere {
    pub fn new(minimum: Vec3, maximum: Vec3) -> Self {
        let center = (minimum + maximum) * 0.5;
        let radius = (maximum - minimum).length() * 0.5;
        Self {
            center,
            radius,
            center_world: center,
            radius_world: radius,
        }
    }

    pub fn update(&mut self, world: &Mat4) {
        self.center_world = world.transform_point3(self.center);
        let scale = world
            .x_axis
            .truncate()
            .length()
            .max(world.y_axis.truncate().length())
            .max(world.z_axis.truncate().length());
        self.radius_world = self.radius * scale;
    }

    pub fn is_in_frustum(&self, planes: &FrustumPlanes) -> bool {
        planes
            .iter()
            .all(|plane| plane.dot_coordinate(self.center_world) > -self.radius_world)
    }
}

/// Box and sphere for one mesh or submesh
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingInfo {
    pub bounding_box: BoundingBox,
    pub bounding_sphere: BoundingSphere,
}

impl Default for BoundingInfo {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO)
    }
}

impl BoundingInfo {
    pub fn new(minimum: Vec3, maximum: Vec3) -> Self {
        Self {
            bounding_box: BoundingBox::new(minimum, maximum),
            bounding_sphere: BoundingSphere::new(minimum, maximum),
        }
    }

    pub fn update(&mut self, world: &Mat4) {
        self.bounding_box.update(world);
        self.bounding_sphere.update(world);
    }

    /// Cheap sphere rejection first, then the box test
    pub fn is_in_frustum(&self, planes: &FrustumPlanes) -> bool {
        self.bounding_sphere.is_in_frustum(planes) && self.bounding_box.is_in_frustum(planes)
    }
}
