//! Meshes and their submesh partitions

use crate::bounding::BoundingInfo;
use crate::device::EffectHandle;
use crate::handle::{MaterialHandle, SkeletonHandle};
use crate::node::Node;
use glam::{Mat4, Vec3};
use lumen_animation::{Animation, AnimationTarget, AnimationValue};

/// Layer bits a new mesh is visible on
pub const DEFAULT_LAYER_MASK: u32 = 0x0FFF_FFFF;

/// Vertex positions and triangle indices, produced by an external builder or loader
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self { positions, indices }
    }

    /// Local-space extents of the given vertex range
    pub fn extents(&self, vertex_start: usize, vertex_count: usize) -> (Vec3, Vec3) {
        let end = (vertex_start + vertex_count).min(self.positions.len());
        let slice = self.positions.get(vertex_start..end).unwrap_or(&[]);
        if slice.is_empty() {
            return (Vec3::ZERO, Vec3::ZERO);
        }
        slice.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), p| (min.min(*p), max.max(*p)),
        )
    }

    /// Unit cube centred on the origin, 8 vertices and 12 triangles
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;
        let positions = vec![
            Vec3::new(-h, -h, -h),
            Vec3::new(h, -h, -h),
            Vec3::new(h, h, -h),
            Vec3::new(-h, h, -h),
            Vec3::new(-h, -h, h),
            Vec3::new(h, -h, h),
            Vec3::new(h, h, h),
            Vec3::new(-h, h, h),
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1, 0, 3, 2, // back
            4, 5, 6, 4, 6, 7, // front
            0, 1, 5, 0, 5, 4, // bottom
            3, 6, 2, 3, 7, 6, // top
            0, 4, 7, 0, 7, 3, // left
            1, 2, 6, 1, 6, 5, // right
        ];
        Self { positions, indices }
    }
}

/// A range of a mesh's geometry drawn with one material
#[derive(Debug, Clone, PartialEq)]
pub struct SubMesh {
    pub vertex_start: usize,
    pub vertex_count: usize,
    pub index_start: usize,
    pub index_count: usize,
    pub(crate) bounding_info: BoundingInfo,
    pub(crate) effect: SubMeshEffect,
}

/// Effect variant compiled for one submesh and the defines it was built from.
///
/// Meshes sharing a material can need different variants (a faded mesh
/// blends, an opaque one does not), so the cache lives on the submesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubMeshEffect {
    /// Material the cached variant belongs to
    pub(crate) material: Option<MaterialHandle>,
    pub defines: Option<Vec<String>>,
    pub effect: Option<EffectHandle>,
}

impl SubMeshEffect {
    pub fn clear(&mut self) {
        self.defines = None;
        self.effect = None;
    }
}

impl SubMesh {
    pub fn bounding_info(&self) -> &BoundingInfo {
        &self.bounding_info
    }

    /// Effect from the last readiness check of this submesh
    pub fn effect(&self) -> Option<EffectHandle> {
        self.effect.effect
    }

    /// Number of triangles in the index range
    pub fn face_count(&self) -> usize {
        self.index_count / 3
    }
}

/// Delay-load state of mesh data streamed in after the mesh was added
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DelayLoadState {
    #[default]
    None,
    Loaded,
    Loading,
    NotLoaded,
}

/// A renderable node
#[derive(Debug, Clone)]
pub struct Mesh {
    pub node: Node,
    pub geometry: Option<Geometry>,
    pub sub_meshes: Vec<SubMesh>,
    /// `None` renders with the scene's default material
    pub material: Option<MaterialHandle>,
    pub skeleton: Option<SkeletonHandle>,
    pub is_visible: bool,
    /// 0 hides the mesh, below 1 forces the transparent bucket
    pub visibility: f32,
    pub is_pickable: bool,
    /// Skip frustum and layer tests
    pub always_select_as_active_mesh: bool,
    pub layer_mask: u32,
    pub rendering_group_id: usize,
    /// Sort key ahead of distance for transparent submeshes
    pub alpha_index: i32,
    pub delay_load_state: DelayLoadState,
    pub(crate) bounding_info: BoundingInfo,
    pub(crate) render_id: Option<u64>,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            node: Node::new(name),
            geometry: None,
            sub_meshes: Vec::new(),
            material: None,
            skeleton: None,
            is_visible: true,
            visibility: 1.0,
            is_pickable: true,
            always_select_as_active_mesh: false,
            layer_mask: DEFAULT_LAYER_MASK,
            rendering_group_id: 0,
            alpha_index: i32::MAX,
            delay_load_state: DelayLoadState::None,
            bounding_info: BoundingInfo::default(),
            render_id: None,
        }
    }

    /// Attach geometry with a single submesh covering all of it
    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        let (min, max) = geometry.extents(0, geometry.positions.len());
        self.bounding_info = BoundingInfo::new(min, max);
        self.sub_meshes = vec![SubMesh {
            vertex_start: 0,
            vertex_count: geometry.positions.len(),
            index_start: 0,
            index_count: geometry.indices.len(),
            bounding_info: BoundingInfo::new(min, max),
            effect: SubMeshEffect::default(),
        }];
        self.geometry = Some(geometry);
        self
    }

    /// Bounds for a mesh without geometry, e.g. one that is still delay-loading
    pub fn with_bounds(mut self, minimum: Vec3, maximum: Vec3) -> Self {
        self.bounding_info = BoundingInfo::new(minimum, maximum);
        self
    }

    pub fn with_material(mut self, material: MaterialHandle) -> Self {
        self.material = Some(material);
        self
    }

    /// Split the geometry further; the submesh bounds come from its vertex range
    pub fn add_sub_mesh(
        &mut self,
        vertex_start: usize,
        vertex_count: usize,
        index_start: usize,
        index_count: usize,
    ) -> usize {
        let (min, max) = self
            .geometry
            .as_ref()
            .map(|g| g.extents(vertex_start, vertex_count))
            .unwrap_or((self.bounding_info.bounding_box.minimum, self.bounding_info.bounding_box.maximum));
        self.sub_meshes.push(SubMesh {
            vertex_start,
            vertex_count,
            index_start,
            index_count,
            bounding_info: BoundingInfo::new(min, max),
            effect: SubMeshEffect::default(),
        });
        self.sub_meshes.len() - 1
    }

    pub fn total_vertices(&self) -> usize {
        self.geometry.as_ref().map_or(0, |g| g.positions.len())
    }

    pub fn total_indices(&self) -> usize {
        self.geometry.as_ref().map_or(0, |g| g.indices.len())
    }

    pub fn bounding_info(&self) -> &BoundingInfo {
        &self.bounding_info
    }

    /// Render id of the last frame this mesh was active in
    pub fn render_id(&self) -> Option<u64> {
        self.render_id
    }

    /// Mesh data is usable; materials are checked separately
    pub fn is_ready(&self) -> bool {
        self.delay_load_state != DelayLoadState::Loading
    }

    pub(crate) fn update_bounds(&mut self, world: &Mat4) {
        self.bounding_info.update(world);
        for sub_mesh in &mut self.sub_meshes {
            sub_mesh.bounding_info.update(world);
        }
    }
}

impl AnimationTarget for Mesh {
    fn animations(&self) -> &[Animation] {
        &self.node.animations
    }

    fn set_animated_property(&mut self, property: &str, value: &AnimationValue) -> bool {
        match (property, value) {
            ("visibility", AnimationValue::Float(v)) => {
                self.visibility = *v;
                true
            }
            _ => self.node.set_transform_property(property, value),
        }
    }

    fn animated_property(&self, property: &str) -> Option<AnimationValue> {
        match property {
            "visibility" => Some(AnimationValue::Float(self.visibility)),
            _ => self.node.transform_property(property),
        }
    }
}
