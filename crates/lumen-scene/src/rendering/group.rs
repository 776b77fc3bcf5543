use crate::device::{AlphaMode, EffectHandle};
use crate::handle::{MaterialHandle, MeshHandle, ParticleSystemHandle};
use std::cmp::Ordering;

/// One submesh selected for drawing this frame
#[derive(Debug, Clone, PartialEq)]
pub struct SubMeshEntry {
    pub mesh: MeshHandle,
    pub sub_mesh_index: usize,
    /// Resolved material: the mesh's own or the scene default
    pub material: MaterialHandle,
    /// Effect variant the submesh was found ready with
    pub effect: EffectHandle,
    pub alpha_index: i32,
    /// Distance from the camera to the submesh bounding-sphere center
    pub distance_to_camera: f32,
}

/// Which bucket of a group a submesh lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderBucket {
    Opaque,
    AlphaTest,
    Transparent,
}

/// The pass a draw belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPass {
    DepthOnly,
    Opaque,
    AlphaTest,
    Transparent,
}

pub type SubMeshComparator = Box<dyn Fn(&SubMeshEntry, &SubMeshEntry) -> Ordering>;

/// Nearest first
pub fn front_to_back(a: &SubMeshEntry, b: &SubMeshEntry) -> Ordering {
    a.distance_to_camera.total_cmp(&b.distance_to_camera)
}

/// By alpha index, then farthest first
pub fn back_to_front(a: &SubMeshEntry, b: &SubMeshEntry) -> Ordering {
    a.alpha_index
        .cmp(&b.alpha_index)
        .then_with(|| b.distance_to_camera.total_cmp(&a.distance_to_camera))
}

/// Receives the draws of a rendering group in order
pub trait SubMeshDrawer {
    fn draw_sub_mesh(&mut self, entry: &SubMeshEntry, pass: DrawPass);

    fn draw_particles(&mut self, group_id: usize, systems: &[ParticleSystemHandle]);

    fn set_color_write(&mut self, enabled: bool);

    fn set_alpha_mode(&mut self, mode: AlphaMode);

    fn clear_depth_stencil(&mut self, depth: bool, stencil: bool);

    fn before_rendering_group(&mut self, _group_id: usize) {}

    fn after_rendering_group(&mut self, _group_id: usize) {}
}

/// Per-frame buckets of one rendering group
#[derive(Default)]
pub struct RenderingGroup {
    index: usize,
    opaque: Vec<SubMeshEntry>,
    alpha_test: Vec<SubMeshEntry>,
    transparent: Vec<SubMeshEntry>,
    depth_only: Vec<SubMeshEntry>,
    particles: Vec<ParticleSystemHandle>,
    pub(crate) opaque_sort: Option<SubMeshComparator>,
    pub(crate) alpha_test_sort: Option<SubMeshComparator>,
    pub(crate) transparent_sort: Option<SubMeshComparator>,
}

impl std::fmt::Debug for RenderingGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderingGroup")
            .field("index", &self.index)
            .field("opaque", &self.opaque.len())
            .field("alpha_test", &self.alpha_test.len())
            .field("transparent", &self.transparent.len())
            .field("depth_only", &self.depth_only.len())
            .field("particles", &self.particles.len())
            .finish()
    }
}

impl RenderingGroup {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn opaque(&self) -> &[SubMeshEntry] {
        &self.opaque
    }

    pub fn alpha_test(&self) -> &[SubMeshEntry] {
        &self.alpha_test
    }

    pub fn transparent(&self) -> &[SubMeshEntry] {
        &self.transparent
    }

    pub fn depth_only(&self) -> &[SubMeshEntry] {
        &self.depth_only
    }

    pub fn particles(&self) -> &[ParticleSystemHandle] {
        &self.particles
    }

    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty()
            && self.alpha_test.is_empty()
            && self.transparent.is_empty()
            && self.depth_only.is_empty()
            && self.particles.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.opaque.clear();
        self.alpha_test.clear();
        self.transparent.clear();
        self.depth_only.clear();
        self.particles.clear();
    }

    pub(crate) fn dispatch(&mut self, entry: SubMeshEntry, bucket: RenderBucket, depth_pre_pass: bool) {
        match bucket {
            RenderBucket::Opaque => self.opaque.push(entry),
            RenderBucket::AlphaTest => self.alpha_test.push(entry),
            RenderBucket::Transparent => {
                if depth_pre_pass {
                    self.depth_only.push(entry.clone());
                }
                self.transparent.push(entry);
            }
        }
    }

    pub(crate) fn dispatch_particles(&mut self, system: ParticleSystemHandle) {
        if !self.particles.contains(&system) {
            self.particles.push(system);
        }
    }

    pub(crate) fn remove_mesh(&mut self, mesh: MeshHandle) {
        for bucket in [
            &mut self.opaque,
            &mut self.alpha_test,
            &mut self.transparent,
            &mut self.depth_only,
        ] {
            bucket.retain(|e| e.mesh != mesh);
        }
    }

    pub(crate) fn remove_particle_system(&mut self, system: ParticleSystemHandle) {
        self.particles.retain(|p| *p != system);
    }

    /// Stable sort of every bucket
    pub(crate) fn sort(&mut self) {
        sort_bucket(&mut self.depth_only, self.transparent_sort.as_ref(), back_to_front);
        sort_bucket(&mut self.opaque, self.opaque_sort.as_ref(), front_to_back);
        sort_bucket(&mut self.alpha_test, self.alpha_test_sort.as_ref(), front_to_back);
        sort_bucket(&mut self.transparent, self.transparent_sort.as_ref(), back_to_front);
    }

    /// Draw order: depth-only, opaque, alpha-test, particles, transparent
    pub(crate) fn render(&mut self, drawer: &mut dyn SubMeshDrawer) {
        self.sort();

        if !self.depth_only.is_empty() {
            drawer.set_color_write(false);
            for entry in &self.depth_only {
                drawer.draw_sub_mesh(entry, DrawPass::DepthOnly);
            }
            drawer.set_color_write(true);
        }

        for entry in &self.opaque {
            drawer.draw_sub_mesh(entry, DrawPass::Opaque);
        }

        for entry in &self.alpha_test {
            drawer.draw_sub_mesh(entry, DrawPass::AlphaTest);
        }

        if !self.particles.is_empty() {
            drawer.draw_particles(self.index, &self.particles);
        }

        if !self.transparent.is_empty() {
            for entry in &self.transparent {
                drawer.draw_sub_mesh(entry, DrawPass::Transparent);
            }
            drawer.set_alpha_mode(AlphaMode::Disable);
        }
    }
}

fn sort_bucket(
    bucket: &mut [SubMeshEntry],
    custom: Option<&SubMeshComparator>,
    default: fn(&SubMeshEntry, &SubMeshEntry) -> Ordering,
) {
    match custom {
        Some(compare) => bucket.sort_by(|a, b| compare(a, b)),
        None => bucket.sort_by(default),
    }
}
