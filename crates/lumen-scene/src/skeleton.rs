//! Skeletons: bone hierarchies prepared once per frame for skinned meshes

use crate::node::Identified;
use glam::Mat4;
use lumen_core::UniqueId;

#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    /// Index of the parent bone; parents must come before their children
    pub parent: Option<usize>,
    pub local_matrix: Mat4,
}

impl Bone {
    pub fn new(name: &str, parent: Option<usize>, local_matrix: Mat4) -> Self {
        Self {
            name: name.to_string(),
            parent,
            local_matrix,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Skeleton {
    pub name: String,
    pub id: String,
    pub bones: Vec<Bone>,
    pub(crate) unique_id: Option<UniqueId>,
    absolute_matrices: Vec<Mat4>,
    prepared_render_id: Option<u64>,
}

impl Skeleton {
    pub fn new(name: &str, bones: Vec<Bone>) -> Self {
        Self {
            name: name.to_string(),
            id: name.to_string(),
            bones,
            unique_id: None,
            absolute_matrices: Vec::new(),
            prepared_render_id: None,
        }
    }

    /// Compute absolute bone matrices, at most once per render id.
    ///
    /// Returns true if work was done.
    pub fn prepare(&mut self, render_id: u64) -> bool {
        if self.prepared_render_id == Some(render_id) {
            return false;
        }
        self.absolute_matrices.clear();
        for (index, bone) in self.bones.iter().enumerate() {
            let parent = bone
                .parent
                .filter(|p| *p < index)
                .and_then(|p| self.absolute_matrices.get(p).copied())
                .unwrap_or(Mat4::IDENTITY);
            self.absolute_matrices.push(parent * bone.local_matrix);
        }
        self.prepared_render_id = Some(render_id);
        true
    }

    pub fn absolute_matrices(&self) -> &[Mat4] {
        &self.absolute_matrices
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }
}

impl Identified for Skeleton {
    fn name(&self) -> &str {
        &self.name
    }
    fn id(&self) -> &str {
        &self.id
    }
    fn unique_id(&self) -> Option<UniqueId> {
        self.unique_id
    }
}
