use super::group::{RenderBucket, RenderingGroup, SubMeshComparator, SubMeshDrawer, SubMeshEntry};
use crate::handle::{MeshHandle, ParticleSystemHandle};
use log::warn;
use lumen_core::{LumenError, Result};

/// Rendering groups are numbered `0..MAX_RENDERING_GROUPS`
pub const MAX_RENDERING_GROUPS: usize = 4;

/// Whether depth and stencil are cleared before a group draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoClearSetup {
    pub auto_clear: bool,
    pub depth: bool,
    pub stencil: bool,
}

impl Default for AutoClearSetup {
    fn default() -> Self {
        Self {
            auto_clear: true,
            depth: true,
            stencil: true,
        }
    }
}

/// Owns the rendering groups and draws them in id order
#[derive(Debug)]
pub struct RenderingManager {
    groups: Vec<RenderingGroup>,
    auto_clear: [AutoClearSetup; MAX_RENDERING_GROUPS],
}

impl Default for RenderingManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderingManager {
    pub fn new() -> Self {
        Self {
            groups: (0..MAX_RENDERING_GROUPS).map(RenderingGroup::new).collect(),
            auto_clear: [AutoClearSetup::default(); MAX_RENDERING_GROUPS],
        }
    }

    /// Empty every bucket; comparators and clear setups are kept
    pub fn reset(&mut self) {
        for group in &mut self.groups {
            group.clear();
        }
    }

    pub fn group(&self, id: usize) -> Option<&RenderingGroup> {
        self.groups.get(id)
    }

    pub fn groups(&self) -> &[RenderingGroup] {
        &self.groups
    }

    /// Queue a submesh. Out-of-range group ids are logged and dropped.
    pub fn dispatch(&mut self, group_id: usize, entry: SubMeshEntry, bucket: RenderBucket, depth_pre_pass: bool) {
        match self.groups.get_mut(group_id) {
            Some(group) => group.dispatch(entry, bucket, depth_pre_pass),
            None => warn!(
                "mesh {:?} uses rendering group {group_id}, only 0..{MAX_RENDERING_GROUPS} exist",
                entry.mesh
            ),
        }
    }

    pub fn dispatch_particles(&mut self, group_id: usize, system: ParticleSystemHandle) {
        match self.groups.get_mut(group_id) {
            Some(group) => group.dispatch_particles(system),
            None => warn!("particle system {system:?} uses rendering group {group_id}, only 0..{MAX_RENDERING_GROUPS} exist"),
        }
    }

    pub fn remove_mesh(&mut self, mesh: MeshHandle) {
        for group in &mut self.groups {
            group.remove_mesh(mesh);
        }
    }

    pub fn remove_particle_system(&mut self, system: ParticleSystemHandle) {
        for group in &mut self.groups {
            group.remove_particle_system(system);
        }
    }

    /// Override bucket sorting for a group. `None` restores the default order.
    pub fn set_rendering_order(
        &mut self,
        group_id: usize,
        opaque: Option<SubMeshComparator>,
        alpha_test: Option<SubMeshComparator>,
        transparent: Option<SubMeshComparator>,
    ) -> Result<()> {
        let group = self.groups.get_mut(group_id).ok_or(LumenError::InvalidRenderingGroup {
            id: group_id,
            max: MAX_RENDERING_GROUPS,
        })?;
        group.opaque_sort = opaque;
        group.alpha_test_sort = alpha_test;
        group.transparent_sort = transparent;
        Ok(())
    }

    pub fn set_rendering_auto_clear_depth_stencil(
        &mut self,
        group_id: usize,
        auto_clear: bool,
        depth: bool,
        stencil: bool,
    ) -> Result<()> {
        let setup = self.auto_clear.get_mut(group_id).ok_or(LumenError::InvalidRenderingGroup {
            id: group_id,
            max: MAX_RENDERING_GROUPS,
        })?;
        *setup = AutoClearSetup {
            auto_clear,
            depth,
            stencil,
        };
        Ok(())
    }

    pub fn auto_clear_setup(&self, group_id: usize) -> Option<AutoClearSetup> {
        self.auto_clear.get(group_id).copied()
    }

    /// Draw every non-empty group in id order.
    ///
    /// Group 0 never clears: the camera clear already did.
    pub fn render(&mut self, drawer: &mut dyn SubMeshDrawer) {
        for (id, group) in self.groups.iter_mut().enumerate() {
            if group.is_empty() {
                continue;
            }
            drawer.before_rendering_group(id);
            let setup = self.auto_clear[id];
            if id > 0 && setup.auto_clear && (setup.depth || setup.stencil) {
                drawer.clear_depth_stencil(setup.depth, setup.stencil);
            }
            group.render(drawer);
            drawer.after_rendering_group(id);
        }
    }
}
