//! Pointer events raised from pick results

use crate::handle::MeshHandle;
use crate::picking::PickingInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    Move,
    Down,
    Up,
    /// Down and up on the same mesh
    Tap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointerInfo {
    pub kind: PointerEventKind,
    pub pick_info: PickingInfo,
}

/// Which meshes the pointer is over and was pressed on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointerState {
    pub(crate) mesh_under_pointer: Option<MeshHandle>,
    pub(crate) pointer_down_mesh: Option<MeshHandle>,
    pub(crate) is_down: bool,
}

impl PointerState {
    pub fn mesh_under_pointer(&self) -> Option<MeshHandle> {
        self.mesh_under_pointer
    }

    pub fn is_down(&self) -> bool {
        self.is_down
    }

    /// Track the mesh under the pointer; a miss clears it
    pub(crate) fn on_move(&mut self, pick: &PickingInfo) {
        self.mesh_under_pointer = pick.hit.then_some(pick.picked_mesh).flatten();
    }

    pub(crate) fn on_down(&mut self, pick: &PickingInfo) {
        self.on_move(pick);
        self.is_down = true;
        self.pointer_down_mesh = self.mesh_under_pointer;
    }

    /// Record a release; true when it completes a tap on the pressed mesh
    pub(crate) fn on_up(&mut self, pick: &PickingInfo) -> bool {
        self.on_move(pick);
        let tapped = self.is_down && self.pointer_down_mesh.is_some() && self.pointer_down_mesh == self.mesh_under_pointer;
        self.is_down = false;
        self.pointer_down_mesh = None;
        tapped
    }

    /// Forget a mesh that left the scene
    pub(crate) fn forget_mesh(&mut self, mesh: MeshHandle) {
        if self.mesh_under_pointer == Some(mesh) {
            self.mesh_under_pointer = None;
        }
        if self.pointer_down_mesh == Some(mesh) {
            self.pointer_down_mesh = None;
        }
    }
}
