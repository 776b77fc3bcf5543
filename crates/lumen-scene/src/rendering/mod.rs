//! Rendering groups and the draw dispatch that runs per camera

mod cache;
mod group;
mod manager;

pub use cache::MaterialCache;
pub use group::{
    back_to_front, front_to_back, DrawPass, RenderBucket, RenderingGroup, SubMeshComparator, SubMeshDrawer,
    SubMeshEntry,
};
pub use manager::{AutoClearSetup, RenderingManager, MAX_RENDERING_GROUPS};
