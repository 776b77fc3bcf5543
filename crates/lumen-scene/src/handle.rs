//! Typed handles into a scene's entity arena
//!
//! Each handle wraps a `hecs::Entity` (index + generation), so a handle kept
//! after its entity was removed fails to resolve instead of pointing at a
//! recycled slot.

use hecs::Entity;

/// Common access to the entity behind a handle
pub trait SceneHandle: Copy {
    fn entity(self) -> Entity;
}

macro_rules! scene_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) Entity);

        impl $name {
            /// Stable bit pattern, useful as a map key outside the scene
            pub fn to_bits(self) -> u64 {
                self.0.to_bits().get()
            }
        }

        impl SceneHandle for $name {
            fn entity(self) -> Entity {
                self.0
            }
        }
    };
}

scene_handle!(
    /// Any node: mesh, camera, light or transform node
    NodeHandle
);
scene_handle!(MeshHandle);
scene_handle!(CameraHandle);
scene_handle!(LightHandle);
scene_handle!(TransformNodeHandle);
scene_handle!(MaterialHandle);
scene_handle!(TextureHandle);
scene_handle!(SkeletonHandle);
scene_handle!(ParticleSystemHandle);

macro_rules! into_node_handle {
    ($($name:ident),*) => {
        $(
            impl From<$name> for NodeHandle {
                fn from(handle: $name) -> Self {
                    NodeHandle(handle.0)
                }
            }
        )*
    };
}

into_node_handle!(MeshHandle, CameraHandle, LightHandle, TransformNodeHandle);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_handles_share_the_entity() {
        let mut world = hecs::World::new();
        let entity = world.spawn((1u32,));
        let mesh = MeshHandle(entity);
        let node: NodeHandle = mesh.into();
        assert_eq!(node.entity(), mesh.entity());
        assert_eq!(node.to_bits(), mesh.to_bits());
    }

    #[test]
    fn stale_handles_do_not_resolve() {
        let mut world = hecs::World::new();
        let first = MeshHandle(world.spawn((1u32,)));
        world.despawn(first.entity()).unwrap();
        let second = MeshHandle(world.spawn((2u32,)));
        assert_ne!(first, second);
        assert!(!world.contains(first.entity()));
    }
}
