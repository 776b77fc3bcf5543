//! Linear lookups over the registries

use super::Scene;
use crate::camera::Camera;
use crate::handle::{
    CameraHandle, LightHandle, MaterialHandle, MeshHandle, NodeHandle, ParticleSystemHandle, SceneHandle,
    SkeletonHandle, TextureHandle, TransformNodeHandle,
};
use crate::light::Light;
use crate::material::MaterialEntry;
use crate::mesh::Mesh;
use crate::node::{Identified, TransformNode};
use crate::particles::ParticleSystemEntry;
use crate::skeleton::Skeleton;
use crate::texture::Texture;
use hecs::{Component, World};
use lumen_core::UniqueId;

fn matches<C, P>(world: &World, entity: hecs::Entity, predicate: &P) -> bool
where
    C: Component + Identified,
    P: Fn(&C) -> bool,
{
    world.get::<&C>(entity).map_or(false, |c| predicate(&c))
}

fn find_first<H, C, P>(world: &World, handles: &[H], predicate: P) -> Option<H>
where
    H: SceneHandle,
    C: Component + Identified,
    P: Fn(&C) -> bool,
{
    handles.iter().copied().find(|h| matches::<C, P>(world, h.entity(), &predicate))
}

fn find_last<H, C, P>(world: &World, handles: &[H], predicate: P) -> Option<H>
where
    H: SceneHandle,
    C: Component + Identified,
    P: Fn(&C) -> bool,
{
    handles.iter().rev().copied().find(|h| matches::<C, P>(world, h.entity(), &predicate))
}

macro_rules! lookups {
    ($list:ident, $handle:ty, $component:ty, $by_id:ident, $last_by_id:ident, $by_unique_id:ident, $by_name:ident) => {
        pub fn $by_id(&self, id: &str) -> Option<$handle> {
            find_first::<_, $component, _>(&self.world, &self.$list, |c| c.id() == id)
        }

        pub fn $last_by_id(&self, id: &str) -> Option<$handle> {
            find_last::<_, $component, _>(&self.world, &self.$list, |c| c.id() == id)
        }

        pub fn $by_unique_id(&self, unique_id: UniqueId) -> Option<$handle> {
            find_first::<_, $component, _>(&self.world, &self.$list, |c| c.unique_id() == Some(unique_id))
        }

        pub fn $by_name(&self, name: &str) -> Option<$handle> {
            find_first::<_, $component, _>(&self.world, &self.$list, |c| c.name() == name)
        }
    };
}

impl Scene {
    lookups!(meshes, MeshHandle, Mesh, get_mesh_by_id, get_last_mesh_by_id, get_mesh_by_unique_id, get_mesh_by_name);
    lookups!(
        cameras,
        CameraHandle,
        Camera,
        get_camera_by_id,
        get_last_camera_by_id,
        get_camera_by_unique_id,
        get_camera_by_name
    );
    lookups!(lights, LightHandle, Light, get_light_by_id, get_last_light_by_id, get_light_by_unique_id, get_light_by_name);
    lookups!(
        transform_nodes,
        TransformNodeHandle,
        TransformNode,
        get_transform_node_by_id,
        get_last_transform_node_by_id,
        get_transform_node_by_unique_id,
        get_transform_node_by_name
    );
    lookups!(
        materials,
        MaterialHandle,
        MaterialEntry,
        get_material_by_id,
        get_last_material_by_id,
        get_material_by_unique_id,
        get_material_by_name
    );
    lookups!(
        skeletons,
        SkeletonHandle,
        Skeleton,
        get_skeleton_by_id,
        get_last_skeleton_by_id,
        get_skeleton_by_unique_id,
        get_skeleton_by_name
    );
    lookups!(
        particle_systems,
        ParticleSystemHandle,
        ParticleSystemEntry,
        get_particle_system_by_id,
        get_last_particle_system_by_id,
        get_particle_system_by_unique_id,
        get_particle_system_by_name
    );
    lookups!(
        textures,
        TextureHandle,
        Texture,
        get_texture_by_id,
        get_last_texture_by_id,
        get_texture_by_unique_id,
        get_texture_by_name
    );

    /// Every mesh whose id is `id`, in registry order
    pub fn get_meshes_by_id(&self, id: &str) -> Vec<MeshHandle> {
        self.meshes
            .iter()
            .copied()
            .filter(|h| matches::<Mesh, _>(&self.world, h.0, &|m: &Mesh| m.id() == id))
            .collect()
    }

    /// Search meshes, then transform nodes, lights and cameras
    pub fn get_node_by_id(&self, id: &str) -> Option<NodeHandle> {
        self.get_mesh_by_id(id)
            .map(NodeHandle::from)
            .or_else(|| self.get_transform_node_by_id(id).map(NodeHandle::from))
            .or_else(|| self.get_light_by_id(id).map(NodeHandle::from))
            .or_else(|| self.get_camera_by_id(id).map(NodeHandle::from))
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<NodeHandle> {
        self.get_mesh_by_name(name)
            .map(NodeHandle::from)
            .or_else(|| self.get_transform_node_by_name(name).map(NodeHandle::from))
            .or_else(|| self.get_light_by_name(name).map(NodeHandle::from))
            .or_else(|| self.get_camera_by_name(name).map(NodeHandle::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn named(name: &str, id: &str) -> Mesh {
        let mut mesh = Mesh::new(name);
        mesh.node.id = id.to_string();
        mesh
    }

    #[test]
    fn first_and_last_by_id() {
        let mut scene = Scene::default();
        let first = scene.add_mesh(named("a", "shared"));
        let other = scene.add_mesh(named("b", "other"));
        let last = scene.add_mesh(named("c", "shared"));

        assert_eq!(scene.get_mesh_by_id("shared"), Some(first));
        assert_eq!(scene.get_last_mesh_by_id("shared"), Some(last));
        assert_eq!(scene.get_meshes_by_id("shared"), vec![first, last]);
        assert_eq!(scene.get_mesh_by_name("b"), Some(other));
        assert_eq!(scene.get_mesh_by_id("missing"), None);
    }

    #[test]
    fn by_unique_id() {
        let mut scene = Scene::default();
        let mesh = scene.add_mesh(named("a", "a"));
        let unique_id = scene.mesh(mesh).unwrap().node.unique_id().unwrap();
        assert_eq!(scene.get_mesh_by_unique_id(unique_id), Some(mesh));

        scene.remove_mesh(mesh);
        assert_eq!(scene.get_mesh_by_unique_id(unique_id), None);
    }

    #[test]
    fn node_lookup_spans_kinds() {
        let mut scene = Scene::default();
        let light = scene.add_light(Light::point("sun", Vec3::Y));
        let camera = scene.add_camera(Camera::new("eye", Vec3::Z, Vec3::ZERO));
        assert_eq!(scene.get_node_by_name("sun"), Some(light.into()));
        assert_eq!(scene.get_node_by_id("eye"), Some(camera.into()));
        assert_eq!(scene.get_node_by_name("nobody"), None);
    }

    #[test]
    fn material_lookup() {
        let mut scene = Scene::default();
        let material = scene.add_material(crate::material::BasicMaterial::new("glass"));
        assert_eq!(scene.get_material_by_name("glass"), Some(material));
        assert_eq!(scene.get_material_by_id("glass"), Some(material));
    }
}
