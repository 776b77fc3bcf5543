//! Scene nodes: the part shared by meshes, cameras, lights and transform nodes

use crate::camera::Camera;
use crate::handle::NodeHandle;
use crate::light::Light;
use crate::mesh::Mesh;
use glam::{Mat4, Quat, Vec3};
use hecs::{Entity, World};
use log::warn;
use lumen_animation::{Animation, AnimationTarget, AnimationValue};
use lumen_core::{Transform, UniqueId};

/// Guards against parent cycles when walking up the hierarchy
const MAX_HIERARCHY_DEPTH: usize = 128;

/// The kinds of node a scene knows about.
///
/// Stored next to the kind's own component so hierarchy code can reach the
/// shared `Node` part of any entity with one exhaustive match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    TransformNode,
    Mesh,
    Camera,
    Light,
}

/// Name, identity, hierarchy and local transform of a node
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    /// Free-form id; defaults to the name and need not be unique
    pub id: String,
    pub parent: Option<NodeHandle>,
    pub enabled: bool,
    pub transform: Transform,
    /// Animations available to `Scene::begin_animation`
    pub animations: Vec<Animation>,
    pub(crate) unique_id: Option<UniqueId>,
    pub(crate) world_matrix: Mat4,
    pub(crate) world_matrix_render_id: Option<u64>,
}

impl Node {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: name.to_string(),
            parent: None,
            enabled: true,
            transform: Transform::IDENTITY,
            animations: Vec::new(),
            unique_id: None,
            world_matrix: Mat4::IDENTITY,
            world_matrix_render_id: None,
        }
    }

    /// Assigned by the scene on add; `None` while the node is outside a scene
    pub fn unique_id(&self) -> Option<UniqueId> {
        self.unique_id
    }

    /// World matrix from the last evaluation
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    /// Translation part of the last computed world matrix
    pub fn absolute_position(&self) -> Vec3 {
        self.world_matrix.w_axis.truncate()
    }

    pub(crate) fn set_transform_property(&mut self, property: &str, value: &AnimationValue) -> bool {
        let t = &mut self.transform;
        match (property, value) {
            ("position", AnimationValue::Vector3(v)) => t.position = *v,
            ("rotation", AnimationValue::Vector3(v)) => t.rotation = *v,
            ("scaling", AnimationValue::Vector3(v)) => t.scaling = *v,
            ("rotation_quaternion", AnimationValue::Quaternion(q)) => t.rotation_quaternion = Some(*q),
            (path, AnimationValue::Float(f)) => match component_mut(t, path) {
                Some(slot) => *slot = *f,
                None => return false,
            },
            _ => return false,
        }
        true
    }

    pub(crate) fn transform_property(&self, property: &str) -> Option<AnimationValue> {
        let t = &self.transform;
        match property {
            "position" => Some(AnimationValue::Vector3(t.position)),
            "rotation" => Some(AnimationValue::Vector3(t.rotation)),
            "scaling" => Some(AnimationValue::Vector3(t.scaling)),
            "rotation_quaternion" => Some(AnimationValue::Quaternion(
                t.rotation_quaternion.unwrap_or(Quat::IDENTITY),
            )),
            path => {
                let (vector, axis) = path.split_once('.')?;
                let v = match vector {
                    "position" => t.position,
                    "rotation" => t.rotation,
                    "scaling" => t.scaling,
                    _ => return None,
                };
                let f = match axis {
                    "x" => v.x,
                    "y" => v.y,
                    "z" => v.z,
                    _ => return None,
                };
                Some(AnimationValue::Float(f))
            }
        }
    }
}

fn component_mut<'a>(t: &'a mut Transform, path: &str) -> Option<&'a mut f32> {
    let (vector, axis) = path.split_once('.')?;
    let v = match vector {
        "position" => &mut t.position,
        "rotation" => &mut t.rotation,
        "scaling" => &mut t.scaling,
        _ => return None,
    };
    match axis {
        "x" => Some(&mut v.x),
        "y" => Some(&mut v.y),
        "z" => Some(&mut v.z),
        _ => None,
    }
}

/// A node with no behavior of its own, used to group and move children
#[derive(Debug, Clone)]
pub struct TransformNode {
    pub node: Node,
}

impl TransformNode {
    pub fn new(name: &str) -> Self {
        Self { node: Node::new(name) }
    }
}

impl AnimationTarget for TransformNode {
    fn animations(&self) -> &[Animation] {
        &self.node.animations
    }

    fn set_animated_property(&mut self, property: &str, value: &AnimationValue) -> bool {
        self.node.set_transform_property(property, value)
    }

    fn animated_property(&self, property: &str) -> Option<AnimationValue> {
        self.node.transform_property(property)
    }
}

/// Name, id and unique id of anything stored in a scene registry
pub trait Identified {
    fn name(&self) -> &str;
    fn id(&self) -> &str;
    fn unique_id(&self) -> Option<UniqueId>;
}

macro_rules! identified_by_node {
    ($($ty:ty),*) => {
        $(
            impl Identified for $ty {
                fn name(&self) -> &str {
                    &self.node.name
                }
                fn id(&self) -> &str {
                    &self.node.id
                }
                fn unique_id(&self) -> Option<UniqueId> {
                    self.node.unique_id
                }
            }
        )*
    };
}

identified_by_node!(Mesh, Camera, Light, TransformNode);

/// Run `f` on the `Node` part of any node entity
pub(crate) fn with_node<R>(world: &World, entity: Entity, f: impl FnOnce(&Node) -> R) -> Option<R> {
    let kind = *world.get::<&NodeKind>(entity).ok()?;
    match kind {
        NodeKind::Mesh => world.get::<&Mesh>(entity).ok().map(|c| f(&c.node)),
        NodeKind::Camera => world.get::<&Camera>(entity).ok().map(|c| f(&c.node)),
        NodeKind::Light => world.get::<&Light>(entity).ok().map(|c| f(&c.node)),
        NodeKind::TransformNode => world.get::<&TransformNode>(entity).ok().map(|c| f(&c.node)),
    }
}

/// Run `f` on the `Node` part of any node entity, mutably
pub(crate) fn with_node_mut<R>(world: &World, entity: Entity, f: impl FnOnce(&mut Node) -> R) -> Option<R> {
    let kind = *world.get::<&NodeKind>(entity).ok()?;
    match kind {
        NodeKind::Mesh => world.get::<&mut Mesh>(entity).ok().map(|mut c| f(&mut c.node)),
        NodeKind::Camera => world.get::<&mut Camera>(entity).ok().map(|mut c| f(&mut c.node)),
        NodeKind::Light => world.get::<&mut Light>(entity).ok().map(|mut c| f(&mut c.node)),
        NodeKind::TransformNode => world
            .get::<&mut TransformNode>(entity)
            .ok()
            .map(|mut c| f(&mut c.node)),
    }
}

/// World matrix of `entity`, computed at most once per render id.
///
/// Parents are resolved first. A parent handle that no longer resolves is
/// treated as the scene root.
pub(crate) fn compute_world_matrix(world: &World, entity: Entity, render_id: u64) -> Mat4 {
    compute_world_matrix_at_depth(world, entity, render_id, 0)
}

fn compute_world_matrix_at_depth(world: &World, entity: Entity, render_id: u64, depth: usize) -> Mat4 {
    let Some((parent, cached)) = with_node(world, entity, |n| {
        let cached = (n.world_matrix_render_id == Some(render_id)).then_some(n.world_matrix);
        (n.parent, cached)
    }) else {
        return Mat4::IDENTITY;
    };
    if let Some(matrix) = cached {
        return matrix;
    }

    let parent_matrix = match parent {
        Some(p) if p.0 != entity && depth < MAX_HIERARCHY_DEPTH => {
            compute_world_matrix_at_depth(world, p.0, render_id, depth + 1)
        }
        Some(_) => {
            warn!("node hierarchy too deep or cyclic, treating {entity:?} as a root");
            Mat4::IDENTITY
        }
        None => Mat4::IDENTITY,
    };

    with_node_mut(world, entity, |n| {
        let matrix = parent_matrix * n.transform.to_matrix();
        n.world_matrix = matrix;
        n.world_matrix_render_id = Some(render_id);
        matrix
    })
    .unwrap_or(Mat4::IDENTITY)
}

/// World matrix of `entity` from the current local transforms, without caching
pub(crate) fn current_world_matrix(world: &World, entity: Entity) -> Mat4 {
    let mut matrix = Mat4::IDENTITY;
    let mut current = Some(entity);
    let mut depth = 0;
    while let Some(e) = current {
        let Some((local, parent)) = with_node(world, e, |n| (n.transform.to_matrix(), n.parent)) else {
            break;
        };
        matrix = local * matrix;
        depth += 1;
        if depth > MAX_HIERARCHY_DEPTH {
            break;
        }
        current = parent.map(|p| p.0).filter(|p| *p != e);
    }
    matrix
}

/// A node is enabled when it and all of its ancestors are
pub(crate) fn is_enabled_in_hierarchy(world: &World, entity: Entity) -> bool {
    let mut current = Some(entity);
    let mut depth = 0;
    while let Some(e) = current {
        match with_node(world, e, |n| (n.enabled, n.parent)) {
            Some((false, _)) => return false,
            Some((true, parent)) => current = parent.map(|p| p.0).filter(|p| *p != e),
            None => return depth > 0,
        }
        depth += 1;
        if depth > MAX_HIERARCHY_DEPTH {
            break;
        }
    }
    true
}
