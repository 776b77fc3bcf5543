//! Lumen Scene - Scene graph and frame orchestration
//!
//! A `Scene` owns meshes, cameras, lights, materials and the other entities
//! of one world, and `Scene::render` runs a frame through an `Engine`:
//! - animation and deterministic lockstep stepping
//! - per-camera matrix updates and active-mesh evaluation (frustum culling,
//!   optional selection octree)
//! - rendering-group dispatch with opaque / alpha-test / transparent buckets
//!   and a cached material binding
//! - picking, pointer simulation and pending-data readiness
//!
//! Drawing goes through the `GraphicsDevice` trait. `RecordingDevice` is a
//! headless implementation that records every command for tests and tools.

mod bounding;
mod camera;
mod config;
mod device;
mod engine;
mod frustum;
mod handle;
mod headless;
mod light;
mod material;
mod mesh;
mod node;
mod observables;
mod octree;
mod particles;
mod picking;
mod pointer;
pub mod rendering;
mod scene;
mod skeleton;
mod sprites;
mod texture;

pub use bounding::{BoundingBox, BoundingInfo, BoundingSphere};
pub use camera::{Camera, CameraMode};
pub use config::{EngineOptions, LumenConfig, SceneConfig};
pub use device::{
    AlphaMode, CullMode, EffectDescriptor, EffectHandle, GraphicsDevice, PrimitiveType, RenderState, UniformValue,
};
pub use engine::Engine;
pub use frustum::{frustum_planes, points_in_frustum, unbounded_planes, FrustumPlanes, Plane};
pub use handle::{
    CameraHandle, LightHandle, MaterialHandle, MeshHandle, NodeHandle, ParticleSystemHandle, SceneHandle,
    SkeletonHandle, TextureHandle, TransformNodeHandle,
};
pub use headless::{DeviceCommand, RecordingDevice};
pub use light::{compare_lights_priority, Light, LightKind};
pub use material::{BasicMaterial, Material, MaterialBindContext, MaterialEntry};
pub use mesh::{DelayLoadState, Geometry, Mesh, SubMesh, SubMeshEffect, DEFAULT_LAYER_MASK};
pub use node::{Identified, Node, NodeKind, TransformNode};
pub use observables::{
    AnimationEventInfo, CameraRenderInfo, FrameInfo, RenderingGroupInfo, SceneObservables, StepInfo,
};
pub use octree::{SelectionOctree, DEFAULT_MAX_CAPACITY, DEFAULT_MAX_DEPTH};
pub use particles::{ParticleSystem, ParticleSystemEntry, PointParticleSystem};
pub use picking::{PickingInfo, Ray, TriangleHit};
pub use pointer::{PointerEventKind, PointerInfo, PointerState};
pub use scene::{DisposeRequest, MeshPredicate, PerfCounters, Removed, Scene};
pub use skeleton::{Bone, Skeleton};
pub use sprites::{BillboardSprites, Sprite, SpriteHit, SpriteManager};
pub use texture::{Texture, TextureLoadState};
