//! Materials: the collaborator that decides how a submesh is shaded

use crate::device::{AlphaMode, CullMode, EffectDescriptor, EffectHandle, GraphicsDevice, RenderState, UniformValue};
use crate::handle::{MaterialHandle, MeshHandle};
use crate::mesh::{Mesh, SubMesh, SubMeshEffect};
use crate::node::Identified;
use glam::Mat4;
use hecs::World;
use log::warn;
use lumen_core::{Color, Result, UniqueId};

/// Everything a material needs to bind for one draw
pub struct MaterialBindContext<'a> {
    pub world: Mat4,
    pub mesh: &'a Mesh,
    pub sub_mesh_index: usize,
    /// Variant resolved for this submesh during evaluation
    pub effect: EffectHandle,
}

/// A material as seen by the render loop
pub trait Material: Send + Sync {
    fn name(&self) -> &str;

    /// Compile or look up the effect for this submesh, recording it in
    /// `cache`; true once it can be drawn
    fn is_ready_for_sub_mesh(
        &mut self,
        device: &mut dyn GraphicsDevice,
        mesh: &Mesh,
        sub_mesh: &SubMesh,
        cache: &mut SubMeshEffect,
        use_instances: bool,
    ) -> bool;

    /// Full bind: effect, state and every uniform
    fn bind(&mut self, device: &mut dyn GraphicsDevice, context: &MaterialBindContext<'_>) -> Result<()>;

    /// Cheap rebind when the same material, effect and visibility are already bound
    fn bind_only_world_matrix(&mut self, device: &mut dyn GraphicsDevice, world: &Mat4) {
        device.set_uniform("world", UniformValue::Mat4(*world));
    }

    fn unbind(&mut self, _device: &mut dyn GraphicsDevice) {}

    fn need_alpha_blending(&self) -> bool;

    fn need_alpha_blending_for_mesh(&self, mesh: &Mesh) -> bool {
        self.need_alpha_blending() || mesh.visibility < 1.0
    }

    fn need_alpha_testing(&self) -> bool;

    /// Draw once into depth only before the transparent pass
    fn need_depth_pre_pass(&self) -> bool {
        false
    }

    fn back_face_culling(&self) -> bool {
        true
    }

    fn alpha_mode(&self) -> AlphaMode {
        AlphaMode::Combine
    }

    /// Drop compiled state
    fn dispose(&mut self) {}
}

/// A material stored in the scene
pub struct MaterialEntry {
    pub name: String,
    pub id: String,
    pub material: Box<dyn Material>,
    pub(crate) unique_id: Option<UniqueId>,
}

impl MaterialEntry {
    pub fn new(material: impl Material + 'static) -> Self {
        let name = material.name().to_string();
        Self {
            id: name.clone(),
            name,
            material: Box::new(material),
            unique_id: None,
        }
    }
}

impl std::fmt::Debug for MaterialEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialEntry")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("unique_id", &self.unique_id)
            .finish_non_exhaustive()
    }
}

impl Identified for MaterialEntry {
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

/// Flat-colored material with optional transparency and alpha testing.
///
/// Defines are derived from the mesh and the material flags; the effect is
/// only recompiled when they change.
#[derive(Debug, Clone)]
pub struct BasicMaterial {
    pub name: String,
    pub diffuse: Color,
    pub alpha: f32,
    pub alpha_test: bool,
    pub alpha_mode: AlphaMode,
    pub back_face_culling: bool,
    pub depth_pre_pass: bool,
}

impl BasicMaterial {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            diffuse: Color::WHITE,
            alpha: 1.0,
            alpha_test: false,
            alpha_mode: AlphaMode::Combine,
            back_face_culling: true,
            depth_pre_pass: false,
        }
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_diffuse(mut self, diffuse: Color) -> Self {
        self.diffuse = diffuse;
        self
    }

    pub fn with_alpha_test(mut self) -> Self {
        self.alpha_test = true;
        self
    }

    fn defines_for(&self, mesh: &Mesh, use_instances: bool) -> Vec<String> {
        let mut defines = Vec::new();
        if self.alpha_test {
            defines.push("ALPHATEST".to_string());
        }
        if self.need_alpha_blending_for_mesh(mesh) {
            defines.push("ALPHABLEND".to_string());
        }
        if mesh.skeleton.is_some() {
            defines.push("BONES".to_string());
        }
        if use_instances {
            defines.push("INSTANCES".to_string());
        }
        defines
    }
}

impl Material for BasicMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_ready_for_sub_mesh(
        &mut self,
        device: &mut dyn GraphicsDevice,
        mesh: &Mesh,
        _sub_mesh: &SubMesh,
        cache: &mut SubMeshEffect,
        use_instances: bool,
    ) -> bool {
        let defines = self.defines_for(mesh, use_instances);
        if cache.effect.is_none() || cache.defines.as_ref() != Some(&defines) {
            match device.create_effect(&EffectDescriptor::new(&self.name, defines.clone())) {
                Ok(effect) => {
                    cache.effect = Some(effect);
                    cache.defines = Some(defines);
                }
                Err(e) => {
                    warn!("material '{}' failed to compile: {e}", self.name);
                    cache.clear();
                    return false;
                }
            }
        }
        cache.effect.is_some_and(|e| device.is_effect_ready(e))
    }

    fn bind(&mut self, device: &mut dyn GraphicsDevice, context: &MaterialBindContext<'_>) -> Result<()> {
        device.bind_effect(context.effect);
        device.set_state(RenderState {
            cull: if self.back_face_culling { CullMode::Back } else { CullMode::None },
            ..RenderState::default()
        });
        device.set_uniform("world", UniformValue::Mat4(context.world));
        device.set_uniform("vDiffuseColor", UniformValue::Color(self.diffuse));
        device.set_uniform("alpha", UniformValue::Float(self.alpha * context.mesh.visibility));
        Ok(())
    }

    fn need_alpha_blending(&self) -> bool {
        self.alpha < 1.0
    }

    fn need_alpha_testing(&self) -> bool {
        self.alpha_test
    }

    fn need_depth_pre_pass(&self) -> bool {
        self.depth_pre_pass
    }

    fn back_face_culling(&self) -> bool {
        self.back_face_culling
    }

    fn alpha_mode(&self) -> AlphaMode {
        self.alpha_mode
    }
}

/// Run `material`'s readiness check for one submesh of `mesh`, keeping the
/// resolved variant in that submesh's cache.
///
/// Returns the effect to draw with once it is compiled. A cache built for a
/// different material is discarded first.
pub(crate) fn prepare_sub_mesh(
    world: &World,
    device: &mut dyn GraphicsDevice,
    mesh: MeshHandle,
    sub_mesh_index: usize,
    material: MaterialHandle,
    use_instances: bool,
) -> Option<EffectHandle> {
    let mut mesh = world.get::<&mut Mesh>(mesh.0).ok()?;
    let mut entry = world.get::<&mut MaterialEntry>(material.0).ok()?;
    let mut cache = std::mem::take(&mut mesh.sub_meshes.get_mut(sub_mesh_index)?.effect);
    if cache.material != Some(material) {
        cache = SubMeshEffect {
            material: Some(material),
            ..SubMeshEffect::default()
        };
    }
    let ready = entry.material.is_ready_for_sub_mesh(
        device,
        &mesh,
        &mesh.sub_meshes[sub_mesh_index],
        &mut cache,
        use_instances,
    );
    let effect = cache.effect.filter(|_| ready);
    mesh.sub_meshes[sub_mesh_index].effect = cache;
    effect
}
