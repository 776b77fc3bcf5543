use crate::device::EffectHandle;
use crate::handle::MaterialHandle;

/// The last material, effect and visibility bound on the device.
///
/// A draw whose triple matches can skip the full material bind. Resetting
/// the cache only costs a rebind.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MaterialCache {
    material: Option<MaterialHandle>,
    effect: Option<EffectHandle>,
    visibility: Option<f32>,
}

impl MaterialCache {
    pub fn is_invalid(&self, material: MaterialHandle, effect: EffectHandle, visibility: f32) -> bool {
        self.material != Some(material) || self.effect != Some(effect) || self.visibility != Some(visibility)
    }

    pub fn set(&mut self, material: MaterialHandle, effect: EffectHandle, visibility: f32) {
        self.material = Some(material);
        self.effect = Some(effect);
        self.visibility = Some(visibility);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.material.is_none() && self.effect.is_none() && self.visibility.is_none()
    }

    pub fn material(&self) -> Option<MaterialHandle> {
        self.material
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triple_must_match() {
        let mut world = hecs::World::new();
        let material = MaterialHandle(world.spawn((0u8,)));
        let other = MaterialHandle(world.spawn((1u8,)));
        let effect = EffectHandle(1);

        let mut cache = MaterialCache::default();
        assert!(cache.is_empty());
        assert!(cache.is_invalid(material, effect, 1.0));

        cache.set(material, effect, 1.0);
        assert!(!cache.is_invalid(material, effect, 1.0));
        assert!(cache.is_invalid(material, effect, 0.5));
        assert!(cache.is_invalid(other, effect, 1.0));
        assert!(cache.is_invalid(material, EffectHandle(2), 1.0));

        cache.reset();
        assert!(cache.is_invalid(material, effect, 1.0));
    }
}
