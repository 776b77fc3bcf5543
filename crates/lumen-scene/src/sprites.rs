//! Sprite managers: camera-facing quads picked separately from meshes

use crate::mesh::DEFAULT_LAYER_MASK;
use crate::picking::Ray;
use glam::Vec3;

/// Hit on one sprite of a manager
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteHit {
    pub sprite_index: usize,
    pub distance: f32,
    pub point: Vec3,
}

/// A collection of sprites that can be intersected by a pick ray
pub trait SpriteManager {
    fn name(&self) -> &str;

    fn is_pickable(&self) -> bool {
        true
    }

    fn layer_mask(&self) -> u32 {
        DEFAULT_LAYER_MASK
    }

    /// Nearest hit (or the first, with `fast_check`) among sprites accepted by `predicate`
    fn intersects(&self, ray: &Ray, predicate: &dyn Fn(&Sprite) -> bool, fast_check: bool) -> Option<SpriteHit>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub name: String,
    pub position: Vec3,
    pub size: f32,
    pub is_pickable: bool,
}

impl Sprite {
    pub fn new(name: &str, position: Vec3, size: f32) -> Self {
        Self {
            name: name.to_string(),
            position,
            size,
            is_pickable: true,
        }
    }
}

/// Sprites picked as spheres of diameter `size`, which matches a billboard
/// seen from any direction
#[derive(Debug, Clone, Default)]
pub struct BillboardSprites {
    pub name: String,
    pub sprites: Vec<Sprite>,
    pub is_pickable: bool,
}

impl BillboardSprites {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sprites: Vec::new(),
            is_pickable: true,
        }
    }

    pub fn add(&mut self, sprite: Sprite) -> usize {
        self.sprites.push(sprite);
        self.sprites.len() - 1
    }
}

impl SpriteManager for BillboardSprites {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_pickable(&self) -> bool {
        self.is_pickable
    }

    fn intersects(&self, ray: &Ray, predicate: &dyn Fn(&Sprite) -> bool, fast_check: bool) -> Option<SpriteHit> {
        let mut best: Option<SpriteHit> = None;
        for (index, sprite) in self.sprites.iter().enumerate() {
            if !sprite.is_pickable || !predicate(sprite) {
                continue;
            }
            let radius = sprite.size * 0.5;
            if !ray.intersects_sphere(sprite.position, radius) {
                continue;
            }
            let distance = (sprite.position - ray.origin).dot(ray.direction).max(0.0);
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(SpriteHit {
                    sprite_index: index,
                    distance,
                    point: ray.at(distance),
                });
                if fast_check {
                    break;
                }
            }
        }
        best
    }
}
