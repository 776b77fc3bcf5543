//! Lights and their priority ordering

use crate::node::Node;
use glam::Vec3;
use lumen_animation::{Animation, AnimationTarget, AnimationValue};
use lumen_core::Color;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Point,
    Directional { direction: Vec3 },
    Spot { direction: Vec3, angle: f32, exponent: f32 },
    Hemispheric { direction: Vec3, ground_color: Color },
}

#[derive(Debug, Clone)]
pub struct Light {
    pub node: Node,
    pub kind: LightKind,
    pub intensity: f32,
    pub diffuse: Color,
    pub specular: Color,
    pub range: f32,
    /// Higher priorities sort first
    pub render_priority: i32,
    /// Lights with an active shadow generator sort ahead of all others
    pub shadow_enabled: bool,
    pub include_only_with_layer_mask: u32,
}

impl Light {
    pub fn new(name: &str, kind: LightKind) -> Self {
        Self {
            node: Node::new(name),
            kind,
            intensity: 1.0,
            diffuse: Color::WHITE,
            specular: Color::WHITE,
            range: f32::MAX,
            render_priority: 0,
            shadow_enabled: false,
            include_only_with_layer_mask: 0,
        }
    }

    pub fn point(name: &str, position: Vec3) -> Self {
        let mut light = Self::new(name, LightKind::Point);
        light.node.transform.position = position;
        light
    }

    pub fn hemispheric(name: &str, direction: Vec3) -> Self {
        Self::new(
            name,
            LightKind::Hemispheric {
                direction,
                ground_color: Color::BLACK,
            },
        )
    }

    pub fn with_priority(mut self, render_priority: i32) -> Self {
        self.render_priority = render_priority;
        self
    }

    /// Whether this light affects a mesh on the given layers
    pub fn can_affect_layer(&self, layer_mask: u32) -> bool {
        self.include_only_with_layer_mask == 0 || self.include_only_with_layer_mask & layer_mask != 0
    }
}

/// Shadow casters first, then descending render priority
pub fn compare_lights_priority(a: &Light, b: &Light) -> Ordering {
    b.shadow_enabled
        .cmp(&a.shadow_enabled)
        .then_with(|| b.render_priority.cmp(&a.render_priority))
}

impl AnimationTarget for Light {
    fn animations(&self) -> &[Animation] {
        &self.node.animations
    }

    fn set_animated_property(&mut self, property: &str, value: &AnimationValue) -> bool {
        match (property, value) {
            ("intensity", AnimationValue::Float(f)) => self.intensity = *f,
            ("range", AnimationValue::Float(f)) => self.range = *f,
            _ => return self.node.set_transform_property(property, value),
        }
        true
    }

    fn animated_property(&self, property: &str) -> Option<AnimationValue> {
        match property {
            "intensity" => Some(AnimationValue::Float(self.intensity)),
            "range" => Some(AnimationValue::Float(self.range)),
            _ => self.node.transform_property(property),
        }
    }
}
