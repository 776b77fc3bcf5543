//! Scene-level animation: starting runs on nodes and writing values back

use super::Scene;
use crate::camera::Camera;
use crate::handle::NodeHandle;
use crate::light::Light;
use crate::mesh::Mesh;
use crate::node::{with_node, NodeKind, TransformNode};
use crate::observables::AnimationEventInfo;
use hecs::{Entity, World};
use log::debug;
use lumen_animation::{Animatable, AnimatableId, AnimationEngine, AnimationTarget, AnimationValue};
use lumen_core::{LumenError, Result};

/// Write one animated value into whichever node kind `entity` is
pub(crate) fn apply_animated_property(world: &World, entity: Entity, property: &str, value: &AnimationValue) -> bool {
    let Ok(kind) = world.get::<&NodeKind>(entity).map(|k| *k) else {
        return false;
    };
    match kind {
        NodeKind::Mesh => world
            .get::<&mut Mesh>(entity)
            .is_ok_and(|mut m| m.set_animated_property(property, value)),
        NodeKind::Camera => world
            .get::<&mut Camera>(entity)
            .is_ok_and(|mut c| c.set_animated_property(property, value)),
        NodeKind::Light => world
            .get::<&mut Light>(entity)
            .is_ok_and(|mut l| l.set_animated_property(property, value)),
        NodeKind::TransformNode => world
            .get::<&mut TransformNode>(entity)
            .is_ok_and(|mut t| t.set_animated_property(property, value)),
    }
}

impl Scene {
    /// Run the node's own animations between `from` and `to`, replacing runs already on it
    pub fn begin_animation(
        &mut self,
        target: impl Into<NodeHandle>,
        from: f32,
        to: f32,
        looping: bool,
        speed_ratio: f32,
    ) -> Result<AnimatableId> {
        let target = target.into();
        let animations = with_node(&self.world, target.0, |n| n.animations.clone())
            .ok_or_else(|| LumenError::EntityNotFound(format!("{target:?}")))?;
        Ok(self
            .animations
            .begin_animation(target, animations, from, to, looping, speed_ratio))
    }

    /// Run explicit animations alongside whatever is already running on the node
    pub fn begin_direct_animation(
        &mut self,
        target: impl Into<NodeHandle>,
        animations: Vec<lumen_animation::Animation>,
        from: f32,
        to: f32,
        looping: bool,
        speed_ratio: f32,
    ) -> Result<AnimatableId> {
        let target = target.into();
        if !self.world.contains(target.0) {
            return Err(LumenError::EntityNotFound(format!("{target:?}")));
        }
        Ok(self
            .animations
            .begin_direct_animation(target, animations, from, to, looping, speed_ratio))
    }

    /// Stop runs on a node; with a name only that animation
    pub fn stop_animation(&mut self, target: impl Into<NodeHandle>, animation_name: Option<&str>) -> bool {
        self.animations.stop_animation(&target.into(), animation_name)
    }

    pub fn stop_all_animations(&mut self) {
        self.animations.stop_all();
    }

    pub fn animatable(&self, id: AnimatableId) -> Option<&Animatable<NodeHandle>> {
        self.animations.animatable(id)
    }

    pub fn animatable_mut(&mut self, id: AnimatableId) -> Option<&mut Animatable<NodeHandle>> {
        self.animations.animatable_mut(id)
    }

    pub fn is_animating(&self, target: impl Into<NodeHandle>) -> bool {
        self.animations.is_animating(&target.into())
    }

    pub fn animation_engine(&self) -> &AnimationEngine<NodeHandle> {
        &self.animations
    }

    /// Advance every run by `delta_ms` of animation time
    pub(crate) fn animate(&mut self, delta_ms: f64) {
        if !self.config.animations_enabled || self.animations.is_empty() {
            return;
        }
        self.counters.animation_time.begin_monitoring();
        let world = &self.world;
        let outcome = self.animations.animate(delta_ms, |target, property, value| {
            if !apply_animated_property(world, target.0, property, value) {
                debug!("skipping animated property '{property}' on {target:?}");
            }
        });
        for (target, name) in outcome.events {
            self.observables
                .on_animation_event
                .notify_observers(&AnimationEventInfo { target, name });
        }
        self.counters.animation_time.end_monitoring(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::test_support::{engine, frame};
    use glam::Vec3;
    use lumen_animation::{Animation, AnimationEvent, AnimationKey, LoopMode};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn slide() -> Animation {
        Animation::new("slide", "position.x", 10.0, LoopMode::Constant).with_keys(vec![
            AnimationKey::new(0.0, AnimationValue::Float(0.0)),
            AnimationKey::new(10.0, AnimationValue::Float(10.0)),
        ])
    }

    #[test]
    fn node_animations_drive_transforms() {
        let mut scene = Scene::default();
        let mut engine = engine();
        let mut mesh = Mesh::new("box");
        mesh.node.animations.push(slide());
        let mesh = scene.add_mesh(mesh);

        scene.begin_animation(mesh, 0.0, 10.0, false, 1.0).unwrap();
        assert!(scene.is_animating(mesh));
        frame(&mut engine, 0);
        scene.render(&mut engine);
        frame(&mut engine, 500);
        scene.render(&mut engine);

        let x = scene.mesh(mesh).unwrap().node.transform.position.x;
        assert!((x - 5.0).abs() < 1e-3, "x = {x}");
    }

    #[test]
    fn unknown_property_leaves_the_node_untouched() {
        let mut scene = Scene::default();
        let mut engine = engine();
        let mut mesh = Mesh::new("box");
        mesh.node.animations.push(
            Animation::new("bogus", "no.such.property", 10.0, LoopMode::Constant).with_keys(vec![
                AnimationKey::new(0.0, AnimationValue::Float(0.0)),
                AnimationKey::new(10.0, AnimationValue::Float(10.0)),
            ]),
        );
        mesh.node.animations.push(slide());
        let mesh = scene.add_mesh(mesh);
        assert!(!apply_animated_property(
            &scene.world,
            mesh.0,
            "no.such.property",
            &AnimationValue::Float(1.0)
        ));

        scene.begin_animation(mesh, 0.0, 10.0, false, 1.0).unwrap();
        frame(&mut engine, 0);
        scene.render(&mut engine);
        frame(&mut engine, 500);
        scene.render(&mut engine);
        let x = scene.mesh(mesh).unwrap().node.transform.position.x;
        assert!((x - 5.0).abs() < 1e-3, "x = {x}");

        let stale = mesh.0;
        scene.remove_mesh(mesh);
        assert!(!apply_animated_property(&scene.world, stale, "position.x", &AnimationValue::Float(1.0)));
    }

    #[test]
    fn animations_can_be_disabled() {
        let mut scene = Scene::default();
        scene.config.animations_enabled = false;
        let mut engine = engine();
        let mut light = Light::point("lamp", Vec3::ZERO);
        light.node.animations.push(slide());
        let light = scene.add_light(light);

        scene.begin_animation(light, 0.0, 10.0, false, 1.0).unwrap();
        frame(&mut engine, 500);
        scene.render(&mut engine);
        assert_eq!(scene.light(light).unwrap().node.transform.position.x, 0.0);
    }

    #[test]
    fn removed_nodes_stop_animating() {
        let mut scene = Scene::default();
        let mut mesh = Mesh::new("box");
        mesh.node.animations.push(slide());
        let mesh = scene.add_mesh(mesh);
        scene.begin_animation(mesh, 0.0, 10.0, true, 1.0).unwrap();
        scene.remove_mesh(mesh);
        assert!(!scene.is_animating(mesh));
        assert!(scene.begin_animation(mesh, 0.0, 10.0, true, 1.0).is_err());
    }

    #[test]
    fn animation_events_reach_the_observable() {
        let mut scene = Scene::default();
        let mut engine = engine();
        let node = scene.add_transform_node(TransformNode::new("pivot"));
        let mut animation = slide();
        animation.add_event(AnimationEvent {
            frame: 5.0,
            name: "halfway".to_string(),
            only_once: true,
        });

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        scene
            .observables()
            .on_animation_event
            .add(move |info, _| log.borrow_mut().push(info.name.clone()));

        scene
            .begin_direct_animation(node, vec![animation], 0.0, 10.0, false, 1.0)
            .unwrap();
        frame(&mut engine, 0);
        scene.render(&mut engine);
        frame(&mut engine, 600);
        scene.render(&mut engine);
        assert_eq!(*seen.borrow(), vec!["halfway".to_string()]);
    }
}
