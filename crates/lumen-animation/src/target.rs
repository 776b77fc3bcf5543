//! Capability trait for animated objects

use crate::clip::{Animation, AnimationValue};

/// An object whose properties animations can drive.
///
/// Properties are addressed by path (`position`, `position.x`,
/// `visibility`, ...). Implementors decide which paths they accept.
pub trait AnimationTarget {
    /// Animations attached to this object, used when a run is started by target
    fn animations(&self) -> &[Animation];

    /// Write an interpolated value. Returns false if the path or value kind is unsupported.
    fn set_animated_property(&mut self, property: &str, value: &AnimationValue) -> bool;

    /// Read the current value of a property
    fn animated_property(&self, property: &str) -> Option<AnimationValue>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Bag {
        values: HashMap<String, AnimationValue>,
        animations: Vec<Animation>,
    }

    impl AnimationTarget for Bag {
        fn animations(&self) -> &[Animation] {
            &self.animations
        }

        fn set_animated_property(&mut self, property: &str, value: &AnimationValue) -> bool {
            self.values.insert(property.to_string(), *value);
            true
        }

        fn animated_property(&self, property: &str) -> Option<AnimationValue> {
            self.values.get(property).copied()
        }
    }

    #[test]
    fn trait_objects_round_trip_values() {
        let mut bag = Bag::default();
        let target: &mut dyn AnimationTarget = &mut bag;
        assert!(target.set_animated_property("alpha", &AnimationValue::Float(0.5)));
        assert_eq!(target.animated_property("alpha"), Some(AnimationValue::Float(0.5)));
        assert!(target.animations().is_empty());
    }
}
