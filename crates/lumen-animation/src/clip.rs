//! Core animation data types

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A value an animation can drive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum AnimationValue {
    Float(f32),
    Vector3(Vec3),
    Quaternion(Quat),
}

impl AnimationValue {
    /// Linear interpolation. Quaternions use spherical interpolation.
    /// Mismatched kinds return `self` unchanged.
    pub fn lerp(&self, other: &AnimationValue, t: f32) -> AnimationValue {
        match (self, other) {
            (AnimationValue::Float(a), AnimationValue::Float(b)) => AnimationValue::Float(a + (b - a) * t),
            (AnimationValue::Vector3(a), AnimationValue::Vector3(b)) => AnimationValue::Vector3(a.lerp(*b, t)),
            (AnimationValue::Quaternion(a), AnimationValue::Quaternion(b)) => {
                AnimationValue::Quaternion(a.slerp(*b, t))
            }
            _ => *self,
        }
    }

    /// Component-wise `self + other * scale`, used to offset relative loops.
    /// Quaternions are not offset.
    pub fn add_scaled(&self, other: &AnimationValue, scale: f32) -> AnimationValue {
        match (self, other) {
            (AnimationValue::Float(a), AnimationValue::Float(b)) => AnimationValue::Float(a + b * scale),
            (AnimationValue::Vector3(a), AnimationValue::Vector3(b)) => AnimationValue::Vector3(*a + *b * scale),
            _ => *self,
        }
    }

    /// `self - other` for additive kinds
    pub fn difference(&self, other: &AnimationValue) -> Option<AnimationValue> {
        match (self, other) {
            (AnimationValue::Float(a), AnimationValue::Float(b)) => Some(AnimationValue::Float(a - b)),
            (AnimationValue::Vector3(a), AnimationValue::Vector3(b)) => Some(AnimationValue::Vector3(*a - *b)),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            AnimationValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vector3(&self) -> Option<Vec3> {
        match self {
            AnimationValue::Vector3(v) => Some(*v),
            _ => None,
        }
    }
}

/// A key: a value at a frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationKey {
    pub frame: f32,
    pub value: AnimationValue,
    /// Incoming tangent for cubic spline
    #[serde(default)]
    pub in_tangent: Option<AnimationValue>,
    /// Outgoing tangent for cubic spline
    #[serde(default)]
    pub out_tangent: Option<AnimationValue>,
}

impl AnimationKey {
    pub fn new(frame: f32, value: AnimationValue) -> Self {
        Self {
            frame,
            value,
            in_tangent: None,
            out_tangent: None,
        }
    }
}

/// What happens when a looping run passes its last frame
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Each cycle continues from where the previous one ended
    Relative,
    /// Restart from the first frame
    #[default]
    Cycle,
    /// Hold the last value
    Constant,
}

/// How to interpolate between keys
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Jump to next value (no blending)
    Step,
    /// Linear interpolation
    #[default]
    Linear,
    /// Cubic Hermite spline (uses key tangents)
    CubicSpline,
}

/// An event raised when playback crosses a frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimationEvent {
    pub frame: f32,
    pub name: String,
    /// Fire only during the first cycle
    #[serde(default)]
    pub only_once: bool,
}

/// Keyframes driving one named property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Animation {
    pub name: String,
    /// Property path on the target, e.g. `position` or `position.x`
    pub target_property: String,
    pub frames_per_second: f32,
    #[serde(default)]
    pub loop_mode: LoopMode,
    #[serde(default)]
    pub interpolation: Interpolation,
    /// Keys sorted by frame
    #[serde(default)]
    pub keys: Vec<AnimationKey>,
    #[serde(default)]
    pub events: Vec<AnimationEvent>,
}

impl Animation {
    pub fn new(name: &str, target_property: &str, frames_per_second: f32, loop_mode: LoopMode) -> Self {
        Self {
            name: name.to_string(),
            target_property: target_property.to_string(),
            frames_per_second,
            loop_mode,
            interpolation: Interpolation::Linear,
            keys: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Replace the keys, sorting them by frame
    pub fn with_keys(mut self, mut keys: Vec<AnimationKey>) -> Self {
        keys.sort_by(|a, b| a.frame.total_cmp(&b.frame));
        self.keys = keys;
        self
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn add_event(&mut self, event: AnimationEvent) {
        self.events.push(event);
        self.events.sort_by(|a, b| a.frame.total_cmp(&b.frame));
    }

    /// Frame of the first key (0 when there are no keys)
    pub fn first_frame(&self) -> f32 {
        self.keys.first().map(|k| k.frame).unwrap_or(0.0)
    }

    /// Frame of the last key (0 when there are no keys)
    pub fn last_frame(&self) -> f32 {
        self.keys.last().map(|k| k.frame).unwrap_or(0.0)
    }
}
