//! Keyframe animation for Lumen
//!
//! - `clip` — animation data: keys, loop modes, events
//! - `sampler` — pure key evaluation at a frame
//! - `animatable` — one in-flight run of a set of animations against a target
//! - `engine` — the scene-level collection of runs, advanced once per frame
//! - `target` — the capability trait animated objects implement

pub mod animatable;
pub mod clip;
pub mod engine;
pub mod sampler;
pub mod target;

pub use animatable::{Animatable, AnimatableId};
pub use clip::{Animation, AnimationEvent, AnimationKey, AnimationValue, Interpolation, LoopMode};
pub use engine::{AnimationEngine, AnimationOutcome};
pub use target::AnimationTarget;
