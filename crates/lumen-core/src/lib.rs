//! Lumen Core - Foundational types for the Lumen scene engine
//!
//! This crate provides the core types that all other Lumen crates depend on:
//! - `UniqueIdGenerator` - Per-scene monotonic identifiers
//! - `PerfCounter` - Frame timing and counting accumulators
//! - `Transform`, `Color`, `Viewport` - Spatial and presentation types
//! - Error types and Result alias

mod error;
mod id;
mod perf;
mod types;

pub use error::{LumenError, Result};
pub use id::{UniqueId, UniqueIdGenerator};
pub use perf::PerfCounter;
pub use types::{Color, Transform, Viewport};

/// Re-exported math types so downstream crates agree on one `glam` version
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
