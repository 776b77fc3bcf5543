//! Lumen Runtime - Frame loop infrastructure
//!
//! Provides the building blocks the scene's `render()` is assembled from:
//! - `Observable` — synchronous publish/subscribe bus for lifecycle events
//! - `FrameClock` / `LockstepStepper` — frame delta measurement and fixed-step accumulation
//! - `ReadinessGate` / `ReadinessToken` — pending-resource tracking and deferred ready callbacks
//! - `SimulationSystem` — trait for simulation collaborators (physics) advanced by the frame loop
//! - `RenderPhase` — the phases one `render()` call moves through

mod clock;
mod observable;
mod readiness;
mod state;
mod system;

pub use clock::{FrameClock, LockstepStepper};
pub use observable::{EventState, Observable, ObserverHandle, MASK_ALL};
pub use readiness::{ReadinessGate, ReadinessToken};
pub use state::RenderPhase;
pub use system::SimulationSystem;
