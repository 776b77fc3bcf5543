//! Phases of one `render()` call
//!
//! A frame always walks the same path, with no waiting state:
//! `Idle -> PreparingFrame -> Animating -> Stepping -> PerCameraRendering -> Done -> Idle`.

/// Where a scene currently is within its frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderPhase {
    /// Between frames
    #[default]
    Idle,
    /// Readiness check, counters reset, before-render observers
    PreparingFrame,
    /// Animation tick
    Animating,
    /// Fixed-step or single-step simulation advance
    Stepping,
    /// Per-camera evaluation and draw dispatch
    PerCameraRendering,
    /// After-render observers and bookkeeping
    Done,
}

impl RenderPhase {
    /// The phase that unconditionally follows this one
    pub fn successor(self) -> Self {
        match self {
            RenderPhase::Idle => RenderPhase::PreparingFrame,
            RenderPhase::PreparingFrame => RenderPhase::Animating,
            RenderPhase::Animating => RenderPhase::Stepping,
            RenderPhase::Stepping => RenderPhase::PerCameraRendering,
            RenderPhase::PerCameraRendering => RenderPhase::Done,
            RenderPhase::Done => RenderPhase::Idle,
        }
    }

    /// True while a frame is in flight
    pub fn is_rendering(self) -> bool {
        self != RenderPhase::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_cycle_returns_to_idle() {
        let mut phase = RenderPhase::default();
        let mut visited = vec![phase];
        for _ in 0..6 {
            phase = phase.successor();
            visited.push(phase);
        }
        assert_eq!(
            visited,
            vec![
                RenderPhase::Idle,
                RenderPhase::PreparingFrame,
                RenderPhase::Animating,
                RenderPhase::Stepping,
                RenderPhase::PerCameraRendering,
                RenderPhase::Done,
                RenderPhase::Idle,
            ]
        );
    }

    #[test]
    fn only_idle_is_not_rendering() {
        assert!(!RenderPhase::Idle.is_rendering());
        assert!(RenderPhase::Stepping.is_rendering());
    }
}
