//! Simulation collaborator trait

use lumen_core::Result;

/// A simulation engine (physics, typically) advanced by the frame loop.
///
/// With deterministic lockstep enabled the scene calls `fixed_update` once
/// per fixed step; otherwise `update` runs once per frame with the real delta.
pub trait SimulationSystem {
    /// Human-readable name for this system
    fn name(&self) -> &str;

    /// Advance by exactly one fixed step of `dt` seconds
    fn fixed_update(&mut self, dt: f64) -> Result<()>;

    /// Advance by a variable frame delta of `dt` seconds
    fn update(&mut self, dt: f64) -> Result<()> {
        self.fixed_update(dt)
    }

    /// Called when the owning scene is disposed
    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Integrator {
        elapsed: f64,
    }

    impl SimulationSystem for Integrator {
        fn name(&self) -> &str {
            "integrator"
        }

        fn fixed_update(&mut self, dt: f64) -> Result<()> {
            self.elapsed += dt;
            Ok(())
        }
    }

    #[test]
    fn update_defaults_to_fixed_update() {
        let mut system = Integrator { elapsed: 0.0 };
        system.update(0.5).unwrap();
        system.fixed_update(0.25).unwrap();
        assert!((system.elapsed - 0.75).abs() < 1e-12);
        assert!(system.shutdown().is_ok());
        assert_eq!(system.name(), "integrator");
    }
}
