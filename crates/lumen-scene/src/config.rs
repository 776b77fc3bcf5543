//! Scene and engine configuration
//!
//! Loaded with three layers of precedence (highest wins):
//! 1. Environment variables: `LUMEN_DETERMINISTIC_LOCKSTEP`, `LUMEN_LOCKSTEP_MAX_STEPS`, `LUMEN_TIME_STEP`
//! 2. Project file: `lumen.toml`
//! 3. Built-in defaults

use lumen_core::{Color, LumenError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-scene behavior switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub clear_color: Color,
    /// Clear color, depth and stencil before each camera renders
    pub auto_clear: bool,
    pub auto_clear_depth_and_stencil: bool,
    pub animations_enabled: bool,
    /// Animate with a fixed 16 ms delta regardless of frame time
    pub use_constant_animation_delta_time: bool,
    pub animation_time_scale: f64,
    pub physics_enabled: bool,
    pub particles_enabled: bool,
    /// Treat every layer-visible mesh as inside the frustum
    pub skip_frustum_clipping: bool,
    /// Keep lights sorted by priority as they are added
    pub require_light_sorting: bool,
    /// Dispatch every submesh of an active mesh without per-submesh culling
    pub dispatch_all_sub_meshes_of_active_meshes: bool,
    pub min_delta_time_ms: f64,
    pub max_delta_time_ms: f64,
    /// Reference rate the animation ratio is measured against
    pub default_frame_rate: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            clear_color: Color::CLEAR,
            auto_clear: true,
            auto_clear_depth_and_stencil: true,
            animations_enabled: true,
            use_constant_animation_delta_time: false,
            animation_time_scale: 1.0,
            physics_enabled: true,
            particles_enabled: true,
            skip_frustum_clipping: false,
            require_light_sorting: false,
            dispatch_all_sub_meshes_of_active_meshes: false,
            min_delta_time_ms: 1.0,
            max_delta_time_ms: 1000.0,
            default_frame_rate: 60.0,
        }
    }
}

impl SceneConfig {
    pub fn validate(&self) -> Result<()> {
        check_range("scene.min_delta_time_ms", self.min_delta_time_ms, 0.0, self.max_delta_time_ms)?;
        check_range("scene.max_delta_time_ms", self.max_delta_time_ms, self.min_delta_time_ms, 60_000.0)?;
        check_range("scene.default_frame_rate", self.default_frame_rate, 1.0, 1000.0)?;
        check_range("scene.animation_time_scale", self.animation_time_scale, 0.0, 1000.0)?;
        Ok(())
    }
}

/// Engine-wide timing and render target options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Advance animation and physics in fixed steps
    pub deterministic_lockstep: bool,
    pub lockstep_max_steps: u32,
    /// Fixed step length in seconds
    pub time_step: f64,
    pub render_width: u32,
    pub render_height: u32,
    pub hardware_scaling_level: f32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            deterministic_lockstep: false,
            lockstep_max_steps: 4,
            time_step: 1.0 / 60.0,
            render_width: 1280,
            render_height: 720,
            hardware_scaling_level: 1.0,
        }
    }
}

impl EngineOptions {
    pub fn validate(&self) -> Result<()> {
        check_range("engine.time_step", self.time_step, 1e-6, 1.0)?;
        check_range("engine.lockstep_max_steps", self.lockstep_max_steps as f64, 1.0, 1000.0)?;
        check_range("engine.hardware_scaling_level", self.hardware_scaling_level as f64, 0.01, 100.0)?;
        Ok(())
    }

    /// Render target size after hardware scaling
    pub fn render_size(&self) -> (u32, u32) {
        let scale = self.hardware_scaling_level.max(0.01);
        (
            (self.render_width as f32 / scale) as u32,
            (self.render_height as f32 / scale) as u32,
        )
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_nan() || value < min || value > max {
        return Err(LumenError::ValueOutOfRange {
            field: field.to_string(),
            min,
            max,
            value,
        });
    }
    Ok(())
}

/// Contents of `lumen.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LumenConfig {
    pub scene: SceneConfig,
    pub engine: EngineOptions,
}

impl LumenConfig {
    pub const FILE_NAME: &'static str = "lumen.toml";

    /// Load with layered precedence: defaults < `lumen.toml` < env vars
    pub fn load() -> Result<Self> {
        let path = Path::new(Self::FILE_NAME);
        let mut config = if path.exists() {
            Self::load_file(path)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific file; a missing file yields the defaults
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            Self::load_file(path)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.scene.validate()?;
        self.engine.validate()
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| LumenError::ConfigParse(format!("Failed to parse config {}: {}", path.display(), e)))
    }

    /// Apply environment-style overrides; `lookup` maps a variable name to its value
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("LUMEN_DETERMINISTIC_LOCKSTEP") {
            self.engine.deterministic_lockstep = parse_bool(&value)
                .ok_or_else(|| LumenError::ConfigParse(format!("LUMEN_DETERMINISTIC_LOCKSTEP: '{value}'")))?;
        }
        if let Some(value) = lookup("LUMEN_LOCKSTEP_MAX_STEPS") {
            self.engine.lockstep_max_steps = value
                .trim()
                .parse()
                .map_err(|e| LumenError::ConfigParse(format!("LUMEN_LOCKSTEP_MAX_STEPS: {e}")))?;
        }
        if let Some(value) = lookup("LUMEN_TIME_STEP") {
            self.engine.time_step = value
                .trim()
                .parse()
                .map_err(|e| LumenError::ConfigParse(format!("LUMEN_TIME_STEP: {e}")))?;
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = LumenConfig::default();
        assert!(!config.engine.deterministic_lockstep);
        assert_eq!(config.engine.lockstep_max_steps, 4);
        assert!((config.engine.time_step - 1.0 / 60.0).abs() < 1e-12);
        assert_eq!(config.scene.min_delta_time_ms, 1.0);
        assert_eq!(config.scene.max_delta_time_ms, 1000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = LumenConfig::from_toml_str(
            r#"
            [engine]
            deterministic_lockstep = true
            time_step = 0.02

            [scene]
            require_light_sorting = true
            "#,
        )
        .unwrap();
        assert!(config.engine.deterministic_lockstep);
        assert_eq!(config.engine.time_step, 0.02);
        assert_eq!(config.engine.lockstep_max_steps, 4);
        assert!(config.scene.require_light_sorting);
        assert!(config.scene.auto_clear);
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = LumenConfig::from_toml_str("[engine\n").unwrap_err();
        assert!(matches!(err, LumenError::ConfigParse(_)));
    }

    #[test]
    fn out_of_range_time_step() {
        let err = LumenConfig::from_toml_str("[engine]\ntime_step = 0.0\n").unwrap_err();
        assert!(matches!(err, LumenError::ValueOutOfRange { .. }));
    }

    #[test]
    fn env_overrides_win() {
        let vars: HashMap<&str, &str> = [
            ("LUMEN_DETERMINISTIC_LOCKSTEP", "yes"),
            ("LUMEN_LOCKSTEP_MAX_STEPS", "8"),
            ("LUMEN_TIME_STEP", "0.01"),
        ]
        .into_iter()
        .collect();
        let mut config = LumenConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert!(config.engine.deterministic_lockstep);
        assert_eq!(config.engine.lockstep_max_steps, 8);
        assert_eq!(config.engine.time_step, 0.01);
    }

    #[test]
    fn bad_env_value() {
        let mut config = LumenConfig::default();
        let result = config.apply_overrides(|key| (key == "LUMEN_LOCKSTEP_MAX_STEPS").then(|| "many".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = LumenConfig::load_from_file(Path::new("/definitely/not/here/lumen.toml")).unwrap();
        assert_eq!(config, LumenConfig::default());
    }

    #[test]
    fn render_size_applies_scaling() {
        let options = EngineOptions {
            hardware_scaling_level: 2.0,
            ..EngineOptions::default()
        };
        assert_eq!(options.render_size(), (640, 360));
    }
}
