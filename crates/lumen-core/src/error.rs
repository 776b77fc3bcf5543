//! Error types for Lumen

use thiserror::Error;

/// The main error type for Lumen operations
#[derive(Debug, Error)]
pub enum LumenError {
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Stale handle: {0}")]
    StaleHandle(String),

    #[error("No camera defined")]
    NoActiveCamera,

    #[error("Material bind failed: {0}")]
    MaterialBind(String),

    #[error("Effect compilation failed: {0}")]
    EffectCompilation(String),

    #[error("Graphics device lost")]
    DeviceLost,

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Physics error: {0}")]
    PhysicsError(String),

    #[error("Animation error: {0}")]
    AnimationError(String),

    #[error("Scene disposed")]
    SceneDisposed,

    #[error("Invalid rendering group: {id} (expected 0..{max})")]
    InvalidRenderingGroup { id: usize, max: usize },

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("Config value out of range: {field} must be between {min} and {max}, got {value}")]
    ValueOutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for Lumen operations
pub type Result<T> = std::result::Result<T, LumenError>;

impl From<toml::de::Error> for LumenError {
    fn from(err: toml::de::Error) -> Self {
        LumenError::ConfigParse(err.to_string())
    }
}
