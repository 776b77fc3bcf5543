//! Textures as far as the scene is concerned: identity and load state

use crate::node::Identified;
use lumen_core::UniqueId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureLoadState {
    #[default]
    Loaded,
    /// Still streaming; the scene holds a pending-data entry until it loads
    Loading,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Texture {
    pub name: String,
    pub id: String,
    pub url: Option<String>,
    pub width: u32,
    pub height: u32,
    pub(crate) load_state: TextureLoadState,
    pub(crate) unique_id: Option<UniqueId>,
}

impl Texture {
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            id: name.to_string(),
            url: None,
            width,
            height,
            load_state: TextureLoadState::Loaded,
            unique_id: None,
        }
    }

    /// A texture whose data arrives later through `Scene::mark_texture_loaded`
    pub fn loading(name: &str, url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            load_state: TextureLoadState::Loading,
            ..Self::new(name, 0, 0)
        }
    }

    pub fn load_state(&self) -> TextureLoadState {
        self.load_state
    }

    pub fn is_ready(&self) -> bool {
        self.load_state == TextureLoadState::Loaded
    }
}

impl Identified for Texture {
    fn name(&self) -> &str {
        &self.name
    }
    fn id(&self) -> &str {
        &self.id
    }
    fn unique_id(&self) -> Option<UniqueId> {
        self.unique_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_texture_is_not_ready() {
        let texture = Texture::loading("albedo", "textures/albedo.png");
        assert!(!texture.is_ready());
        assert_eq!(texture.url.as_deref(), Some("textures/albedo.png"));
        assert!(Texture::new("white", 1, 1).is_ready());
    }
}
