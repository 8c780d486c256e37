//! Sprite and glyph atlases supplied by the host.

use std::collections::HashMap;

use crate::render::TextureId;

/// Location of one image inside the sprite atlas.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ImagePosition {
    /// Normalized top-left texture coordinate.
    pub tl: [f32; 2],
    /// Normalized bottom-right texture coordinate.
    pub br: [f32; 2],
    /// Image size in pixels.
    pub size: [f32; 2],
}

/// Sprite sheet used for icons and line patterns.
#[derive(Debug, Clone, Default)]
pub struct SpriteAtlas {
    /// Image and index are both available.
    pub loaded: bool,
    pub texture: Option<TextureId>,
    pub width: u32,
    pub height: u32,
    pub positions: HashMap<String, ImagePosition>,
}

impl SpriteAtlas {
    /// Loaded with a texture attached.
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.loaded && self.texture.is_some()
    }

    #[inline]
    pub fn position(&self, name: &str) -> Option<&ImagePosition> {
        self.positions.get(name)
    }
}

/// SDF glyph atlas used by text.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlyphAtlas {
    pub texture: TextureId,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Assets {
    pub sprite: Option<SpriteAtlas>,
    pub glyphs: Option<GlyphAtlas>,
}

impl Assets {
    /// Sprite atlas, only once it is loaded.
    pub fn loaded_sprite(&self) -> Option<&SpriteAtlas> {
        self.sprite.as_ref().filter(|s| s.is_loaded())
    }
}
