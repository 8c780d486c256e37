use std::sync::atomic::{AtomicU64, Ordering};

/// Handle of a texture registered with the executor (raster tiles, atlases).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    /// Allocates a fresh, process-unique id.
    pub fn allocate() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Handle of a pooled offscreen render target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TargetId(u32);

impl TargetId {
    #[inline]
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Anything a draw can sample from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureSource {
    Texture(TextureId),
    Target(TargetId),
}

impl From<TextureId> for TextureSource {
    fn from(id: TextureId) -> Self {
        Self::Texture(id)
    }
}

impl From<TargetId> for TextureSource {
    fn from(id: TargetId) -> Self {
        Self::Target(id)
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Filter {
    #[default]
    Linear,
    Nearest,
}

/// Texture bound to a texture unit.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureBinding {
    pub source: TextureSource,
    pub filter: Filter,
}

impl TextureBinding {
    #[inline]
    pub fn new(source: impl Into<TextureSource>, filter: Filter) -> Self {
        Self {
            source: source.into(),
            filter,
        }
    }

    #[inline]
    pub fn linear(source: impl Into<TextureSource>) -> Self {
        Self::new(source, Filter::Linear)
    }
}

/// Draw destination.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Framebuffer {
    /// The presented frame.
    #[default]
    Default,
    Target(TargetId),
}
