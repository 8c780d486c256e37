/// Frame of reference for symbol rotation.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum RotationAlignment {
    /// Rotates with the map.
    Map,
    /// Stays upright relative to the screen.
    #[default]
    Viewport,
}

/// Layout values for one symbol kind (text or icon).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SymbolLayout {
    pub rotation_alignment: RotationAlignment,
    /// Size the geometry was laid out at.
    pub max_size: f32,
    pub keep_upright: bool,
}

impl SymbolLayout {
    #[inline]
    pub fn aligned_with_map(&self) -> bool {
        self.rotation_alignment == RotationAlignment::Map
    }
}

/// Layout-parameter snapshot taken when a bucket is compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutProperties {
    /// Edge length of a prerendered raster group, without edge buffer.
    pub raster_size: Option<f32>,
    /// Fractional edge buffer of a prerendered raster group.
    pub raster_buffer: Option<f32>,
    /// Number of separable blur passes applied after prerendering.
    pub raster_blur: u32,
    pub text: SymbolLayout,
    pub icon: SymbolLayout,
    /// Bucket carries fill geometry.
    pub fill: bool,
    /// Bucket carries line geometry.
    pub line: bool,
}

impl Default for LayoutProperties {
    fn default() -> Self {
        Self {
            raster_size: None,
            raster_buffer: None,
            raster_blur: 0,
            text: SymbolLayout {
                rotation_alignment: RotationAlignment::Viewport,
                max_size: 16.0,
                keep_upright: true,
            },
            icon: SymbolLayout {
                rotation_alignment: RotationAlignment::Viewport,
                max_size: 1.0,
                keep_upright: false,
            },
            fill: false,
            line: false,
        }
    }
}
