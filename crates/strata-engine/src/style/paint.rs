use std::time::Duration;

use crate::paint::Color;

/// Reference frame of a translate offset.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum TranslateAnchor {
    /// Offset is in map space and rotates with the map.
    #[default]
    Map,
    /// Offset is in screen space.
    Viewport,
}

/// Pixel offset applied to a layer's geometry.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Translate {
    pub offset: [f32; 2],
    pub anchor: TranslateAnchor,
}

impl Translate {
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.offset == [0.0, 0.0]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinePaint {
    pub color: Color,
    pub width: f32,
    pub gap_width: f32,
    pub blur: f32,
    /// Dash and gap length, in line widths. `[1, -1]` draws solid.
    pub dasharray: [f32; 2],
    /// Sprite image used as a repeating pattern.
    pub image: Option<String>,
    pub translate: Translate,
}

impl Default for LinePaint {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: 1.0,
            gap_width: 0.0,
            blur: 0.0,
            dasharray: [1.0, -1.0],
            image: None,
            translate: Translate::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RasterPaint {
    pub opacity: f32,
    pub fade_duration: Duration,
    pub saturation: f32,
    pub contrast: f32,
    /// Degrees.
    pub hue_rotate: f32,
    /// Output range the source brightness is mapped to.
    pub brightness: [f32; 2],
}

impl Default for RasterPaint {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            fade_duration: Duration::from_millis(300),
            saturation: 0.0,
            contrast: 0.0,
            hue_rotate: 0.0,
            brightness: [0.0, 1.0],
        }
    }
}

/// Paint values for one symbol pass (text or icon).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolPassPaint {
    /// Falls back to the layout max size when unset.
    pub size: Option<f32>,
    pub color: Color,
    pub halo_color: Option<Color>,
    pub halo_width: f32,
    pub halo_blur: f32,
    pub translate: Translate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolPaint {
    pub text: SymbolPassPaint,
    pub icon: SymbolPassPaint,
    pub icon_opacity: f32,
}

impl Default for SymbolPaint {
    fn default() -> Self {
        Self {
            text: SymbolPassPaint {
                color: Color::BLACK,
                ..Default::default()
            },
            icon: SymbolPassPaint {
                color: Color::BLACK,
                ..Default::default()
            },
            icon_opacity: 1.0,
        }
    }
}
