//! Per-layer draw routines.
//!
//! A [`Painter`] bundles what the routines need for one frame: the render
//! context to record into, the target pool, the prerender cache and a
//! read-only [`DrawEnv`]. [`Painter::draw_layer`] dispatches on the layer
//! kind.

mod clip;
mod line;
mod prerendered;
mod raster;
mod symbol;
mod vertices;

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::time::Instant;

use glam::Mat4;

use crate::assets::Assets;
use crate::buffer::PackedBuffer;
use crate::render::{RenderContext, RenderError, SavedState};
use crate::renderer::RendererConfig;
use crate::style::{LayerKind, LayerStyle, StyledLayer};
use crate::target::{PrerenderedTexture, RenderTargetPool};
use crate::tile::TileSet;
use crate::time::FadeProperties;
use crate::transform::Transform;

pub use line::{line_widths, LineWidths};
pub use raster::{contrast_factor, saturation_factor, spin_weights};
pub use symbol::{quantize_angle, SdfParams};

/// Prerendered raster groups, keyed by tile id and bucket key.
pub type PrerenderCache = HashMap<(u64, String), PrerenderedTexture>;

/// Frame-wide, read-only inputs of the draw routines.
#[derive(Copy, Clone)]
pub struct DrawEnv<'a> {
    pub transform: Transform,
    pub assets: &'a Assets,
    pub fade: FadeProperties,
    /// Shared quad covering a whole tile.
    pub tile_extent: &'a PackedBuffer,
    pub config: &'a RendererConfig,
    pub now: Instant,
    pub pixel_ratio: f32,
    pub rotating: bool,
    pub zooming: bool,
    /// Pixel space to clip space.
    pub projection: Mat4,
}

pub struct Painter<'a> {
    pub ctx: &'a mut RenderContext,
    pub pool: &'a mut RenderTargetPool,
    pub cache: &'a mut PrerenderCache,
    pub env: DrawEnv<'a>,
}

impl<'a> Painter<'a> {
    /// Draws one layer over the given tiles.
    ///
    /// Not-ready inputs (missing bucket, atlas or texture) skip silently;
    /// a kind/style mismatch or a state violation is returned.
    pub fn draw_layer(&mut self, styled: &StyledLayer, tiles: &TileSet<'_>) -> Result<(), RenderError> {
        let layer = &styled.layer;
        if tiles.is_empty() {
            return Ok(());
        }
        self.ctx.unbind_textures();

        match (layer.kind, &styled.style) {
            (LayerKind::Line, LayerStyle::Line(paint)) => line::draw_line(self, layer, paint, tiles),
            (LayerKind::Raster, LayerStyle::Raster(paint)) => raster::draw_raster(self, paint, tiles),
            (LayerKind::PrerenderedRaster, LayerStyle::Raster(paint)) => {
                prerendered::draw_prerendered(self, layer, paint, tiles)
            }
            (LayerKind::Symbol, LayerStyle::Symbol(paint)) => {
                symbol::draw_symbols(self, layer, paint, tiles)
            }
            (LayerKind::DebugVertices, _) => vertices::draw_vertices(self, layer, tiles),
            (kind, style) => Err(RenderError::StyleMismatch {
                layer: layer.id.clone(),
                kind,
                style: style.name(),
            }),
        }
    }

    /// Saves blend, stencil, framebuffer and viewport state; the returned
    /// guard restores it when dropped, including on early `?` returns.
    pub fn preserve_state(&mut self) -> StateGuard<'_, 'a> {
        let saved = self.ctx.save_state();
        StateGuard {
            painter: self,
            saved,
        }
    }
}

/// Restores render state on drop.
pub struct StateGuard<'p, 'a> {
    painter: &'p mut Painter<'a>,
    saved: SavedState,
}

impl<'a> Deref for StateGuard<'_, 'a> {
    type Target = Painter<'a>;

    fn deref(&self) -> &Painter<'a> {
        self.painter
    }
}

impl<'a> DerefMut for StateGuard<'_, 'a> {
    fn deref_mut(&mut self) -> &mut Painter<'a> {
        self.painter
    }
}

impl Drop for StateGuard<'_, '_> {
    fn drop(&mut self) {
        self.painter.ctx.restore_state(self.saved);
    }
}
