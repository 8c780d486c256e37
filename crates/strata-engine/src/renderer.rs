//! Frame driver: owns per-frame state and dispatches layers to the draw
//! routines.

use std::time::{Duration, Instant};

use crate::assets::Assets;
use crate::buffer::PackedBuffer;
use crate::draw::{DrawEnv, Painter, PrerenderCache};
use crate::paint::Color;
use crate::render::{GpuCmd, RenderContext, RenderError, StencilMode, Viewport};
use crate::style::StyledLayer;
use crate::target::RenderTargetPool;
use crate::tile::{tile_extent_buffer, Tile, TileCoord, TileSet};
use crate::time::{FadeProperties, FrameHistory};
use crate::transform::Transform;

#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Window over which label fades are derived from zoom changes.
    pub symbol_fade_duration: Duration,
    /// Prerendered raster edge length when the bucket does not set one.
    pub default_raster_size: f32,
    /// Prerendered raster edge buffer when the bucket does not set one.
    pub default_raster_buffer: f32,
    pub debug_point_color: Color,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            symbol_fade_duration: Duration::from_millis(300),
            default_raster_size: 512.0,
            default_raster_buffer: 1.0 / 32.0,
            debug_point_color: Color::from_premul(0.25, 0.0, 0.0, 0.25),
        }
    }
}

/// Per-frame inputs supplied by the host.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameState {
    pub transform: Transform,
    /// Device pixels per logical pixel.
    pub pixel_ratio: f32,
    pub now: Instant,
    pub rotating: bool,
    pub zooming: bool,
    /// Color cleared to before the first layer; `None` keeps the frame's
    /// previous contents.
    pub clear_color: Option<Color>,
}

impl FrameState {
    pub fn new(transform: Transform, now: Instant) -> Self {
        Self {
            transform,
            pixel_ratio: 1.0,
            now,
            rotating: false,
            zooming: false,
            clear_color: Some(Color::TRANSPARENT),
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct ActiveFrame {
    state: FrameState,
    fade: FadeProperties,
}

/// Records frames of styled layers over tiles as GPU commands.
///
/// ```text
/// renderer.begin_frame(state);
/// for (layer, tiles) in visible { renderer.draw_layer(layer, &tiles)?; }
/// executor.render(&gpu, &renderer.finish_frame())?;
/// ```
pub struct Renderer {
    config: RendererConfig,
    assets: Assets,
    ctx: RenderContext,
    pool: RenderTargetPool,
    prerendered: PrerenderCache,
    tile_extent: PackedBuffer,
    history: FrameHistory,
    frame: Option<ActiveFrame>,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            assets: Assets::default(),
            ctx: RenderContext::new(Viewport::default()),
            pool: RenderTargetPool::new(),
            prerendered: PrerenderCache::new(),
            tile_extent: tile_extent_buffer(),
            history: FrameHistory::new(),
            frame: None,
        }
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    #[inline]
    pub fn assets(&self) -> &Assets {
        &self.assets
    }

    /// Sprite and glyph atlases; the host swaps them in as they load.
    #[inline]
    pub fn assets_mut(&mut self) -> &mut Assets {
        &mut self.assets
    }

    #[inline]
    pub fn pool(&self) -> &RenderTargetPool {
        &self.pool
    }

    /// Number of cached prerendered raster groups.
    #[inline]
    pub fn prerendered_count(&self) -> usize {
        self.prerendered.len()
    }

    /// Starts recording a frame: updates the label fade window, resets the
    /// default framebuffer viewport and clears color and stencil.
    pub fn begin_frame(&mut self, state: FrameState) {
        if self.frame.is_some() {
            log::warn!("begin_frame called before finish_frame; continuing the open frame");
        }

        self.history.record(state.transform.zoom, state.now);
        let fade = self
            .history
            .fade_properties(self.config.symbol_fade_duration, state.now);

        let viewport = Viewport::new(
            0,
            0,
            (state.transform.width * state.pixel_ratio).round() as u32,
            (state.transform.height * state.pixel_ratio).round() as u32,
        );
        self.ctx.begin_frame(viewport);
        self.ctx.clear(
            state.clear_color.map(Color::to_array),
            Some(StencilMode::CLIP_BIT),
        );

        self.frame = Some(ActiveFrame { state, fade });
    }

    /// Records one layer over its visible tiles.
    pub fn draw_layer(&mut self, layer: &StyledLayer, tiles: &TileSet<'_>) -> Result<(), RenderError> {
        let Some(frame) = self.frame else {
            return Err(RenderError::FrameNotStarted);
        };
        let state = frame.state;

        let mut painter = Painter {
            ctx: &mut self.ctx,
            pool: &mut self.pool,
            cache: &mut self.prerendered,
            env: DrawEnv {
                transform: state.transform,
                assets: &self.assets,
                fade: frame.fade,
                tile_extent: &self.tile_extent,
                config: &self.config,
                now: state.now,
                pixel_ratio: state.pixel_ratio,
                rotating: state.rotating,
                zooming: state.zooming,
                projection: state.transform.projection_matrix(),
            },
        };
        painter.draw_layer(layer, tiles)
    }

    /// Ends the frame and hands over its commands for replay.
    pub fn finish_frame(&mut self) -> Vec<GpuCmd> {
        if self.frame.take().is_none() {
            log::warn!("finish_frame called without begin_frame");
        }
        self.ctx.finish()
    }

    /// Drops the cached prerendered texture of one bucket, e.g. after its
    /// style changed.
    pub fn invalidate_bucket(&mut self, coord: TileCoord, bucket_key: &str) -> Result<(), RenderError> {
        match self.prerendered.remove(&(coord.id(), bucket_key.to_owned())) {
            Some(texture) => texture.release(&mut self.pool),
            None => Ok(()),
        }
    }

    /// Releases everything the renderer holds for a tile that is going away:
    /// buffer uploads and cached prerendered textures.
    pub fn evict_tile(&mut self, tile: &Tile) -> Result<(), RenderError> {
        for buffer in tile.buffers() {
            self.ctx.forget_buffer(buffer.id());
        }

        let id = tile.id();
        let keys: Vec<_> = self
            .prerendered
            .keys()
            .filter(|(tile_id, _)| *tile_id == id)
            .cloned()
            .collect();
        for key in keys {
            if let Some(texture) = self.prerendered.remove(&key) {
                texture.release(&mut self.pool)?;
            }
        }
        Ok(())
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}
