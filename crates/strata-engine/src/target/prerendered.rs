use glam::Mat4;

use crate::buffer::PackedBuffer;
use crate::paint::Color;
use crate::render::{
    Framebuffer, GaussianProgram, Primitive, RenderContext, RenderError, StencilMode,
    TextureBinding, Viewport,
};
use crate::tile::EXTENT;

use super::pool::{RenderTarget, RenderTargetPool};

/// A tile's raster group rendered once into an offscreen target.
///
/// The texture covers the tile plus `buffer` of its edge on every side, so
/// blurring does not darken the tile borders.
#[derive(Debug)]
pub struct PrerenderedTexture {
    buffer: f32,
    size: u32,
    target: Option<RenderTarget>,
}

impl PrerenderedTexture {
    /// `raster_size` is the edge length without buffer; `buffer` is a
    /// fraction of it.
    pub fn new(raster_size: f32, buffer: f32) -> Self {
        let size = (raster_size * (1.0 + 2.0 * buffer)).round().max(1.0) as u32;
        Self {
            buffer,
            size,
            target: None,
        }
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn buffer(&self) -> f32 {
        self.buffer
    }

    #[inline]
    pub fn is_materialized(&self) -> bool {
        self.target.is_some()
    }

    /// Projection from tile units onto the buffered texture.
    pub fn projection(&self) -> Mat4 {
        let b = self.buffer * EXTENT;
        Mat4::orthographic_rh_gl(-b, EXTENT + b, EXTENT + b, -b, 0.0, 1.0)
    }

    /// Makes the texture the draw destination, acquiring its target first
    /// if needed, and clears it.
    ///
    /// Stencil is cleared to the clip bit so clipped draws pass everywhere.
    pub fn bind_framebuffer(&mut self, ctx: &mut RenderContext, pool: &mut RenderTargetPool) {
        let size = self.size;
        let target = self.target.get_or_insert_with(|| pool.acquire(ctx, size));
        ctx.bind_framebuffer(Framebuffer::Target(target.id()));
        ctx.clear(
            Some(Color::TRANSPARENT.to_array()),
            Some(StencilMode::CLIP_BIT),
        );
        ctx.set_viewport(Viewport::square(size));
    }

    /// The rendered texture, for sampling.
    pub fn texture(&self) -> Result<TextureBinding, RenderError> {
        self.target
            .as_ref()
            .map(|t| TextureBinding::linear(t.id()))
            .ok_or(RenderError::TargetNotMaterialized)
    }

    /// Applies `passes` rounds of a separable gaussian blur in place.
    ///
    /// Each round renders horizontally into a pooled secondary target and
    /// vertically back. The secondary is released on every exit path and
    /// render state is restored.
    pub fn blur(
        &mut self,
        ctx: &mut RenderContext,
        pool: &mut RenderTargetPool,
        tile_extent: &PackedBuffer,
        passes: u32,
    ) -> Result<(), RenderError> {
        let Some(original) = self.target.as_ref() else {
            return Err(RenderError::TargetNotMaterialized);
        };
        if passes == 0 {
            return Ok(());
        }

        let secondary = pool.acquire(ctx, self.size);
        let saved = ctx.save_state();
        ctx.set_stencil_test(false);

        let result = blur_passes(ctx, original, &secondary, tile_extent, passes);

        ctx.restore_state(saved);
        let released = pool.release(secondary);
        match (result, released) {
            (Err(err), Err(release_err)) => {
                log::warn!("blur of {}px target: {release_err}", self.size);
                Err(err)
            }
            (Err(err), Ok(())) => Err(err),
            (Ok(()), released) => released,
        }
    }

    /// Returns the target to the pool.
    pub fn release(self, pool: &mut RenderTargetPool) -> Result<(), RenderError> {
        match self.target {
            Some(target) => pool.release(target),
            None => Ok(()),
        }
    }
}

fn blur_passes(
    ctx: &mut RenderContext,
    original: &RenderTarget,
    secondary: &RenderTarget,
    tile_extent: &PackedBuffer,
    passes: u32,
) -> Result<(), RenderError> {
    let size = original.size();
    let texel = 1.0 / size as f32;
    let count = tile_extent.len() as u32;
    let transparent = Some(Color::TRANSPARENT.to_array());

    ctx.switch_program::<GaussianProgram>();
    ctx.uniforms::<GaussianProgram>()?.matrix =
        Mat4::orthographic_rh_gl(0.0, EXTENT, EXTENT, 0.0, 0.0, 1.0).to_cols_array_2d();

    for _ in 0..passes {
        // horizontal: original -> secondary
        ctx.bind_framebuffer(Framebuffer::Target(secondary.id()));
        ctx.set_viewport(Viewport::square(size));
        ctx.clear(transparent, Some(StencilMode::CLIP_BIT));
        ctx.bind_texture(0, Some(TextureBinding::linear(original.id())))?;
        ctx.uniforms::<GaussianProgram>()?.offset = [texel, 0.0];
        ctx.bind_vertex_buffer(tile_extent)?;
        ctx.draw_arrays(Primitive::TriangleStrip, 0, count)?;

        // vertical: secondary -> original
        ctx.bind_framebuffer(Framebuffer::Target(original.id()));
        ctx.clear(transparent, None);
        ctx.bind_texture(0, Some(TextureBinding::linear(secondary.id())))?;
        ctx.uniforms::<GaussianProgram>()?.offset = [0.0, texel];
        ctx.draw_arrays(Primitive::TriangleStrip, 0, count)?;
    }

    ctx.bind_texture(0, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DrawCall, GpuCmd, TextureSource, Uniforms};
    use crate::tile::tile_extent_buffer;

    fn ctx() -> RenderContext {
        let mut ctx = RenderContext::new(Viewport::new(0, 0, 800, 600));
        ctx.begin_frame(Viewport::new(0, 0, 800, 600));
        ctx
    }

    fn draws(ctx: &RenderContext) -> Vec<&DrawCall> {
        ctx.commands().iter().filter_map(GpuCmd::as_draw).collect()
    }

    #[test]
    fn size_includes_buffer() {
        let tex = PrerenderedTexture::new(512.0, 1.0 / 32.0);
        assert_eq!(tex.size(), 544);
        assert!(!tex.is_materialized());
        assert_eq!(tex.texture(), Err(RenderError::TargetNotMaterialized));
    }

    #[test]
    fn bind_clears_and_sizes_viewport() {
        let mut ctx = ctx();
        let mut pool = RenderTargetPool::new();
        let mut tex = PrerenderedTexture::new(256.0, 0.0);
        tex.bind_framebuffer(&mut ctx, &mut pool);

        let cmds = ctx.commands();
        let tail = &cmds[cmds.len() - 4..];
        assert!(matches!(tail[0], GpuCmd::CreateTarget { size: 256, .. }));
        assert!(matches!(tail[1], GpuCmd::BindFramebuffer(Framebuffer::Target(_))));
        assert_eq!(
            tail[2],
            GpuCmd::Clear {
                color: Some([0.0; 4]),
                stencil: Some(0x80)
            }
        );
        assert_eq!(tail[3], GpuCmd::Viewport(Viewport::square(256)));
        assert!(tex.texture().is_ok());
    }

    #[test]
    fn blur_alternates_targets_and_releases_secondary() {
        let mut ctx = ctx();
        let mut pool = RenderTargetPool::new();
        let extent = tile_extent_buffer();
        let mut tex = PrerenderedTexture::new(256.0, 0.0);
        tex.bind_framebuffer(&mut ctx, &mut pool);
        let original = tex.texture().unwrap().source;

        tex.blur(&mut ctx, &mut pool, &extent, 2).unwrap();

        let draws = draws(&ctx);
        assert_eq!(draws.len(), 4);
        for pair in draws.chunks(2) {
            let (h, v) = (pair[0], pair[1]);
            assert_eq!(h.textures[0].map(|t| t.source), Some(original));
            assert_ne!(v.textures[0].map(|t| t.source), Some(original));
            assert!(matches!(h.uniforms, Uniforms::Gaussian(u) if u.offset == [1.0 / 256.0, 0.0]));
            assert!(matches!(v.uniforms, Uniforms::Gaussian(u) if u.offset == [0.0, 1.0 / 256.0]));
            assert_eq!(h.stencil, StencilMode::Disabled);
        }

        // The last pass wrote into the original.
        let TextureSource::Target(original_id) = original else { panic!() };
        let last_bind = ctx
            .commands()
            .iter()
            .rev()
            .find_map(|c| match c {
                GpuCmd::BindFramebuffer(Framebuffer::Target(id)) => Some(*id),
                _ => None,
            });
        assert_eq!(last_bind, Some(original_id));

        assert_eq!(pool.checked_out(), 1);
        assert_eq!(pool.pooled(), 1);
        assert!(ctx.stencil_test());
    }

    #[test]
    fn blur_restores_framebuffer_and_viewport() {
        let mut ctx = ctx();
        let mut pool = RenderTargetPool::new();
        let extent = tile_extent_buffer();
        let mut tex = PrerenderedTexture::new(128.0, 0.0);
        tex.bind_framebuffer(&mut ctx, &mut pool);
        let before = ctx.save_state();

        tex.blur(&mut ctx, &mut pool, &extent, 1).unwrap();
        assert_eq!(ctx.save_state(), before);
    }

    #[test]
    fn blur_before_render_fails_without_leaking() {
        let mut ctx = ctx();
        let mut pool = RenderTargetPool::new();
        let mut tex = PrerenderedTexture::new(128.0, 0.0);
        assert_eq!(
            tex.blur(&mut ctx, &mut pool, &tile_extent_buffer(), 1),
            Err(RenderError::TargetNotMaterialized)
        );
        assert_eq!(pool.checked_out(), 0);
    }

    #[test]
    fn failed_blur_keeps_its_error_and_returns_secondary() {
        let mut ctx = ctx();
        let mut pool = RenderTargetPool::new();
        let mut tex = PrerenderedTexture::new(128.0, 0.0);
        tex.bind_framebuffer(&mut ctx, &mut pool);
        let before = ctx.save_state();

        // An index buffer cannot feed the blur quad.
        let triangles = PackedBuffer::from_records(&[crate::buffer::Triangle::new(0, 1, 2)]);
        assert!(matches!(
            tex.blur(&mut ctx, &mut pool, &triangles, 1),
            Err(RenderError::BufferKindMismatch { .. })
        ));
        assert_eq!(pool.checked_out(), 1);
        assert_eq!(pool.pooled(), 1);
        assert_eq!(ctx.save_state(), before);
    }

    #[test]
    fn release_returns_target() {
        let mut ctx = ctx();
        let mut pool = RenderTargetPool::new();
        let mut tex = PrerenderedTexture::new(128.0, 0.0);
        tex.bind_framebuffer(&mut ctx, &mut pool);
        tex.release(&mut pool).unwrap();
        assert_eq!(pool.checked_out(), 0);
        assert_eq!(pool.pooled(), 1);
    }
}
