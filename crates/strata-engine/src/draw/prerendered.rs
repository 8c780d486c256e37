use crate::render::{Primitive, RasterProgram, RenderError, TextureBinding};
use crate::style::{Layer, RasterPaint};
use crate::target::PrerenderedTexture;
use crate::tile::{Bucket, TileSet, TileView};

use super::raster::apply_color_correction;
use super::Painter;

pub(super) fn draw_prerendered(
    p: &mut Painter<'_>,
    layer: &Layer,
    paint: &RasterPaint,
    tiles: &TileSet<'_>,
) -> Result<(), RenderError> {
    let key = layer.bucket_key();
    for view in tiles.iter() {
        let Some(bucket) = view.tile.bucket(key) else {
            continue;
        };

        // Taken out while rendering so the painter can be borrowed whole.
        let cache_key = (view.tile.id(), key.to_owned());
        let texture = match p.cache.remove(&cache_key) {
            Some(texture) => texture,
            None => materialize(p, layer, bucket, view, tiles)?,
        };
        let binding = texture.texture();
        let buffer = texture.buffer();
        p.cache.insert(cache_key, texture);

        draw_cached(p, paint, view, binding?, buffer)?;
    }
    Ok(())
}

/// Renders a tile's sub-layers into a fresh prerendered texture.
fn materialize(
    p: &mut Painter<'_>,
    layer: &Layer,
    bucket: &Bucket,
    view: &TileView<'_>,
    tiles: &TileSet<'_>,
) -> Result<PrerenderedTexture, RenderError> {
    let config = p.env.config;
    let mut texture = PrerenderedTexture::new(
        bucket.layout.raster_size.unwrap_or(config.default_raster_size),
        bucket.layout.raster_buffer.unwrap_or(config.default_raster_buffer),
    );

    if let Err(err) = render_into(p, layer, bucket, view, tiles, &mut texture) {
        if let Err(release_err) = texture.release(p.pool) {
            log::warn!("prerendered layer `{}`: {release_err}", layer.id);
        }
        return Err(err);
    }
    log::debug!(
        "prerendered layer `{}` for tile {} ({}px)",
        layer.id,
        view.tile.id(),
        texture.size()
    );
    Ok(texture)
}

fn render_into(
    p: &mut Painter<'_>,
    layer: &Layer,
    bucket: &Bucket,
    view: &TileView<'_>,
    tiles: &TileSet<'_>,
    texture: &mut PrerenderedTexture,
) -> Result<(), RenderError> {
    let mut guard = p.preserve_state();
    {
        let Painter { ctx, pool, .. } = &mut *guard;
        texture.bind_framebuffer(ctx, pool);
    }

    let children = TileSet {
        source: tiles.source,
        views: vec![TileView::with_matrix(view.tile, texture.projection())],
    };
    // Back blending composites front to back: topmost child first.
    for child in layer.children.iter().rev() {
        guard.draw_layer(child, &children)?;
    }

    if bucket.layout.raster_blur > 0 {
        let Painter { ctx, pool, env, .. } = &mut *guard;
        texture.blur(ctx, pool, env.tile_extent, bucket.layout.raster_blur)?;
    }
    Ok(())
}

fn draw_cached(
    p: &mut Painter<'_>,
    paint: &RasterPaint,
    view: &TileView<'_>,
    binding: TextureBinding,
    buffer: f32,
) -> Result<(), RenderError> {
    let extent = p.env.tile_extent;
    let mut p = p.preserve_state();
    p.ctx.set_stencil_test(false);

    p.ctx.switch_program::<RasterProgram>();
    {
        let u = p.ctx.uniforms::<RasterProgram>()?;
        apply_color_correction(u, paint);
        u.matrix = view.pos_matrix.to_cols_array_2d();
        u.tl_parent = [0.0, 0.0];
        u.scale_parent = 1.0;
        u.buffer_scale = 1.0 + 2.0 * buffer;
        u.opacity0 = paint.opacity;
        u.opacity1 = 0.0;
    }

    p.ctx.bind_texture(0, Some(binding))?;
    p.ctx.bind_texture(1, None)?;
    p.ctx.bind_vertex_buffer(extent)?;
    p.ctx.draw_arrays(Primitive::TriangleStrip, 0, extent.len() as u32)
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::super::test_support::Harness;
    use super::*;
    use crate::buffer::{ElementGroup, ElementGroupTable, LineVertex, PackedBuffer, Triangle};
    use crate::render::{Framebuffer, GpuCmd, ProgramKind, TextureSource, Uniforms, Viewport};
    use crate::style::{LayerKind, LayerStyle, LayoutProperties, LinePaint, StyledLayer};
    use crate::tile::{Tile, TileCoord};

    fn group_layer() -> Layer {
        let mut layer = Layer::new("hillshade", LayerKind::PrerenderedRaster);
        layer.children.push(StyledLayer::new(
            Layer::new("contours", LayerKind::Line),
            LayerStyle::Line(LinePaint::default()),
        ));
        layer
    }

    fn group_tile(raster_blur: u32) -> Tile {
        let mut tile = Tile::new(TileCoord::new(3, 2, 2), Instant::now());

        tile.buckets.insert(
            "hillshade".into(),
            Bucket::new(LayoutProperties {
                raster_size: Some(256.0),
                raster_buffer: Some(0.0),
                raster_blur,
                ..LayoutProperties::default()
            }),
        );

        let mut lines = Bucket::new(LayoutProperties::default());
        lines.buffers.line_vertex = Some(PackedBuffer::from_records(&[LineVertex::default(); 3]));
        lines.buffers.line_element = Some(PackedBuffer::from_records(&[Triangle::new(0, 1, 2)]));
        lines.groups.groups = ElementGroupTable::from_groups(vec![ElementGroup {
            vertex_start_index: 0,
            vertex_length: 3,
            element_start_index: 0,
            element_length: 1,
        }]);
        tile.buckets.insert("contours".into(), lines);
        tile
    }

    fn draws(h: &Harness) -> Vec<&crate::render::DrawCall> {
        h.ctx.commands().iter().filter_map(GpuCmd::as_draw).collect()
    }

    #[test]
    fn renders_once_then_samples_cache() {
        let mut h = Harness::new();
        let tile = group_tile(0);
        let tiles = TileSet::new(None, [&tile]);
        let layer = group_layer();
        let paint = RasterPaint {
            opacity: 0.6,
            ..RasterPaint::default()
        };

        draw_prerendered(&mut h.painter(), &layer, &paint, &tiles).unwrap();
        let first = draws(&h).len();
        // clip mask (2) + line (1) into the target, then the cached quad.
        assert_eq!(first, 4);
        assert_eq!(h.cache.len(), 1);

        draw_prerendered(&mut h.painter(), &layer, &paint, &tiles).unwrap();
        let all = draws(&h);
        assert_eq!(all.len(), first + 1);

        let quad = all.last().unwrap();
        assert_eq!(quad.program, ProgramKind::Raster);
        assert!(matches!(quad.textures[0].map(|t| t.source), Some(TextureSource::Target(_))));
        let Uniforms::Raster(u) = quad.uniforms else { panic!() };
        assert_eq!((u.opacity0, u.opacity1, u.buffer_scale), (0.6, 0.0, 1.0));
        assert_eq!(h.pool.checked_out(), 1);
        assert_eq!(h.cache.len(), 1);
        let created = h
            .ctx
            .commands()
            .iter()
            .filter(|c| matches!(c, GpuCmd::CreateTarget { .. }))
            .count();
        assert_eq!(created, 1);
    }

    #[test]
    fn default_framebuffer_and_viewport_restored() {
        let mut h = Harness::new();
        let tile = group_tile(1);
        let tiles = TileSet::new(None, [&tile]);

        draw_prerendered(&mut h.painter(), &group_layer(), &RasterPaint::default(), &tiles).unwrap();

        assert_eq!(h.ctx.framebuffer(), Framebuffer::Default);
        assert_eq!(h.ctx.viewport(), Viewport::new(0, 0, 512, 512));
        assert!(h.ctx.stencil_test());
        // Blur borrowed a secondary and gave it back.
        assert_eq!(h.pool.checked_out(), 1);
        assert_eq!(h.pool.pooled(), 1);
        assert!(draws(&h).iter().any(|d| d.program == ProgramKind::Gaussian));
    }

    #[test]
    fn child_error_releases_target() {
        let mut h = Harness::new();
        let tile = group_tile(0);
        let tiles = TileSet::new(None, [&tile]);
        let mut layer = group_layer();
        layer.children.push(StyledLayer::new(
            Layer::new("broken", LayerKind::Symbol),
            LayerStyle::Empty,
        ));

        let err = draw_prerendered(&mut h.painter(), &layer, &RasterPaint::default(), &tiles);
        assert!(matches!(err, Err(RenderError::StyleMismatch { .. })));
        assert!(h.cache.is_empty());
        assert_eq!(h.pool.checked_out(), 0);
        assert_eq!(h.ctx.framebuffer(), Framebuffer::Default);
    }
}
