use crate::fade;
use crate::render::{Primitive, RasterProgram, RasterUniforms, RenderError, TextureBinding};
use crate::style::RasterPaint;
use crate::tile::TileSet;

use super::Painter;

pub fn contrast_factor(contrast: f32) -> f32 {
    if contrast > 0.0 {
        1.0 / (1.0 - contrast)
    } else {
        1.0 + contrast
    }
}

pub fn saturation_factor(saturation: f32) -> f32 {
    if saturation > 0.0 {
        1.0 - 1.0 / (1.001 - saturation)
    } else {
        -saturation
    }
}

/// Hue rotation weights for an angle in degrees.
pub fn spin_weights(degrees: f32) -> [f32; 3] {
    let (s, c) = degrees.to_radians().sin_cos();
    let sqrt3 = 3f32.sqrt();
    [
        (2.0 * c + 1.0) / 3.0,
        (-sqrt3 * s - c + 1.0) / 3.0,
        (sqrt3 * s - c + 1.0) / 3.0,
    ]
}

/// Writes the layer-wide color correction uniforms.
pub(super) fn apply_color_correction(u: &mut RasterUniforms, paint: &RasterPaint) {
    let [w0, w1, w2] = spin_weights(paint.hue_rotate);
    u.spin_weights = [w0, w1, w2, 0.0];
    u.brightness_low = paint.brightness[0];
    u.brightness_high = paint.brightness[1];
    u.saturation_factor = saturation_factor(paint.saturation);
    u.contrast_factor = contrast_factor(paint.contrast);
}

pub(super) fn draw_raster(
    p: &mut Painter<'_>,
    paint: &RasterPaint,
    tiles: &TileSet<'_>,
) -> Result<(), RenderError> {
    let env = p.env;
    let mut p = p.preserve_state();
    p.ctx.set_stencil_test(false);

    p.ctx.switch_program::<RasterProgram>();
    {
        let u = p.ctx.uniforms::<RasterProgram>()?;
        apply_color_correction(u, paint);
        u.buffer_scale = 1.0;
    }

    for view in tiles.iter() {
        let tile = view.tile;
        let Some(texture) = tile.texture else {
            continue;
        };
        let parent = tiles
            .source
            .and_then(|source| source.find_loaded_parent(tile.coord))
            .filter(|parent| parent.texture.is_some());

        let mut opacities = fade::opacities(tile, parent, tiles.source, paint, env.now);

        p.ctx.bind_texture(0, Some(TextureBinding::linear(texture)))?;
        let (scale_parent, tl_parent) = match parent.and_then(|pt| pt.texture.map(|t| (pt, t))) {
            Some((parent, parent_texture)) => {
                p.ctx.bind_texture(1, Some(TextureBinding::linear(parent_texture)))?;
                tile.coord.position_in(parent.coord.z)
            }
            None => {
                p.ctx.bind_texture(1, None)?;
                opacities[1] = 0.0;
                (1.0, [0.0, 0.0])
            }
        };

        {
            let u = p.ctx.uniforms::<RasterProgram>()?;
            u.matrix = view.pos_matrix.to_cols_array_2d();
            u.tl_parent = tl_parent;
            u.scale_parent = scale_parent;
            u.opacity0 = opacities[0];
            u.opacity1 = opacities[1];
        }

        let quad = tile.bounds.as_ref().unwrap_or(env.tile_extent);
        p.ctx.bind_vertex_buffer(quad)?;
        p.ctx.draw_arrays(Primitive::TriangleStrip, 0, quad.len() as u32)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::super::test_support::Harness;
    use super::*;
    use crate::render::{GpuCmd, StencilMode, TextureId, TextureSource, Uniforms};
    use crate::tile::{Tile, TileCoord, TileSource};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    struct Source {
        parent: Tile,
    }

    impl TileSource for Source {
        fn find_loaded_parent(&self, coord: TileCoord) -> Option<&Tile> {
            (coord.ancestor(self.parent.coord.z) == Some(self.parent.coord)).then_some(&self.parent)
        }

        fn covering_zoom(&self) -> i32 {
            3
        }
    }

    #[test]
    fn color_correction_factors() {
        assert!(approx(contrast_factor(0.5), 2.0));
        assert!(approx(contrast_factor(-0.5), 0.5));
        assert!(approx(contrast_factor(0.0), 1.0));
        assert!(approx(saturation_factor(0.0), 0.0));
        assert!(approx(saturation_factor(-0.4), 0.4));
        assert!(approx(saturation_factor(0.5), 1.0 - 1.0 / 0.501));
    }

    #[test]
    fn zero_hue_rotation_is_identity() {
        let w = spin_weights(0.0);
        assert!(approx(w[0], 1.0) && approx(w[1], 0.0) && approx(w[2], 0.0));
        let w = spin_weights(120.0);
        assert!(approx(w[0], 0.0) && approx(w[1], 0.0) && approx(w[2], 1.0));
    }

    #[test]
    fn tiles_without_texture_are_skipped() {
        let mut h = Harness::new();
        let tile = Tile::new(TileCoord::new(1, 0, 0), Instant::now());
        let tiles = TileSet::new(None, [&tile]);
        draw_raster(&mut h.painter(), &RasterPaint::default(), &tiles).unwrap();
        assert!(h.ctx.commands().iter().all(|c| c.as_draw().is_none()));
        assert!(h.ctx.stencil_test());
    }

    #[test]
    fn crossfades_with_loaded_parent() {
        let mut h = Harness::new();
        let now = h.now;

        let mut parent = Tile::new(TileCoord::new(2, 1, 0), now - Duration::from_secs(5));
        let parent_texture = TextureId::allocate();
        parent.texture = Some(parent_texture);
        let source = Source { parent };

        let mut tile = Tile::new(TileCoord::new(3, 3, 1), now - Duration::from_millis(150));
        let texture = TextureId::allocate();
        tile.texture = Some(texture);

        let tiles = TileSet::new(Some(&source), [&tile]);
        draw_raster(&mut h.painter(), &RasterPaint::default(), &tiles).unwrap();

        let draws: Vec<_> = h.ctx.commands().iter().filter_map(GpuCmd::as_draw).collect();
        assert_eq!(draws.len(), 1);
        let draw = draws[0];
        assert_eq!(draw.stencil, StencilMode::Disabled);
        assert_eq!(draw.textures[0].map(|t| t.source), Some(TextureSource::Texture(texture)));
        assert_eq!(
            draw.textures[1].map(|t| t.source),
            Some(TextureSource::Texture(parent_texture))
        );

        let Uniforms::Raster(u) = draw.uniforms else { panic!() };
        assert_eq!(u.scale_parent, 0.5);
        assert_eq!(u.tl_parent, [0.5, 0.5]);
        assert!(approx(u.opacity0 + u.opacity1, 1.0));
        assert!(approx(u.opacity0, 0.5));
        assert_eq!(u.buffer_scale, 1.0);

        // Stencil testing is back on for the next layer.
        assert!(h.ctx.stencil_test());
    }

    #[test]
    fn missing_parent_zeroes_ancestor_opacity() {
        let mut h = Harness::new();
        let mut tile = Tile::new(TileCoord::new(0, 0, 0), h.now);
        tile.texture = Some(TextureId::allocate());
        let tiles = TileSet::new(None, [&tile]);
        let paint = RasterPaint {
            opacity: 0.7,
            ..RasterPaint::default()
        };
        draw_raster(&mut h.painter(), &paint, &tiles).unwrap();

        let draw = h.ctx.commands().iter().find_map(GpuCmd::as_draw).unwrap();
        let Uniforms::Raster(u) = draw.uniforms else { panic!() };
        assert_eq!((u.opacity0, u.opacity1), (0.7, 0.0));
        assert_eq!(draw.textures[1], None);
    }
}
