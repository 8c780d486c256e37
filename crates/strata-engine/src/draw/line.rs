use crate::assets::ImagePosition;
use crate::render::{LinePatternProgram, LineProgram, RenderError, TextureBinding};
use crate::style::{Layer, LinePaint};
use crate::tile::TileSet;

use super::Painter;

/// Line geometry derived from paint and device pixel ratio, in pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LineWidths {
    pub antialiasing: f32,
    pub blur: f32,
    /// Distance of the line's center from the geometry, for gap widths.
    pub offset: f32,
    pub outset: f32,
    pub inset: f32,
}

pub fn line_widths(paint: &LinePaint, pixel_ratio: f32) -> LineWidths {
    let width = paint.width;
    let antialiasing = 1.0 / pixel_ratio;
    let offset = if paint.gap_width > 0.0 {
        paint.gap_width / 2.0 + width / 2.0
    } else {
        0.0
    };
    LineWidths {
        antialiasing,
        blur: paint.blur + antialiasing,
        offset,
        outset: offset + width / 2.0 + antialiasing / 2.0,
        inset: (offset - width / 2.0 - antialiasing / 2.0).max(-1.0) + 1.0,
    }
}

#[derive(Copy, Clone)]
enum Shader<'s> {
    Solid,
    Pattern(&'s ImagePosition),
}

pub(super) fn draw_line(
    p: &mut Painter<'_>,
    layer: &Layer,
    paint: &LinePaint,
    tiles: &TileSet<'_>,
) -> Result<(), RenderError> {
    if paint.width <= 0.0 {
        return Ok(());
    }
    let env = p.env;
    let widths = line_widths(paint, env.pixel_ratio);
    let linewidth = [widths.outset, widths.inset];

    let shader = match paint.image.as_deref() {
        None => Shader::Solid,
        Some(name) => {
            let Some(sprite) = env.assets.loaded_sprite() else {
                log::trace!("line layer `{}`: sprite not loaded", layer.id);
                return Ok(());
            };
            let (Some(texture), Some(pos)) = (sprite.texture, sprite.position(name)) else {
                log::debug!("line layer `{}`: no sprite image `{name}`", layer.id);
                return Ok(());
            };
            p.ctx.bind_texture(0, Some(TextureBinding::linear(texture)))?;
            Shader::Pattern(pos)
        }
    };

    switch_program(p, shader);
    match shader {
        Shader::Solid => {
            let u = p.ctx.uniforms::<LineProgram>()?;
            u.color = paint.color.to_array();
            u.dasharray = paint.dasharray;
            u.linewidth = linewidth;
            u.blur = widths.blur;
        }
        Shader::Pattern(pos) => {
            let u = p.ctx.uniforms::<LinePatternProgram>()?;
            u.pattern_tl = pos.tl;
            u.pattern_br = pos.br;
            u.fade = env.transform.zoom_fraction();
            u.linewidth = linewidth;
            u.blur = widths.blur;
        }
    }

    let key = layer.bucket_key();
    for view in tiles.iter() {
        let Some(bucket) = view.tile.bucket(key) else {
            continue;
        };
        let (Some(vertex), Some(element)) =
            (&bucket.buffers.line_vertex, &bucket.buffers.line_element)
        else {
            continue;
        };

        p.draw_clipping_mask(view.pos_matrix)?;
        switch_program(p, shader);

        let z = view.z();
        let matrix = env
            .transform
            .translate_matrix(view.pos_matrix, z, &paint.translate)
            .to_cols_array_2d();
        let exmatrix = view.tile.ex_matrix.to_cols_array_2d();
        let ratio = env.transform.tile_ratio(z);

        p.ctx.bind_vertex_buffer(vertex)?;
        p.ctx.bind_index_buffer(element)?;

        match shader {
            Shader::Solid => {
                let u = p.ctx.uniforms::<LineProgram>()?;
                u.matrix = matrix;
                u.exmatrix = exmatrix;
                u.ratio = ratio;
            }
            Shader::Pattern(pos) => {
                let factor = 8.0 / ((env.transform.tile_zoom() - z as i32) as f32).exp2();
                let u = p.ctx.uniforms::<LinePatternProgram>()?;
                u.matrix = matrix;
                u.exmatrix = exmatrix;
                u.ratio = ratio;
                u.pattern_size = [pos.size[0] * factor, pos.size[1]];
            }
        }

        for group in &bucket.groups.groups {
            p.ctx.draw_elements(
                group.first_index(),
                group.index_count(),
                group.vertex_start_index as i32,
            )?;
        }
    }
    Ok(())
}

fn switch_program(p: &mut Painter<'_>, shader: Shader<'_>) {
    match shader {
        Shader::Solid => p.ctx.switch_program::<LineProgram>(),
        Shader::Pattern(_) => p.ctx.switch_program::<LinePatternProgram>(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Instant;

    use super::super::test_support::Harness;
    use super::*;
    use crate::assets::SpriteAtlas;
    use crate::buffer::{ElementGroup, ElementGroupTable, LineVertex, PackedBuffer, Triangle};
    use crate::render::{
        DrawRange, GpuCmd, ProgramKind, StencilMode, TextureId, TextureSource, Uniforms,
    };
    use crate::style::{LayerKind, LayoutProperties};
    use crate::tile::{Bucket, Tile, TileCoord};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    fn line_tile() -> Tile {
        let mut tile = Tile::new(TileCoord::new(2, 1, 1), Instant::now());
        let mut bucket = Bucket::new(LayoutProperties::default());
        bucket.buffers.line_vertex = Some(PackedBuffer::from_records(&[LineVertex::default(); 8]));
        bucket.buffers.line_element = Some(PackedBuffer::from_records(&[Triangle::new(0, 1, 2); 4]));
        bucket.groups.groups = ElementGroupTable::from_groups(vec![
            ElementGroup {
                vertex_start_index: 0,
                vertex_length: 4,
                element_start_index: 0,
                element_length: 2,
            },
            ElementGroup {
                vertex_start_index: 4,
                vertex_length: 4,
                element_start_index: 2,
                element_length: 2,
            },
        ]);
        tile.buckets.insert("roads".into(), bucket);
        tile
    }

    #[test]
    fn widths_for_plain_two_pixel_line() {
        let paint = LinePaint {
            width: 2.0,
            ..LinePaint::default()
        };
        let w = line_widths(&paint, 1.0);
        assert_eq!(
            w,
            LineWidths {
                antialiasing: 1.0,
                blur: 1.0,
                offset: 0.0,
                outset: 1.5,
                inset: 0.0,
            }
        );
    }

    #[test]
    fn widths_with_gap_and_retina() {
        let paint = LinePaint {
            width: 2.0,
            gap_width: 4.0,
            blur: 0.5,
            ..LinePaint::default()
        };
        let w = line_widths(&paint, 2.0);
        assert!(approx(w.antialiasing, 0.5));
        assert!(approx(w.blur, 1.0));
        assert!(approx(w.offset, 3.0));
        assert!(approx(w.outset, 4.25));
        assert!(approx(w.inset, 2.75));
    }

    #[test]
    fn one_indexed_draw_per_group_after_clip_mask() {
        let mut h = Harness::new();
        let tile = line_tile();
        let tiles = TileSet::new(None, [&tile]);
        let layer = Layer::new("roads", LayerKind::Line);

        draw_line(&mut h.painter(), &layer, &LinePaint::default(), &tiles).unwrap();

        let draws: Vec<_> = h.ctx.commands().iter().filter_map(GpuCmd::as_draw).collect();
        let kinds: Vec<_> = draws.iter().map(|d| d.program).collect();
        assert_eq!(
            kinds,
            [ProgramKind::ClipMask, ProgramKind::ClipMask, ProgramKind::Line, ProgramKind::Line]
        );
        assert_eq!(
            draws[3].range,
            DrawRange::Elements {
                first_index: 6,
                index_count: 6,
                base_vertex: 4,
            }
        );
        assert_eq!(draws[2].stencil, StencilMode::Test);
        let Uniforms::Line(u) = draws[2].uniforms else { panic!() };
        assert_eq!(u.linewidth, [1.0, 0.0]);
        assert!(approx(u.ratio, 1.0 / 4.0 / 8.0));
    }

    #[test]
    fn zero_width_draws_nothing() {
        let mut h = Harness::new();
        let tile = line_tile();
        let tiles = TileSet::new(None, [&tile]);
        let paint = LinePaint {
            width: 0.0,
            ..LinePaint::default()
        };
        let before = h.ctx.commands().len();
        draw_line(&mut h.painter(), &Layer::new("roads", LayerKind::Line), &paint, &tiles).unwrap();
        assert_eq!(h.ctx.commands().len(), before);
    }

    #[test]
    fn pattern_waits_for_sprite() {
        let mut h = Harness::new();
        let tile = line_tile();
        let tiles = TileSet::new(None, [&tile]);
        let paint = LinePaint {
            image: Some("rail".into()),
            ..LinePaint::default()
        };
        let layer = Layer::new("roads", LayerKind::Line);

        let before = h.ctx.commands().len();
        draw_line(&mut h.painter(), &layer, &paint, &tiles).unwrap();
        assert_eq!(h.ctx.commands().len(), before);

        let texture = TextureId::allocate();
        h.assets.sprite = Some(SpriteAtlas {
            loaded: true,
            texture: Some(texture),
            width: 64,
            height: 64,
            positions: HashMap::from([(
                "rail".to_string(),
                crate::assets::ImagePosition {
                    tl: [0.0, 0.0],
                    br: [0.5, 0.25],
                    size: [32.0, 16.0],
                },
            )]),
        });
        h.transform.zoom = 2.5;
        draw_line(&mut h.painter(), &layer, &paint, &tiles).unwrap();

        let draws: Vec<_> = h.ctx.commands().iter().filter_map(GpuCmd::as_draw).collect();
        let pattern = draws
            .iter()
            .find(|d| d.program == ProgramKind::LinePattern)
            .unwrap();
        let Uniforms::LinePattern(u) = pattern.uniforms else { panic!() };
        assert_eq!(u.pattern_br, [0.5, 0.25]);
        assert_eq!(u.pattern_size, [32.0 * 8.0, 16.0]);
        assert!(approx(u.fade, 0.5));
        assert_eq!(pattern.textures[0].map(|t| t.source), Some(TextureSource::Texture(texture)));
    }
}
