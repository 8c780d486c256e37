use glam::{Mat4, Vec3};

use crate::buffer::{ElementGroupTable, PackedBuffer};
use crate::render::{BlendMode, DotProgram, Primitive, RenderError};
use crate::style::Layer;
use crate::tile::TileSet;

use super::Painter;

/// Debug overlay: every fill and line vertex as a point.
///
/// wgpu rasterizes point lists at a fixed 1px, so points do not grow with
/// the pixel ratio and have no blur.
pub(super) fn draw_vertices(
    p: &mut Painter<'_>,
    layer: &Layer,
    tiles: &TileSet<'_>,
) -> Result<(), RenderError> {
    let color = p.env.config.debug_point_color;
    let mut p = p.preserve_state();
    p.ctx.set_blend(BlendMode::Front);

    p.ctx.switch_program::<DotProgram>();
    p.ctx.uniforms::<DotProgram>()?.color = color.to_array();

    let key = layer.bucket_key();
    for view in tiles.iter() {
        let Some(bucket) = view.tile.bucket(key) else {
            continue;
        };
        {
            let u = p.ctx.uniforms::<DotProgram>()?;
            u.matrix = view.pos_matrix.to_cols_array_2d();
            u.exmatrix = view.tile.ex_matrix.to_cols_array_2d();
        }

        if bucket.layout.fill {
            if let Some(vertices) = &bucket.buffers.fill_vertex {
                draw_points(&mut p, vertices, &bucket.groups.groups)?;
            }
        }

        // Line vertices store doubled coordinates.
        p.ctx.uniforms::<DotProgram>()?.matrix = (view.pos_matrix
            * Mat4::from_scale(Vec3::new(0.5, 0.5, 1.0)))
        .to_cols_array_2d();

        if bucket.layout.line {
            if let Some(vertices) = &bucket.buffers.line_vertex {
                draw_points(&mut p, vertices, &bucket.groups.groups)?;
            }
        }
    }
    Ok(())
}

fn draw_points(
    p: &mut Painter<'_>,
    vertices: &PackedBuffer,
    groups: &ElementGroupTable,
) -> Result<(), RenderError> {
    p.ctx.bind_vertex_buffer(vertices)?;
    for group in groups {
        p.ctx
            .draw_arrays(Primitive::PointList, group.vertex_start_index, group.vertex_length)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::super::test_support::Harness;
    use super::*;
    use crate::buffer::{ElementGroup, FillVertex, LineVertex};
    use crate::render::{GpuCmd, Uniforms};
    use crate::style::{LayerKind, LayoutProperties};
    use crate::tile::{Bucket, Tile, TileCoord};

    #[test]
    fn fill_and_line_points_with_front_blending() {
        let mut h = Harness::new();
        let mut tile = Tile::new(TileCoord::new(0, 0, 0), Instant::now());
        let mut bucket = Bucket::new(LayoutProperties {
            fill: true,
            line: true,
            ..LayoutProperties::default()
        });
        bucket.buffers.fill_vertex = Some(PackedBuffer::from_records(&[FillVertex::new(1, 1); 5]));
        bucket.buffers.line_vertex = Some(PackedBuffer::from_records(&[LineVertex::default(); 5]));
        bucket.groups.groups = ElementGroupTable::from_groups(vec![ElementGroup {
            vertex_start_index: 0,
            vertex_length: 5,
            ..Default::default()
        }]);
        tile.buckets.insert("debug".into(), bucket);
        let tiles = TileSet::new(None, [&tile]);

        draw_vertices(&mut h.painter(), &Layer::new("debug", LayerKind::DebugVertices), &tiles)
            .unwrap();

        let draws: Vec<_> = h.ctx.commands().iter().filter_map(GpuCmd::as_draw).collect();
        assert_eq!(draws.len(), 2);
        assert!(draws.iter().all(|d| d.blend == BlendMode::Front));
        assert!(draws.iter().all(|d| d.primitive == Primitive::PointList));

        let Uniforms::Dot(fill) = draws[0].uniforms else { panic!() };
        let Uniforms::Dot(line) = draws[1].uniforms else { panic!() };
        assert_eq!(fill.color, [0.25, 0.0, 0.0, 0.25]);
        assert_eq!(fill.matrix[0][0], 1.0);
        assert_eq!(line.matrix[0][0], 0.5);
        assert_eq!(h.ctx.blend(), BlendMode::Back);
    }

    #[test]
    fn blend_restored_without_tiles_drawn() {
        let mut h = Harness::new();
        let tile = Tile::new(TileCoord::new(0, 0, 0), Instant::now());
        let tiles = TileSet::new(None, [&tile]);
        draw_vertices(&mut h.painter(), &Layer::new("debug", LayerKind::DebugVertices), &tiles)
            .unwrap();
        assert_eq!(h.ctx.blend(), BlendMode::Back);
    }
}
