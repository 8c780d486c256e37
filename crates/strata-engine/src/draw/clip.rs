use glam::Mat4;

use crate::render::{ClipProgram, Primitive, RenderError, StencilMode};
use crate::tile::EXTENT;

use super::Painter;

impl Painter<'_> {
    /// Restricts subsequent stencil-tested draws to one tile.
    ///
    /// Resets the whole framebuffer's clip bit, then sets it inside the tile
    /// quad. Leaves the clip program active and the reference at the clip bit.
    pub fn draw_clipping_mask(&mut self, pos_matrix: Mat4) -> Result<(), RenderError> {
        let extent = self.env.tile_extent;
        let count = extent.len() as u32;
        let ctx = &mut *self.ctx;

        ctx.switch_program::<ClipProgram>();
        ctx.bind_vertex_buffer(extent)?;

        ctx.uniforms::<ClipProgram>()?.matrix =
            Mat4::orthographic_rh_gl(0.0, EXTENT, EXTENT, 0.0, 0.0, 1.0).to_cols_array_2d();
        ctx.set_stencil_ref(0);
        ctx.draw_arrays(Primitive::TriangleStrip, 0, count)?;

        ctx.uniforms::<ClipProgram>()?.matrix = pos_matrix.to_cols_array_2d();
        ctx.set_stencil_ref(StencilMode::CLIP_BIT);
        ctx.draw_arrays(Primitive::TriangleStrip, 0, count)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;
    use crate::render::{GpuCmd, ProgramKind};

    #[test]
    fn mask_resets_then_marks_tile() {
        let mut h = Harness::new();
        let matrix = Mat4::from_scale(glam::Vec3::splat(0.5));
        h.painter().draw_clipping_mask(matrix).unwrap();

        let draws: Vec<_> = h.ctx.commands().iter().filter_map(GpuCmd::as_draw).collect();
        assert_eq!(draws.len(), 2);
        assert!(draws.iter().all(|d| d.program == ProgramKind::ClipMask));
        assert!(draws.iter().all(|d| d.stencil == StencilMode::Write));
        assert_eq!(draws[0].stencil_ref, 0);
        assert_eq!(draws[1].stencil_ref, 0x80);
        assert_eq!(h.ctx.stencil_ref(), 0x80);
        assert_eq!(h.ctx.active_program(), Some(ProgramKind::ClipMask));
    }
}
