use std::collections::HashMap;

use crate::buffer::{ArrayKind, BufferId, PackedBuffer};

use super::cmd::{DrawCall, DrawRange, GpuCmd, VertexBinding};
use super::error::RenderError;
use super::handles::{Framebuffer, TargetId, TextureBinding};
use super::program::{ProgramKind, ShaderProgram, UniformStore};
use super::state::{BlendMode, Primitive, StencilMode, Viewport};

/// Number of texture units a program can sample.
pub const TEXTURE_UNITS: usize = 2;

/// Render state that routines must leave as they found it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SavedState {
    pub blend: BlendMode,
    pub stencil_test: bool,
    pub stencil_ref: u32,
    pub framebuffer: Framebuffer,
    pub viewport: Viewport,
}

/// GPU state machine that records a frame as [`GpuCmd`]s.
///
/// Mirrors the GL model the draw routines are written against: one active
/// program, per-program uniforms that persist across switches, vertex
/// attributes that must be rebound after every switch, and global blend,
/// stencil, framebuffer and viewport state.
#[derive(Debug)]
pub struct RenderContext {
    cmds: Vec<GpuCmd>,

    program: Option<ProgramKind>,
    uniforms: UniformStore,
    vertex: Option<VertexBinding>,
    index: Option<BufferId>,
    textures: [Option<TextureBinding>; TEXTURE_UNITS],

    blend: BlendMode,
    stencil_test: bool,
    stencil_ref: u32,
    framebuffer: Framebuffer,
    viewport: Viewport,

    /// Upload position of every buffer already on the GPU.
    uploaded: HashMap<BufferId, usize>,
}

impl RenderContext {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            cmds: Vec::new(),
            program: None,
            uniforms: UniformStore::default(),
            vertex: None,
            index: None,
            textures: [None; TEXTURE_UNITS],
            blend: BlendMode::Back,
            stencil_test: true,
            stencil_ref: StencilMode::CLIP_BIT,
            framebuffer: Framebuffer::Default,
            viewport,
            uploaded: HashMap::new(),
        }
    }

    /// Resets per-frame state. Uploads and uniform values carry over.
    pub fn begin_frame(&mut self, viewport: Viewport) {
        self.program = None;
        self.vertex = None;
        self.index = None;
        self.textures = [None; TEXTURE_UNITS];
        self.blend = BlendMode::Back;
        self.stencil_test = true;
        self.stencil_ref = StencilMode::CLIP_BIT;
        self.framebuffer = Framebuffer::Default;
        self.viewport = viewport;
        self.cmds.push(GpuCmd::BindFramebuffer(Framebuffer::Default));
        self.cmds.push(GpuCmd::Viewport(viewport));
    }

    /// Takes the recorded commands.
    pub fn finish(&mut self) -> Vec<GpuCmd> {
        std::mem::take(&mut self.cmds)
    }

    /// Commands recorded so far.
    #[inline]
    pub fn commands(&self) -> &[GpuCmd] {
        &self.cmds
    }

    // ── programs ──────────────────────────────────────────────────────────

    /// Activates `P`. Switching resets the vertex attribute bindings.
    pub fn switch_program<P: ShaderProgram>(&mut self) {
        if self.program == Some(P::KIND) {
            return;
        }
        self.program = Some(P::KIND);
        self.vertex = None;
    }

    #[inline]
    pub fn active_program(&self) -> Option<ProgramKind> {
        self.program
    }

    /// Uniforms of `P`, which must be the active program.
    pub fn uniforms<P: ShaderProgram>(&mut self) -> Result<&mut P::Uniforms, RenderError> {
        if self.program != Some(P::KIND) {
            return Err(RenderError::ProgramNotActive {
                expected: P::KIND,
                active: self.program,
            });
        }
        Ok(P::uniforms_mut(&mut self.uniforms))
    }

    /// Current uniform values of `P`, active or not.
    pub fn peek_uniforms<P: ShaderProgram>(&self) -> &P::Uniforms {
        P::uniforms(&self.uniforms)
    }

    // ── buffers & textures ────────────────────────────────────────────────

    /// Binds a vertex buffer to the active program's attributes, uploading
    /// it first if the GPU copy is missing or stale.
    pub fn bind_vertex_buffer(&mut self, buffer: &PackedBuffer) -> Result<(), RenderError> {
        let Some(layout) = buffer.layout() else {
            return Err(RenderError::BufferKindMismatch {
                expected: ArrayKind::Vertex,
                found: buffer.kind(),
            });
        };
        if self.program.is_none() {
            return Err(RenderError::NoActiveProgram);
        }
        self.ensure_uploaded(buffer);
        self.vertex = Some(VertexBinding {
            buffer: buffer.id(),
            layout,
        });
        Ok(())
    }

    /// Binds an element (triangle index) buffer.
    pub fn bind_index_buffer(&mut self, buffer: &PackedBuffer) -> Result<(), RenderError> {
        if buffer.kind() != ArrayKind::Index {
            return Err(RenderError::BufferKindMismatch {
                expected: ArrayKind::Index,
                found: buffer.kind(),
            });
        }
        self.ensure_uploaded(buffer);
        self.index = Some(buffer.id());
        Ok(())
    }

    fn ensure_uploaded(&mut self, buffer: &PackedBuffer) {
        if self.uploaded.get(&buffer.id()) == Some(&buffer.pos()) {
            return;
        }
        self.uploaded.insert(buffer.id(), buffer.pos());
        self.cmds.push(GpuCmd::UploadBuffer {
            id: buffer.id(),
            kind: buffer.kind(),
            bytes: buffer.bind().to_vec(),
        });
    }

    /// Drops the GPU copy of a buffer.
    pub fn forget_buffer(&mut self, id: BufferId) {
        if self.uploaded.remove(&id).is_some() {
            self.cmds.push(GpuCmd::DestroyBuffer(id));
        }
        if self.vertex.is_some_and(|v| v.buffer == id) {
            self.vertex = None;
        }
        if self.index == Some(id) {
            self.index = None;
        }
    }

    #[inline]
    pub fn is_uploaded(&self, id: BufferId) -> bool {
        self.uploaded.contains_key(&id)
    }

    pub fn bind_texture(
        &mut self,
        unit: usize,
        binding: Option<TextureBinding>,
    ) -> Result<(), RenderError> {
        let Some(slot) = self.textures.get_mut(unit) else {
            return Err(RenderError::InvalidTextureUnit(unit));
        };
        *slot = binding;
        Ok(())
    }

    /// Clears every texture unit.
    pub fn unbind_textures(&mut self) {
        self.textures = [None; TEXTURE_UNITS];
    }

    // ── global state ──────────────────────────────────────────────────────

    #[inline]
    pub fn blend(&self) -> BlendMode {
        self.blend
    }

    #[inline]
    pub fn set_blend(&mut self, blend: BlendMode) {
        self.blend = blend;
    }

    #[inline]
    pub fn stencil_test(&self) -> bool {
        self.stencil_test
    }

    #[inline]
    pub fn set_stencil_test(&mut self, enabled: bool) {
        self.stencil_test = enabled;
    }

    #[inline]
    pub fn stencil_ref(&self) -> u32 {
        self.stencil_ref
    }

    #[inline]
    pub fn set_stencil_ref(&mut self, reference: u32) {
        self.stencil_ref = reference;
    }

    #[inline]
    pub fn framebuffer(&self) -> Framebuffer {
        self.framebuffer
    }

    pub fn bind_framebuffer(&mut self, framebuffer: Framebuffer) {
        if self.framebuffer == framebuffer {
            return;
        }
        self.framebuffer = framebuffer;
        self.cmds.push(GpuCmd::BindFramebuffer(framebuffer));
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.viewport == viewport {
            return;
        }
        self.viewport = viewport;
        self.cmds.push(GpuCmd::Viewport(viewport));
    }

    /// Clears the bound framebuffer.
    pub fn clear(&mut self, color: Option<[f32; 4]>, stencil: Option<u32>) {
        if color.is_none() && stencil.is_none() {
            return;
        }
        self.cmds.push(GpuCmd::Clear { color, stencil });
    }

    pub(crate) fn create_target(&mut self, id: TargetId, size: u32) {
        self.cmds.push(GpuCmd::CreateTarget { id, size });
    }

    pub fn save_state(&self) -> SavedState {
        SavedState {
            blend: self.blend,
            stencil_test: self.stencil_test,
            stencil_ref: self.stencil_ref,
            framebuffer: self.framebuffer,
            viewport: self.viewport,
        }
    }

    pub fn restore_state(&mut self, saved: SavedState) {
        self.blend = saved.blend;
        self.stencil_test = saved.stencil_test;
        self.stencil_ref = saved.stencil_ref;
        self.bind_framebuffer(saved.framebuffer);
        self.set_viewport(saved.viewport);
    }

    // ── draws ─────────────────────────────────────────────────────────────

    /// Non-indexed draw of `count` vertices starting at `first`.
    pub fn draw_arrays(
        &mut self,
        primitive: Primitive,
        first: u32,
        count: u32,
    ) -> Result<(), RenderError> {
        self.draw(primitive, DrawRange::Arrays { first, count })
    }

    /// Indexed triangle draw.
    pub fn draw_elements(
        &mut self,
        first_index: u32,
        index_count: u32,
        base_vertex: i32,
    ) -> Result<(), RenderError> {
        let program = self.program.ok_or(RenderError::NoActiveProgram)?;
        if self.index.is_none() {
            return Err(RenderError::IndexBufferNotBound { program });
        }
        self.draw(
            Primitive::TriangleList,
            DrawRange::Elements {
                first_index,
                index_count,
                base_vertex,
            },
        )
    }

    fn draw(&mut self, primitive: Primitive, range: DrawRange) -> Result<(), RenderError> {
        let program = self.program.ok_or(RenderError::NoActiveProgram)?;
        let vertex = self
            .vertex
            .ok_or(RenderError::AttributesNotBound { program })?;

        let empty = match range {
            DrawRange::Arrays { count, .. } => count == 0,
            DrawRange::Elements { index_count, .. } => index_count == 0,
        };
        if empty {
            return Ok(());
        }

        let stencil = if program == ProgramKind::ClipMask {
            StencilMode::Write
        } else if self.stencil_test {
            StencilMode::Test
        } else {
            StencilMode::Disabled
        };

        let index = match range {
            DrawRange::Elements { .. } => self.index,
            DrawRange::Arrays { .. } => None,
        };

        self.cmds.push(GpuCmd::Draw(DrawCall {
            program,
            uniforms: self.uniforms.snapshot(program),
            blend: self.blend,
            stencil,
            stencil_ref: self.stencil_ref,
            vertex,
            index,
            textures: self.textures,
            primitive,
            range,
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{FillVertex, LineVertex, Triangle};
    use crate::render::program::{ClipProgram, LineProgram, RasterProgram, Uniforms};

    fn ctx() -> RenderContext {
        RenderContext::new(Viewport::new(0, 0, 800, 600))
    }

    fn draws(ctx: &RenderContext) -> Vec<&DrawCall> {
        ctx.commands().iter().filter_map(GpuCmd::as_draw).collect()
    }

    // ── programs ──────────────────────────────────────────────────────────

    #[test]
    fn uniforms_of_inactive_program_fail() {
        let mut ctx = ctx();
        assert_eq!(
            ctx.uniforms::<LineProgram>().err(),
            Some(RenderError::ProgramNotActive {
                expected: ProgramKind::Line,
                active: None
            })
        );
        ctx.switch_program::<RasterProgram>();
        assert!(matches!(
            ctx.uniforms::<LineProgram>(),
            Err(RenderError::ProgramNotActive { active: Some(ProgramKind::Raster), .. })
        ));
    }

    #[test]
    fn switch_resets_attributes_but_keeps_uniforms() {
        let mut ctx = ctx();
        let vertices = PackedBuffer::from_records(&[LineVertex::default(); 3]);

        ctx.switch_program::<LineProgram>();
        ctx.uniforms::<LineProgram>().map(|u| u.blur = 3.0).unwrap();
        ctx.bind_vertex_buffer(&vertices).unwrap();

        ctx.switch_program::<ClipProgram>();
        ctx.switch_program::<LineProgram>();
        assert_eq!(
            ctx.draw_arrays(Primitive::TriangleList, 0, 3),
            Err(RenderError::AttributesNotBound { program: ProgramKind::Line })
        );
        assert_eq!(ctx.uniforms::<LineProgram>().unwrap().blur, 3.0);
    }

    #[test]
    fn switching_to_the_active_program_keeps_bindings() {
        let mut ctx = ctx();
        let vertices = PackedBuffer::from_records(&[FillVertex::new(0, 0)]);
        ctx.switch_program::<ClipProgram>();
        ctx.bind_vertex_buffer(&vertices).unwrap();
        ctx.switch_program::<ClipProgram>();
        assert!(ctx.draw_arrays(Primitive::PointList, 0, 1).is_ok());
    }

    // ── buffers ───────────────────────────────────────────────────────────

    #[test]
    fn buffers_upload_once_until_they_grow() {
        let mut ctx = ctx();
        let mut vertices = PackedBuffer::from_records(&[FillVertex::new(1, 1)]);
        ctx.switch_program::<ClipProgram>();

        ctx.bind_vertex_buffer(&vertices).unwrap();
        ctx.bind_vertex_buffer(&vertices).unwrap();
        vertices.append(&FillVertex::new(2, 2));
        ctx.bind_vertex_buffer(&vertices).unwrap();

        let uploads: Vec<usize> = ctx
            .commands()
            .iter()
            .filter_map(|c| match c {
                GpuCmd::UploadBuffer { bytes, .. } => Some(bytes.len()),
                _ => None,
            })
            .collect();
        assert_eq!(uploads, vec![4, 8]);
    }

    #[test]
    fn wrong_buffer_kinds_are_rejected() {
        let mut ctx = ctx();
        ctx.switch_program::<LineProgram>();
        let triangles = PackedBuffer::from_records(&[Triangle::new(0, 1, 2)]);
        let vertices = PackedBuffer::from_records(&[LineVertex::default()]);
        assert!(matches!(
            ctx.bind_vertex_buffer(&triangles),
            Err(RenderError::BufferKindMismatch { expected: ArrayKind::Vertex, .. })
        ));
        assert!(matches!(
            ctx.bind_index_buffer(&vertices),
            Err(RenderError::BufferKindMismatch { expected: ArrayKind::Index, .. })
        ));
    }

    #[test]
    fn indexed_draw_needs_element_buffer() {
        let mut ctx = ctx();
        let vertices = PackedBuffer::from_records(&[LineVertex::default(); 3]);
        ctx.switch_program::<LineProgram>();
        ctx.bind_vertex_buffer(&vertices).unwrap();
        assert_eq!(
            ctx.draw_elements(0, 3, 0),
            Err(RenderError::IndexBufferNotBound { program: ProgramKind::Line })
        );
    }

    #[test]
    fn forget_buffer_records_destroy_once() {
        let mut ctx = ctx();
        let vertices = PackedBuffer::from_records(&[FillVertex::new(0, 0)]);
        ctx.switch_program::<ClipProgram>();
        ctx.bind_vertex_buffer(&vertices).unwrap();
        ctx.forget_buffer(vertices.id());
        ctx.forget_buffer(vertices.id());
        let destroys = ctx
            .commands()
            .iter()
            .filter(|c| matches!(c, GpuCmd::DestroyBuffer(_)))
            .count();
        assert_eq!(destroys, 1);
        assert!(!ctx.is_uploaded(vertices.id()));
    }

    // ── draws & state ─────────────────────────────────────────────────────

    #[test]
    fn draws_snapshot_state() {
        let mut ctx = ctx();
        let vertices = PackedBuffer::from_records(&[FillVertex::new(0, 0); 4]);

        ctx.switch_program::<ClipProgram>();
        ctx.bind_vertex_buffer(&vertices).unwrap();
        ctx.set_stencil_ref(0);
        ctx.draw_arrays(Primitive::TriangleStrip, 0, 4).unwrap();

        ctx.switch_program::<RasterProgram>();
        ctx.bind_vertex_buffer(&vertices).unwrap();
        ctx.uniforms::<RasterProgram>().unwrap().opacity0 = 0.5;
        ctx.set_stencil_test(false);
        ctx.set_blend(BlendMode::Front);
        ctx.draw_arrays(Primitive::TriangleStrip, 0, 4).unwrap();
        ctx.uniforms::<RasterProgram>().unwrap().opacity0 = 0.25;

        let d = draws(&ctx);
        assert_eq!(d.len(), 2);
        assert_eq!(d[0].stencil, StencilMode::Write);
        assert_eq!(d[0].stencil_ref, 0);
        assert_eq!(d[1].stencil, StencilMode::Disabled);
        assert_eq!(d[1].blend, BlendMode::Front);
        match d[1].uniforms {
            Uniforms::Raster(u) => assert_eq!(u.opacity0, 0.5),
            ref other => panic!("unexpected uniforms {other:?}"),
        }
    }

    #[test]
    fn empty_draws_are_dropped() {
        let mut ctx = ctx();
        let vertices = PackedBuffer::from_records(&[FillVertex::new(0, 0)]);
        ctx.switch_program::<ClipProgram>();
        ctx.bind_vertex_buffer(&vertices).unwrap();
        ctx.draw_arrays(Primitive::PointList, 0, 0).unwrap();
        assert!(draws(&ctx).is_empty());
    }

    #[test]
    fn restore_brings_back_framebuffer_and_viewport() {
        let mut ctx = ctx();
        let saved = ctx.save_state();
        ctx.bind_framebuffer(Framebuffer::Target(TargetId::new(0)));
        ctx.set_viewport(Viewport::square(544));
        ctx.set_blend(BlendMode::Front);
        ctx.set_stencil_test(false);
        ctx.restore_state(saved);

        assert_eq!(ctx.save_state(), saved);
        assert_eq!(
            ctx.commands().last(),
            Some(&GpuCmd::Viewport(Viewport::new(0, 0, 800, 600)))
        );
    }

    #[test]
    fn texture_units_are_bounded() {
        let mut ctx = ctx();
        assert_eq!(ctx.bind_texture(2, None), Err(RenderError::InvalidTextureUnit(2)));
    }
}
