use crate::buffer::{ArrayKind, BufferId, VertexLayout};

use super::handles::{Framebuffer, TargetId, TextureBinding};
use super::program::{ProgramKind, Uniforms};
use super::state::{BlendMode, Primitive, StencilMode, Viewport};

/// Vertex buffer bound for a draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexBinding {
    pub buffer: BufferId,
    pub layout: VertexLayout,
}

/// Which vertices or indices a draw consumes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DrawRange {
    Arrays {
        first: u32,
        count: u32,
    },
    Elements {
        first_index: u32,
        index_count: u32,
        /// Added to every index; the element group's first vertex.
        base_vertex: i32,
    },
}

/// A draw with all the state it depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub program: ProgramKind,
    pub uniforms: Uniforms,
    pub blend: BlendMode,
    pub stencil: StencilMode,
    pub stencil_ref: u32,
    pub vertex: VertexBinding,
    pub index: Option<BufferId>,
    pub textures: [Option<TextureBinding>; 2],
    pub primitive: Primitive,
    pub range: DrawRange,
}

/// One recorded GPU operation.
///
/// A frame is an ordered list of these; [`GpuExecutor`](super::GpuExecutor)
/// replays it on wgpu.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCmd {
    /// (Re)upload the bytes `0..pos` of a packed buffer.
    UploadBuffer {
        id: BufferId,
        kind: ArrayKind,
        bytes: Vec<u8>,
    },
    /// Release the GPU copy of a packed buffer.
    DestroyBuffer(BufferId),
    /// Allocate color and stencil storage for a pooled target.
    CreateTarget { id: TargetId, size: u32 },
    BindFramebuffer(Framebuffer),
    Viewport(Viewport),
    /// Clear the bound framebuffer's color and/or stencil.
    Clear {
        color: Option<[f32; 4]>,
        stencil: Option<u32>,
    },
    Draw(DrawCall),
}

impl GpuCmd {
    #[inline]
    pub fn as_draw(&self) -> Option<&DrawCall> {
        match self {
            Self::Draw(draw) => Some(draw),
            _ => None,
        }
    }
}
