//! Splitting a recorded frame into render passes.

use super::cmd::GpuCmd;
use super::handles::Framebuffer;
use super::state::Viewport;

/// Operation inside a render pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PassOp {
    Viewport(Viewport),
    /// Index of a [`GpuCmd::Draw`] in the frame's command list.
    Draw(usize),
}

/// One render pass over a single framebuffer.
#[derive(Debug, Clone, PartialEq)]
pub struct PassPlan {
    pub framebuffer: Framebuffer,
    /// Load op: clear to this color instead of loading.
    pub clear_color: Option<[f32; 4]>,
    /// Load op: clear stencil to this value instead of loading.
    pub clear_stencil: Option<u32>,
    pub ops: Vec<PassOp>,
}

impl PassPlan {
    fn load(framebuffer: Framebuffer, viewport: Option<Viewport>) -> Self {
        Self {
            framebuffer,
            clear_color: None,
            clear_stencil: None,
            ops: viewport.map(PassOp::Viewport).into_iter().collect(),
        }
    }

    pub fn draw_count(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, PassOp::Draw(_))).count()
    }

    fn has_draws(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, PassOp::Draw(_)))
    }

    fn is_empty(&self) -> bool {
        !self.has_draws() && self.clear_color.is_none() && self.clear_stencil.is_none()
    }
}

/// Groups a frame's commands into render passes.
///
/// A pass ends when another framebuffer is bound, or when a clear follows a
/// draw (wgpu only clears as a load op). Viewports carry over into the next
/// pass. Passes with neither clears nor draws are dropped. Resource commands
/// are not part of any pass.
pub fn plan_passes(cmds: &[GpuCmd]) -> Vec<PassPlan> {
    let mut passes = Vec::new();
    let mut viewport: Option<Viewport> = None;
    let mut current = PassPlan::load(Framebuffer::Default, None);

    for (i, cmd) in cmds.iter().enumerate() {
        match cmd {
            GpuCmd::BindFramebuffer(fb) => {
                if *fb == current.framebuffer {
                    continue;
                }
                let next = PassPlan::load(*fb, viewport);
                let done = std::mem::replace(&mut current, next);
                if !done.is_empty() {
                    passes.push(done);
                }
            }
            GpuCmd::Clear { color, stencil } => {
                if current.has_draws() {
                    let next = PassPlan::load(current.framebuffer, viewport);
                    passes.push(std::mem::replace(&mut current, next));
                }
                if color.is_some() {
                    current.clear_color = *color;
                }
                if stencil.is_some() {
                    current.clear_stencil = *stencil;
                }
            }
            GpuCmd::Viewport(v) => {
                viewport = Some(*v);
                current.ops.push(PassOp::Viewport(*v));
            }
            GpuCmd::Draw(_) => current.ops.push(PassOp::Draw(i)),
            GpuCmd::UploadBuffer { .. } | GpuCmd::DestroyBuffer(_) | GpuCmd::CreateTarget { .. } => {}
        }
    }

    if !current.is_empty() {
        passes.push(current);
    }
    passes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BufferId, PackedBuffer, FillVertex, VertexLayout};
    use crate::render::cmd::{DrawCall, DrawRange, VertexBinding};
    use crate::render::handles::TargetId;
    use crate::render::program::{ProgramKind, UniformStore};
    use crate::render::state::{BlendMode, Primitive, StencilMode};

    fn draw(buffer: BufferId) -> GpuCmd {
        GpuCmd::Draw(DrawCall {
            program: ProgramKind::ClipMask,
            uniforms: UniformStore::default().snapshot(ProgramKind::ClipMask),
            blend: BlendMode::Back,
            stencil: StencilMode::Write,
            stencil_ref: 0,
            vertex: VertexBinding {
                buffer,
                layout: VertexLayout::Fill,
            },
            index: None,
            textures: [None; 2],
            primitive: Primitive::TriangleStrip,
            range: DrawRange::Arrays { first: 0, count: 4 },
        })
    }

    #[test]
    fn leading_clear_becomes_load_op() {
        let id = PackedBuffer::new::<FillVertex>().id();
        let cmds = vec![
            GpuCmd::BindFramebuffer(Framebuffer::Default),
            GpuCmd::Viewport(Viewport::new(0, 0, 100, 100)),
            GpuCmd::Clear {
                color: Some([0.0; 4]),
                stencil: Some(0x80),
            },
            draw(id),
            draw(id),
        ];
        let passes = plan_passes(&cmds);
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].clear_stencil, Some(0x80));
        assert_eq!(passes[0].clear_color, Some([0.0; 4]));
        assert_eq!(passes[0].draw_count(), 2);
    }

    #[test]
    fn framebuffer_binds_split_passes_and_carry_viewport() {
        let id = PackedBuffer::new::<FillVertex>().id();
        let target = Framebuffer::Target(TargetId::new(0));
        let screen = Viewport::new(0, 0, 800, 600);
        let cmds = vec![
            GpuCmd::Viewport(screen),
            draw(id),
            GpuCmd::CreateTarget {
                id: TargetId::new(0),
                size: 544,
            },
            GpuCmd::BindFramebuffer(target),
            GpuCmd::Clear {
                color: Some([0.0; 4]),
                stencil: Some(0x80),
            },
            GpuCmd::Viewport(Viewport::square(544)),
            draw(id),
            GpuCmd::BindFramebuffer(Framebuffer::Default),
            GpuCmd::Viewport(screen),
            draw(id),
        ];
        let passes = plan_passes(&cmds);
        assert_eq!(passes.len(), 3);
        assert_eq!(passes[1].framebuffer, target);
        assert_eq!(passes[1].ops[0], PassOp::Viewport(screen));
        assert_eq!(passes[1].ops.last(), Some(&PassOp::Draw(6)));
        assert_eq!(passes[2].framebuffer, Framebuffer::Default);
        assert_eq!(passes[2].clear_color, None);
    }

    #[test]
    fn clear_after_draws_opens_new_pass() {
        let id = PackedBuffer::new::<FillVertex>().id();
        let cmds = vec![
            draw(id),
            GpuCmd::Clear {
                color: Some([1.0; 4]),
                stencil: None,
            },
            draw(id),
        ];
        let passes = plan_passes(&cmds);
        assert_eq!(passes.len(), 2);
        assert_eq!(passes[0].clear_color, None);
        assert_eq!(passes[1].clear_color, Some([1.0; 4]));
        assert_eq!(passes[1].clear_stencil, None);
    }

    #[test]
    fn idle_framebuffer_switches_produce_no_pass() {
        let target = Framebuffer::Target(TargetId::new(3));
        let cmds = vec![
            GpuCmd::BindFramebuffer(target),
            GpuCmd::BindFramebuffer(Framebuffer::Default),
        ];
        assert!(plan_passes(&cmds).is_empty());
    }
}
