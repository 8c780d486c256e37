//! Recording and replay of GPU work.
//!
//! Draw routines run against [`RenderContext`], a GL-style state machine
//! that records [`GpuCmd`]s. [`GpuExecutor`] splits the recording into
//! render passes and replays it on wgpu.

mod cmd;
mod ctx;
mod error;
mod executor;
mod handles;
mod plan;
mod program;
mod state;

pub use cmd::{DrawCall, DrawRange, GpuCmd, VertexBinding};
pub use ctx::{RenderContext, SavedState, TEXTURE_UNITS};
pub use error::RenderError;
pub use executor::{FrameTarget, GpuExecutor, TARGET_FORMAT, UNIFORM_STRIDE};
pub use handles::{Filter, Framebuffer, TargetId, TextureBinding, TextureId, TextureSource};
pub use plan::{plan_passes, PassOp, PassPlan};
pub use program::{
    ClipProgram, ClipUniforms, DotProgram, DotUniforms, GaussianProgram, GaussianUniforms,
    IconProgram, IconUniforms, LinePatternProgram, LinePatternUniforms, LineProgram, LineUniforms,
    Mat4Cols, ProgramKind, RasterProgram, RasterUniforms, SdfProgram, SdfUniforms, ShaderProgram,
    UniformStore, Uniforms,
};
pub use state::{BlendMode, Primitive, StencilMode, Viewport};
