use std::fmt;

use crate::buffer::ArrayKind;
use crate::style::LayerKind;

use super::handles::{TargetId, TextureId};
use super::program::ProgramKind;

/// Precondition violations raised while recording or replaying a frame.
///
/// Not-ready conditions (atlas missing, bucket missing, no tile texture) are
/// not errors; routines skip those silently.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Uniforms of a program were accessed while another one was active.
    ProgramNotActive {
        expected: ProgramKind,
        active: Option<ProgramKind>,
    },
    /// A draw was issued before any program was activated.
    NoActiveProgram,
    /// A draw was issued without vertex attributes bound since the last
    /// program switch.
    AttributesNotBound { program: ProgramKind },
    /// An indexed draw was issued without an element buffer.
    IndexBufferNotBound { program: ProgramKind },
    /// A packed buffer was bound to the wrong binding point.
    BufferKindMismatch { expected: ArrayKind, found: ArrayKind },
    /// Texture unit outside `0..TEXTURE_UNITS`.
    InvalidTextureUnit(usize),
    /// A prerendered texture was sampled before it was rendered.
    TargetNotMaterialized,
    /// A render target was released while already pooled.
    DoubleRelease(TargetId),
    /// A render target id unknown to the pool.
    UnknownTarget(TargetId),
    /// A texture id unknown to the executor.
    UnknownTexture(TextureId),
    /// Layer kind and resolved style disagree.
    StyleMismatch {
        layer: String,
        kind: LayerKind,
        style: &'static str,
    },
    /// Layers were drawn outside `begin_frame` / `finish_frame`.
    FrameNotStarted,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProgramNotActive { expected, active } => match active {
                Some(active) => write!(
                    f,
                    "uniforms of {expected:?} accessed while {active:?} is active"
                ),
                None => write!(f, "uniforms of {expected:?} accessed with no active program"),
            },
            Self::NoActiveProgram => write!(f, "draw issued with no active program"),
            Self::AttributesNotBound { program } => {
                write!(f, "draw with {program:?} issued without vertex attributes bound")
            }
            Self::IndexBufferNotBound { program } => {
                write!(f, "indexed draw with {program:?} issued without an element buffer")
            }
            Self::BufferKindMismatch { expected, found } => {
                write!(f, "expected a {expected:?} buffer, got a {found:?} buffer")
            }
            Self::InvalidTextureUnit(unit) => write!(f, "texture unit {unit} does not exist"),
            Self::TargetNotMaterialized => {
                write!(f, "prerendered texture sampled before it was rendered")
            }
            Self::DoubleRelease(id) => write!(f, "render target {} released twice", id.index()),
            Self::UnknownTarget(id) => write!(f, "render target {} is not in the pool", id.index()),
            Self::UnknownTexture(id) => write!(f, "texture {} is not registered", id.raw()),
            Self::StyleMismatch { layer, kind, style } => {
                write!(f, "layer `{layer}` of kind {kind:?} got a {style} style")
            }
            Self::FrameNotStarted => write!(f, "layer drawn outside of a frame"),
        }
    }
}

impl std::error::Error for RenderError {}
