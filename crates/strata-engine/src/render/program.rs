//! Shader programs and their typed uniform blocks.
//!
//! Every program has exactly one uniform struct whose layout mirrors the
//! `Uniforms` struct of its WGSL source (std140-compatible, 16-byte aligned).

use bytemuck::{Pod, Zeroable};

pub type Mat4Cols = [[f32; 4]; 4];

const IDENTITY: Mat4Cols = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// GPU programs known to the renderer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ProgramKind {
    Line,
    LinePattern,
    Raster,
    Sdf,
    Icon,
    Dot,
    Gaussian,
    ClipMask,
}

impl ProgramKind {
    pub const ALL: [ProgramKind; 8] = [
        Self::Line,
        Self::LinePattern,
        Self::Raster,
        Self::Sdf,
        Self::Icon,
        Self::Dot,
        Self::Gaussian,
        Self::ClipMask,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Line => "strata line",
            Self::LinePattern => "strata linepattern",
            Self::Raster => "strata raster",
            Self::Sdf => "strata sdf",
            Self::Icon => "strata icon",
            Self::Dot => "strata dot",
            Self::Gaussian => "strata gaussian",
            Self::ClipMask => "strata clip",
        }
    }

    pub(crate) fn source(self) -> &'static str {
        match self {
            Self::Line => include_str!("shaders/line.wgsl"),
            Self::LinePattern => include_str!("shaders/linepattern.wgsl"),
            Self::Raster => include_str!("shaders/raster.wgsl"),
            Self::Sdf => include_str!("shaders/sdf.wgsl"),
            Self::Icon => include_str!("shaders/icon.wgsl"),
            Self::Dot => include_str!("shaders/dot.wgsl"),
            Self::Gaussian => include_str!("shaders/gaussian.wgsl"),
            Self::ClipMask => include_str!("shaders/clip.wgsl"),
        }
    }

    /// Clip masks only touch the stencil buffer.
    #[inline]
    pub fn writes_color(self) -> bool {
        self != Self::ClipMask
    }
}

// ── uniform blocks ────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LineUniforms {
    pub matrix: Mat4Cols,
    pub exmatrix: Mat4Cols,
    pub color: [f32; 4],
    /// Outset, inset.
    pub linewidth: [f32; 2],
    pub dasharray: [f32; 2],
    pub ratio: f32,
    pub blur: f32,
    pub _pad: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LinePatternUniforms {
    pub matrix: Mat4Cols,
    pub exmatrix: Mat4Cols,
    pub linewidth: [f32; 2],
    pub pattern_tl: [f32; 2],
    pub pattern_br: [f32; 2],
    pub pattern_size: [f32; 2],
    pub ratio: f32,
    pub blur: f32,
    pub fade: f32,
    pub _pad: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct RasterUniforms {
    pub matrix: Mat4Cols,
    /// Hue rotation weights; `w` unused.
    pub spin_weights: [f32; 4],
    pub tl_parent: [f32; 2],
    pub scale_parent: f32,
    pub buffer_scale: f32,
    pub opacity0: f32,
    pub opacity1: f32,
    pub brightness_low: f32,
    pub brightness_high: f32,
    pub saturation_factor: f32,
    pub contrast_factor: f32,
    pub _pad: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SdfUniforms {
    pub matrix: Mat4Cols,
    pub exmatrix: Mat4Cols,
    pub color: [f32; 4],
    pub texsize: [f32; 2],
    pub flip: f32,
    pub angle: f32,
    pub zoom: f32,
    pub fadedist: f32,
    pub minfadezoom: f32,
    pub maxfadezoom: f32,
    pub fadezoom: f32,
    pub gamma: f32,
    pub buffer: f32,
    pub _pad: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct IconUniforms {
    pub matrix: Mat4Cols,
    pub exmatrix: Mat4Cols,
    pub texsize: [f32; 2],
    pub flip: f32,
    pub angle: f32,
    pub zoom: f32,
    pub fadedist: f32,
    pub minfadezoom: f32,
    pub maxfadezoom: f32,
    pub fadezoom: f32,
    pub opacity: f32,
    pub _pad: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct DotUniforms {
    pub matrix: Mat4Cols,
    pub exmatrix: Mat4Cols,
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GaussianUniforms {
    pub matrix: Mat4Cols,
    /// One texel along the blur direction.
    pub offset: [f32; 2],
    pub _pad: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ClipUniforms {
    pub matrix: Mat4Cols,
}

impl Default for LineUniforms {
    fn default() -> Self {
        Self {
            matrix: IDENTITY,
            exmatrix: IDENTITY,
            dasharray: [1.0, -1.0],
            ..Zeroable::zeroed()
        }
    }
}

impl Default for LinePatternUniforms {
    fn default() -> Self {
        Self {
            matrix: IDENTITY,
            exmatrix: IDENTITY,
            ..Zeroable::zeroed()
        }
    }
}

impl Default for RasterUniforms {
    fn default() -> Self {
        Self {
            matrix: IDENTITY,
            spin_weights: [1.0, 0.0, 0.0, 0.0],
            scale_parent: 1.0,
            buffer_scale: 1.0,
            opacity0: 1.0,
            brightness_high: 1.0,
            contrast_factor: 1.0,
            ..Zeroable::zeroed()
        }
    }
}

impl Default for SdfUniforms {
    fn default() -> Self {
        Self {
            matrix: IDENTITY,
            exmatrix: IDENTITY,
            ..Zeroable::zeroed()
        }
    }
}

impl Default for IconUniforms {
    fn default() -> Self {
        Self {
            matrix: IDENTITY,
            exmatrix: IDENTITY,
            opacity: 1.0,
            ..Zeroable::zeroed()
        }
    }
}

impl Default for DotUniforms {
    fn default() -> Self {
        Self {
            matrix: IDENTITY,
            exmatrix: IDENTITY,
            color: [0.0; 4],
        }
    }
}

impl Default for GaussianUniforms {
    fn default() -> Self {
        Self {
            matrix: IDENTITY,
            ..Zeroable::zeroed()
        }
    }
}

impl Default for ClipUniforms {
    fn default() -> Self {
        Self { matrix: IDENTITY }
    }
}

/// Snapshot of one program's uniforms, captured at draw time.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Uniforms {
    Line(LineUniforms),
    LinePattern(LinePatternUniforms),
    Raster(RasterUniforms),
    Sdf(SdfUniforms),
    Icon(IconUniforms),
    Dot(DotUniforms),
    Gaussian(GaussianUniforms),
    ClipMask(ClipUniforms),
}

impl Uniforms {
    /// Bytes as uploaded to the uniform buffer.
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Line(u) => bytemuck::bytes_of(u),
            Self::LinePattern(u) => bytemuck::bytes_of(u),
            Self::Raster(u) => bytemuck::bytes_of(u),
            Self::Sdf(u) => bytemuck::bytes_of(u),
            Self::Icon(u) => bytemuck::bytes_of(u),
            Self::Dot(u) => bytemuck::bytes_of(u),
            Self::Gaussian(u) => bytemuck::bytes_of(u),
            Self::ClipMask(u) => bytemuck::bytes_of(u),
        }
    }
}

/// Current uniform values of every program.
///
/// Values persist across program switches, like GL program uniforms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformStore {
    pub line: LineUniforms,
    pub line_pattern: LinePatternUniforms,
    pub raster: RasterUniforms,
    pub sdf: SdfUniforms,
    pub icon: IconUniforms,
    pub dot: DotUniforms,
    pub gaussian: GaussianUniforms,
    pub clip: ClipUniforms,
}

impl UniformStore {
    pub fn snapshot(&self, kind: ProgramKind) -> Uniforms {
        match kind {
            ProgramKind::Line => Uniforms::Line(self.line),
            ProgramKind::LinePattern => Uniforms::LinePattern(self.line_pattern),
            ProgramKind::Raster => Uniforms::Raster(self.raster),
            ProgramKind::Sdf => Uniforms::Sdf(self.sdf),
            ProgramKind::Icon => Uniforms::Icon(self.icon),
            ProgramKind::Dot => Uniforms::Dot(self.dot),
            ProgramKind::Gaussian => Uniforms::Gaussian(self.gaussian),
            ProgramKind::ClipMask => Uniforms::ClipMask(self.clip),
        }
    }
}

// ── programs ──────────────────────────────────────────────────────────────

/// Compile-time handle of a shader program.
pub trait ShaderProgram {
    const KIND: ProgramKind;
    type Uniforms: Pod + Default + std::fmt::Debug;

    fn uniforms(store: &UniformStore) -> &Self::Uniforms;
    fn uniforms_mut(store: &mut UniformStore) -> &mut Self::Uniforms;
}

/// Solid and dashed lines.
pub struct LineProgram;
/// Lines filled with a sprite pattern.
pub struct LinePatternProgram;
/// Raster tiles with parent cross-fade and color correction.
pub struct RasterProgram;
/// Signed-distance-field glyphs and icons.
pub struct SdfProgram;
/// Plain sprite icons.
pub struct IconProgram;
/// Debug points.
pub struct DotProgram;
/// One direction of a separable blur.
pub struct GaussianProgram;
/// Stencil-only tile clipping mask.
pub struct ClipProgram;

impl ShaderProgram for LineProgram {
    const KIND: ProgramKind = ProgramKind::Line;
    type Uniforms = LineUniforms;

    fn uniforms(store: &UniformStore) -> &LineUniforms {
        &store.line
    }
    fn uniforms_mut(store: &mut UniformStore) -> &mut LineUniforms {
        &mut store.line
    }
}

impl ShaderProgram for LinePatternProgram {
    const KIND: ProgramKind = ProgramKind::LinePattern;
    type Uniforms = LinePatternUniforms;

    fn uniforms(store: &UniformStore) -> &LinePatternUniforms {
        &store.line_pattern
    }
    fn uniforms_mut(store: &mut UniformStore) -> &mut LinePatternUniforms {
        &mut store.line_pattern
    }
}

impl ShaderProgram for RasterProgram {
    const KIND: ProgramKind = ProgramKind::Raster;
    type Uniforms = RasterUniforms;

    fn uniforms(store: &UniformStore) -> &RasterUniforms {
        &store.raster
    }
    fn uniforms_mut(store: &mut UniformStore) -> &mut RasterUniforms {
        &mut store.raster
    }
}

impl ShaderProgram for SdfProgram {
    const KIND: ProgramKind = ProgramKind::Sdf;
    type Uniforms = SdfUniforms;

    fn uniforms(store: &UniformStore) -> &SdfUniforms {
        &store.sdf
    }
    fn uniforms_mut(store: &mut UniformStore) -> &mut SdfUniforms {
        &mut store.sdf
    }
}

impl ShaderProgram for IconProgram {
    const KIND: ProgramKind = ProgramKind::Icon;
    type Uniforms = IconUniforms;

    fn uniforms(store: &UniformStore) -> &IconUniforms {
        &store.icon
    }
    fn uniforms_mut(store: &mut UniformStore) -> &mut IconUniforms {
        &mut store.icon
    }
}

impl ShaderProgram for DotProgram {
    const KIND: ProgramKind = ProgramKind::Dot;
    type Uniforms = DotUniforms;

    fn uniforms(store: &UniformStore) -> &DotUniforms {
        &store.dot
    }
    fn uniforms_mut(store: &mut UniformStore) -> &mut DotUniforms {
        &mut store.dot
    }
}

impl ShaderProgram for GaussianProgram {
    const KIND: ProgramKind = ProgramKind::Gaussian;
    type Uniforms = GaussianUniforms;

    fn uniforms(store: &UniformStore) -> &GaussianUniforms {
        &store.gaussian
    }
    fn uniforms_mut(store: &mut UniformStore) -> &mut GaussianUniforms {
        &mut store.gaussian
    }
}

impl ShaderProgram for ClipProgram {
    const KIND: ProgramKind = ProgramKind::ClipMask;
    type Uniforms = ClipUniforms;

    fn uniforms(store: &UniformStore) -> &ClipUniforms {
        &store.clip
    }
    fn uniforms_mut(store: &mut UniformStore) -> &mut ClipUniforms {
        &mut store.clip
    }
}
