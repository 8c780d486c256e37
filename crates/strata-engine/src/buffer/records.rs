//! Fixed-stride geometry records shared with the geometry compiler.
//!
//! The byte layouts here are a wire contract: strides and field offsets must
//! match the vertex attribute tables handed to wgpu.

use bytemuck::{Pod, Zeroable};

/// Which GPU binding point a packed buffer feeds.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ArrayKind {
    Vertex,
    Index,
}

/// Vertex attribute layouts understood by the shader programs.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VertexLayout {
    /// `FillVertex`, 4 bytes.
    Fill,
    /// `LineVertex`, 8 bytes.
    Line,
    /// `RasterVertex`, 8 bytes.
    Raster,
    /// `SymbolVertex`, 16 bytes.
    Symbol,
}

impl VertexLayout {
    const FILL_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Sint16x2];
    const LINE_ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Sint16x2, // pos * 2 | normal bits
        1 => Sint8x4   // extrude.xy, linesofar hi, linesofar lo
    ];
    const RASTER_ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Sint16x2, // pos
        1 => Sint16x2  // texture pos, 0..32767
    ];
    const SYMBOL_ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Sint16x2, // anchor
        1 => Sint16x2, // offset, 1/64 px
        2 => Uint8x4,  // tex.x/4, tex.y/4, labelminzoom*10, angle
        3 => Uint8x4   // minzoom*10, maxzoom*10, range start, range end
    ];

    pub const fn stride(self) -> u64 {
        match self {
            Self::Fill => 4,
            Self::Line | Self::Raster => 8,
            Self::Symbol => 16,
        }
    }

    pub fn buffer_layout(self) -> wgpu::VertexBufferLayout<'static> {
        let attributes: &'static [wgpu::VertexAttribute] = match self {
            Self::Fill => &Self::FILL_ATTRS,
            Self::Line => &Self::LINE_ATTRS,
            Self::Raster => &Self::RASTER_ATTRS,
            Self::Symbol => &Self::SYMBOL_ATTRS,
        };
        wgpu::VertexBufferLayout {
            array_stride: self.stride(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }
}

/// A fixed-size record that can be appended to a `PackedBuffer`.
pub trait Record: Pod {
    const KIND: ArrayKind;
    /// Attribute layout for vertex records, `None` for index records.
    const LAYOUT: Option<VertexLayout>;
}

// ── fill ──────────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct FillVertex {
    pub pos: [i16; 2],
}

impl FillVertex {
    #[inline]
    pub const fn new(x: i16, y: i16) -> Self {
        Self { pos: [x, y] }
    }
}

impl Record for FillVertex {
    const KIND: ArrayKind = ArrayKind::Vertex;
    const LAYOUT: Option<VertexLayout> = Some(VertexLayout::Fill);
}

// ── line ──────────────────────────────────────────────────────────────────

/// Line vertex (8 bytes):
///
///  offset 0  pos        [i16; 2]  coordinate * 2, low bit = normal direction
///  offset 4  extrude    [i8; 2]   unit extrusion * 63
///  offset 6  linesofar  [u8; 2]   distance / 128, distance % 128
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub pos: [i16; 2],
    pub extrude: [i8; 2],
    pub linesofar: [u8; 2],
}

impl LineVertex {
    /// Extrusion vectors are unit length; 63 keeps them inside `i8`.
    pub const EXTRUDE_SCALE: f32 = 63.0;

    pub fn new(point: [f32; 2], extrude: [f32; 2], tx: u8, ty: u8, linesofar: f32) -> Self {
        let d = linesofar.max(0.0) as u32;
        Self {
            pos: [
                ((point[0].floor() as i16) << 1) | (tx & 1) as i16,
                ((point[1].floor() as i16) << 1) | (ty & 1) as i16,
            ],
            extrude: [
                (Self::EXTRUDE_SCALE * extrude[0]).round() as i8,
                (Self::EXTRUDE_SCALE * extrude[1]).round() as i8,
            ],
            linesofar: [(d / 128).min(127) as u8, (d % 128) as u8],
        }
    }

    /// Distance along the line, as reconstructed by the line shaders.
    pub fn linesofar(&self) -> u32 {
        self.linesofar[0] as u32 * 128 + self.linesofar[1] as u32
    }
}

impl Record for LineVertex {
    const KIND: ArrayKind = ArrayKind::Vertex;
    const LAYOUT: Option<VertexLayout> = Some(VertexLayout::Line);
}

// ── raster ────────────────────────────────────────────────────────────────

/// Tile-space quad corner with its texture coordinate (8 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct RasterVertex {
    pub pos: [i16; 2],
    pub texture_pos: [i16; 2],
}

impl RasterVertex {
    /// Texture coordinate that maps to 1.0 in the shaders.
    pub const TEXTURE_MAX: i16 = 32767;

    #[inline]
    pub const fn new(x: i16, y: i16, tx: i16, ty: i16) -> Self {
        Self { pos: [x, y], texture_pos: [tx, ty] }
    }
}

impl Record for RasterVertex {
    const KIND: ArrayKind = ArrayKind::Vertex;
    const LAYOUT: Option<VertexLayout> = Some(VertexLayout::Raster);
}

// ── symbol ────────────────────────────────────────────────────────────────

/// Glyph / icon vertex (16 bytes).
///
///  offset  0  anchor  [i16; 2]
///  offset  4  offset  [i16; 2]  1/64 px
///  offset  8  data1   [u8; 4]   tex.x/4, tex.y/4, labelminzoom*10, angle
///  offset 12  data2   [u8; 4]   minzoom*10, maxzoom*10, range start, range end
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct SymbolVertex {
    pub anchor: [i16; 2],
    pub offset: [i16; 2],
    pub data1: [u8; 4],
    pub data2: [u8; 4],
}

impl Record for SymbolVertex {
    const KIND: ArrayKind = ArrayKind::Vertex;
    const LAYOUT: Option<VertexLayout> = Some(VertexLayout::Symbol);
}

// ── triangles ─────────────────────────────────────────────────────────────

/// Three 16-bit vertex indices relative to the owning element group.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Triangle {
    pub indices: [u16; 3],
}

impl Triangle {
    #[inline]
    pub const fn new(a: u16, b: u16, c: u16) -> Self {
        Self { indices: [a, b, c] }
    }
}

impl Record for Triangle {
    const KIND: ArrayKind = ArrayKind::Index;
    const LAYOUT: Option<VertexLayout> = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_match_wire_contract() {
        assert_eq!(std::mem::size_of::<FillVertex>(), 4);
        assert_eq!(std::mem::size_of::<LineVertex>(), 8);
        assert_eq!(std::mem::size_of::<RasterVertex>(), 8);
        assert_eq!(std::mem::size_of::<SymbolVertex>(), 16);
        assert_eq!(std::mem::size_of::<Triangle>(), 6);

        for layout in [VertexLayout::Fill, VertexLayout::Line, VertexLayout::Raster, VertexLayout::Symbol] {
            assert_eq!(layout.buffer_layout().array_stride, layout.stride());
        }
    }

    #[test]
    fn line_vertex_packs_normal_bits_and_distance() {
        let v = LineVertex::new([10.7, 3.0], [1.0, -1.0], 1, 0, 300.0);
        assert_eq!(v.pos, [21, 6]);
        assert_eq!(v.extrude, [63, -63]);
        assert_eq!(v.linesofar, [2, 44]);
        assert_eq!(v.linesofar(), 300);
    }

    #[test]
    fn line_vertex_byte_offsets() {
        let v = LineVertex::new([1.0, 2.0], [0.0, 1.0], 0, 1, 129.0);
        let bytes = bytemuck::bytes_of(&v);
        assert_eq!(i16::from_ne_bytes([bytes[0], bytes[1]]), 2);
        assert_eq!(i16::from_ne_bytes([bytes[2], bytes[3]]), 5);
        assert_eq!(bytes[4] as i8, 0);
        assert_eq!(bytes[5] as i8, 63);
        assert_eq!(bytes[6], 1);
        assert_eq!(bytes[7], 1);
    }
}
