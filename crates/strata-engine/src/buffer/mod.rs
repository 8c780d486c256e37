//! Packed tile geometry.
//!
//! Buckets compiled outside this crate hand over their geometry as
//! `PackedBuffer`s of fixed-stride records, subdivided by `ElementGroupTable`s
//! so that every draw call stays within 16-bit index range.

mod groups;
mod packed;
mod records;

pub use groups::{ElementGroup, ElementGroupTable};
pub use packed::{BufferId, PackedBuffer};
pub use records::{
    ArrayKind, FillVertex, LineVertex, RasterVertex, Record, SymbolVertex, Triangle, VertexLayout,
};
