//! Resolved style inputs.
//!
//! Style evaluation happens outside this crate; routines receive plain
//! resolved values per layer and a layout snapshot per bucket.

mod layer;
mod layout;
mod paint;

pub use layer::{Layer, LayerKind, LayerStyle, StyledLayer};
pub use layout::{LayoutProperties, RotationAlignment, SymbolLayout};
pub use paint::{LinePaint, RasterPaint, SymbolPaint, SymbolPassPaint, Translate, TranslateAnchor};
