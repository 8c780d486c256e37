use super::paint::{LinePaint, RasterPaint, SymbolPaint};

/// Kind of draw routine a layer is rendered with.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LayerKind {
    Line,
    Raster,
    /// Raster group whose children are composited into a cached texture.
    PrerenderedRaster,
    Symbol,
    DebugVertices,
}

/// A style layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: String,
    /// Layer whose buckets this layer shares.
    pub reference: Option<String>,
    pub kind: LayerKind,
    /// Sub-layers of a prerendered raster group, in paint order.
    pub children: Vec<StyledLayer>,
}

impl Layer {
    pub fn new(id: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: id.into(),
            reference: None,
            kind,
            children: Vec::new(),
        }
    }

    /// Key of this layer's bucket in a tile.
    #[inline]
    pub fn bucket_key(&self) -> &str {
        self.reference.as_deref().unwrap_or(&self.id)
    }
}

/// Resolved paint values for the current frame.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerStyle {
    Line(LinePaint),
    Raster(RasterPaint),
    Symbol(SymbolPaint),
    /// Layers without paint properties.
    Empty,
}

impl LayerStyle {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Line(_) => "line",
            Self::Raster(_) => "raster",
            Self::Symbol(_) => "symbol",
            Self::Empty => "empty",
        }
    }
}

/// A layer paired with its resolved style.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledLayer {
    pub layer: Layer,
    pub style: LayerStyle,
}

impl StyledLayer {
    pub fn new(layer: Layer, style: LayerStyle) -> Self {
        Self { layer, style }
    }
}
