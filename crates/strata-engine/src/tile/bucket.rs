use crate::buffer::{ElementGroupTable, PackedBuffer};
use crate::style::LayoutProperties;

/// Packed buffers of a bucket, per geometry kind.
#[derive(Debug, Default)]
pub struct BucketBuffers {
    pub fill_vertex: Option<PackedBuffer>,
    pub line_vertex: Option<PackedBuffer>,
    pub line_element: Option<PackedBuffer>,
    pub glyph_vertex: Option<PackedBuffer>,
    pub icon_vertex: Option<PackedBuffer>,
}

impl BucketBuffers {
    /// All present buffers.
    pub fn iter(&self) -> impl Iterator<Item = &PackedBuffer> {
        [
            &self.fill_vertex,
            &self.line_vertex,
            &self.line_element,
            &self.glyph_vertex,
            &self.icon_vertex,
        ]
        .into_iter()
        .flatten()
    }
}

/// Element group tables of a bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketGroups {
    /// Fill / line geometry.
    pub groups: ElementGroupTable,
    pub text: ElementGroupTable,
    pub icon: ElementGroupTable,
    /// Icons are signed-distance fields.
    pub sdf_icons: bool,
}

/// Compiled geometry of one layer in one tile.
#[derive(Debug, Default)]
pub struct Bucket {
    pub layout: LayoutProperties,
    pub buffers: BucketBuffers,
    pub groups: BucketGroups,
}

impl Bucket {
    pub fn new(layout: LayoutProperties) -> Self {
        Self {
            layout,
            ..Default::default()
        }
    }
}
