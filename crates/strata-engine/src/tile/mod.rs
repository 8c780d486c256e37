//! Tiles as seen by the renderer.
//!
//! Tiles are produced and owned by the tile source; the renderer only reads
//! them.

mod bucket;
mod coord;

use std::collections::HashMap;
use std::time::Instant;

use glam::Mat4;

use crate::buffer::{PackedBuffer, RasterVertex};
use crate::render::TextureId;

pub use bucket::{Bucket, BucketBuffers, BucketGroups};
pub use coord::TileCoord;

/// Tile-space units per tile edge.
pub const EXTENT: f32 = 4096.0;

/// Quad covering a whole tile with full texture coordinates, drawn as a
/// 4-vertex triangle strip.
pub fn tile_extent_buffer() -> PackedBuffer {
    const E: i16 = EXTENT as i16;
    const T: i16 = RasterVertex::TEXTURE_MAX;
    PackedBuffer::from_records(&[
        RasterVertex::new(0, 0, 0, 0),
        RasterVertex::new(E, 0, T, 0),
        RasterVertex::new(0, E, 0, T),
        RasterVertex::new(E, E, T, T),
    ])
}

/// A loaded tile.
#[derive(Debug)]
pub struct Tile {
    pub coord: TileCoord,
    /// When the tile finished loading; drives raster fades.
    pub time_added: Instant,
    /// Tile units to clip space.
    pub pos_matrix: Mat4,
    /// Extrusion matrix for lines.
    pub ex_matrix: Mat4,
    /// Raster image, once uploaded.
    pub texture: Option<TextureId>,
    /// Raster quad covering the tile's data bounds; the shared tile extent
    /// is used when absent.
    pub bounds: Option<PackedBuffer>,
    pub buckets: HashMap<String, Bucket>,
}

impl Tile {
    pub fn new(coord: TileCoord, time_added: Instant) -> Self {
        Self {
            coord,
            time_added,
            pos_matrix: Mat4::IDENTITY,
            ex_matrix: Mat4::IDENTITY,
            texture: None,
            bounds: None,
            buckets: HashMap::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.coord.id()
    }

    #[inline]
    pub fn bucket(&self, key: &str) -> Option<&Bucket> {
        self.buckets.get(key)
    }

    /// Every packed buffer owned by this tile.
    pub fn buffers(&self) -> impl Iterator<Item = &PackedBuffer> {
        self.bounds
            .iter()
            .chain(self.buckets.values().flat_map(|b| b.buffers.iter()))
    }
}

/// Loaded-tile queries the raster fade needs.
pub trait TileSource {
    /// Closest loaded ancestor of `coord`, if any.
    fn find_loaded_parent(&self, coord: TileCoord) -> Option<&Tile>;

    /// Zoom level the source would ideally cover the viewport with.
    fn covering_zoom(&self) -> i32;
}

/// A tile as drawn in this frame.
///
/// Prerendered groups draw the same tile again with a projection onto the
/// cached texture, hence the separate matrix.
#[derive(Debug, Copy, Clone)]
pub struct TileView<'a> {
    pub tile: &'a Tile,
    pub pos_matrix: Mat4,
}

impl<'a> TileView<'a> {
    #[inline]
    pub fn new(tile: &'a Tile) -> Self {
        Self {
            tile,
            pos_matrix: tile.pos_matrix,
        }
    }

    #[inline]
    pub fn with_matrix(tile: &'a Tile, pos_matrix: Mat4) -> Self {
        Self { tile, pos_matrix }
    }

    #[inline]
    pub fn z(&self) -> u8 {
        self.tile.coord.z
    }
}

/// Visible tiles of one source for one layer.
#[derive(Clone, Default)]
pub struct TileSet<'a> {
    pub source: Option<&'a dyn TileSource>,
    pub views: Vec<TileView<'a>>,
}

impl<'a> TileSet<'a> {
    pub fn new(source: Option<&'a dyn TileSource>, tiles: impl IntoIterator<Item = &'a Tile>) -> Self {
        Self {
            source,
            views: tiles.into_iter().map(TileView::new).collect(),
        }
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, TileView<'a>> {
        self.views.iter()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{FillVertex, Triangle};
    use crate::style::LayoutProperties;

    #[test]
    fn buffers_cover_bounds_and_buckets() {
        let mut tile = Tile::new(TileCoord::new(1, 0, 1), Instant::now());
        tile.bounds = Some(PackedBuffer::from_records(&[FillVertex::new(0, 0)]));

        let mut bucket = Bucket::new(LayoutProperties::default());
        bucket.buffers.fill_vertex = Some(PackedBuffer::new::<FillVertex>());
        bucket.buffers.line_element = Some(PackedBuffer::new::<Triangle>());
        tile.buckets.insert("water".into(), bucket);

        assert_eq!(tile.buffers().count(), 3);
        assert!(tile.bucket("water").is_some());
        assert!(tile.bucket("roads").is_none());
    }

    #[test]
    fn tile_set_views_use_tile_matrices() {
        let mut tile = Tile::new(TileCoord::new(0, 0, 0), Instant::now());
        tile.pos_matrix = Mat4::from_scale(glam::Vec3::splat(2.0));
        let set = TileSet::new(None, [&tile]);
        assert_eq!(set.views.len(), 1);
        assert_eq!(set.views[0].pos_matrix, tile.pos_matrix);
        assert_eq!(set.views[0].z(), 0);
    }

    #[test]
    fn tile_extent_spans_tile_and_texture() {
        let quad = tile_extent_buffer();
        assert_eq!(quad.len(), 4);
        assert_eq!(
            quad.read::<RasterVertex>(3),
            Some(RasterVertex::new(4096, 4096, 32767, 32767))
        );
    }
}
