/// Position of a tile in the pyramid.
///
/// Packed id: `((2^z * y + x) * 32) + z`. The low five bits carry the zoom,
/// so zooms above 31 are not representable.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub const MAX_ZOOM: u8 = 31;

    #[inline]
    pub const fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Packed tile id.
    pub fn id(self) -> u64 {
        debug_assert!(self.z <= Self::MAX_ZOOM);
        let dim = 1u64 << self.z;
        ((dim * self.y as u64 + self.x as u64) * 32) + self.z as u64
    }

    /// Decodes a packed tile id.
    pub fn from_id(id: u64) -> Self {
        let z = (id % 32) as u8;
        let dim = 1u64 << z;
        let xy = (id - z as u64) / 32;
        Self {
            z,
            x: (xy % dim) as u32,
            y: (xy / dim) as u32,
        }
    }

    /// Direct parent, `None` at zoom 0.
    pub fn parent(self) -> Option<Self> {
        if self.z == 0 {
            return None;
        }
        Some(Self::new(self.z - 1, self.x / 2, self.y / 2))
    }

    /// Ancestor at zoom `z`, `None` if `z` is not above this tile.
    pub fn ancestor(self, z: u8) -> Option<Self> {
        if z > self.z {
            return None;
        }
        let shift = self.z - z;
        Some(Self::new(z, self.x >> shift, self.y >> shift))
    }

    /// Where this tile sits inside an ancestor at zoom `parent_z`:
    /// `(scale, [tl_x, tl_y])` with `scale = 2^(parent_z - z)` and the
    /// top-left corner in the ancestor's unit square.
    pub fn position_in(self, parent_z: u8) -> (f32, [f32; 2]) {
        let scale = 2f32.powi(parent_z as i32 - self.z as i32);
        let tl = [
            (self.x as f32 * scale) % 1.0,
            (self.y as f32 * scale) % 1.0,
        ];
        (scale, tl)
    }
}
