//! Cross-fading a raster tile with its closest loaded ancestor.

use std::time::{Duration, Instant};

use crate::style::RasterPaint;
use crate::tile::{Tile, TileSource};

/// Opacities `[tile, ancestor]` for a raster tile, summing to the layer's
/// raster opacity.
///
/// When the ancestor sits further from the ideal zoom than the tile (or
/// there is none) the tile fades in since it was added. Otherwise the map is
/// zooming out and the tile fades out since the ancestor arrived.
pub fn opacities(
    tile: &Tile,
    parent: Option<&Tile>,
    source: Option<&dyn TileSource>,
    paint: &RasterPaint,
    now: Instant,
) -> [f32; 2] {
    let Some(source) = source else {
        return [paint.opacity, 0.0];
    };

    let since_tile = fade_progress(now, tile.time_added, paint.fade_duration);
    let ideal_z = source.covering_zoom();

    let tile_opacity = match parent {
        Some(parent) if !parent_further(tile, parent, ideal_z) => {
            let since_parent = fade_progress(now, parent.time_added, paint.fade_duration);
            (1.0 - since_parent).clamp(0.0, 1.0)
        }
        _ => since_tile.clamp(0.0, 1.0),
    };

    [
        tile_opacity * paint.opacity,
        (1.0 - tile_opacity) * paint.opacity,
    ]
}

fn parent_further(tile: &Tile, parent: &Tile, ideal_z: i32) -> bool {
    (parent.coord.z as i32 - ideal_z).abs() > (tile.coord.z as i32 - ideal_z).abs()
}

/// Elapsed fade durations since `added`; infinite for a zero duration.
fn fade_progress(now: Instant, added: Instant, duration: Duration) -> f32 {
    if duration.is_zero() {
        return f32::INFINITY;
    }
    now.saturating_duration_since(added).as_secs_f32() / duration.as_secs_f32()
}
