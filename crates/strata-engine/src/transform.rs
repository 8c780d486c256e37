//! Map view state and the matrices derived from it.

use glam::{Mat4, Vec2, Vec3};

use crate::style::{Translate, TranslateAnchor};

/// Current camera of the map view.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub zoom: f32,
    /// Bearing in radians.
    pub angle: f32,
    /// Viewport size in logical pixels.
    pub width: f32,
    pub height: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            zoom: 0.0,
            angle: 0.0,
            width: 512.0,
            height: 512.0,
        }
    }
}

impl Transform {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// `2^zoom`.
    #[inline]
    pub fn scale(&self) -> f32 {
        self.zoom.exp2()
    }

    /// Integer zoom the tiles are rendered at.
    #[inline]
    pub fn tile_zoom(&self) -> i32 {
        self.zoom.floor() as i32
    }

    #[inline]
    pub fn zoom_fraction(&self) -> f32 {
        self.zoom - self.zoom.floor()
    }

    /// Screen pixels per tile unit for tiles of zoom `z`, with 4096-unit tiles
    /// spanning 512 pixels at their own zoom.
    #[inline]
    pub fn tile_ratio(&self, z: u8) -> f32 {
        self.scale() / (z as f32).exp2() / 8.0
    }

    /// Pixel space (top-left origin) to clip space.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::orthographic_rh_gl(0.0, self.width, self.height, 0.0, 0.0, -1.0)
    }

    /// Applies a pixel translate to a tile matrix.
    ///
    /// Viewport-anchored offsets are rotated back by the bearing so that they
    /// stay fixed on screen.
    pub fn translate_matrix(&self, matrix: Mat4, z: u8, translate: &Translate) -> Mat4 {
        if translate.is_zero() {
            return matrix;
        }

        let mut offset = Vec2::from(translate.offset);
        if translate.anchor == TranslateAnchor::Viewport {
            offset = Vec2::from_angle(-self.angle).rotate(offset);
        }

        let ratio = self.tile_ratio(z);
        matrix * Mat4::from_translation(Vec3::new(offset.x / ratio, offset.y / ratio, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn zoom_derivatives() {
        let t = Transform {
            zoom: 3.25,
            ..Default::default()
        };
        assert!(approx(t.scale(), 3.25f32.exp2()));
        assert_eq!(t.tile_zoom(), 3);
        assert!(approx(t.zoom_fraction(), 0.25));
    }

    #[test]
    fn tile_ratio_at_own_zoom_is_one_eighth() {
        let t = Transform {
            zoom: 4.0,
            ..Default::default()
        };
        assert!(approx(t.tile_ratio(4), 0.125));
        assert!(approx(t.tile_ratio(3), 0.25));
    }

    #[test]
    fn projection_maps_corners() {
        let t = Transform::new(800.0, 600.0);
        let m = t.projection_matrix();
        let tl = m.project_point3(Vec3::ZERO);
        let br = m.project_point3(Vec3::new(800.0, 600.0, 0.0));
        assert!(approx(tl.x, -1.0) && approx(tl.y, 1.0));
        assert!(approx(br.x, 1.0) && approx(br.y, -1.0));
    }

    #[test]
    fn zero_translate_is_identity() {
        let t = Transform::default();
        let m = Mat4::from_scale(Vec3::splat(3.0));
        assert_eq!(t.translate_matrix(m, 0, &Translate::default()), m);
    }

    #[test]
    fn translate_divides_by_tile_ratio() {
        let t = Transform {
            zoom: 2.0,
            ..Default::default()
        };
        let translate = Translate {
            offset: [1.0, 2.0],
            anchor: TranslateAnchor::Map,
        };
        // ratio at z=2 is 1/8: one pixel is eight tile units
        let m = t.translate_matrix(Mat4::IDENTITY, 2, &translate);
        let p = m.transform_point3(Vec3::ZERO);
        assert!(approx(p.x, 8.0) && approx(p.y, 16.0));
    }

    #[test]
    fn viewport_anchor_counter_rotates() {
        let t = Transform {
            zoom: 3.0,
            angle: std::f32::consts::FRAC_PI_2,
            ..Default::default()
        };
        let translate = Translate {
            offset: [1.0, 0.0],
            anchor: TranslateAnchor::Viewport,
        };
        let p = t
            .translate_matrix(Mat4::IDENTITY, 3, &translate)
            .transform_point3(Vec3::ZERO);
        assert!(approx(p.x, 0.0));
        assert!(approx(p.y, -8.0));
    }
}
