use std::f32::consts::PI;

use glam::{Mat4, Vec3};

use crate::buffer::{ElementGroupTable, PackedBuffer};
use crate::render::{
    Filter, IconProgram, IconUniforms, Mat4Cols, Primitive, RenderError, SdfProgram, SdfUniforms,
    TextureBinding,
};
use crate::style::{Layer, LayoutProperties, SymbolLayout, SymbolPaint, SymbolPassPaint};
use crate::tile::{Bucket, TileSet};
use crate::time::FadeProperties;

use super::{DrawEnv, Painter};

/// Edge of the SDF glyph cutoff, in 1/8 px.
const SDF_PX: f32 = 8.0;
const BLUR_OFFSET: f32 = 1.19;
const HALO_OFFSET: f32 = 6.0;
/// Fill edge: `(256 - 64) / 256`.
const FILL_BUFFER: f32 = 0.75;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Pass {
    Text,
    Icon,
}

impl Pass {
    /// Size the atlas images were rendered at.
    fn default_size(self) -> f32 {
        match self {
            Self::Text => 24.0,
            Self::Icon => 1.0,
        }
    }

    fn layout(self, layout: &LayoutProperties) -> &SymbolLayout {
        match self {
            Self::Text => &layout.text,
            Self::Icon => &layout.icon,
        }
    }

    fn paint(self, paint: &SymbolPaint) -> &SymbolPassPaint {
        match self {
            Self::Text => &paint.text,
            Self::Icon => &paint.icon,
        }
    }

    fn groups(self, bucket: &Bucket) -> &ElementGroupTable {
        match self {
            Self::Text => &bucket.groups.text,
            Self::Icon => &bucket.groups.icon,
        }
    }

    fn vertices(self, bucket: &Bucket) -> Option<&PackedBuffer> {
        match self {
            Self::Text => bucket.buffers.glyph_vertex.as_ref(),
            Self::Icon => bucket.buffers.icon_vertex.as_ref(),
        }
    }
}

/// Bearing in radians as an unsigned byte angle, as the vertex data stores it.
pub fn quantize_angle(angle: f32) -> f32 {
    ((angle / PI * 128.0).round() as i32).rem_euclid(256) as f32
}

/// Edge parameters of one SDF draw.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SdfParams {
    pub gamma: f32,
    pub buffer: f32,
}

impl SdfParams {
    pub fn fill(default_size: f32, font_size: f32, pixel_ratio: f32) -> Self {
        Self {
            gamma: 0.105 * default_size / font_size / pixel_ratio,
            buffer: FILL_BUFFER,
        }
    }

    /// Halo drawn under a fill with `fill`'s gamma.
    pub fn halo(fill: Self, halo_width: f32, halo_blur: f32, font_scale: f32) -> Self {
        Self {
            gamma: halo_blur * BLUR_OFFSET / font_scale / SDF_PX + fill.gamma,
            buffer: (HALO_OFFSET - halo_width / font_scale) / SDF_PX,
        }
    }
}

/// Layer-wide values of one symbol pass.
#[derive(Debug, Copy, Clone, PartialEq)]
struct PassParams {
    font_size: f32,
    font_scale: f32,
    aligned_with_map: bool,
    exmatrix: Mat4,
    flip: bool,
    angle: f32,
    zoom: f32,
}

impl PassParams {
    fn new(pass: Pass, layout: &LayoutProperties, paint: &SymbolPaint, env: &DrawEnv<'_>) -> Self {
        let layout = pass.layout(layout);
        let aligned_with_map = layout.aligned_with_map();

        let mut exmatrix = env.projection;
        if aligned_with_map && env.transform.angle != 0.0 {
            exmatrix *= Mat4::from_rotation_z(env.transform.angle);
        }
        let font_size = pass.paint(paint).size.unwrap_or(layout.max_size);
        let font_scale = font_size / pass.default_size();
        exmatrix *= Mat4::from_scale(Vec3::new(font_scale, font_scale, 1.0));

        let zoom_adjust = (font_size / layout.max_size).log2();
        let zoom_adjust = if zoom_adjust.is_finite() { zoom_adjust } else { 0.0 };

        Self {
            font_size,
            font_scale,
            aligned_with_map,
            exmatrix,
            flip: aligned_with_map && layout.keep_upright,
            angle: quantize_angle(env.transform.angle),
            zoom: (env.transform.zoom - zoom_adjust) * 10.0,
        }
    }
}

/// Uniform fields shared by the SDF and icon programs.
trait SymbolUniforms {
    fn set_pass(&mut self, params: &PassParams, texsize: [f32; 2], fade: &FadeProperties, zoom: f32);
    fn set_matrix(&mut self, matrix: Mat4Cols);
}

macro_rules! impl_symbol_uniforms {
    ($ty:ty) => {
        impl SymbolUniforms for $ty {
            fn set_pass(
                &mut self,
                params: &PassParams,
                texsize: [f32; 2],
                fade: &FadeProperties,
                zoom: f32,
            ) {
                self.exmatrix = params.exmatrix.to_cols_array_2d();
                self.texsize = texsize;
                self.flip = if params.flip { 1.0 } else { 0.0 };
                self.angle = params.angle;
                self.zoom = params.zoom;
                self.fadedist = fade.fadedist * 10.0;
                self.minfadezoom = (fade.min_fade_zoom * 10.0).floor();
                self.maxfadezoom = (fade.max_fade_zoom * 10.0).floor();
                self.fadezoom = (zoom + fade.bump) * 10.0;
            }

            fn set_matrix(&mut self, matrix: Mat4Cols) {
                self.matrix = matrix;
            }
        }
    };
}

impl_symbol_uniforms!(SdfUniforms);
impl_symbol_uniforms!(IconUniforms);

pub(super) fn draw_symbols(
    p: &mut Painter<'_>,
    layer: &Layer,
    paint: &SymbolPaint,
    tiles: &TileSet<'_>,
) -> Result<(), RenderError> {
    let key = layer.bucket_key();
    let Some(layout) = tiles
        .views
        .first()
        .and_then(|view| view.tile.bucket(key))
        .map(|bucket| &bucket.layout)
    else {
        return Ok(());
    };

    let mut p = p.preserve_state();
    p.ctx.set_stencil_test(false);

    draw_pass(&mut p, Pass::Text, layer, layout, paint, tiles)?;
    draw_pass(&mut p, Pass::Icon, layer, layout, paint, tiles)
}

fn draw_pass(
    p: &mut Painter<'_>,
    pass: Pass,
    layer: &Layer,
    layout: &LayoutProperties,
    paint: &SymbolPaint,
    tiles: &TileSet<'_>,
) -> Result<(), RenderError> {
    let env = p.env;
    let params = PassParams::new(pass, layout, paint, &env);
    let sdf_icons = tiles
        .views
        .first()
        .and_then(|view| view.tile.bucket(layer.bucket_key()))
        .is_some_and(|bucket| bucket.groups.sdf_icons);
    let sdf = pass == Pass::Text || sdf_icons;

    let (binding, texsize) = match pass {
        Pass::Text => {
            let Some(glyphs) = env.assets.glyphs else {
                log::trace!("symbol layer `{}`: glyph atlas not ready", layer.id);
                return Ok(());
            };
            (
                TextureBinding::linear(glyphs.texture),
                [glyphs.width as f32 / 4.0, glyphs.height as f32 / 4.0],
            )
        }
        Pass::Icon => {
            let Some((sprite, texture)) = env
                .assets
                .loaded_sprite()
                .and_then(|sprite| sprite.texture.map(|t| (sprite, t)))
            else {
                log::trace!("symbol layer `{}`: sprite not loaded", layer.id);
                return Ok(());
            };
            let smooth = params.aligned_with_map
                || env.rotating
                || env.zooming
                || params.font_scale != 1.0
                || sdf;
            let filter = if smooth { Filter::Linear } else { Filter::Nearest };
            (
                TextureBinding::new(texture, filter),
                [sprite.width as f32, sprite.height as f32],
            )
        }
    };

    p.ctx.bind_texture(0, Some(binding))?;
    if sdf {
        p.ctx.switch_program::<SdfProgram>();
    } else {
        p.ctx.switch_program::<IconProgram>();
    }
    with_uniforms(p, sdf, |u| u.set_pass(&params, texsize, &env.fade, env.transform.zoom))?;

    let pass_paint = pass.paint(paint);
    let fill = SdfParams::fill(pass.default_size(), params.font_size, env.pixel_ratio);
    let key = layer.bucket_key();

    for view in tiles.iter() {
        let Some(bucket) = view.tile.bucket(key) else {
            continue;
        };
        let groups = pass.groups(bucket);
        if groups.is_empty() {
            continue;
        }
        let Some(vertices) = pass.vertices(bucket) else {
            continue;
        };

        let matrix = env
            .transform
            .translate_matrix(view.pos_matrix, view.z(), &pass_paint.translate)
            .to_cols_array_2d();
        p.ctx.bind_vertex_buffer(vertices)?;
        with_uniforms(p, sdf, |u| u.set_matrix(matrix))?;

        if !sdf {
            p.ctx.uniforms::<IconProgram>()?.opacity = paint.icon_opacity;
            draw_groups(p, groups)?;
            continue;
        }

        // Halo goes underneath the fill.
        if let Some(halo_color) = pass_paint.halo_color {
            let halo = SdfParams::halo(
                fill,
                pass_paint.halo_width,
                pass_paint.halo_blur,
                params.font_scale,
            );
            set_sdf(p, halo, halo_color.to_array())?;
            draw_groups(p, groups)?;
        }
        set_sdf(p, fill, pass_paint.color.to_array())?;
        draw_groups(p, groups)?;
    }
    Ok(())
}

fn with_uniforms(
    p: &mut Painter<'_>,
    sdf: bool,
    f: impl FnOnce(&mut dyn SymbolUniforms),
) -> Result<(), RenderError> {
    if sdf {
        f(p.ctx.uniforms::<SdfProgram>()?);
    } else {
        f(p.ctx.uniforms::<IconProgram>()?);
    }
    Ok(())
}

fn set_sdf(p: &mut Painter<'_>, params: SdfParams, color: [f32; 4]) -> Result<(), RenderError> {
    let u = p.ctx.uniforms::<SdfProgram>()?;
    u.gamma = params.gamma;
    u.buffer = params.buffer;
    u.color = color;
    Ok(())
}

fn draw_groups(p: &mut Painter<'_>, groups: &ElementGroupTable) -> Result<(), RenderError> {
    for group in groups {
        p.ctx
            .draw_arrays(Primitive::TriangleList, group.vertex_start_index, group.vertex_length)?;
    }
    Ok(())
}
