//! Strata engine crate.
//!
//! Draws styled map layers over vector and raster tiles: packed tile
//! geometry, per-layer draw routines, raster cross-fades and pooled
//! offscreen targets. Routines record into a [`render::RenderContext`];
//! [`render::GpuExecutor`] replays the recording on wgpu.

pub mod device;
pub mod logging;
pub mod time;

pub mod assets;
pub mod buffer;
pub mod draw;
pub mod fade;
pub mod paint;
pub mod render;
pub mod renderer;
pub mod style;
pub mod target;
pub mod tile;
pub mod transform;

pub use renderer::{FrameState, Renderer, RendererConfig};
