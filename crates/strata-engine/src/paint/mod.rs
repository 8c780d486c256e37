//! Color values handed over by style evaluation.
//!
//! Colors are linear premultiplied RGBA, the form the layer shaders blend with.

pub mod color;

pub use color::Color;
