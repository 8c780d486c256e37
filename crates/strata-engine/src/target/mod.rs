//! Offscreen render targets.

mod pool;
mod prerendered;

pub use pool::{PoolStats, RenderTarget, RenderTargetPool};
pub use prerendered::PrerenderedTexture;
