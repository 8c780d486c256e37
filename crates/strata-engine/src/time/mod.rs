//! Frame-to-frame timing used by label fading.

mod frame_history;

pub use frame_history::{FadeProperties, FrameHistory};
