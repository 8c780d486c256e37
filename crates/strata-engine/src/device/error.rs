/// What the host should do after a frame could not be acquired.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// The surface was configured again; record the next frame as usual.
    Reconfigured,
    /// Drop this frame's command list and try again next frame.
    SkipFrame,
    /// The device is out of memory; stop rendering.
    Fatal,
}
