/// A single acquired frame.
///
/// Short-lived: holding a surface texture prevents acquisition of the next
/// one. Headless frames carry no surface texture and render into the
/// device's offscreen color target.
pub struct GpuFrame {
    pub surface_texture: Option<wgpu::SurfaceTexture>,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
