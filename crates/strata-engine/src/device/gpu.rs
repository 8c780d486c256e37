use anyhow::{Context, Result};
use glam::UVec2;
use wgpu::SurfaceError;

use super::surface;
use super::{GpuFrame, GpuInit, SurfaceErrorAction};

/// Where finished frames go.
enum Presentation<'w> {
    Surface {
        surface: wgpu::Surface<'w>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
        format: wgpu::TextureFormat,
    },
}

/// Owns wgpu core objects and the presentation target.
///
/// This type is the low-level rendering context:
/// - creates and stores Instance/Adapter/Device/Queue
/// - creates and configures the Surface (swapchain), or an offscreen color
///   texture for headless use
/// - acquires frames and provides an encoder + view for the executor
pub struct Gpu<'w> {
    /// Kept alive for the lifetime of the surface.
    #[allow(dead_code)]
    instance: wgpu::Instance,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,

    presentation: Presentation<'w>,

    /// Current drawable size in physical pixels.
    size: UVec2,
}

impl<'w> Gpu<'w> {
    /// Creates a GPU context presenting to `target` (a window or canvas).
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn with_surface(
        target: impl Into<wgpu::SurfaceTarget<'w>>,
        size: UVec2,
        init: GpuInit,
    ) -> Result<Self> {
        anyhow::ensure!(size.x > 0 && size.y > 0, "surface has zero size");

        let instance = create_instance();

        // Surface lifetime is tied to the target via `'w`.
        let surface = instance
            .create_surface(target)
            .context("failed to create wgpu surface")?;

        let adapter = request_adapter(&instance, &init, Some(&surface)).await?;
        let (device, queue) = request_device(&adapter, &init).await?;

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps, init.prefer_srgb)
            .context("no supported surface formats")?;
        let alpha_mode = surface::choose_alpha_mode(&caps, init.alpha_mode);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.x,
            height: size.y,
            present_mode: init.present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);

        log::info!(
            "gpu ready: adapter={:?} format={format:?} size={}x{}",
            adapter.get_info().name,
            size.x,
            size.y
        );

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            presentation: Presentation::Surface { surface, config },
            size,
        })
    }

    /// Creates a GPU context rendering into an offscreen color texture.
    pub async fn headless(size: UVec2, init: GpuInit) -> Result<Self> {
        anyhow::ensure!(size.x > 0 && size.y > 0, "offscreen target has zero size");

        let instance = create_instance();
        let adapter = request_adapter(&instance, &init, None).await?;
        let (device, queue) = request_device(&adapter, &init).await?;

        let format = init.headless_format;
        let texture = surface::create_offscreen(&device, format, size);

        log::info!(
            "gpu ready (headless): adapter={:?} format={format:?} size={}x{}",
            adapter.get_info().name,
            size.x,
            size.y
        );

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            presentation: Presentation::Offscreen { texture, format },
            size,
        })
    }

    /// Blocking variant of [`Gpu::headless`].
    pub fn headless_blocking(size: UVec2, init: GpuInit) -> Result<Self> {
        pollster::block_on(Self::headless(size, init))
    }

    /// Returns the color format of the presented frames.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        match &self.presentation {
            Presentation::Surface { config, .. } => config.format,
            Presentation::Offscreen { format, .. } => *format,
        }
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Offscreen color texture, when headless.
    pub fn offscreen_texture(&self) -> Option<&wgpu::Texture> {
        match &self.presentation {
            Presentation::Offscreen { texture, .. } => Some(texture),
            Presentation::Surface { .. } => None,
        }
    }

    /// Reconfigures the presentation target after a resize.
    ///
    /// wgpu does not support configuring a surface with a 0x0 size; in that case,
    /// only internal state is updated and configuration is deferred.
    pub fn resize(&mut self, new_size: UVec2) {
        self.size = new_size;
        if new_size.x == 0 || new_size.y == 0 {
            return;
        }

        match &mut self.presentation {
            Presentation::Surface { surface, config } => {
                config.width = new_size.x;
                config.height = new_size.y;
                surface.configure(&self.device, config);
            }
            Presentation::Offscreen { texture, format } => {
                *texture = surface::create_offscreen(&self.device, *format, new_size);
            }
        }
    }

    /// Acquires the next frame and creates an encoder.
    ///
    /// For surfaces, the returned frame owns the surface texture; releasing it
    /// after submission presents the frame.
    pub fn begin_frame(&self) -> std::result::Result<GpuFrame, SurfaceError> {
        let (surface_texture, view) = match &self.presentation {
            Presentation::Surface { surface, .. } => {
                let st = surface.get_current_texture()?;
                let view = st.texture.create_view(&wgpu::TextureViewDescriptor::default());
                (Some(st), view)
            }
            Presentation::Offscreen { texture, .. } => {
                (None, texture.create_view(&wgpu::TextureViewDescriptor::default()))
            }
        };

        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("strata frame encoder"),
            });

        Ok(GpuFrame {
            surface_texture,
            view,
            encoder,
        })
    }

    /// Submits the recorded commands for the given frame and presents it.
    pub fn submit(&self, frame: GpuFrame) {
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        drop(frame.view);
        if let Some(st) = frame.surface_texture {
            st.present();
        }
    }

    /// Converts a `SurfaceError` into a higher-level action.
    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        let device = &self.device;
        match &self.presentation {
            Presentation::Surface { surface, config } => {
                surface::map_surface_error(err, self.size, || surface.configure(device, config))
            }
            Presentation::Offscreen { .. } => surface::map_surface_error(err, self.size, || {}),
        }
    }
}

fn create_instance() -> wgpu::Instance {
    // Use all backends to allow wgpu to select the optimal platform backend.
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

async fn request_adapter(
    instance: &wgpu::Instance,
    init: &GpuInit,
    surface: Option<&wgpu::Surface<'_>>,
) -> Result<wgpu::Adapter> {
    instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: init.power_preference,
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .context("failed to find a suitable GPU adapter")
}

async fn request_device(
    adapter: &wgpu::Adapter,
    init: &GpuInit,
) -> Result<(wgpu::Device, wgpu::Queue)> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("strata-engine device"),
            required_features: init.required_features,
            required_limits: init.required_limits.clone(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create wgpu device/queue")
}
