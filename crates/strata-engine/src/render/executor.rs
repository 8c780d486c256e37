use std::collections::HashMap;

use glam::UVec2;
use wgpu::util::DeviceExt;

use crate::buffer::{ArrayKind, BufferId, VertexLayout};
use crate::device::Gpu;

use super::cmd::{DrawCall, DrawRange, GpuCmd};
use super::error::RenderError;
use super::handles::{Filter, Framebuffer, TargetId, TextureId, TextureSource};
use super::plan::{plan_passes, PassOp, PassPlan};
use super::program::ProgramKind;
use super::state::{BlendMode, Primitive, StencilMode};

/// Byte distance between consecutive draws' uniform blocks.
pub const UNIFORM_STRIDE: u64 = 256;

/// Color format of pooled render targets.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Stencil8;

/// The frame a command list is replayed into.
#[derive(Copy, Clone)]
pub struct FrameTarget<'a> {
    pub view: &'a wgpu::TextureView,
    pub size: UVec2,
    pub format: wgpu::TextureFormat,
}

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

struct GpuTarget {
    color_view: wgpu::TextureView,
    stencil_view: wgpu::TextureView,
    size: u32,
}

struct Layouts {
    uniforms: wgpu::BindGroupLayout,
    textures: wgpu::BindGroupLayout,
    pipeline: wgpu::PipelineLayout,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
struct PipelineKey {
    program: ProgramKind,
    layout: VertexLayout,
    primitive: Primitive,
    blend: BlendMode,
    stencil: StencilMode,
    format: wgpu::TextureFormat,
}

impl PipelineKey {
    fn new(draw: &DrawCall, format: wgpu::TextureFormat) -> Self {
        Self {
            program: draw.program,
            layout: draw.vertex.layout,
            primitive: draw.primitive,
            blend: draw.blend,
            stencil: draw.stencil,
            format,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
struct TextureKey {
    sources: [Option<TextureSource>; 2],
    filter: Filter,
}

impl TextureKey {
    /// Both units share one sampler, taken from unit 0.
    fn new(draw: &DrawCall) -> Self {
        Self {
            sources: draw.textures.map(|t| t.map(|t| t.source)),
            filter: draw.textures[0].map_or(Filter::Linear, |t| t.filter),
        }
    }
}

/// Replays recorded frames on wgpu.
///
/// Owns every GPU object the renderer needs: uploaded packed buffers,
/// registered textures, pooled target storage, pipelines (created lazily
/// per state combination) and the dynamic-offset uniform buffer.
#[derive(Default)]
pub struct GpuExecutor {
    layouts: Option<Layouts>,
    shaders: HashMap<ProgramKind, wgpu::ShaderModule>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    linear_sampler: Option<wgpu::Sampler>,
    nearest_sampler: Option<wgpu::Sampler>,
    dummy_view: Option<wgpu::TextureView>,

    buffers: HashMap<BufferId, wgpu::Buffer>,
    textures: HashMap<TextureId, GpuTexture>,
    targets: HashMap<TargetId, GpuTarget>,
    surface_stencil: Option<(UVec2, wgpu::TextureView)>,

    uniform_buffer: Option<wgpu::Buffer>,
    uniform_capacity: u64,
    uniform_bind_group: Option<wgpu::BindGroup>,

    warned_missing_texture: bool,
    warned_skipped_draw: bool,
}

impl GpuExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    // ── textures ──────────────────────────────────────────────────────────

    /// Registers an RGBA8 texture (raster tile, sprite or glyph atlas).
    pub fn create_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> TextureId {
        let id = TextureId::allocate();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("strata texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let entry = GpuTexture {
            texture,
            view,
            width: width.max(1),
            height: height.max(1),
        };
        if !rgba.is_empty() {
            write_region(queue, &entry.texture, 0, 0, width, height, rgba);
        }
        self.textures.insert(id, entry);
        log::debug!("texture {} registered ({width}x{height})", id.raw());
        id
    }

    /// Replaces a region of a registered texture, e.g. after the glyph atlas grew.
    #[allow(clippy::too_many_arguments)]
    pub fn update_texture(
        &mut self,
        queue: &wgpu::Queue,
        id: TextureId,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<(), RenderError> {
        let entry = self.textures.get(&id).ok_or(RenderError::UnknownTexture(id))?;
        let fits = x.checked_add(width).is_some_and(|r| r <= entry.width)
            && y.checked_add(height).is_some_and(|b| b <= entry.height);
        if !fits {
            log::warn!(
                "texture {} update {width}x{height} at ({x}, {y}) exceeds {}x{}; ignored",
                id.raw(),
                entry.width,
                entry.height
            );
            return Ok(());
        }
        if width == 0 || height == 0 {
            return Ok(());
        }
        write_region(queue, &entry.texture, x, y, width, height, rgba);
        Ok(())
    }

    pub fn remove_texture(&mut self, id: TextureId) -> bool {
        self.textures.remove(&id).is_some()
    }

    #[inline]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    #[inline]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    #[inline]
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    // ── frames ────────────────────────────────────────────────────────────

    /// Acquires a frame from `gpu`, replays `cmds` into it and presents it.
    pub fn render(&mut self, gpu: &Gpu<'_>, cmds: &[GpuCmd]) -> Result<(), wgpu::SurfaceError> {
        let mut frame = gpu.begin_frame()?;
        let target = FrameTarget {
            view: &frame.view,
            size: gpu.size(),
            format: gpu.surface_format(),
        };
        self.execute(gpu.device(), gpu.queue(), &mut frame.encoder, target, cmds);
        gpu.submit(frame);
        Ok(())
    }

    /// Replays one frame's commands into `encoder`.
    pub fn execute(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        frame: FrameTarget<'_>,
        cmds: &[GpuCmd],
    ) {
        self.ensure_layouts(device);
        self.ensure_samplers(device);
        self.ensure_dummy(device, queue);
        self.ensure_surface_stencil(device, frame.size);

        // Resources first: every upload lands before the passes run.
        let mut uniform_bytes: Vec<u8> = Vec::new();
        let mut uniform_offsets: HashMap<usize, u32> = HashMap::new();
        let mut destroyed: Vec<BufferId> = Vec::new();

        for (i, cmd) in cmds.iter().enumerate() {
            match cmd {
                GpuCmd::UploadBuffer { id, kind, bytes } => {
                    destroyed.retain(|d| d != id);
                    self.upload_buffer(device, *id, *kind, bytes)
                }
                GpuCmd::DestroyBuffer(id) => destroyed.push(*id),
                GpuCmd::CreateTarget { id, size } => self.create_target(device, *id, *size),
                GpuCmd::Draw(draw) => {
                    let offset = uniform_bytes.len();
                    uniform_bytes.extend_from_slice(draw.uniforms.bytes());
                    uniform_bytes.resize(offset + UNIFORM_STRIDE as usize, 0);
                    uniform_offsets.insert(i, offset as u32);
                }
                GpuCmd::BindFramebuffer(_) | GpuCmd::Viewport(_) | GpuCmd::Clear { .. } => {}
            }
        }

        self.ensure_uniform_capacity(device, uniform_bytes.len() as u64);
        if let Some(ubo) = self.uniform_buffer.as_ref() {
            if !uniform_bytes.is_empty() {
                queue.write_buffer(ubo, 0, &uniform_bytes);
            }
        }

        let passes = plan_passes(cmds);

        let mut texture_groups: HashMap<TextureKey, wgpu::BindGroup> = HashMap::new();
        for pass in &passes {
            let format = self.pass_format(pass.framebuffer, frame.format);
            for op in &pass.ops {
                let PassOp::Draw(i) = op else { continue };
                let Some(draw) = cmds[*i].as_draw() else { continue };
                self.ensure_pipeline(device, PipelineKey::new(draw, format));
                let key = TextureKey::new(draw);
                if !texture_groups.contains_key(&key) {
                    if let Some(group) = self.texture_bind_group(device, key) {
                        texture_groups.insert(key, group);
                    }
                }
            }
        }

        let mut skipped = 0;
        for pass in &passes {
            skipped += self.encode_pass(encoder, frame, pass, cmds, &uniform_offsets, &texture_groups);
        }
        if skipped > 0 && !self.warned_skipped_draw {
            log::warn!("GpuExecutor: {skipped} draw(s) skipped, missing buffer or target");
            self.warned_skipped_draw = true;
        }

        // Dropping only releases our handle; submitted work keeps the buffer alive.
        for id in destroyed {
            self.buffers.remove(&id);
        }
    }

    fn pass_format(&self, framebuffer: Framebuffer, frame_format: wgpu::TextureFormat) -> wgpu::TextureFormat {
        match framebuffer {
            Framebuffer::Default => frame_format,
            Framebuffer::Target(_) => TARGET_FORMAT,
        }
    }

    /// Encodes one render pass; returns the number of draws that had to be skipped.
    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        frame: FrameTarget<'_>,
        pass: &PassPlan,
        cmds: &[GpuCmd],
        uniform_offsets: &HashMap<usize, u32>,
        texture_groups: &HashMap<TextureKey, wgpu::BindGroup>,
    ) -> usize {
        let (color_view, stencil_view, width, height) = match pass.framebuffer {
            Framebuffer::Default => {
                let Some((_, stencil)) = self.surface_stencil.as_ref() else {
                    return pass.draw_count();
                };
                (frame.view, stencil, frame.size.x, frame.size.y)
            }
            Framebuffer::Target(id) => {
                let Some(target) = self.targets.get(&id) else {
                    return pass.draw_count();
                };
                (&target.color_view, &target.stencil_view, target.size, target.size)
            }
        };
        let format = self.pass_format(pass.framebuffer, frame.format);
        let Some(uniform_group) = self.uniform_bind_group.as_ref() else {
            return pass.draw_count();
        };

        let color_load = match pass.clear_color {
            Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: a as f64,
            }),
            None => wgpu::LoadOp::Load,
        };
        let stencil_load = match pass.clear_stencil {
            Some(s) => wgpu::LoadOp::Clear(s),
            None => wgpu::LoadOp::Load,
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("strata pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: stencil_view,
                depth_ops: None,
                stencil_ops: Some(wgpu::Operations {
                    load: stencil_load,
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let mut skipped = 0;
        for op in &pass.ops {
            match *op {
                PassOp::Viewport(v) => {
                    if let Some(v) = v.clamp_to(width, height) {
                        rpass.set_viewport(
                            v.x as f32,
                            v.y as f32,
                            v.width as f32,
                            v.height as f32,
                            0.0,
                            1.0,
                        );
                    }
                }
                PassOp::Draw(i) => {
                    let Some(draw) = cmds[i].as_draw() else { continue };
                    let resolved = (
                        self.pipelines.get(&PipelineKey::new(draw, format)),
                        uniform_offsets.get(&i),
                        texture_groups.get(&TextureKey::new(draw)),
                        self.buffers.get(&draw.vertex.buffer),
                    );
                    let (Some(pipeline), Some(&offset), Some(textures), Some(vertex)) = resolved
                    else {
                        skipped += 1;
                        continue;
                    };

                    rpass.set_pipeline(pipeline);
                    rpass.set_bind_group(0, uniform_group, &[offset]);
                    rpass.set_bind_group(1, textures, &[]);
                    rpass.set_vertex_buffer(0, vertex.slice(..));
                    rpass.set_stencil_reference(draw.stencil_ref);

                    match draw.range {
                        DrawRange::Arrays { first, count } => {
                            rpass.draw(first..first + count, 0..1);
                        }
                        DrawRange::Elements {
                            first_index,
                            index_count,
                            base_vertex,
                        } => {
                            let Some(index) = draw.index.and_then(|id| self.buffers.get(&id)) else {
                                skipped += 1;
                                continue;
                            };
                            rpass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint16);
                            rpass.draw_indexed(first_index..first_index + index_count, base_vertex, 0..1);
                        }
                    }
                }
            }
        }
        skipped
    }

    // ── resources ─────────────────────────────────────────────────────────

    fn upload_buffer(&mut self, device: &wgpu::Device, id: BufferId, kind: ArrayKind, bytes: &[u8]) {
        if bytes.is_empty() {
            self.buffers.remove(&id);
            return;
        }
        let usage = match kind {
            ArrayKind::Vertex => wgpu::BufferUsages::VERTEX,
            ArrayKind::Index => wgpu::BufferUsages::INDEX,
        };
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("strata packed buffer"),
            contents: bytes,
            usage: usage | wgpu::BufferUsages::COPY_DST,
        });
        self.buffers.insert(id, buffer);
    }

    fn create_target(&mut self, device: &wgpu::Device, id: TargetId, size: u32) {
        let extent = wgpu::Extent3d {
            width: size.max(1),
            height: size.max(1),
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("strata target color"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let stencil = create_stencil(device, "strata target stencil", extent);

        self.targets.insert(
            id,
            GpuTarget {
                color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
                stencil_view: stencil.create_view(&wgpu::TextureViewDescriptor::default()),
                size,
            },
        );
        log::debug!("render target {} allocated ({size}x{size})", id.index());
    }

    fn ensure_surface_stencil(&mut self, device: &wgpu::Device, size: UVec2) {
        if self.surface_stencil.as_ref().is_some_and(|(s, _)| *s == size) {
            return;
        }
        let extent = wgpu::Extent3d {
            width: size.x.max(1),
            height: size.y.max(1),
            depth_or_array_layers: 1,
        };
        let stencil = create_stencil(device, "strata surface stencil", extent);
        let view = stencil.create_view(&wgpu::TextureViewDescriptor::default());
        self.surface_stencil = Some((size, view));
    }

    fn ensure_uniform_capacity(&mut self, device: &wgpu::Device, required: u64) {
        let required = required.max(UNIFORM_STRIDE);
        if required <= self.uniform_capacity && self.uniform_bind_group.is_some() {
            return;
        }
        let Some(layouts) = self.layouts.as_ref() else { return };

        let capacity = required.next_power_of_two();
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("strata uniforms"),
            size: capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("strata uniforms bg"),
            layout: &layouts.uniforms,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(UNIFORM_STRIDE),
                }),
            }],
        });

        self.uniform_buffer = Some(buffer);
        self.uniform_bind_group = Some(group);
        self.uniform_capacity = capacity;
    }

    fn texture_bind_group(&mut self, device: &wgpu::Device, key: TextureKey) -> Option<wgpu::BindGroup> {
        let mut missing = false;
        let views = key.sources.map(|source| {
            let view = match source {
                None => None,
                Some(TextureSource::Texture(id)) => self.textures.get(&id).map(|t| &t.view),
                Some(TextureSource::Target(id)) => self.targets.get(&id).map(|t| &t.color_view),
            };
            if source.is_some() && view.is_none() {
                missing = true;
            }
            view
        });

        let layouts = self.layouts.as_ref()?;
        let dummy = self.dummy_view.as_ref()?;
        let sampler = match key.filter {
            Filter::Linear => self.linear_sampler.as_ref()?,
            Filter::Nearest => self.nearest_sampler.as_ref()?,
        };

        let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("strata textures bg"),
            layout: &layouts.textures,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(views[0].unwrap_or(dummy)),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(views[1].unwrap_or(dummy)),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        if missing && !self.warned_missing_texture {
            log::warn!("GpuExecutor: draw references an unknown texture; sampling a blank texture");
            self.warned_missing_texture = true;
        }
        Some(group)
    }

    // ── lazy setup ────────────────────────────────────────────────────────

    fn ensure_layouts(&mut self, device: &wgpu::Device) {
        if self.layouts.is_some() {
            return;
        }

        let uniforms = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("strata uniforms bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let textures = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("strata textures bgl"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("strata pipeline layout"),
            bind_group_layouts: &[&uniforms, &textures],
            immediate_size: 0,
        });

        self.layouts = Some(Layouts {
            uniforms,
            textures,
            pipeline,
        });
        // Bind groups built against older layouts are invalid now.
        self.uniform_bind_group = None;
        self.uniform_capacity = 0;
    }

    fn ensure_samplers(&mut self, device: &wgpu::Device) {
        if self.linear_sampler.is_some() && self.nearest_sampler.is_some() {
            return;
        }
        let sampler = |label, filter| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: filter,
                min_filter: filter,
                mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                ..Default::default()
            })
        };
        self.linear_sampler = Some(sampler("strata linear sampler", wgpu::FilterMode::Linear));
        self.nearest_sampler = Some(sampler("strata nearest sampler", wgpu::FilterMode::Nearest));
    }

    fn ensure_dummy(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if self.dummy_view.is_some() {
            return;
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("strata blank texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        write_region(queue, &texture, 0, 0, 1, 1, &[0, 0, 0, 0]);
        self.dummy_view = Some(texture.create_view(&wgpu::TextureViewDescriptor::default()));
    }

    fn ensure_pipeline(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        let Some(layouts) = self.layouts.as_ref() else { return };

        let shader = self.shaders.entry(key.program).or_insert_with(|| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(key.program.label()),
                source: wgpu::ShaderSource::Wgsl(key.program.source().into()),
            })
        });

        let (blend, write_mask) = if key.program.writes_color() {
            (Some(key.blend.to_wgpu()), wgpu::ColorWrites::ALL)
        } else {
            (None, wgpu::ColorWrites::empty())
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(key.program.label()),
            layout: Some(&layouts.pipeline),

            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[key.layout.buffer_layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.format,
                    blend,
                    write_mask,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: key.primitive.to_wgpu(),
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: Some(wgpu::DepthStencilState {
                format: STENCIL_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: key.stencil.to_wgpu(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

        log::debug!("pipeline created: {key:?}");
        self.pipelines.insert(key, pipeline);
    }
}

fn create_stencil(device: &wgpu::Device, label: &str, extent: wgpu::Extent3d) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: STENCIL_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    })
}

fn write_region(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    rgba: &[u8],
) {
    let expected = (width as usize) * (height as usize) * 4;
    if rgba.len() < expected {
        log::warn!(
            "texture upload of {width}x{height} got {} bytes, expected {expected}; ignored",
            rgba.len()
        );
        return;
    }
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d { x, y, z: 0 },
            aspect: wgpu::TextureAspect::All,
        },
        &rgba[..expected],
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}
