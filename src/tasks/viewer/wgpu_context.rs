use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use tracing::{trace, warn};
use wgpu::util::DeviceExt;

use crate::gpu::{Color, DrawCommand, GpuContext};
use crate::texture::{ImageData, TextureHandle};
use crate::world::geometry::Vertices;

// Texture coordinates matching the BL, BR, TL, TR vertex order.
const TEX_COORDS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]];

const MODE_PHOTO: f32 = 0.0;
const MODE_BLEND: f32 = 1.0;
const MODE_FILL: f32 = 2.0;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct Vertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct Params {
    transform: [[f32; 4]; 4],
    color: [f32; 4],
    mix_mode: [f32; 4],
}

pub(super) struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl GpuTexture {
    fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            texture.as_image_copy(),
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Live textures keyed by the handle given out to frames.
#[derive(Default)]
pub(super) struct TextureTable {
    next: u32,
    entries: HashMap<u32, GpuTexture>,
}

impl TextureTable {
    fn insert(&mut self, texture: GpuTexture) -> TextureHandle {
        loop {
            self.next = self.next.wrapping_add(1);
            if self.next != TextureHandle::INVALID.raw() && !self.entries.contains_key(&self.next) {
                break;
            }
        }
        self.entries.insert(self.next, texture);
        TextureHandle::new(self.next)
    }

    fn get(&self, handle: TextureHandle) -> Option<&GpuTexture> {
        self.entries.get(&handle.raw())
    }

    fn remove(&mut self, handle: TextureHandle) -> bool {
        self.entries.remove(&handle.raw()).is_some()
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// The single pipeline every quad goes through.
pub(super) struct FramePipeline {
    pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    // Bound in texture slots that a fill does not sample.
    white: GpuTexture,
}

impl FramePipeline {
    pub(super) fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("frame-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("frame.wgsl").into()),
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
        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                texture_entry(1),
                texture_entry(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("frame-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("frame-pipeline-layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("frame-pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let white = GpuTexture::from_rgba(device, queue, "frame-white", 1, 1, &[255; 4]);

        Self {
            pipeline,
            bind_layout,
            sampler,
            white,
        }
    }
}

struct PreparedDraw {
    vertices: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// [`GpuContext`] for one render-thread turn. Draw commands are encoded
/// into buffers as they arrive and replayed by [`WgpuContext::finish`].
pub(super) struct WgpuContext<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    table: &'a mut TextureTable,
    pipeline: &'a FramePipeline,
    draws: Vec<PreparedDraw>,
}

impl<'a> WgpuContext<'a> {
    pub(super) fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        table: &'a mut TextureTable,
        pipeline: &'a FramePipeline,
    ) -> Self {
        Self {
            device,
            queue,
            table,
            pipeline,
            draws: Vec::new(),
        }
    }

    fn prepare(
        &mut self,
        vertices: &Vertices,
        params: Params,
        from: Option<TextureHandle>,
        to: Option<TextureHandle>,
    ) {
        let table = &*self.table;
        let pipeline = self.pipeline;
        let lookup = |handle: Option<TextureHandle>| match handle {
            None => Some(&pipeline.white.view),
            Some(handle) => table.get(handle).map(|t| &t.view),
        };
        let (Some(from_view), Some(to_view)) = (lookup(from), lookup(to)) else {
            trace!(?from, ?to, "skipping draw of a deleted texture");
            return;
        };

        let quad: [Vertex; 4] = std::array::from_fn(|i| Vertex {
            pos: vertices[i],
            uv: TEX_COORDS[i],
        });
        let vertex_buf = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("frame-vertices"),
                contents: bytemuck::cast_slice(&quad),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let uniform_buf = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("frame-params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame-bind"),
            layout: &pipeline.bind_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(from_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(to_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&pipeline.sampler),
                },
            ],
        });
        self.draws.push(PreparedDraw {
            vertices: vertex_buf,
            bind_group,
        });
    }

    /// Clears `view` to `clear` and replays every queued draw.
    pub(super) fn finish(
        self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        clear: Color,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("frame-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: clear[0] as f64,
                        g: clear[1] as f64,
                        b: clear[2] as f64,
                        a: clear[3] as f64,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline.pipeline);
        for draw in &self.draws {
            pass.set_bind_group(0, &draw.bind_group, &[]);
            pass.set_vertex_buffer(0, draw.vertices.slice(..));
            pass.draw(0..4, 0..1);
        }
    }
}

impl GpuContext for WgpuContext<'_> {
    fn upload(&mut self, image: &ImageData) -> TextureHandle {
        let max = self.device.limits().max_texture_dimension_2d;
        let expected = image.width as usize * image.height as usize * 4;
        if image.width == 0
            || image.height == 0
            || image.width > max
            || image.height > max
            || image.pixels.len() != expected
        {
            warn!(
                path = %image.path.display(),
                width = image.width,
                height = image.height,
                bytes = image.pixels.len(),
                "refusing to upload malformed image"
            );
            return TextureHandle::INVALID;
        }
        let texture = GpuTexture::from_rgba(
            self.device,
            self.queue,
            "frame-photo",
            image.width,
            image.height,
            &image.pixels,
        );
        let handle = self.table.insert(texture);
        trace!(handle = handle.raw(), live = self.table.len(), "texture uploaded");
        handle
    }

    fn is_texture(&self, handle: TextureHandle) -> bool {
        handle.is_valid() && self.table.get(handle).is_some()
    }

    fn delete_texture(&mut self, handle: TextureHandle) {
        if self.table.remove(handle) {
            trace!(handle = handle.raw(), live = self.table.len(), "texture deleted");
        }
    }

    fn draw(&mut self, command: DrawCommand) {
        match command {
            DrawCommand::Photo {
                texture,
                vertices,
                transform,
            } => {
                let params = Params {
                    transform: transform.to_cols_array_2d(),
                    color: [1.0; 4],
                    mix_mode: [0.0, MODE_PHOTO, 0.0, 0.0],
                };
                self.prepare(&vertices, params, Some(texture), Some(texture));
            }
            DrawCommand::Blend {
                from,
                to,
                vertices,
                transform,
                amount,
            } => {
                let params = Params {
                    transform: transform.to_cols_array_2d(),
                    color: [1.0; 4],
                    mix_mode: [amount.clamp(0.0, 1.0), MODE_BLEND, 0.0, 0.0],
                };
                self.prepare(&vertices, params, Some(from), Some(to));
            }
            DrawCommand::Fill {
                vertices,
                transform,
                color,
            } => {
                let params = Params {
                    transform: transform.to_cols_array_2d(),
                    color,
                    mix_mode: [0.0, MODE_FILL, 0.0, 0.0],
                };
                self.prepare(&vertices, params, None, None);
            }
        }
    }
}
