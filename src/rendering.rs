//! Rendering system with wgpu pipelines for slice fills and outlines.

use bytemuck::{Pod, Zeroable};
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::camera::CameraSystem;
use crate::error::RenderError;
use crate::params::{RenderConfig, TraceParams};
use crate::trace::{Slice, TraceBuffer};
use crate::viewport::Viewport;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Height of the bottom edge of every slice fill
pub const FILL_BASE: f32 = -0.5;

/// Anything that can present the live slices.
///
/// Called once per render callback whether or not a tick happened.
pub trait TraceRenderer {
    /// Draw all live slices, oldest to newest
    fn draw(&mut self, buffer: &TraceBuffer);
}

/// Vertex data for slice geometry
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
}

/// Uniform buffer for the trace shader (view-projection matrix + colours)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Uniforms {
    pub view_proj: [[f32; 4]; 4],
    pub fill_color: [f32; 4],
    pub outline_color: [f32; 4],
}

/// X coordinate of position index `index`; slices are centred on x = 0
pub fn slice_x(index: usize, width: usize) -> f32 {
    index as f32 - (width as f32 - 1.0) / 2.0
}

/// Append the fill rows of a slice: top row at the heights, bottom row at [`FILL_BASE`]
pub fn push_fill_vertices(slice: &Slice, out: &mut Vec<Vertex>) {
    let width = slice.width();
    let z = slice.depth();

    out.extend(slice.heights().iter().enumerate().map(|(i, &h)| Vertex {
        position: [slice_x(i, width), h, z],
    }));
    out.extend((0..width).map(|i| Vertex {
        position: [slice_x(i, width), FILL_BASE, z],
    }));
}

/// Append the outline points of a slice
pub fn push_outline_vertices(slice: &Slice, range: Range<usize>, out: &mut Vec<Vertex>) {
    let width = slice.width();
    let outline = slice.outline(range);
    let z = outline.depth();

    out.extend(outline.points().map(|(i, h)| Vertex {
        position: [slice_x(i, width), h, z],
    }));
}

/// Triangle indices for `slices` consecutive fills of `width` points each
pub fn fill_indices(slices: usize, width: usize) -> Vec<u32> {
    let quads = width.saturating_sub(1);
    let mut indices = Vec::with_capacity(slices * quads * 6);

    for s in 0..slices {
        let base = (s * width * 2) as u32;
        let w = width as u32;
        for i in 0..quads as u32 {
            let top_left = base + i;
            let top_right = top_left + 1;
            let bottom_left = base + w + i;
            let bottom_right = bottom_left + 1;

            indices.extend_from_slice(&[
                top_left,
                bottom_left,
                top_right,
                top_right,
                bottom_left,
                bottom_right,
            ]);
        }
    }
    indices
}

/// Line-list indices for `slices` consecutive outlines of `points` points each
pub fn outline_indices(slices: usize, points: usize) -> Vec<u32> {
    let segments = points.saturating_sub(1);
    let mut indices = Vec::with_capacity(slices * segments * 2);

    for s in 0..slices {
        let base = (s * points) as u32;
        for i in 0..segments as u32 {
            indices.extend_from_slice(&[base + i, base + i + 1]);
        }
    }
    indices
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Prefer an sRGB format; fall back to whatever the surface lists first
fn pick_surface_format(
    caps: &wgpu::SurfaceCapabilities,
) -> Result<(wgpu::TextureFormat, wgpu::CompositeAlphaMode), RenderError> {
    let format = caps
        .formats
        .iter()
        .find(|f| f.is_srgb())
        .or_else(|| caps.formats.first())
        .copied()
        .ok_or(RenderError::IncompatibleSurface("texture formats"))?;
    let alpha_mode = caps
        .alpha_modes
        .first()
        .copied()
        .ok_or(RenderError::IncompatibleSurface("alpha modes"))?;
    Ok((format, alpha_mode))
}

fn create_depth_view(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Build one of the two trace pipelines; they differ only in primitive,
/// fragment entry point, blending and depth writes.
#[allow(clippy::too_many_arguments)]
fn create_trace_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    label: &str,
    fs_entry: &str,
    topology: wgpu::PrimitiveTopology,
    blend: wgpu::BlendState,
    depth_write_enabled: bool,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                }],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fs_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled,
            // Outlines sit exactly on their own fill's top edge
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Rendering system managing wgpu device, pipelines, and buffers
pub struct RenderSystem {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    fill_pipeline: wgpu::RenderPipeline,
    outline_pipeline: wgpu::RenderPipeline,
    fill_vertex_buffer: wgpu::Buffer,
    fill_index_buffer: wgpu::Buffer,
    outline_vertex_buffer: wgpu::Buffer,
    outline_index_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    clear_color: wgpu::Color,
    viewport: Viewport,
    viewport_scale: f32,
    outline_range: Range<usize>,
    /// Indices per slice in each index buffer
    fill_index_stride: u32,
    outline_index_stride: u32,
    /// Slices the vertex buffers can hold (the trace ring capacity)
    capacity: usize,
    fill_scratch: Vec<Vertex>,
    outline_scratch: Vec<Vertex>,
}

impl RenderSystem {
    /// Create new rendering system sized for the trace described by `params`
    pub async fn new(
        window: Arc<Window>,
        render_config: &RenderConfig,
        params: &TraceParams,
    ) -> Result<Self, RenderError> {
        // Geometry buffers below are sized from these
        params.validate()?;

        let size = window.inner_size();

        // Create wgpu instance
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Create surface (window must have 'static lifetime via Arc)
        let surface = instance.create_surface(window)?;

        // Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        // Request device
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        // Configure surface
        let surface_caps = surface.get_capabilities(&adapter);
        let (surface_format, alpha_mode) = pick_surface_format(&surface_caps)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let info = adapter.get_info();
        info!(
            "Renderer: {} ({:?}), surface {}x{} {:?}",
            info.name, info.backend, config.width, config.height, surface_format
        );

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Trace Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("trace.wgsl").into()),
        });

        // An sRGB target expects linear shader output
        let to_target = |c: f32| {
            if surface_format.is_srgb() {
                srgb_to_linear(c)
            } else {
                c
            }
        };
        let [fr, fg, fb] = render_config.fill_color;
        let [or, og, ob, oa] = render_config.outline_color;
        let [cr, cg, cb] = render_config.clear_color;

        let camera = CameraSystem::new(render_config.camera.clone());
        let uniforms = Uniforms {
            view_proj: camera.create_view_proj_matrix().to_cols_array_2d(),
            fill_color: [to_target(fr), to_target(fg), to_target(fb), 1.0],
            outline_color: [to_target(or), to_target(og), to_target(ob), oa],
        };

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Uniform Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Trace Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let fill_pipeline = create_trace_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            config.format,
            "Fill Pipeline",
            "fs_fill",
            wgpu::PrimitiveTopology::TriangleList,
            wgpu::BlendState::REPLACE,
            true,
        );
        let outline_pipeline = create_trace_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            config.format,
            "Outline Pipeline",
            "fs_outline",
            wgpu::PrimitiveTopology::LineList,
            wgpu::BlendState::ALPHA_BLENDING,
            false,
        );

        // Geometry buffers sized once for a full ring
        let capacity = params.lifespan_ticks();
        let width = params.slice_width;
        let outline_range = params.outline_range();
        let outline_points = outline_range.len();
        let vertex_size = std::mem::size_of::<Vertex>() as wgpu::BufferAddress;

        let fill_vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Fill Vertex Buffer"),
            size: (capacity * width * 2).max(1) as wgpu::BufferAddress * vertex_size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let outline_vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Outline Vertex Buffer"),
            size: (capacity * outline_points).max(1) as wgpu::BufferAddress * vertex_size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Slice k always occupies the k-th block of vertices, so indices never change
        let fill_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fill Index Buffer"),
            contents: bytemuck::cast_slice(&fill_indices(capacity, width)),
            usage: wgpu::BufferUsages::INDEX,
        });
        let outline_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Outline Index Buffer"),
            contents: bytemuck::cast_slice(&outline_indices(capacity, outline_points)),
            usage: wgpu::BufferUsages::INDEX,
        });

        debug!(
            capacity,
            width,
            outline_points,
            "trace geometry buffers allocated"
        );

        let depth_view = create_depth_view(&device, &config);
        let viewport = Viewport::fit(size.width, size.height, render_config.viewport_scale);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            fill_pipeline,
            outline_pipeline,
            fill_vertex_buffer,
            fill_index_buffer,
            outline_vertex_buffer,
            outline_index_buffer,
            uniform_bind_group,
            depth_view,
            clear_color: wgpu::Color {
                r: to_target(cr) as f64,
                g: to_target(cg) as f64,
                b: to_target(cb) as f64,
                a: 1.0,
            },
            viewport,
            viewport_scale: render_config.viewport_scale,
            outline_range,
            fill_index_stride: (width.saturating_sub(1) * 6) as u32,
            outline_index_stride: (outline_points.saturating_sub(1) * 2) as u32,
            capacity,
            fill_scratch: Vec::with_capacity(capacity * width * 2),
            outline_scratch: Vec::with_capacity(capacity * outline_points),
        })
    }

    /// Reconfigure the surface and recompute the viewport for a new window size
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::fit(width, height, self.viewport_scale);
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, &self.config);
        debug!(width, height, side = self.viewport.side, "surface resized");
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Render a frame with the first `live` slices of the uploaded geometry
    fn render(&self, live: u32) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Trace Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let vp = self.viewport;
            render_pass.set_viewport(vp.x, vp.y, vp.side, vp.side, 0.0, 1.0);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);

            if live > 0 {
                // Fills first so nearer slices occlude the outlines behind them
                render_pass.set_pipeline(&self.fill_pipeline);
                render_pass.set_vertex_buffer(0, self.fill_vertex_buffer.slice(..));
                render_pass
                    .set_index_buffer(self.fill_index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..live * self.fill_index_stride, 0, 0..1);

                if self.outline_index_stride > 0 {
                    render_pass.set_pipeline(&self.outline_pipeline);
                    render_pass.set_vertex_buffer(0, self.outline_vertex_buffer.slice(..));
                    render_pass.set_index_buffer(
                        self.outline_index_buffer.slice(..),
                        wgpu::IndexFormat::Uint32,
                    );
                    render_pass.draw_indexed(0..live * self.outline_index_stride, 0, 0..1);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

impl TraceRenderer for RenderSystem {
    fn draw(&mut self, buffer: &TraceBuffer) {
        if self.viewport.is_empty() {
            return;
        }

        let live = buffer.len().min(self.capacity);
        self.fill_scratch.clear();
        self.outline_scratch.clear();
        for slice in buffer.iter().take(live) {
            push_fill_vertices(slice, &mut self.fill_scratch);
            push_outline_vertices(slice, self.outline_range.clone(), &mut self.outline_scratch);
        }

        if !self.fill_scratch.is_empty() {
            self.queue.write_buffer(
                &self.fill_vertex_buffer,
                0,
                bytemuck::cast_slice(&self.fill_scratch),
            );
        }
        if !self.outline_scratch.is_empty() {
            self.queue.write_buffer(
                &self.outline_vertex_buffer,
                0,
                bytemuck::cast_slice(&self.outline_scratch),
            );
        }

        match self.render(live as u32) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
            }
            Err(wgpu::SurfaceError::Timeout) => warn!("surface timeout, frame skipped"),
            Err(e) => error!("Render error: {:?}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice_with(heights: &[f32], age: usize) -> Slice {
        let mut slice = Slice::new(heights.len());
        slice.reset().copy_from_slice(heights);
        slice.set_age(age, -(age as f32));
        slice
    }

    #[test]
    fn test_slice_x_is_centred() {
        assert_eq!(slice_x(0, 200), -99.5);
        assert_eq!(slice_x(199, 200), 99.5);
        assert_eq!(slice_x(1, 3), 0.0);
    }

    #[test]
    fn test_fill_vertices_two_rows() {
        let slice = slice_with(&[1.0, 2.0, 3.0], 4);
        let mut out = Vec::new();
        push_fill_vertices(&slice, &mut out);

        assert_eq!(out.len(), 6);
        assert_eq!(out[0].position, [-1.0, 1.0, -4.0]);
        assert_eq!(out[2].position, [1.0, 3.0, -4.0]);
        assert_eq!(out[3].position, [-1.0, FILL_BASE, -4.0]);
        assert_eq!(out[5].position, [1.0, FILL_BASE, -4.0]);
    }

    #[test]
    fn test_outline_vertices_follow_range() {
        let slice = slice_with(&[0.0, 5.0, 6.0, 0.0], 0);
        let mut out = Vec::new();
        push_outline_vertices(&slice, 1..3, &mut out);

        assert_eq!(
            out,
            vec![
                Vertex {
                    position: [-0.5, 5.0, 0.0]
                },
                Vertex {
                    position: [0.5, 6.0, 0.0]
                },
            ]
        );
    }

    #[test]
    fn test_fill_indices_layout() {
        let indices = fill_indices(2, 3);
        // 2 quads per slice, 6 indices per quad
        assert_eq!(indices.len(), 24);
        assert_eq!(&indices[..6], &[0, 3, 1, 1, 3, 4]);
        // Second slice starts after the first slice's 6 vertices
        assert_eq!(&indices[12..18], &[6, 9, 7, 7, 9, 10]);
        assert!(indices.iter().all(|&i| i < 12));
    }

    #[test]
    fn test_outline_indices_layout() {
        assert_eq!(outline_indices(2, 3), vec![0, 1, 1, 2, 3, 4, 4, 5]);
        assert!(outline_indices(5, 1).is_empty());
    }

    #[test]
    fn test_srgb_to_linear() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert!((srgb_to_linear(225.0 / 255.0) - 0.753).abs() < 1e-3);
    }

    #[test]
    fn test_pick_surface_format_prefers_srgb() {
        let caps = wgpu::SurfaceCapabilities {
            formats: vec![
                wgpu::TextureFormat::Bgra8Unorm,
                wgpu::TextureFormat::Bgra8UnormSrgb,
            ],
            alpha_modes: vec![wgpu::CompositeAlphaMode::Opaque],
            ..Default::default()
        };
        let (format, alpha) = pick_surface_format(&caps).unwrap();
        assert_eq!(format, wgpu::TextureFormat::Bgra8UnormSrgb);
        assert_eq!(alpha, wgpu::CompositeAlphaMode::Opaque);

        let linear_only = wgpu::SurfaceCapabilities {
            formats: vec![wgpu::TextureFormat::Rgba8Unorm],
            alpha_modes: vec![wgpu::CompositeAlphaMode::Auto],
            ..Default::default()
        };
        assert_eq!(
            pick_surface_format(&linear_only).unwrap().0,
            wgpu::TextureFormat::Rgba8Unorm
        );
    }

    #[test]
    fn test_pick_surface_format_rejects_empty_caps() {
        let err = pick_surface_format(&wgpu::SurfaceCapabilities::default()).unwrap_err();
        assert!(matches!(err, RenderError::IncompatibleSurface("texture formats")));

        let no_alpha = wgpu::SurfaceCapabilities {
            formats: vec![wgpu::TextureFormat::Bgra8UnormSrgb],
            ..Default::default()
        };
        let err = pick_surface_format(&no_alpha).unwrap_err();
        assert!(matches!(err, RenderError::IncompatibleSurface("alpha modes")));
    }

    #[test]
    fn test_uniforms_layout() {
        // mat4 + two vec4, no padding required by WGSL
        assert_eq!(std::mem::size_of::<Uniforms>(), 96);
    }
}
