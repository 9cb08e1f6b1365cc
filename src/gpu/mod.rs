//! wgpu implementation of the compute and render backends.

mod buffers;
mod camera;
mod kernels;

use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

pub use camera::Camera;

use crate::backend::{ComputeBackend, Kernel, ProjectionMode, WaitPolicy};
use crate::error::GpuError;
use crate::shader::{CameraUniform, KernelSources};
use crate::state::{BufferName, BufferSlot, SimulationState};

use buffers::DeviceBuffers;
use kernels::ComputeKernel;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.05,
    a: 1.0,
};

/// Surface, device, mirrored buffers and pipelines.
pub struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    buffers: DeviceBuffers,
    kernels: Vec<(Kernel, ComputeKernel)>,
    render_pipeline: wgpu::RenderPipeline,
    /// One camera block per eye.
    eye_uniforms: [wgpu::Buffer; 2],
    eye_bind_groups: [wgpu::BindGroup; 2],
    depth_texture: wgpu::TextureView,
    node_count: u32,
    encoder: Option<wgpu::CommandEncoder>,
    frame: Option<(wgpu::SurfaceTexture, wgpu::TextureView)>,
}

impl GpuState {
    pub async fn new(
        window: Arc<Window>,
        state: &SimulationState,
        sources: &KernelSources,
    ) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?}, {:?})", info.name, info.device_type, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let buffers = DeviceBuffers::new(&device, state);
        let node_count = state.node_count() as u32;
        let edge_count = state.edge_count() as u32;

        let kernels = [Kernel::RampUp, Kernel::Propose, Kernel::Bond, Kernel::Accept]
            .into_iter()
            .map(|kernel| {
                let invocations = if kernel.per_edge() { edge_count } else { node_count };
                ComputeKernel::new(&device, sources, kernel, &buffers, invocations)
                    .map(|compiled| (kernel, compiled))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let make_eye = |label: &str| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(&CameraUniform {
                    view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
                    point_size: 0.0,
                    _padding: [0.0; 3],
                }),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &camera_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            (buffer, bind_group)
        };
        let (left_buffer, left_group) = make_eye("Left Eye");
        let (right_buffer, right_group) = make_eye("Right Eye");

        let render_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Render Shader"),
            source: wgpu::ShaderSource::Wgsl(sources.render().into()),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&camera_layout],
                push_constant_ranges: &[],
            });

        let node_stride = std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress;
        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &render_shader,
                entry_point: Some("vs_main"),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: node_stride,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &[wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x4, // position
                        }],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: node_stride,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &[wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 1,
                            format: wgpu::VertexFormat::Float32x4, // color
                        }],
                    },
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &render_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let depth_texture = create_depth_texture(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            buffers,
            kernels,
            render_pipeline,
            eye_uniforms: [left_buffer, right_buffer],
            eye_bind_groups: [left_group, right_group],
            depth_texture,
            node_count,
            encoder: None,
            frame: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = create_depth_texture(&self.device, &self.config);
        }
    }

    /// Acquire the next swapchain image.
    ///
    /// A lost or outdated surface is reconfigured and the frame is skipped.
    pub fn begin_frame(&mut self) -> Result<(), GpuError> {
        match self.surface.get_current_texture() {
            Ok(output) => {
                let view = output
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                self.frame = Some((output, view));
                Ok(())
            }
            Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::warn!("surface {}, reconfiguring", e);
                self.surface.configure(&self.device, &self.config);
                Ok(())
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timeout, skipping frame");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// View of the acquired frame, if any.
    pub fn frame_view(&self) -> Option<&wgpu::TextureView> {
        self.frame.as_ref().map(|(_, view)| view)
    }

    /// Record the lattice draw into a new encoder.
    ///
    /// Returns `None` when no frame was acquired.
    pub fn encode_lattice(
        &mut self,
        projection: ProjectionMode,
        camera: &Camera,
    ) -> Option<wgpu::CommandEncoder> {
        let width = self.config.width as f32;
        let height = self.config.height as f32;
        // (eye offset in units of the eye separation, viewport)
        let eyes: Vec<(f32, [f32; 4])> = match projection {
            ProjectionMode::Monocular => vec![(0.0, [0.0, 0.0, width, height])],
            ProjectionMode::Binocular => vec![
                (-0.5, [0.0, 0.0, width / 2.0, height]),
                (0.5, [width / 2.0, 0.0, width / 2.0, height]),
            ],
        };

        for (eye, &(side, [_, _, w, h])) in eyes.iter().enumerate() {
            let uniform = CameraUniform {
                view_proj: camera
                    .view_proj(w / h, side * camera.eye_separation)
                    .to_cols_array_2d(),
                point_size: camera.point_size,
                _padding: [0.0; 3],
            };
            self.queue
                .write_buffer(&self.eye_uniforms[eye], 0, bytemuck::bytes_of(&uniform));
        }

        let (_, view) = self.frame.as_ref()?;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            if let (Some(position), Some(color)) = (
                self.buffers.storage(BufferName::Position),
                self.buffers.storage(BufferName::Color),
            ) {
                render_pass.set_vertex_buffer(0, position.slice(..));
                render_pass.set_vertex_buffer(1, color.slice(..));
            }
            for (eye, &(_, [x, y, w, h])) in eyes.iter().enumerate() {
                render_pass.set_viewport(x, y, w, h, 0.0, 1.0);
                render_pass.set_bind_group(0, &self.eye_bind_groups[eye], &[]);
                render_pass.draw(0..6, 0..self.node_count);
            }
        }

        Some(encoder)
    }

    pub fn submit(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Present the acquired frame, if any.
    pub fn present(&mut self) {
        if let Some((output, _)) = self.frame.take() {
            output.present();
        }
    }
}

impl ComputeBackend for GpuState {
    fn acquire(&mut self) -> Result<(), GpuError> {
        if self.encoder.is_some() {
            return Err(GpuError::Bracket("acquire while a bracket is open"));
        }
        self.encoder = Some(
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Compute Encoder"),
                }),
        );
        Ok(())
    }

    fn execute(&mut self, kernel: Kernel, wait: WaitPolicy) -> Result<(), GpuError> {
        let compiled = self
            .kernels
            .iter()
            .find(|(k, _)| *k == kernel)
            .map(|(_, compiled)| compiled)
            .ok_or(GpuError::Bracket("kernel was never compiled"))?;
        let encoder = self
            .encoder
            .as_mut()
            .ok_or(GpuError::Bracket("execute outside acquire/release"))?;
        compiled.record(encoder);

        if wait == WaitPolicy::Wait {
            let finished = self.encoder.replace(self.device.create_command_encoder(
                &wgpu::CommandEncoderDescriptor {
                    label: Some("Compute Encoder"),
                },
            ));
            if let Some(encoder) = finished {
                self.queue.submit(std::iter::once(encoder.finish()));
            }
            let _ = self.device.poll(wgpu::Maintain::Wait);
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), GpuError> {
        let encoder = self
            .encoder
            .take()
            .ok_or(GpuError::Bracket("release without acquire"))?;
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn write_buffer(&mut self, slot: BufferSlot, bytes: &[u8]) -> Result<(), GpuError> {
        self.buffers.write(&self.queue, slot, bytes)
    }
}

fn create_depth_texture(
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
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
