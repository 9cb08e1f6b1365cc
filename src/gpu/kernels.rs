//! Compute pipelines, one per kernel.
//!
//! Each kernel has its own bind group layout: binding 0 is the parameter
//! block, the storage buffers follow in the order the WGSL declares them.

use crate::backend::Kernel;
use crate::error::GpuError;
use crate::shader::{KernelSources, KERNEL_ENTRY};
use crate::state::BufferName;

use super::buffers::DeviceBuffers;

const WORKGROUP_SIZE: u32 = 256;

#[derive(Clone, Copy)]
enum Source {
    Buffer(BufferName),
    Bonds,
}

/// Storage bindings of a kernel, from binding 1 on, with their read-only flag.
fn storage_bindings(kernel: Kernel) -> &'static [(Source, bool)] {
    use BufferName::*;
    use Source::*;
    match kernel {
        Kernel::RampUp => &[(Buffer(Theta), true), (Buffer(Color), false)],
        Kernel::Propose => &[
            (Buffer(Theta), true),
            (Buffer(ThetaInt), false),
            (Buffer(ThetaState), false),
        ],
        Kernel::Bond => &[
            (Buffer(Central), true),
            (Buffer(Neighbor), true),
            (Buffer(Position), true),
            (Buffer(Theta), true),
            (Buffer(ThetaInt), true),
            (Bonds, false),
        ],
        Kernel::Accept => &[
            (Buffer(Offset), true),
            (Buffer(Theta), false),
            (Buffer(ThetaInt), true),
            (Buffer(ThresholdState), false),
            (Buffer(Color), false),
            (Bonds, true),
        ],
    }
}

pub struct ComputeKernel {
    kernel: Kernel,
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
    invocations: u32,
}

impl ComputeKernel {
    pub fn new(
        device: &wgpu::Device,
        sources: &KernelSources,
        kernel: Kernel,
        buffers: &DeviceBuffers,
        invocations: u32,
    ) -> Result<Self, GpuError> {
        let storage = storage_bindings(kernel);

        let mut layout_entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        layout_entries.extend(storage.iter().enumerate().map(|(i, &(_, read_only))| {
            wgpu::BindGroupLayoutEntry {
                binding: i as u32 + 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }
        }));

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(kernel.label()),
            entries: &layout_entries,
        });

        let mut group_entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: buffers.params().as_entire_binding(),
        }];
        for (i, &(source, _)) in storage.iter().enumerate() {
            let buffer = match source {
                Source::Buffer(name) => buffers
                    .storage(name)
                    .ok_or(GpuError::UnknownSlot(name.slot()))?,
                Source::Bonds => buffers.bonds(),
            };
            group_entries.push(wgpu::BindGroupEntry {
                binding: i as u32 + 1,
                resource: buffer.as_entire_binding(),
            });
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kernel.label()),
            layout: &bind_group_layout,
            entries: &group_entries,
        });

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(kernel.label()),
            source: wgpu::ShaderSource::Wgsl(sources.compose(kernel).into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(kernel.label()),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(kernel.label()),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(KERNEL_ENTRY),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            kernel,
            pipeline,
            bind_group,
            invocations,
        })
    }

    /// Record one dispatch covering every node or edge.
    pub fn record(&self, encoder: &mut wgpu::CommandEncoder) {
        if self.invocations == 0 {
            return;
        }
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(self.kernel.label()),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.dispatch_workgroups(self.invocations.div_ceil(WORKGROUP_SIZE), 1, 1);
    }
}
