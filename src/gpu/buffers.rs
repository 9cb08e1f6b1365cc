//! Device mirrors of the host buffers.

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::error::GpuError;
use crate::shader::KernelParams;
use crate::state::{Arity, BufferName, BufferSlot, ScalarBlock, SimulationState};

/// Smallest buffer wgpu accepts as a storage binding. Zero-edge lattices
/// still get a bindable bond buffer.
const MIN_BUFFER_SIZE: u64 = 16;

/// One storage buffer per per-node and per-edge host buffer, one uniform
/// block holding every scalar and the lattice counts, and the device-only
/// bond scratch buffer.
pub struct DeviceBuffers {
    storage: HashMap<BufferName, wgpu::Buffer>,
    params: wgpu::Buffer,
    bonds: wgpu::Buffer,
}

impl DeviceBuffers {
    /// Allocate buffers sized from `state` and fill them with its contents.
    pub fn new(device: &wgpu::Device, state: &SimulationState) -> Self {
        let storage = BufferName::ALL
            .into_iter()
            .filter(|name| name.arity() != Arity::Scalar)
            .map(|name| {
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(name.label()),
                    contents: &padded(state.buffer_bytes(name)),
                    usage: usage(name),
                });
                (name, buffer)
            })
            .collect();

        // Node and edge counts never change after creation.
        let kernel_params = KernelParams::new(*state.scalars(), state.node_count(), state.edge_count());
        let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("params"),
            contents: bytemuck::bytes_of(&kernel_params),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bond_size = (state.edge_count() * std::mem::size_of::<f32>()) as u64;
        let bonds = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bond"),
            size: bond_size.max(MIN_BUFFER_SIZE),
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        Self {
            storage,
            params,
            bonds,
        }
    }

    pub fn storage(&self, name: BufferName) -> Option<&wgpu::Buffer> {
        self.storage.get(&name)
    }

    pub fn params(&self) -> &wgpu::Buffer {
        &self.params
    }

    pub fn bonds(&self) -> &wgpu::Buffer {
        &self.bonds
    }

    /// Resolve a slot to its buffer, byte offset and writable size.
    fn target(&self, slot: BufferSlot) -> Result<(&wgpu::Buffer, u64, u64), GpuError> {
        let name = BufferName::from_slot(slot).ok_or(GpuError::UnknownSlot(slot))?;
        match name.scalar() {
            Some(param) => Ok((&self.params, param.byte_offset() as u64, 4)),
            None => {
                let buffer = self.storage(name).ok_or(GpuError::UnknownSlot(slot))?;
                Ok((buffer, 0, buffer.size()))
            }
        }
    }

    /// Queue a write of `bytes` into the buffer behind `slot`.
    pub fn write(&self, queue: &wgpu::Queue, slot: BufferSlot, bytes: &[u8]) -> Result<(), GpuError> {
        let (buffer, offset, capacity) = self.target(slot)?;
        let size = bytes.len() as u64;
        if size > capacity {
            return Err(GpuError::BufferOverflow { slot, size, capacity });
        }
        if size > 0 {
            queue.write_buffer(buffer, offset, bytes);
        }
        Ok(())
    }
}

fn usage(name: BufferName) -> wgpu::BufferUsages {
    let base = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST;
    match name {
        BufferName::Position | BufferName::Color => base | wgpu::BufferUsages::VERTEX,
        _ => base,
    }
}

fn padded(bytes: &[u8]) -> Vec<u8> {
    let mut contents = bytes.to_vec();
    if (contents.len() as u64) < MIN_BUFFER_SIZE {
        contents.resize(MIN_BUFFER_SIZE as usize, 0);
    }
    contents
}

// Scalars are written into the block at their field offset.
const _: () = assert!(std::mem::size_of::<ScalarBlock>() == 32);
const _: () = assert!(std::mem::size_of::<KernelParams>() == 48);
