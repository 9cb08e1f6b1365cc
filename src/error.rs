//! Error types for the spin-bubble simulator.
//!
//! Topology errors abort startup, state errors come from misuse of the host
//! store, and GPU errors are fatal once the control loop is running.

use std::fmt;

use crate::state::BufferName;

/// Errors raised while turning a tagged mesh into a neighbor graph.
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyError {
    /// A mesh group that must contain elements matched nothing.
    EmptyGroup { tag: i32, role: &'static str },
    /// The offset table does not have one entry per node.
    OffsetLength { expected: usize, found: usize },
    /// `offset[node]` is smaller than the previous bound.
    NonMonotonicOffset { node: usize },
    /// The last offset does not point at the end of the neighbor list.
    EdgeCount { offset_end: usize, neighbors: usize },
    /// A neighbor index points outside `[0, node_count)`.
    DanglingNeighbor { edge: usize, neighbor: i32, node_count: usize },
    /// A side group has fewer than two nodes, so spacing is undefined.
    DegenerateSide { role: &'static str, nodes: usize },
    /// The mesh collaborator rejected a query.
    Mesh(String),
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyError::EmptyGroup { tag, role } => {
                write!(f, "Mesh group {} ({}) has no elements", tag, role)
            }
            TopologyError::OffsetLength { expected, found } => write!(
                f,
                "Offset table has {} entries, expected one per node ({})",
                found, expected
            ),
            TopologyError::NonMonotonicOffset { node } => {
                write!(f, "Offset table decreases at node {}", node)
            }
            TopologyError::EdgeCount { offset_end, neighbors } => write!(
                f,
                "Last offset is {} but the neighbor list has {} entries",
                offset_end, neighbors
            ),
            TopologyError::DanglingNeighbor { edge, neighbor, node_count } => write!(
                f,
                "Edge {} points at node {} outside 0..{}",
                edge, neighbor, node_count
            ),
            TopologyError::DegenerateSide { role, nodes } => write!(
                f,
                "Side group {} has {} node(s); at least 2 are needed to compute spacing",
                role, nodes
            ),
            TopologyError::Mesh(msg) => write!(f, "Mesh error: {}", msg),
        }
    }
}

impl std::error::Error for TopologyError {}

/// Errors raised by the host-side state store and checkpoint manager.
#[derive(Debug, Clone, PartialEq)]
pub enum StateError {
    /// No scalar parameter has this name.
    UnknownParameter(String),
    /// Restart was requested before a checkpoint was taken.
    NoCheckpoint,
    /// An operation would leave a buffer with the wrong number of entries.
    LengthMismatch {
        buffer: BufferName,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::UnknownParameter(name) => write!(f, "Unknown parameter '{}'", name),
            StateError::NoCheckpoint => {
                write!(f, "Restore requested but no checkpoint has been taken")
            }
            StateError::LengthMismatch { buffer, expected, found } => write!(
                f,
                "Buffer {} would have {} entries, expected {}",
                buffer.label(),
                found,
                expected
            ),
        }
    }
}

impl std::error::Error for StateError {}

/// Errors that can occur in the GPU compute and render backend.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// The swapchain could not provide or present a frame.
    Surface(wgpu::SurfaceError),
    /// A write targeted a slot the backend never allocated.
    UnknownSlot(u32),
    /// A write does not fit into the allocated device buffer.
    BufferOverflow { slot: u32, size: u64, capacity: u64 },
    /// acquire/execute/release were called out of order.
    Bracket(&'static str),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::Surface(e) => write!(f, "Surface error: {}", e),
            GpuError::UnknownSlot(slot) => write!(f, "No device buffer bound to slot {}", slot),
            GpuError::BufferOverflow { slot, size, capacity } => write!(
                f,
                "Write of {} bytes exceeds slot {} capacity of {} bytes",
                size, slot, capacity
            ),
            GpuError::Bracket(msg) => write!(f, "Compute bracket misuse: {}", msg),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            GpuError::Surface(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

impl From<wgpu::SurfaceError> for GpuError {
    fn from(e: wgpu::SurfaceError) -> Self {
        GpuError::Surface(e)
    }
}

/// Errors that can occur when running a simulation.
#[derive(Debug)]
pub enum SimulationError {
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
    /// GPU initialization or a per-frame GPU operation failed.
    Gpu(GpuError),
    /// The mesh could not be turned into a lattice.
    Topology(TopologyError),
    /// The host state store rejected an operation.
    State(StateError),
    /// The configuration file could not be read or parsed.
    Config(String),
    /// A frame was requested before the initial upload.
    NotStarted,
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            SimulationError::Window(e) => write!(f, "Failed to create window: {}", e),
            SimulationError::Gpu(e) => write!(f, "GPU error: {}", e),
            SimulationError::Topology(e) => write!(f, "Topology error: {}", e),
            SimulationError::State(e) => write!(f, "State error: {}", e),
            SimulationError::Config(msg) => write!(f, "Configuration error: {}", msg),
            SimulationError::NotStarted => {
                write!(f, "Frame requested before the initial upload. Call start() first.")
            }
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::EventLoop(e) => Some(e),
            SimulationError::Window(e) => Some(e),
            SimulationError::Gpu(e) => Some(e),
            SimulationError::Topology(e) => Some(e),
            SimulationError::State(e) => Some(e),
            SimulationError::Config(_) | SimulationError::NotStarted => None,
        }
    }
}

impl From<winit::error::EventLoopError> for SimulationError {
    fn from(e: winit::error::EventLoopError) -> Self {
        SimulationError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for SimulationError {
    fn from(e: winit::error::OsError) -> Self {
        SimulationError::Window(e)
    }
}

impl From<GpuError> for SimulationError {
    fn from(e: GpuError) -> Self {
        SimulationError::Gpu(e)
    }
}

impl From<TopologyError> for SimulationError {
    fn from(e: TopologyError) -> Self {
        SimulationError::Topology(e)
    }
}

impl From<StateError> for SimulationError {
    fn from(e: StateError) -> Self {
        SimulationError::State(e)
    }
}
