//! Seams between the simulation core and the devices that run it.
//!
//! The wgpu implementation lives in `gpu`; tests substitute recording
//! doubles.

use serde::{Deserialize, Serialize};

use crate::control::ParameterPanel;
use crate::error::GpuError;
use crate::state::BufferSlot;

/// Compute kernels, in the order they run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Colors every node from its starting angle. Runs once at startup.
    RampUp,
    /// Draws a trial angle per node into the intermediate buffer.
    Propose,
    /// Evaluates one bond energy change per flattened edge.
    Bond,
    /// Sums a node's bonds, accepts or rejects, and recolors.
    Accept,
}

impl Kernel {
    /// Kernels dispatched every frame.
    pub const STEP: [Kernel; 3] = [Kernel::Propose, Kernel::Bond, Kernel::Accept];

    pub fn label(self) -> &'static str {
        match self {
            Kernel::RampUp => "ramp_up",
            Kernel::Propose => "propose",
            Kernel::Bond => "bond",
            Kernel::Accept => "accept",
        }
    }

    /// Whether the kernel runs one invocation per edge instead of per node.
    pub fn per_edge(self) -> bool {
        matches!(self, Kernel::Bond)
    }
}

/// Whether `execute` blocks until the kernel has finished on the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitPolicy {
    Wait,
    NoWait,
}

/// How the lattice is projected on screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionMode {
    #[default]
    Monocular,
    /// Side-by-side stereo pair.
    Binocular,
}

/// Device that runs the update kernels against mirrored buffers.
///
/// Kernels only run between `acquire` and `release`.
pub trait ComputeBackend {
    fn acquire(&mut self) -> Result<(), GpuError>;
    fn execute(&mut self, kernel: Kernel, wait: WaitPolicy) -> Result<(), GpuError>;
    fn release(&mut self) -> Result<(), GpuError>;
    /// Replace the contents of the device buffer in `slot`.
    fn write_buffer(&mut self, slot: BufferSlot, bytes: &[u8]) -> Result<(), GpuError>;
}

/// Window-side collaborator: draws the lattice and the control panel and
/// turns user input into intents on the panel.
pub trait RenderBackend {
    fn begin_frame(&mut self) -> Result<(), GpuError>;
    fn draw(&mut self, projection: ProjectionMode, panel: &mut ParameterPanel)
        -> Result<(), GpuError>;
    fn poll_input(&mut self, panel: &mut ParameterPanel);
    fn end_frame(&mut self) -> Result<(), GpuError>;
}
