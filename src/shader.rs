//! WGSL programs for the update kernels and the lattice renderer.
//!
//! Every compute kernel is compiled as the shared utilities (parameter block,
//! RNG, color map) followed by the kernel body.

use bytemuck::{Pod, Zeroable};

use crate::backend::Kernel;
use crate::state::ScalarBlock;

pub const UTILITIES_SOURCE: &str = include_str!("kernels/utilities.wgsl");
pub const RAMP_UP_SOURCE: &str = include_str!("kernels/ramp_up.wgsl");
pub const PROPOSE_SOURCE: &str = include_str!("kernels/propose.wgsl");
pub const BOND_SOURCE: &str = include_str!("kernels/bond.wgsl");
pub const ACCEPT_SOURCE: &str = include_str!("kernels/accept.wgsl");
pub const RENDER_SOURCE: &str = include_str!("kernels/render.wgsl");

/// Entry point of every compute kernel.
pub const KERNEL_ENTRY: &str = "main";

/// Program sources the wgpu backend compiles.
#[derive(Clone, Debug)]
pub struct KernelSources {
    utilities: String,
    ramp_up: String,
    propose: String,
    bond: String,
    accept: String,
    render: String,
}

impl Default for KernelSources {
    fn default() -> Self {
        Self {
            utilities: UTILITIES_SOURCE.to_owned(),
            ramp_up: RAMP_UP_SOURCE.to_owned(),
            propose: PROPOSE_SOURCE.to_owned(),
            bond: BOND_SOURCE.to_owned(),
            accept: ACCEPT_SOURCE.to_owned(),
            render: RENDER_SOURCE.to_owned(),
        }
    }
}

impl KernelSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace one kernel body. The body must keep the binding layout of the
    /// kernel it replaces.
    pub fn with_kernel(mut self, kernel: Kernel, body: impl Into<String>) -> Self {
        *self.body_mut(kernel) = body.into();
        self
    }

    pub fn body(&self, kernel: Kernel) -> &str {
        match kernel {
            Kernel::RampUp => &self.ramp_up,
            Kernel::Propose => &self.propose,
            Kernel::Bond => &self.bond,
            Kernel::Accept => &self.accept,
        }
    }

    fn body_mut(&mut self, kernel: Kernel) -> &mut String {
        match kernel {
            Kernel::RampUp => &mut self.ramp_up,
            Kernel::Propose => &mut self.propose,
            Kernel::Bond => &mut self.bond,
            Kernel::Accept => &mut self.accept,
        }
    }

    /// Full module source for a kernel.
    pub fn compose(&self, kernel: Kernel) -> String {
        format!("{}\n{}", self.utilities, self.body(kernel))
    }

    pub fn render(&self) -> &str {
        &self.render
    }
}

/// Camera block read by the render shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub point_size: f32,
    pub _padding: [f32; 3],
}

/// Uniform block bound at `@binding(0)` of every compute kernel.
///
/// The scalars come first so each one keeps its [`ScalarBlock`] offset. The
/// counts bound every dispatch, since storage buffers are padded to a
/// minimum size.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct KernelParams {
    pub scalars: ScalarBlock,
    pub node_count: u32,
    pub edge_count: u32,
    pub _padding: [u32; 2],
}

impl KernelParams {
    pub fn new(scalars: ScalarBlock, node_count: usize, edge_count: usize) -> Self {
        Self {
            scalars,
            node_count: node_count as u32,
            edge_count: edge_count as u32,
            _padding: [0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_prepends_utilities() {
        let sources = KernelSources::new();
        let module = sources.compose(Kernel::Accept);
        assert!(module.starts_with(UTILITIES_SOURCE));
        assert!(module.ends_with(ACCEPT_SOURCE));
    }

    #[test]
    fn test_with_kernel_replaces_one_body() {
        let sources = KernelSources::new().with_kernel(Kernel::Bond, "// empty");
        assert_eq!(sources.body(Kernel::Bond), "// empty");
        assert_eq!(sources.body(Kernel::Propose), PROPOSE_SOURCE);
    }

    #[test]
    fn test_kernels_bound_by_lattice_counts() {
        let sources = KernelSources::new();
        for kernel in [Kernel::RampUp, Kernel::Propose, Kernel::Accept] {
            let body = sources.body(kernel);
            assert!(body.contains("params.node_count"), "{:?}", kernel);
            assert!(!body.contains("arrayLength"), "{:?}", kernel);
        }
        let bond = sources.body(Kernel::Bond);
        assert!(bond.contains("params.edge_count"));
        assert!(!bond.contains("arrayLength"));
    }

    #[test]
    fn test_kernel_params_layout() {
        assert_eq!(std::mem::size_of::<KernelParams>(), 48);
        let params = KernelParams::new(ScalarBlock::zeroed(), 3, 12);
        let bytes = bytemuck::bytes_of(&params);
        assert_eq!(&bytes[32..36], &3u32.to_le_bytes());
        assert_eq!(&bytes[36..40], &12u32.to_le_bytes());
    }

    #[test]
    fn test_camera_uniform_layout() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
    }
}
