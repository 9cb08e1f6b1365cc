//! # spinbubble
//!
//! GPU lattice Monte Carlo for false-vacuum decay in a planar spin model.
//!
//! Every node of a periodic square lattice carries a spin angle. Each frame
//! the GPU proposes a trial angle per node, evaluates the energy change of
//! every bond, and accepts or rejects per node with a Metropolis test against
//! the temperature and the two external fields. Regions that tunnel out of
//! the metastable orientation show up as colored bubbles.
//!
//! ## Quick Start
//!
//! ```ignore
//! use spinbubble::prelude::*;
//!
//! let config = SimConfig::default();
//! let mut mesh = PeriodicSquare::new(config.mesh.resolution, config.mesh.extent, config.tags);
//! let lattice = extract(&mut mesh, &config.tags, &config.mesh.extent)?;
//! let controller = Controller::from_lattice(
//!     lattice,
//!     config.parameters,
//!     config.seeding,
//!     config.projection,
//! );
//! spinbubble::run(config, controller)?;
//! ```
//!
//! ## Layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`graph`] | Flattened (CSR) neighbor graph |
//! | [`mesh`], [`topology`] | Tagged mesh groups and lattice extraction |
//! | [`state`] | Host buffers, scalar parameters, RNG seeding |
//! | [`checkpoint`] | Restart snapshot |
//! | [`sync`] | Dirty tracking and uploads |
//! | [`control`] | Per-frame state machine and intents |
//! | [`backend`] | Compute and render seams |
//!
//! The wgpu backend, window and panel live behind [`run`].

mod app;
pub mod backend;
pub mod checkpoint;
pub mod config;
pub mod control;
pub mod error;
mod gpu;
pub mod graph;
pub mod input;
pub mod mesh;
pub mod shader;
pub mod state;
pub mod sync;
pub mod time;
pub mod topology;
#[cfg(feature = "egui")]
mod ui;

pub use app::{run, Frontend};
pub use backend::{ComputeBackend, Kernel, ProjectionMode, RenderBackend, WaitPolicy};
pub use checkpoint::{Checkpoint, CheckpointManager};
pub use config::SimConfig;
pub use control::{Controller, Intent, ParameterPanel, Phase};
pub use error::{GpuError, SimulationError, StateError, TopologyError};
pub use gpu::{Camera, GpuState};
pub use graph::NeighborGraph;
pub use mesh::{GroupTags, MeshSource, PeriodicSquare};
pub use shader::KernelSources;
pub use state::{BufferName, Parameters, Seeding, SimulationState};
pub use sync::SyncController;
pub use topology::{extract, Lattice};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use spinbubble::prelude::*;
/// ```
pub mod prelude {
    pub use crate::backend::{ComputeBackend, Kernel, ProjectionMode, RenderBackend, WaitPolicy};
    pub use crate::config::SimConfig;
    pub use crate::control::{Controller, Intent, ParameterPanel, Phase};
    pub use crate::error::SimulationError;
    pub use crate::mesh::{GroupTags, MeshSource, PeriodicSquare};
    pub use crate::state::{BufferName, Parameters, Seeding, SimulationState};
    pub use crate::topology::{extract, Extent, Lattice};
}
