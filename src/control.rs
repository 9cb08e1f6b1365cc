//! The per-frame control loop.
//!
//! A [`Controller`] owns the host state, the restart checkpoint and the dirty
//! tracker. Each frame runs the update kernels, draws, collects intents from
//! the panel and applies them. Everything happens on one thread, so a flush
//! issued while dispatching an intent has completed before the next frame's
//! kernels are submitted.

use crate::backend::{ComputeBackend, Kernel, ProjectionMode, RenderBackend, WaitPolicy};
use crate::checkpoint::CheckpointManager;
use crate::error::{GpuError, SimulationError};
use crate::state::{BufferName, Parameters, Seeding, SimulationState};
use crate::sync::SyncController;
use crate::topology::Lattice;

/// Lifecycle of the control loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// State is built but the device has not seen it yet.
    Initializing,
    /// Running frames.
    Steady,
    /// Exit was requested.
    Exited,
}

/// A user action collected during input polling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Intent {
    /// Commit the panel's parameter edits.
    Update,
    /// Restore the checkpoint and reset every spin to the panel angle.
    Restart,
    /// Switch how the lattice is projected.
    Projection(ProjectionMode),
    Exit,
}

/// Transient UI state: parameter edits not yet committed plus queued intents.
#[derive(Clone, Debug, Default)]
pub struct ParameterPanel {
    pub edits: Parameters,
    intents: Vec<Intent>,
}

impl ParameterPanel {
    pub fn new(edits: Parameters) -> Self {
        Self {
            edits,
            intents: Vec::new(),
        }
    }

    /// Queue an intent for dispatch at the end of the frame.
    pub fn push(&mut self, intent: Intent) {
        self.intents.push(intent);
    }

    pub fn pending(&self) -> &[Intent] {
        &self.intents
    }

    pub fn take_intents(&mut self) -> Vec<Intent> {
        std::mem::take(&mut self.intents)
    }
}

/// Drives the simulation state machine.
#[derive(Debug)]
pub struct Controller {
    phase: Phase,
    state: SimulationState,
    checkpoints: CheckpointManager,
    sync: SyncController,
    panel: ParameterPanel,
    projection: ProjectionMode,
}

impl Controller {
    /// Wrap an initialized store and take the restart checkpoint.
    pub fn new(state: SimulationState, edits: Parameters, projection: ProjectionMode) -> Self {
        let mut checkpoints = CheckpointManager::new();
        checkpoints.snapshot(&state);
        Self {
            phase: Phase::Initializing,
            state,
            checkpoints,
            sync: SyncController::new(),
            panel: ParameterPanel::new(edits),
            projection,
        }
    }

    /// Build the store from a lattice and wrap it.
    pub fn from_lattice(
        lattice: Lattice,
        params: Parameters,
        seeding: Seeding,
        projection: ProjectionMode,
    ) -> Self {
        let state = SimulationState::from_lattice(lattice, &params, seeding);
        Self::new(state, params, projection)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    pub fn sync(&self) -> &SyncController {
        &self.sync
    }

    pub fn panel(&self) -> &ParameterPanel {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut ParameterPanel {
        &mut self.panel
    }

    pub fn projection(&self) -> ProjectionMode {
        self.projection
    }

    /// Upload everything and run the ramp-up kernel once.
    pub fn start<B: ComputeBackend + ?Sized>(&mut self, backend: &mut B) -> Result<(), SimulationError> {
        if self.phase != Phase::Initializing {
            return Ok(());
        }
        self.sync.flush_all(&self.state, backend)?;
        bracket(backend, &[Kernel::RampUp])?;
        self.phase = Phase::Steady;
        log::info!(
            "simulation started: {} nodes, {} edges",
            self.state.node_count(),
            self.state.edge_count()
        );
        Ok(())
    }

    /// Run one step of the update kernels.
    pub fn compute<B: ComputeBackend + ?Sized>(&mut self, backend: &mut B) -> Result<(), GpuError> {
        bracket(backend, &Kernel::STEP)
    }

    /// Run one full frame and return the phase afterwards.
    pub fn frame<B>(&mut self, backend: &mut B) -> Result<Phase, SimulationError>
    where
        B: ComputeBackend + RenderBackend + ?Sized,
    {
        match self.phase {
            Phase::Initializing => return Err(SimulationError::NotStarted),
            Phase::Exited => return Ok(Phase::Exited),
            Phase::Steady => {}
        }

        self.compute(backend)?;

        backend.begin_frame()?;
        backend.draw(self.projection, &mut self.panel)?;
        backend.poll_input(&mut self.panel);
        backend.end_frame()?;

        for intent in self.panel.take_intents() {
            self.dispatch(intent, backend)?;
            if self.phase == Phase::Exited {
                break;
            }
        }
        Ok(self.phase)
    }

    /// Apply one intent.
    pub fn dispatch<B: ComputeBackend + ?Sized>(
        &mut self,
        intent: Intent,
        backend: &mut B,
    ) -> Result<(), SimulationError> {
        log::info!("intent: {:?}", intent);
        match intent {
            Intent::Update => {
                let touched = self.state.apply(&self.panel.edits);
                self.sync.mark_all_dirty(touched);
                self.sync.flush(&self.state, backend)?;
            }
            Intent::Restart => {
                let nodes = self.checkpoints.restore(&mut self.state)?;
                self.state.reset_per_node(nodes, self.panel.edits.initial_angle)?;
                self.sync.mark_all_dirty([
                    BufferName::Position,
                    BufferName::Theta,
                    BufferName::ThetaInt,
                ]);
                self.sync.flush(&self.state, backend)?;
            }
            Intent::Projection(mode) => self.projection = mode,
            Intent::Exit => self.phase = Phase::Exited,
        }
        Ok(())
    }
}

/// Run `kernels` in order inside one acquire/release bracket, waiting on each.
///
/// The bracket is released even if a kernel fails; the first error wins.
fn bracket<B: ComputeBackend + ?Sized>(backend: &mut B, kernels: &[Kernel]) -> Result<(), GpuError> {
    backend.acquire()?;
    let run = kernels
        .iter()
        .try_for_each(|&kernel| backend.execute(kernel, WaitPolicy::Wait));
    let released = backend.release();
    run.and(released)
}
