//! Restart support.
//!
//! One checkpoint of the kinematic buffers (position, angle, intermediate
//! angle) is taken after initialization. Restart copies it back by value.

use crate::error::StateError;
use crate::state::SimulationState;

/// An owned copy of the buffers a restart restores.
#[derive(Clone, Debug, PartialEq)]
pub struct Checkpoint {
    position: Vec<[f32; 4]>,
    theta: Vec<f32>,
    theta_int: Vec<f32>,
}

impl Checkpoint {
    pub fn node_count(&self) -> usize {
        self.theta.len()
    }

    pub fn positions(&self) -> &[[f32; 4]] {
        &self.position
    }

    pub fn theta(&self) -> &[f32] {
        &self.theta
    }

    pub fn theta_int(&self) -> &[f32] {
        &self.theta_int
    }
}

/// Holds at most one checkpoint. A new snapshot replaces the old one.
#[derive(Debug, Default)]
pub struct CheckpointManager {
    checkpoint: Option<Checkpoint>,
}

impl CheckpointManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the kinematic buffers out of `state`.
    pub fn snapshot(&mut self, state: &SimulationState) {
        self.checkpoint = Some(Checkpoint {
            position: state.positions().to_vec(),
            theta: state.theta().to_vec(),
            theta_int: state.theta_int().to_vec(),
        });
    }

    /// Copy the checkpoint back into `state` and return the restored node count.
    ///
    /// `state` is untouched on error.
    pub fn restore(&self, state: &mut SimulationState) -> Result<usize, StateError> {
        let checkpoint = self.checkpoint.as_ref().ok_or(StateError::NoCheckpoint)?;
        state.overwrite_kinematics(
            &checkpoint.position,
            &checkpoint.theta,
            &checkpoint.theta_int,
        )?;
        Ok(checkpoint.node_count())
    }

    pub fn checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoint.as_ref()
    }

    pub fn has_checkpoint(&self) -> bool {
        self.checkpoint.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Seeding;

    #[test]
    fn test_second_snapshot_replaces_first() {
        let mut state = SimulationState::new(Seeding::Fixed(9));
        state.initialize(3, 1.0).unwrap();
        let mut manager = CheckpointManager::new();
        manager.snapshot(&state);

        state.theta_mut().fill(2.0);
        manager.snapshot(&state);
        state.theta_mut().fill(3.0);

        assert_eq!(manager.restore(&mut state).unwrap(), 3);
        assert_eq!(state.theta(), &[2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_checkpoint_is_independent_copy() {
        let mut state = SimulationState::new(Seeding::Fixed(9));
        state.initialize(2, 0.5).unwrap();
        let mut manager = CheckpointManager::new();
        manager.snapshot(&state);

        state.theta_int_mut()[0] = 9.0;
        let checkpoint = manager.checkpoint().unwrap();
        assert_eq!(checkpoint.theta_int(), &[0.0, 0.0]);
    }

    #[test]
    fn test_restore_into_resized_store_fails() {
        let mut state = SimulationState::new(Seeding::Fixed(9));
        state.initialize(2, 0.5).unwrap();
        let mut manager = CheckpointManager::new();
        manager.snapshot(&state);

        state.initialize(4, 0.5).unwrap();
        let before = state.theta().to_vec();
        let err = manager.restore(&mut state).unwrap_err();
        assert!(matches!(err, StateError::LengthMismatch { expected: 4, found: 2, .. }));
        assert_eq!(state.theta(), before.as_slice());
    }
}
