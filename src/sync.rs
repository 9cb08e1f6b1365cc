//! Host to device synchronization.
//!
//! The device keeps a mirror of every [`BufferName`]. Host mutations become
//! visible to kernels only after the buffer is marked dirty and flushed.
//! Uploads happen in slot order.

use std::collections::BTreeSet;

use crate::backend::ComputeBackend;
use crate::error::GpuError;
use crate::state::{BufferName, SimulationState};

/// Tracks which host buffers differ from their device mirrors.
#[derive(Debug, Default)]
pub struct SyncController {
    dirty: BTreeSet<BufferName>,
    uploads: u64,
    flushes: u64,
}

impl SyncController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_dirty(&mut self, name: BufferName) {
        self.dirty.insert(name);
    }

    pub fn mark_all_dirty<I: IntoIterator<Item = BufferName>>(&mut self, names: I) {
        self.dirty.extend(names);
    }

    pub fn is_dirty(&self, name: BufferName) -> bool {
        self.dirty.contains(&name)
    }

    /// Dirty buffers in upload order.
    pub fn dirty(&self) -> impl Iterator<Item = BufferName> + '_ {
        self.dirty.iter().copied()
    }

    /// Upload every dirty buffer and clear the dirty set.
    ///
    /// If an upload fails the remaining buffers stay dirty and the error is
    /// returned. Returns the number of buffers uploaded.
    pub fn flush<B: ComputeBackend + ?Sized>(
        &mut self,
        state: &SimulationState,
        backend: &mut B,
    ) -> Result<usize, GpuError> {
        self.flushes += 1;
        let mut uploaded = 0;
        while let Some(name) = self.dirty.first().copied() {
            backend.write_buffer(name.slot(), state.buffer_bytes(name))?;
            self.dirty.remove(&name);
            self.uploads += 1;
            uploaded += 1;
            log::debug!("uploaded {} ({} bytes)", name, state.buffer_bytes(name).len());
        }
        Ok(uploaded)
    }

    /// Upload every buffer regardless of dirty state.
    pub fn flush_all<B: ComputeBackend + ?Sized>(
        &mut self,
        state: &SimulationState,
        backend: &mut B,
    ) -> Result<usize, GpuError> {
        self.mark_all_dirty(BufferName::ALL);
        let uploaded = self.flush(state, backend)?;
        log::info!("full upload of {} buffers", uploaded);
        Ok(uploaded)
    }

    /// Total buffers uploaded since creation.
    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    /// Total flush calls since creation.
    pub fn flushes(&self) -> u64 {
        self.flushes
    }
}
