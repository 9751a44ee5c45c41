//! Destinations for a finished snapshot sequence

use crate::error::{SimError, SimResult};
use crate::simulation::states::Snapshot;

/// Consumes the ordered snapshot sequence of a run
pub trait SnapshotSink {
    fn persist(&mut self, particle_count: usize, snapshots: &[Snapshot]) -> SimResult<()>;
}

/// Keeps a copy of the sequence in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub particle_count: usize,
    pub snapshots: Vec<Snapshot>,
}

impl SnapshotSink for MemorySink {
    fn persist(&mut self, particle_count: usize, snapshots: &[Snapshot]) -> SimResult<()> {
        check_sequence(particle_count, snapshots)?;
        self.particle_count = particle_count;
        self.snapshots = snapshots.to_vec();
        Ok(())
    }
}

/// Every snapshot must hold `particle_count` positions and steps must increase
pub fn check_sequence(particle_count: usize, snapshots: &[Snapshot]) -> SimResult<()> {
    if let Some(s) = snapshots.iter().find(|s| s.len() != particle_count) {
        return Err(SimError::Archive(format!(
            "snapshot at step {} holds {} particles, expected {}",
            s.step(),
            s.len(),
            particle_count
        )));
    }
    if let Some(w) = snapshots.windows(2).find(|w| w[1].step() <= w[0].step()) {
        return Err(SimError::Archive(format!(
            "snapshots out of order: step {} follows step {}",
            w[1].step(),
            w[0].step()
        )));
    }
    Ok(())
}
