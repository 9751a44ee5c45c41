//! Run loop for a fixed number of leapfrog steps
//!
//! The driver owns the particle system for the whole run. It computes the
//! initial accelerations once, records the step-0 snapshot, then for steps
//! 1..=num_steps advances the system, validates the result, commits it and
//! records a snapshot every `snapshot_interval` steps.
//!
//! A completed run therefore holds `1 + num_steps / snapshot_interval`
//! snapshots: steps 0, k, 2k, ... up to the last multiple of k. The final
//! state is included whenever `num_steps` is a multiple of the interval.
//!
//! State machine: `Initialized -> Running -> Completed`, with `Aborted` when
//! a step diverges and `Cancelled` when the cancel flag is seen between steps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{SimError, SimResult};
use crate::output::sink::SnapshotSink;
use crate::simulation::forces::{build_force_model, ForceModel};
use crate::simulation::integrator::{leapfrog_step, StepState};
use crate::simulation::params::Parameters;
use crate::simulation::states::{first_non_finite, NVec3, ParticleSystem, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Initialized,
    Running,
    Completed,
    Aborted { step: usize }, // step that diverged
    Cancelled { step: usize }, // last completed step
}

/// Receives `(current_step, total_steps)` after every completed step
pub trait ProgressObserver {
    fn on_step(&mut self, current: usize, total: usize);
}

impl<F: FnMut(usize, usize)> ProgressObserver for F {
    fn on_step(&mut self, current: usize, total: usize) {
        self(current, total)
    }
}

/// Observer that ignores progress
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_step(&mut self, _current: usize, _total: usize) {}
}

/// Observer that logs every `every` steps through `tracing`
pub struct LogProgress {
    pub every: usize,
}

impl ProgressObserver for LogProgress {
    fn on_step(&mut self, current: usize, total: usize) {
        if current == total || (self.every > 0 && current % self.every == 0) {
            info!("step {current}/{total}");
        }
    }
}

pub struct SimulationDriver {
    params: Parameters,
    forces: Box<dyn ForceModel>,
    system: ParticleSystem,
    snapshots: Vec<Snapshot>,
    state: DriverState,
    cancel: Option<Arc<AtomicBool>>,
}

impl SimulationDriver {
    /// Validate `params` and take ownership of `system`, using the kernel
    /// named in the parameters
    pub fn new(system: ParticleSystem, params: Parameters) -> SimResult<Self> {
        let forces = build_force_model(&params);
        Self::with_force_model(system, params, forces)
    }

    /// Same as [`SimulationDriver::new`] with an explicit force model
    pub fn with_force_model(system: ParticleSystem, params: Parameters, forces: Box<dyn ForceModel>) -> SimResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            forces,
            system,
            snapshots: Vec::new(),
            state: DriverState::Initialized,
            cancel: None,
        })
    }

    /// Stop between steps once `flag` becomes true
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn system(&self) -> &ParticleSystem {
        &self.system
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn into_parts(self) -> (ParticleSystem, Vec<Snapshot>) {
        (self.system, self.snapshots)
    }

    /// Execute the run. Returns the final state (`Completed` or `Cancelled`);
    /// divergence returns `SimError::NumericDivergence` and leaves the driver `Aborted`.
    pub fn run(&mut self, observer: &mut dyn ProgressObserver) -> SimResult<DriverState> {
        if self.state != DriverState::Initialized {
            return Err(SimError::Configuration(format!("driver cannot run from state {:?}", self.state)));
        }

        let total = self.params.num_steps;
        let interval = self.params.snapshot_interval;
        self.state = DriverState::Running;
        info!(
            "running {} particles for {} steps (dt = {:e}, eps = {:e})",
            self.system.len(),
            total,
            self.params.dt,
            self.params.softening
        );

        // a_0 so that step 1 starts from a valid acceleration
        let a0 = match self.forces.compute_accelerations(self.system.positions(), self.system.masses()) {
            Ok(a) => a,
            Err(e) => {
                self.state = DriverState::Aborted { step: 0 };
                return Err(e);
            }
        };
        if let Some(reason) = self.divergence_in(&a0, "acceleration") {
            return Err(self.abort(0, reason));
        }
        self.system.set_accelerations(a0)?;

        self.snapshots = Vec::with_capacity(self.params.expected_snapshots());
        self.snapshots.push(self.system.snapshot(0));

        for step in 1..=total {
            if self.cancel_requested() {
                let done = step - 1;
                self.state = DriverState::Cancelled { step: done };
                info!("cancelled after {done}/{total} steps");
                return Ok(self.state);
            }

            let next = match leapfrog_step(&self.system, self.forces.as_ref(), &self.params) {
                Ok(next) => next,
                Err(SimError::InvalidState(reason)) => return Err(self.abort(step, reason)),
                Err(e) => {
                    self.state = DriverState::Aborted { step };
                    return Err(e);
                }
            };

            if let Some(reason) = self.validate_step(&next) {
                return Err(self.abort(step, reason));
            }

            let StepState { positions, velocities, accelerations, t } = next;
            self.system.commit(positions, velocities, accelerations, t);

            if step % interval == 0 {
                self.snapshots.push(self.system.snapshot(step));
                debug!("snapshot {} at step {step}", self.snapshots.len() - 1);
            }

            observer.on_step(step, total);
        }

        self.state = DriverState::Completed;
        info!("completed {total} steps, {} snapshots", self.snapshots.len());
        Ok(self.state)
    }

    /// Run, then hand the recorded snapshots to `sink`.
    /// A cancelled run persists the snapshots of the steps it completed.
    pub fn run_and_persist(
        &mut self,
        observer: &mut dyn ProgressObserver,
        sink: &mut dyn SnapshotSink,
    ) -> SimResult<DriverState> {
        let state = self.run(observer)?;
        sink.persist(self.system.len(), &self.snapshots)?;
        Ok(state)
    }

    fn cancel_requested(&self) -> bool {
        self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn validate_step(&self, next: &StepState) -> Option<String> {
        self.divergence_in(&next.positions, "position")
            .or_else(|| self.divergence_in(&next.velocities, "velocity"))
            .or_else(|| self.divergence_in(&next.accelerations, "acceleration"))
    }

    fn divergence_in(&self, values: &[NVec3], what: &str) -> Option<String> {
        if let Some(i) = first_non_finite(values) {
            return Some(format!("{what} of particle {i} is not finite"));
        }
        if what == "acceleration" {
            if let Some(bound) = self.params.max_acceleration {
                if let Some((i, a)) = values.iter().enumerate().find(|(_, a)| a.norm() > bound) {
                    return Some(format!(
                        "acceleration of particle {i} is {:e}, above bound {bound:e}",
                        a.norm()
                    ));
                }
            }
        }
        None
    }

    fn abort(&mut self, step: usize, reason: String) -> SimError {
        self.state = DriverState::Aborted { step };
        warn!("aborting at step {step}: {reason}");
        SimError::NumericDivergence {
            step,
            reason,
            last_valid: Box::new(self.system.snapshot(step.saturating_sub(1))),
        }
    }
}

/// Run `system` under `params` with the default kernel and no observer,
/// returning the ordered snapshot sequence
pub fn run(system: ParticleSystem, params: Parameters) -> SimResult<Vec<Snapshot>> {
    let mut driver = SimulationDriver::new(system, params)?;
    driver.run(&mut NoProgress)?;
    let (_, snapshots) = driver.into_parts();
    Ok(snapshots)
}
