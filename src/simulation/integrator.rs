//! Fixed-step kick-drift-kick leapfrog (velocity-Verlet) integrator
//!
//! One force evaluation per step: the final acceleration of step n is
//! reused as the initial acceleration of step n + 1. The integrator
//! never writes into its inputs; it returns the advanced state and the
//! driver decides whether to commit it.

use crate::error::{SimError, SimResult};
use crate::simulation::forces::ForceModel;
use crate::simulation::params::Parameters;
use crate::simulation::states::{NVec3, ParticleSystem};

/// State after one step, not yet committed to a [`ParticleSystem`]
#[derive(Debug, Clone)]
pub struct StepState {
    pub positions: Vec<NVec3>,
    pub velocities: Vec<NVec3>,
    pub accelerations: Vec<NVec3>,
    pub t: f64,
}

/// Advance raw arrays by one step of size `dt`
///
/// 1. v_half = v + (dt/2) a
/// 2. x_new  = x + dt v_half
/// 3. a_new  = F(x_new)
/// 4. v_new  = v_half + (dt/2) a_new
pub fn kick_drift_kick(
    positions: &[NVec3],
    velocities: &[NVec3],
    masses: &[f64],
    accelerations: &[NVec3],
    dt: f64,
    forces: &dyn ForceModel,
) -> SimResult<(Vec<NVec3>, Vec<NVec3>, Vec<NVec3>)> {
    if dt == 0.0 {
        return Err(SimError::Configuration("time step must be non-zero".into()));
    }
    let n = positions.len();
    if velocities.len() != n || accelerations.len() != n || masses.len() != n {
        return Err(SimError::Configuration("state arrays must all hold N entries".into()));
    }

    let half_dt = 0.5 * dt;

    // Kick: v_n+1/2 = v_n + (dt/2) a_n
    let v_half: Vec<NVec3> = velocities
        .iter()
        .zip(accelerations.iter())
        .map(|(v, a)| *v + half_dt * *a)
        .collect();

    // Drift: x_n+1 = x_n + dt v_n+1/2
    let new_positions: Vec<NVec3> = positions
        .iter()
        .zip(v_half.iter())
        .map(|(x, v)| *x + dt * *v)
        .collect();

    // a_n+1 from x_n+1
    let new_accelerations = forces.compute_accelerations(&new_positions, masses)?;

    // Kick: v_n+1 = v_n+1/2 + (dt/2) a_n+1
    let new_velocities: Vec<NVec3> = v_half
        .iter()
        .zip(new_accelerations.iter())
        .map(|(v, a)| *v + half_dt * *a)
        .collect();

    Ok((new_positions, new_velocities, new_accelerations))
}

/// Advance `sys` by one step of `params.dt` without mutating it.
/// `sys.accelerations()` must already hold the accelerations at `sys.positions()`.
pub fn leapfrog_step(sys: &ParticleSystem, forces: &dyn ForceModel, params: &Parameters) -> SimResult<StepState> {
    let (positions, velocities, accelerations) = kick_drift_kick(
        sys.positions(),
        sys.velocities(),
        sys.masses(),
        sys.accelerations(),
        params.dt,
        forces,
    )?;

    Ok(StepState {
        positions,
        velocities,
        accelerations,
        t: sys.time() + params.dt,
    })
}
