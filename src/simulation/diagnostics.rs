//! Conserved quantities used to monitor a run
//!
//! The potential uses the same softening as the force law, so the pair
//! (kinetic, potential) is the energy the leapfrog scheme actually keeps bounded.

use crate::simulation::params::Parameters;
use crate::simulation::states::{NVec3, ParticleSystem};

/// Sum of m_i v_i
pub fn total_momentum(sys: &ParticleSystem) -> NVec3 {
    sys.velocities()
        .iter()
        .zip(sys.masses().iter())
        .fold(NVec3::zeros(), |p, (v, m)| p + *m * *v)
}

/// Sum of |m_i v_i|, a scale for relative momentum error when the total is near zero
pub fn momentum_magnitude_sum(sys: &ParticleSystem) -> f64 {
    sys.velocities()
        .iter()
        .zip(sys.masses().iter())
        .map(|(v, m)| m * v.norm())
        .sum()
}

pub fn kinetic_energy(sys: &ParticleSystem) -> f64 {
    sys.velocities()
        .iter()
        .zip(sys.masses().iter())
        .map(|(v, m)| 0.5 * m * v.norm_squared())
        .sum()
}

/// Softened (Plummer) potential: -sum_{i<j} G m_i m_j / sqrt(|r_ij|^2 + eps^2)
pub fn potential_energy(sys: &ParticleSystem, params: &Parameters) -> f64 {
    let x = sys.positions();
    let m = sys.masses();
    let eps2 = params.eps2();
    let n = sys.len();

    let mut u = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let r = x[j] - x[i];
            u -= m[i] * m[j] / (r.norm_squared() + eps2).sqrt();
        }
    }
    params.G * u
}

pub fn total_energy(sys: &ParticleSystem, params: &Parameters) -> f64 {
    kinetic_energy(sys) + potential_energy(sys, params)
}

/// Mass-weighted mean position
pub fn center_of_mass(sys: &ParticleSystem) -> NVec3 {
    let total: f64 = sys.masses().iter().sum();
    let weighted = sys
        .positions()
        .iter()
        .zip(sys.masses().iter())
        .fold(NVec3::zeros(), |c, (x, m)| c + *m * *x);
    weighted / total
}
