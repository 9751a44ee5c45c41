//! Softened Newtonian gravity for the n-body engine
//!
//! Every kernel evaluates the same exact O(N^2) pairwise sum
//!
//!   a_i = G * sum_{j != i} m_j * (x_j - x_i) / (|x_j - x_i|^2 + eps^2)^1.5
//!
//! and differs only in how the pairs are visited:
//! - [`NewtonianGravity3`]: ascending i, ascending j, one full sweep per particle
//! - [`PairwiseGravity3`]: each unordered pair (i < j) once, equal and opposite update
//! - [`ParallelGravity3`]: the direct sweep with the outer loop spread over rayon

use rayon::prelude::*;

use crate::configuration::config::KernelConfig;
use crate::error::{SimError, SimResult};
use crate::simulation::params::Parameters;
use crate::simulation::states::{first_non_finite, NVec3};

/// A source of per-particle accelerations operating on positions and masses
pub trait ForceModel: Send + Sync {
    /// Write the acceleration of every particle into `out`.
    /// `out` is overwritten, not accumulated into.
    fn accelerations_into(&self, positions: &[NVec3], masses: &[f64], out: &mut [NVec3]);

    /// Checked entry point: validates the inputs and allocates the output
    fn compute_accelerations(&self, positions: &[NVec3], masses: &[f64]) -> SimResult<Vec<NVec3>> {
        let n = positions.len();
        if n == 0 {
            return Err(SimError::Configuration("force evaluation needs at least one particle".into()));
        }
        if masses.len() != n {
            return Err(SimError::Configuration(format!(
                "{} positions but {} masses",
                n,
                masses.len()
            )));
        }
        if let Some(i) = first_non_finite(positions) {
            return Err(SimError::InvalidState(format!("position of particle {i} is not finite")));
        }
        if let Some(i) = masses.iter().position(|m| !m.is_finite()) {
            return Err(SimError::InvalidState(format!("mass of particle {i} is not finite")));
        }

        let mut out = vec![NVec3::zeros(); n];
        self.accelerations_into(positions, masses, &mut out);
        Ok(out)
    }
}

/// Pick the kernel named in the parameters
pub fn build_force_model(params: &Parameters) -> Box<dyn ForceModel> {
    let direct = NewtonianGravity3 { G: params.G, eps2: params.eps2() };
    match params.kernel {
        KernelConfig::Direct => Box::new(direct),
        KernelConfig::Pairwise => Box::new(PairwiseGravity3 { G: params.G, eps2: params.eps2() }),
        KernelConfig::Parallel => Box::new(ParallelGravity3 { direct }),
    }
}

/// 3D Newtonian gravity with uniform softening (direct n^2 sum)
#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy)]
pub struct NewtonianGravity3 {
    pub G: f64, // gravitational constant
    pub eps2: f64, // softening squared
}

impl NewtonianGravity3 {
    /// Acceleration on particle `i` from every other particle, j ascending
    #[inline]
    pub fn acceleration_on(&self, i: usize, positions: &[NVec3], masses: &[f64]) -> NVec3 {
        let xi = positions[i];
        let mut acc = NVec3::zeros();

        for (j, (xj, mj)) in positions.iter().zip(masses.iter()).enumerate() {
            // Self term contributes exactly nothing
            if j == i {
                continue;
            }

            // Displacement from i to j, i is pulled along +r
            let r = *xj - xi;

            // Softened squared distance |r|^2 + eps^2
            let d2 = r.dot(&r) + self.eps2;

            // 1 / |r_soft|^3
            let inv_r = d2.sqrt().recip();
            let inv_r3 = inv_r * inv_r * inv_r;

            acc += (*mj * inv_r3) * r;
        }

        self.G * acc
    }
}

impl ForceModel for NewtonianGravity3 {
    fn accelerations_into(&self, positions: &[NVec3], masses: &[f64], out: &mut [NVec3]) {
        for (i, a) in out.iter_mut().enumerate() {
            *a = self.acceleration_on(i, positions, masses);
        }
    }
}

/// Direct sum visiting each unordered pair once.
/// Deterministic, but rounds differently from [`NewtonianGravity3`].
#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy)]
pub struct PairwiseGravity3 {
    pub G: f64,
    pub eps2: f64,
}

impl ForceModel for PairwiseGravity3 {
    fn accelerations_into(&self, positions: &[NVec3], masses: &[f64], out: &mut [NVec3]) {
        for a in out.iter_mut() {
            *a = NVec3::zeros();
        }

        let n = positions.len();

        // Loop over each unordered pair (i, j) with i < j
        for i in 0..n {
            let xi = positions[i];
            let mi = masses[i];

            for j in (i + 1)..n {
                let xj = positions[j];
                let mj = masses[j];

                let r = xj - xi;
                let d2 = r.dot(&r) + self.eps2;
                let inv_r = d2.sqrt().recip();
                let inv_r3 = inv_r * inv_r * inv_r;

                // coef * r is the same vector for both sides of the pair
                let coef = self.G * inv_r3;

                // a_i +=  G * m_j * r / |r_soft|^3
                // a_j += -G * m_i * r / |r_soft|^3
                out[i] += coef * mj * r;
                out[j] -= coef * mi * r;
            }
        }
    }
}

/// Direct sum with one rayon task per particle. Each particle's sum keeps
/// ascending j, so output is bit-identical to [`NewtonianGravity3`].
#[derive(Debug, Clone, Copy)]
pub struct ParallelGravity3 {
    pub direct: NewtonianGravity3,
}

impl ForceModel for ParallelGravity3 {
    fn accelerations_into(&self, positions: &[NVec3], masses: &[f64], out: &mut [NVec3]) {
        out.par_iter_mut().enumerate().for_each(|(i, a)| {
            *a = self.direct.acceleration_on(i, positions, masses);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gravity() -> NewtonianGravity3 {
        NewtonianGravity3 { G: 1.0, eps2: 0.01 }
    }

    #[test]
    fn empty_input_is_a_configuration_error() {
        let res = gravity().compute_accelerations(&[], &[]);
        assert!(matches!(res, Err(SimError::Configuration(_))));
    }

    #[test]
    fn nan_position_is_invalid_state() {
        let pos = vec![NVec3::zeros(), NVec3::new(f64::NAN, 0.0, 0.0)];
        let res = gravity().compute_accelerations(&pos, &[1.0, 1.0]);
        assert!(matches!(res, Err(SimError::InvalidState(_))));
    }

    #[test]
    fn infinite_mass_is_invalid_state() {
        let pos = vec![NVec3::zeros(), NVec3::new(1.0, 0.0, 0.0)];
        let res = gravity().compute_accelerations(&pos, &[1.0, f64::INFINITY]);
        assert!(matches!(res, Err(SimError::InvalidState(_))));
    }

    #[test]
    fn build_force_model_honours_kernel() {
        let pos = vec![NVec3::zeros(), NVec3::new(1.0, 0.5, 0.0), NVec3::new(-0.3, 0.2, 0.9)];
        let masses = [1.0, 2.0, 3.0];
        let mut params = Parameters { G: 1.0, softening: 0.1, ..Parameters::default() };

        let direct = build_force_model(&params).compute_accelerations(&pos, &masses).unwrap();
        params.kernel = KernelConfig::Parallel;
        let parallel = build_force_model(&params).compute_accelerations(&pos, &masses).unwrap();
        params.kernel = KernelConfig::Pairwise;
        let pairwise = build_force_model(&params).compute_accelerations(&pos, &masses).unwrap();

        assert_eq!(direct, parallel);
        for (a, b) in direct.iter().zip(pairwise.iter()) {
            assert!((a - b).norm() <= 1e-12 * a.norm().max(1.0));
        }
    }
}
