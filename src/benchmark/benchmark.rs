use std::time::Instant;

use crate::configuration::config::KernelConfig;
use crate::error::SimResult;
use crate::simulation::forces::build_force_model;
use crate::simulation::integrator::leapfrog_step;
use crate::simulation::params::Parameters;
use crate::simulation::states::{NVec3, ParticleSystem};

const KERNELS: [KernelConfig; 3] = [KernelConfig::Direct, KernelConfig::Pairwise, KernelConfig::Parallel];

/// Helper to build a deterministic system of size `n`, no rand needed
pub fn make_system(n: usize) -> SimResult<ParticleSystem> {
    let positions = (0..n)
        .map(|i| {
            let i_f = i as f64;
            NVec3::new(
                (i_f * 0.37).sin() * 5.0,
                (i_f * 0.13).cos() * 5.0,
                (i_f * 0.07).sin() * 5.0,
            )
        })
        .collect();

    ParticleSystem::new(positions, vec![NVec3::zeros(); n], vec![1.0; n])
}

/// Dimensionless parameters for timing runs
pub fn make_params(kernel: KernelConfig) -> Parameters {
    Parameters {
        G: 0.1,
        softening: 1e-2,
        dt: 1e-3,
        num_steps: 1,
        snapshot_interval: 1,
        max_acceleration: None,
        kernel,
    }
}

/// Time one force evaluation per kernel for a range of n
pub fn bench_forces(ns: &[usize]) {
    for &n in ns {
        let sys = match make_system(n) {
            Ok(sys) => sys,
            Err(e) => {
                eprintln!("N = {n}: {e}");
                continue;
            }
        };
        let mut out = vec![NVec3::zeros(); n];
        let mut line = format!("N = {n:5}");

        for kernel in KERNELS {
            let forces = build_force_model(&make_params(kernel));

            // Warm up
            forces.accelerations_into(sys.positions(), sys.masses(), &mut out);

            let t0 = Instant::now();
            forces.accelerations_into(sys.positions(), sys.masses(), &mut out);
            let secs = t0.elapsed().as_secs_f64();

            line.push_str(&format!(", {:?} = {:8.6} s", kernel, secs));
        }

        println!("{line}");
    }
}

/// Time full leapfrog steps per kernel, CSV output
/// Paste output directly into a spreadsheet to graph
pub fn bench_leapfrog_curve(max_n: usize, stride: usize) {
    println!("N,direct_ms,pairwise_ms,parallel_ms");

    for n in (stride..=max_n).step_by(stride.max(1)) {
        // Small n: average over a few steps to smooth noise
        // Large n: only 1 step to avoid minutes of runtime
        let steps = if n <= 800 { 5 } else { 1 };
        let template = match make_system(n) {
            Ok(sys) => sys,
            Err(e) => {
                eprintln!("N = {n}: {e}");
                return;
            }
        };

        let mut row = vec![n.to_string()];
        for kernel in KERNELS {
            let params = make_params(kernel);
            let forces = build_force_model(&params);
            let mut sys = template.clone();
            let a0 = match forces.compute_accelerations(sys.positions(), sys.masses()) {
                Ok(a) => a,
                Err(e) => {
                    eprintln!("N = {n}: {e}");
                    return;
                }
            };
            if sys.set_accelerations(a0).is_err() {
                return;
            }

            let t0 = Instant::now();
            for _ in 0..steps {
                match leapfrog_step(&sys, forces.as_ref(), &params) {
                    Ok(next) => sys.commit(next.positions, next.velocities, next.accelerations, next.t),
                    Err(e) => {
                        eprintln!("N = {n}: {e}");
                        return;
                    }
                }
            }
            let ms = t0.elapsed().as_secs_f64() * 1000.0 / steps as f64;
            row.push(format!("{ms:.6}"));
        }

        println!("{}", row.join(","));
    }
}
