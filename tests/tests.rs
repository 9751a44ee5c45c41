use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use galsim::simulation::diagnostics::{center_of_mass, momentum_magnitude_sum, total_energy, total_momentum};
use galsim::simulation::forces::{ForceModel, NewtonianGravity3, PairwiseGravity3};
use galsim::simulation::integrator::{kick_drift_kick, leapfrog_step};
use galsim::simulation::params::Parameters;
use galsim::simulation::states::{NVec3, ParticleSystem};
use galsim::{KernelConfig, NoProgress, SimError, SimulationDriver};

/// Build a simple 2-body system separated along x-axis, at rest
pub fn two_body_system(dist: f64, m1: f64, m2: f64) -> ParticleSystem {
    ParticleSystem::new(
        vec![[-dist / 2.0, 0.0, 0.0].into(), [dist / 2.0, 0.0, 0.0].into()],
        vec![NVec3::zeros(); 2],
        vec![m1, m2],
    )
    .unwrap()
}

/// Default physics parameters for tests
pub fn test_params() -> Parameters {
    Parameters {
        G: 0.1,
        softening: 1e-3,
        dt: 0.001,
        num_steps: 100,
        snapshot_interval: 10,
        max_acceleration: None,
        kernel: KernelConfig::Direct,
    }
}

/// Direct gravity from parameters
pub fn gravity(p: &Parameters) -> NewtonianGravity3 {
    NewtonianGravity3 { G: p.G, eps2: p.eps2() }
}

fn accelerations(forces: &dyn ForceModel, sys: &ParticleSystem) -> Vec<NVec3> {
    forces.compute_accelerations(sys.positions(), sys.masses()).unwrap()
}

/// Advance `steps` leapfrog steps through the driver and return the final state
fn advance(sys: ParticleSystem, p: &Parameters, steps: usize) -> ParticleSystem {
    let params = Parameters { num_steps: steps, snapshot_interval: steps.max(1), ..p.clone() };
    let mut driver = SimulationDriver::new(sys, params).unwrap();
    driver.run(&mut NoProgress).unwrap();
    driver.into_parts().0
}

/// Force model that counts its evaluations
struct Counting {
    inner: NewtonianGravity3,
    calls: Arc<AtomicUsize>,
}

impl ForceModel for Counting {
    fn accelerations_into(&self, positions: &[NVec3], masses: &[f64], out: &mut [NVec3]) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.accelerations_into(positions, masses, out);
    }
}

// ==================================================================================
// Gravity tests
// ==================================================================================

#[test]
fn gravity_newton_third_law() {
    let sys = two_body_system(1.0, 2.0, 3.0);
    let p = test_params();

    let acc = accelerations(&gravity(&p), &sys);
    let net = acc[0] * sys.masses()[0] + acc[1] * sys.masses()[1];

    assert!(net.norm() < 1e-12, "Net momentum not zero: {:?}", net);
}

#[test]
fn gravity_points_toward_other_body() {
    let sys = two_body_system(2.0, 1.0, 1.0);
    let p = test_params();

    let acc = accelerations(&gravity(&p), &sys);
    let dx = sys.positions()[1] - sys.positions()[0];

    assert!(dx.norm() > 0.0);
    assert!(acc[0].dot(&dx) > 0.0, "Acceleration is not toward second body");
    assert!(acc[1].dot(&dx) < 0.0, "Acceleration is not toward first body");
}

#[test]
fn gravity_inverse_square_law() {
    let sys_r = two_body_system(1.0, 1.0, 1.0);
    let sys_2r = two_body_system(2.0, 1.0, 1.0);
    let p = test_params();
    let forces = gravity(&p);

    let ratio = accelerations(&forces, &sys_r)[0].norm() / accelerations(&forces, &sys_2r)[0].norm();

    assert!((ratio - 4.0).abs() < 1e-3, "Expected ~4x, got {}", ratio);
}

#[test]
fn self_interaction_is_excluded() {
    // A lone particle feels nothing at all
    let single = ParticleSystem::new(vec![NVec3::new(3.0, -1.0, 2.0)], vec![NVec3::zeros()], vec![5.0]).unwrap();
    let p = test_params();
    assert_eq!(accelerations(&gravity(&p), &single)[0], NVec3::zeros());

    // With three particles, a_0 is the sum over j = 1, 2 only
    let positions = vec![NVec3::new(0.0, 0.0, 0.0), NVec3::new(1.0, 0.0, 0.0), NVec3::new(0.0, 2.0, 0.0)];
    let masses = vec![7.0, 2.0, 3.0];
    let sys = ParticleSystem::new(positions.clone(), vec![NVec3::zeros(); 3], masses.clone()).unwrap();
    let a0 = accelerations(&gravity(&p), &sys)[0];

    let mut expected = NVec3::zeros();
    for j in 1..3 {
        let r = positions[j] - positions[0];
        let d2 = r.norm_squared() + p.eps2();
        expected += p.G * masses[j] * r / (d2 * d2.sqrt());
    }
    assert!((a0 - expected).norm() <= 1e-14 * expected.norm());
}

#[test]
fn pairwise_contributions_are_antisymmetric() {
    let p = test_params();
    let positions = vec![NVec3::new(0.3, -0.2, 0.1), NVec3::new(-0.7, 0.4, 0.9)];
    let masses = vec![2.5, 0.4];
    let sys = ParticleSystem::new(positions, vec![NVec3::zeros(); 2], masses).unwrap();

    let direct = gravity(&p);
    let pairwise = PairwiseGravity3 { G: p.G, eps2: p.eps2() };
    let kernels: [&dyn ForceModel; 2] = [&direct, &pairwise];

    for forces in kernels {
        let acc = accelerations(forces, &sys);
        let f01 = sys.masses()[0] * acc[0];
        let f10 = sys.masses()[1] * acc[1];
        assert!((f01 + f10).norm() <= 1e-14 * f01.norm(), "{f01:?} vs {f10:?}");
    }
}

#[test]
fn gravity_softening_prevents_blowup() {
    let p = Parameters { softening: 0.1, ..test_params() };
    let m = 1.0;
    let forces = gravity(&p);
    let bound = p.G * m / p.eps2();

    // Sweep separations from far inside the softening length to well outside it
    let mut d = 1e-9;
    while d < 10.0 {
        let acc = accelerations(&forces, &two_body_system(d, m, m));
        assert!(acc[0].norm().is_finite());
        assert!(acc[0].norm() <= bound, "d = {d}: {} > {bound}", acc[0].norm());
        d *= 1.5;
    }

    // Coincident particles pull with exactly zero force
    let sys = ParticleSystem::new(vec![NVec3::zeros(); 2], vec![NVec3::zeros(); 2], vec![m, m]).unwrap();
    assert_eq!(accelerations(&forces, &sys), vec![NVec3::zeros(); 2]);
}

#[test]
fn two_body_scenario_in_si_units() {
    let m = 1.0e30;
    let d = 1.0e19;
    let p = Parameters {
        G: 6.6743e-11,
        softening: 1.0e19,
        dt: 1.0e10,
        num_steps: 1,
        snapshot_interval: 1,
        ..Parameters::default()
    };

    let sys = ParticleSystem::new(
        vec![NVec3::zeros(), NVec3::new(d, 0.0, 0.0)],
        vec![NVec3::zeros(); 2],
        vec![m, m],
    )
    .unwrap();

    // a = G m d / (d^2 + eps^2)^1.5
    let d2 = d * d + p.eps2();
    let expected = p.G * m * d / (d2 * d2.sqrt());
    let acc = accelerations(&gravity(&p), &sys);
    assert!((acc[0].norm() - expected).abs() <= 1e-12 * expected);
    assert!((acc[1].norm() - expected).abs() <= 1e-12 * expected);

    let before = sys.positions().to_vec();
    let after = advance(sys, &p, 1);

    // Both moved toward each other along x
    let axis = NVec3::new(1.0, 0.0, 0.0);
    let closing = (after.positions()[0] - before[0]).dot(&axis) - (after.positions()[1] - before[1]).dot(&axis);
    assert!(closing > 0.0, "particles did not approach: {closing}");
    assert!(after.positions()[1].x - after.positions()[0].x <= d);

    // Nonzero, equal and opposite
    let v0 = after.velocities()[0];
    let v1 = after.velocities()[1];
    assert!(v0.norm() > 0.0);
    assert!(v0.x > 0.0 && v1.x < 0.0);
    assert!((v0 + v1).norm() <= 1e-12 * v0.norm());
    assert!((v0.norm() - expected * p.dt).abs() <= 1e-6 * expected * p.dt);
}

#[test]
fn two_body_separation_decreases() {
    let p = Parameters { G: 1.0, softening: 0.01, dt: 0.01, ..test_params() };
    let sys = two_body_system(1.0, 1.0, 1.0);
    let after = advance(sys, &p, 1);

    let sep = (after.positions()[1] - after.positions()[0]).norm();
    assert!(sep < 1.0, "separation {sep}");
}

#[test]
fn single_particle_stays_put() {
    let start = NVec3::new(1.0, 2.0, 3.0);
    let sys = ParticleSystem::new(vec![start], vec![NVec3::zeros()], vec![4.0]).unwrap();
    let after = advance(sys, &test_params(), 100);

    assert_eq!(after.positions()[0], start);
    assert_eq!(after.velocities()[0], NVec3::zeros());
    assert_eq!(after.accelerations()[0], NVec3::zeros());
}

// ==================================================================================
// Integrator tests
// ==================================================================================

#[test]
fn zero_time_step_is_rejected() {
    let sys = two_body_system(1.0, 1.0, 1.0);
    let p = test_params();
    let res = kick_drift_kick(
        sys.positions(),
        sys.velocities(),
        sys.masses(),
        sys.accelerations(),
        0.0,
        &gravity(&p),
    );
    assert!(matches!(res, Err(SimError::Configuration(_))));
}

#[test]
fn step_does_not_mutate_its_input() {
    let p = test_params();
    let mut sys = two_body_system(1.0, 1.0, 2.0);
    sys.set_accelerations(accelerations(&gravity(&p), &sys)).unwrap();
    let copy = sys.clone();
    let next = leapfrog_step(&sys, &gravity(&p), &p).unwrap();

    assert_eq!(sys.positions(), copy.positions());
    assert_eq!(sys.velocities(), copy.velocities());
    assert_ne!(next.positions, copy.positions().to_vec());
    assert!((next.t - p.dt).abs() < 1e-18);
}

#[test]
fn one_force_evaluation_per_step() {
    let p = Parameters { num_steps: 25, ..test_params() };
    let calls = Arc::new(AtomicUsize::new(0));
    let forces = Counting { inner: gravity(&p), calls: calls.clone() };

    let mut driver = SimulationDriver::with_force_model(two_body_system(1.0, 1.0, 1.0), p, Box::new(forces)).unwrap();
    driver.run(&mut NoProgress).unwrap();

    // one for the initial acceleration, then one per step
    assert_eq!(calls.load(Ordering::SeqCst), 26);
}

#[test]
fn leapfrog_is_time_reversible() {
    let p = Parameters { G: 1.0, softening: 0.05, dt: 1e-3, ..test_params() };
    let forces = gravity(&p);

    let mut x = vec![NVec3::new(-0.5, 0.0, 0.0), NVec3::new(0.5, 0.0, 0.0), NVec3::new(0.0, 0.8, 0.1)];
    let mut v = vec![NVec3::new(0.0, -0.4, 0.0), NVec3::new(0.0, 0.4, 0.0), NVec3::new(0.3, 0.0, 0.0)];
    let m = vec![1.0, 1.0, 0.5];
    let mut a = forces.compute_accelerations(&x, &m).unwrap();
    let (x0, v0) = (x.clone(), v.clone());

    for _ in 0..500 {
        (x, v, a) = kick_drift_kick(&x, &v, &m, &a, p.dt, &forces).unwrap();
    }
    for _ in 0..500 {
        (x, v, a) = kick_drift_kick(&x, &v, &m, &a, -p.dt, &forces).unwrap();
    }

    for i in 0..3 {
        assert!((x[i] - x0[i]).norm() < 1e-9, "particle {i} drifted {:e}", (x[i] - x0[i]).norm());
        assert!((v[i] - v0[i]).norm() < 1e-9);
    }
}

#[test]
fn momentum_is_conserved() {
    let p = Parameters { G: 1.0, softening: 0.05, dt: 1e-3, num_steps: 2000, ..test_params() };
    let sys = ParticleSystem::new(
        vec![
            NVec3::new(0.0, 0.0, 0.0),
            NVec3::new(1.0, 0.2, -0.1),
            NVec3::new(-0.8, 0.5, 0.3),
            NVec3::new(0.1, -0.9, 0.6),
            NVec3::new(0.4, 0.4, -0.7),
        ],
        vec![
            NVec3::new(0.1, 0.0, 0.0),
            NVec3::new(0.0, 0.6, 0.0),
            NVec3::new(-0.2, -0.3, 0.1),
            NVec3::new(0.5, 0.0, -0.2),
            NVec3::new(0.0, 0.1, 0.4),
        ],
        vec![3.0, 1.0, 0.5, 2.0, 1.5],
    )
    .unwrap();

    let p0 = total_momentum(&sys);
    let scale = momentum_magnitude_sum(&sys);
    let com0 = center_of_mass(&sys);
    let total_mass: f64 = sys.masses().iter().sum();
    let after = advance(sys, &p, p.num_steps);
    let drift = (total_momentum(&after) - p0).norm();

    assert!(drift / scale < 1e-6, "relative momentum error {:e}", drift / scale);

    // Centre of mass coasts at P / M
    let expected = com0 + p0 * (after.time() / total_mass);
    let com_error = (center_of_mass(&after) - expected).norm();
    assert!(com_error < 1e-8, "centre of mass off its straight line by {:e}", com_error);
}

#[test]
fn energy_error_stays_bounded() {
    let p = Parameters { G: 1.0, softening: 0.01, dt: 1e-3, ..test_params() };
    let forces = gravity(&p);

    // Equal masses on an eccentric orbit about their common centre, started at apocentre
    let d: f64 = 1.0;
    let d2 = d * d + p.eps2();
    let a = p.G * d / (d2 * d2.sqrt());
    let v = 0.8 * (a * d / 2.0).sqrt();

    let mut sys = ParticleSystem::new(
        vec![NVec3::new(-d / 2.0, 0.0, 0.0), NVec3::new(d / 2.0, 0.0, 0.0)],
        vec![NVec3::new(0.0, -v, 0.0), NVec3::new(0.0, v, 0.0)],
        vec![1.0, 1.0],
    )
    .unwrap();
    sys.set_accelerations(accelerations(&forces, &sys)).unwrap();

    let e0 = total_energy(&sys, &p);
    let steps = 10_000;
    let mut errors = Vec::with_capacity(steps);
    let (mut x, mut vel, mut acc) = (sys.positions().to_vec(), sys.velocities().to_vec(), sys.accelerations().to_vec());

    for _ in 0..steps {
        (x, vel, acc) = kick_drift_kick(&x, &vel, sys.masses(), &acc, p.dt, &forces).unwrap();
        let now = ParticleSystem::new(x.clone(), vel.clone(), sys.masses().to_vec()).unwrap();
        errors.push(((total_energy(&now, &p) - e0) / e0).abs());
    }

    let worst = errors.iter().cloned().fold(0.0, f64::max);
    assert!(worst < 1e-4, "energy error {worst:e}");

    // No secular growth: the second half's envelope matches the first half's
    let (first, second) = errors.split_at(steps / 2);
    let first_max = first.iter().cloned().fold(0.0, f64::max);
    let second_max = second.iter().cloned().fold(0.0, f64::max);
    assert!(second_max < 2.0 * first_max + 1e-12, "{second_max:e} vs {first_max:e}");
}
