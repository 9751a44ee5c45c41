//! Initial conditions for a galaxy: a thin rotating stellar disc plus a
//! spherical dark matter halo
//!
//! All draws come from a caller-supplied RNG, so a seeded `ChaCha8Rng`
//! reproduces the same galaxy on every run.

use std::f64::consts::PI;

use rand::Rng;

use crate::error::SimResult;
use crate::simulation::params::G_SI;
use crate::simulation::states::{NVec3, ParticleKind, ParticleSystem};

/// Star particles per galaxy
pub const NUM_STARS: usize = 500;

/// Dark matter halo particles per galaxy
pub const NUM_DM_PARTICLES: usize = 1000;

/// One solar mass per star particle (kg)
pub const STAR_MASS: f64 = 2e30;

/// Halo particles are heavier to mimic the halo mass (kg)
pub const DM_PARTICLE_MASS: f64 = 1e32;

/// Roughly 50,000 light years (m)
pub const GALAXY_RADIUS: f64 = 5e20;

/// Disc half-thickness as a fraction of the radius
const DISC_THICKNESS: f64 = 0.05;

/// Softening of the circular velocity estimate near the centre (m)
const CIRCULAR_VELOCITY_SOFTENING: f64 = 1e18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    StellarDisc,
    DarkMatterHalo,
}

/// Everything needed to generate one galaxy
#[derive(Debug, Clone)]
pub struct GalaxySpec {
    pub center: NVec3,
    pub velocity: NVec3, // bulk velocity
    pub stars: usize,
    pub dark_matter: usize,
    pub star_mass: f64,
    pub dark_matter_mass: f64,
    pub radius: f64,
}

impl GalaxySpec {
    pub fn new(center: NVec3, velocity: NVec3) -> Self {
        Self {
            center,
            velocity,
            stars: NUM_STARS,
            dark_matter: NUM_DM_PARTICLES,
            star_mass: STAR_MASS,
            dark_matter_mass: DM_PARTICLE_MASS,
            radius: GALAXY_RADIUS,
        }
    }
}

/// Raw arrays for one population
#[derive(Debug, Clone, Default)]
pub struct Population {
    pub positions: Vec<NVec3>,
    pub velocities: Vec<NVec3>,
    pub masses: Vec<f64>,
}

/// Generate `count` particles of one distribution around `center`
pub fn generate<R: Rng + ?Sized>(
    center: NVec3,
    velocity: NVec3,
    count: usize,
    kind: Distribution,
    mass: f64,
    radius: f64,
    rng: &mut R,
) -> Population {
    match kind {
        Distribution::StellarDisc => stellar_disc(center, velocity, count, mass, radius, rng),
        Distribution::DarkMatterHalo => dark_matter_halo(center, velocity, count, mass, radius, rng),
    }
}

/// Flat rotating disc: area-uniform radius, uniform angle, thin vertical jitter,
/// tangential speed from the enclosed disc mass
fn stellar_disc<R: Rng + ?Sized>(center: NVec3, velocity: NVec3, count: usize, mass: f64, radius: f64, rng: &mut R) -> Population {
    let mut out = Population {
        positions: Vec::with_capacity(count),
        velocities: Vec::with_capacity(count),
        masses: vec![mass; count],
    };

    for _ in 0..count {
        let r = radius * rng.gen::<f64>().sqrt();
        let theta = 2.0 * PI * rng.gen::<f64>();

        let x = r * theta.cos();
        let y = r * theta.sin();
        let z = radius * DISC_THICKNESS * (rng.gen::<f64>() - 0.5);
        out.positions.push(NVec3::new(x, y, z) + center);

        let v_circ = (G_SI * mass * count as f64 / (r + CIRCULAR_VELOCITY_SOFTENING)).sqrt();
        let v = NVec3::new(-v_circ * theta.sin(), v_circ * theta.cos(), 0.0);
        out.velocities.push(v + velocity);
    }

    out
}

/// Volume-uniform sphere, no spin: every particle carries the bulk velocity
fn dark_matter_halo<R: Rng + ?Sized>(center: NVec3, velocity: NVec3, count: usize, mass: f64, radius: f64, rng: &mut R) -> Population {
    let mut out = Population {
        positions: Vec::with_capacity(count),
        velocities: vec![velocity; count],
        masses: vec![mass; count],
    };

    for _ in 0..count {
        let r = radius * rng.gen::<f64>().cbrt();
        let theta = (1.0 - 2.0 * rng.gen::<f64>()).acos();
        let phi = 2.0 * PI * rng.gen::<f64>();

        let x = r * theta.sin() * phi.cos();
        let y = r * theta.sin() * phi.sin();
        let z = r * theta.cos();
        out.positions.push(NVec3::new(x, y, z) + center);
    }

    out
}

/// Disc particles first, then halo particles, tagged by kind
pub fn create_galaxy<R: Rng + ?Sized>(spec: &GalaxySpec, rng: &mut R) -> SimResult<ParticleSystem> {
    let disc = generate(
        spec.center,
        spec.velocity,
        spec.stars,
        Distribution::StellarDisc,
        spec.star_mass,
        spec.radius,
        rng,
    );
    let halo = generate(
        spec.center,
        spec.velocity,
        spec.dark_matter,
        Distribution::DarkMatterHalo,
        spec.dark_matter_mass,
        spec.radius,
        rng,
    );

    let mut kinds = vec![ParticleKind::Star; disc.masses.len()];
    kinds.extend(std::iter::repeat(ParticleKind::DarkMatter).take(halo.masses.len()));

    let Population { mut positions, mut velocities, mut masses } = disc;
    positions.extend(halo.positions);
    velocities.extend(halo.velocities);
    masses.extend(halo.masses);

    ParticleSystem::with_kinds(positions, velocities, masses, kinds)
}

/// The classic head-on pair: one galaxy at -1e21 m drifting +y, one at +1e21 m drifting -y
pub fn merger_pair() -> [GalaxySpec; 2] {
    [
        GalaxySpec::new(NVec3::new(-1e21, 0.0, 0.0), NVec3::new(0.0, 1e4, 0.0)),
        GalaxySpec::new(NVec3::new(1e21, 0.0, 0.0), NVec3::new(0.0, -1e4, 0.0)),
    ]
}
