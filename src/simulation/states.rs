//! Core state types for the N-body simulation.
//!
//! - `ParticleSystem` holds positions, velocities, masses, cached
//!   accelerations and a kind tag for N particles, all indexed alike
//! - `Particle` is a convenience record used to build a system one body at a time
//! - `Snapshot` is an immutable copy of the positions at a given step
//!
//! Construction is checked: every array must have the same length N >= 1,
//! masses must be positive, and no component may be NaN or infinite.

use nalgebra::Vector3;

use crate::error::{SimError, SimResult};

pub type NVec3 = Vector3<f64>;

/// What a particle represents. Only renderers look at this; the force law
/// treats every particle the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParticleKind {
    Star,
    DarkMatter,
    #[default]
    Body,
}

impl ParticleKind {
    /// Tag written to snapshot archives
    pub fn code(self) -> u8 {
        match self {
            ParticleKind::Star => 0,
            ParticleKind::DarkMatter => 1,
            ParticleKind::Body => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ParticleKind::Star),
            1 => Some(ParticleKind::DarkMatter),
            2 => Some(ParticleKind::Body),
            _ => None,
        }
    }
}

/// Initial state of a single particle
#[derive(Debug, Clone)]
pub struct Particle {
    pub x: NVec3, // position
    pub v: NVec3, // velocity
    pub m: f64, // mass
    pub kind: ParticleKind,
}

/// State container for N particles
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    positions: Vec<NVec3>,
    velocities: Vec<NVec3>,
    masses: Vec<f64>,
    accelerations: Vec<NVec3>,
    kinds: Vec<ParticleKind>,
    t: f64, // simulation time
}

impl ParticleSystem {
    /// Build a system from parallel arrays. Accelerations start at zero and
    /// every particle is tagged `ParticleKind::Body`.
    pub fn new(positions: Vec<NVec3>, velocities: Vec<NVec3>, masses: Vec<f64>) -> SimResult<Self> {
        let n = positions.len();
        let kinds = vec![ParticleKind::Body; n];
        Self::with_kinds(positions, velocities, masses, kinds)
    }

    /// Build a system from parallel arrays with explicit kind tags
    pub fn with_kinds(
        positions: Vec<NVec3>,
        velocities: Vec<NVec3>,
        masses: Vec<f64>,
        kinds: Vec<ParticleKind>,
    ) -> SimResult<Self> {
        let n = positions.len();
        if n == 0 {
            return Err(SimError::Configuration("particle system must hold at least one particle".into()));
        }
        if velocities.len() != n || masses.len() != n || kinds.len() != n {
            return Err(SimError::Configuration(format!(
                "array lengths differ: {} positions, {} velocities, {} masses, {} kinds",
                n,
                velocities.len(),
                masses.len(),
                kinds.len()
            )));
        }
        if let Some(i) = masses.iter().position(|m| !(m.is_finite() && *m > 0.0)) {
            return Err(SimError::Configuration(format!(
                "mass of particle {i} must be positive and finite, got {}",
                masses[i]
            )));
        }
        if let Some(i) = first_non_finite(&positions) {
            return Err(SimError::Configuration(format!("position of particle {i} is not finite")));
        }
        if let Some(i) = first_non_finite(&velocities) {
            return Err(SimError::Configuration(format!("velocity of particle {i} is not finite")));
        }

        Ok(Self {
            positions,
            velocities,
            masses,
            accelerations: vec![NVec3::zeros(); n],
            kinds,
            t: 0.0,
        })
    }

    /// Build a system from a list of particles
    pub fn from_particles(particles: &[Particle]) -> SimResult<Self> {
        Self::with_kinds(
            particles.iter().map(|p| p.x).collect(),
            particles.iter().map(|p| p.v).collect(),
            particles.iter().map(|p| p.m).collect(),
            particles.iter().map(|p| p.kind).collect(),
        )
    }

    /// Append every particle of `other` after the particles of `self`
    pub fn extend(&mut self, other: ParticleSystem) {
        self.positions.extend(other.positions);
        self.velocities.extend(other.velocities);
        self.masses.extend(other.masses);
        self.accelerations.extend(other.accelerations);
        self.kinds.extend(other.kinds);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always false for a constructed system, kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[NVec3] {
        &self.positions
    }

    pub fn velocities(&self) -> &[NVec3] {
        &self.velocities
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn accelerations(&self) -> &[NVec3] {
        &self.accelerations
    }

    pub fn kinds(&self) -> &[ParticleKind] {
        &self.kinds
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    /// Replace the cached accelerations. Length must match N.
    pub fn set_accelerations(&mut self, accelerations: Vec<NVec3>) -> SimResult<()> {
        if accelerations.len() != self.len() {
            return Err(SimError::Configuration(format!(
                "expected {} accelerations, got {}",
                self.len(),
                accelerations.len()
            )));
        }
        self.accelerations = accelerations;
        Ok(())
    }

    /// Install a fully computed step: new positions, velocities, accelerations
    /// and the advanced time. Callers validate before committing.
    pub(crate) fn commit(&mut self, positions: Vec<NVec3>, velocities: Vec<NVec3>, accelerations: Vec<NVec3>, t: f64) {
        debug_assert_eq!(positions.len(), self.len());
        debug_assert_eq!(velocities.len(), self.len());
        debug_assert_eq!(accelerations.len(), self.len());
        self.positions = positions;
        self.velocities = velocities;
        self.accelerations = accelerations;
        self.t = t;
    }

    /// Immutable copy of the current positions tagged with `step`
    pub fn snapshot(&self, step: usize) -> Snapshot {
        Snapshot {
            step,
            positions: self.positions.clone(),
        }
    }
}

/// Positions of every particle at one sampled step
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    step: usize,
    positions: Vec<NVec3>,
}

impl Snapshot {
    pub fn new(step: usize, positions: Vec<NVec3>) -> Self {
        Self { step, positions }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn positions(&self) -> &[NVec3] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Index of the first vector with a NaN or infinite component
pub(crate) fn first_non_finite(values: &[NVec3]) -> Option<usize> {
    values.iter().position(|v| !v.iter().all(|c| c.is_finite()))
}
