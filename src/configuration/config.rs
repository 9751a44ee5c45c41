//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! simulation scenario. A scenario consists of:
//!
//! - [`ParametersConfig`] – numerical parameters and physical constants
//! - [`GalaxyConfig`]     – a generated galaxy (stellar disc + dark matter halo)
//! - [`BodyConfig`]       – initial state for an explicitly listed body
//! - [`ScenarioConfig`]   – top-level wrapper used to load a scenario from YAML
//!
//! # YAML format
//! The galaxy merger, two galaxies moving past each other:
//!
//! ```yaml
//! parameters:
//!   G: 6.67430e-11          # gravitational constant
//!   dt: 1.0e13              # fixed step size (s)
//!   num_steps: 10000        # number of steps
//!   softening: 1.0e19       # softening length epsilon (m), not squared
//!   snapshot_interval: 10   # steps between snapshots
//!   kernel: "direct"        # or "pairwise" / "parallel"
//!   seed: 42                # seed for galaxy generation
//!
//! galaxies:
//!   - center: [ -1.0e21, 0.0, 0.0 ]
//!     velocity: [ 0.0, 1.0e4, 0.0 ]
//!   - center: [ 1.0e21, 0.0, 0.0 ]
//!     velocity: [ 0.0, -1.0e4, 0.0 ]
//!     stars: 250
//!
//! bodies:
//!   - x: [ 0.0, 0.0, 0.0 ]
//!     v: [ 0.0, 0.0, 0.0 ]
//!     m: 1.0e36
//! ```
//!
//! Omitted galaxy fields fall back to the defaults in [`crate::initial::galaxy`].
//! The scenario builder maps this configuration into runtime types.

use serde::Deserialize;

use crate::initial::galaxy::{DM_PARTICLE_MASS, GALAXY_RADIUS, NUM_DM_PARTICLES, NUM_STARS, STAR_MASS};
use crate::simulation::params::{G_SI, NUM_STEPS, SNAPSHOT_INTERVAL, SOFTENING_LENGTH, TIME_STEP};

/// Which force kernel evaluates the pairwise sum
/// kernel: "direct"`, `"pairwise"` or `"parallel"`
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KernelConfig {
    #[default]
    #[serde(rename = "direct")] // ascending i, ascending j. Reference kernel, bit-reproducible
    Direct,

    #[serde(rename = "pairwise")] // each pair once, equal and opposite. Half the work, different rounding
    Pairwise,

    #[serde(rename = "parallel")] // direct kernel across the rayon pool, bit-identical to direct
    Parallel,
}

/// Global numerical and physical parameters for a scenario
#[allow(non_snake_case)]
#[derive(Deserialize, Debug, Clone)]
pub struct ParametersConfig {
    #[serde(default = "default_g")]
    pub G: f64, // gravitational constant
    #[serde(default = "default_dt")]
    pub dt: f64, // time step size
    #[serde(default = "default_num_steps")]
    pub num_steps: usize, // number of steps
    #[serde(default = "default_softening")]
    pub softening: f64, // softening - prevent singular forces at very small separations
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: usize, // steps between snapshots
    #[serde(default)]
    pub max_acceleration: Option<f64>, // strict divergence bound
    #[serde(default)]
    pub kernel: KernelConfig, // force kernel
    #[serde(default)]
    pub seed: u64, // deterministic seed to make runs reproducable
}

impl Default for ParametersConfig {
    fn default() -> Self {
        Self {
            G: G_SI,
            dt: TIME_STEP,
            num_steps: NUM_STEPS,
            softening: SOFTENING_LENGTH,
            snapshot_interval: SNAPSHOT_INTERVAL,
            max_acceleration: None,
            kernel: KernelConfig::Direct,
            seed: 0,
        }
    }
}

/// A generated galaxy
#[derive(Deserialize, Debug, Clone)]
pub struct GalaxyConfig {
    pub center: Vec<f64>, // galaxy centre
    pub velocity: Vec<f64>, // bulk velocity
    #[serde(default = "default_stars")]
    pub stars: usize, // stellar disc particles
    #[serde(default = "default_dark_matter")]
    pub dark_matter: usize, // halo particles
    #[serde(default = "default_star_mass")]
    pub star_mass: f64,
    #[serde(default = "default_dark_matter_mass")]
    pub dark_matter_mass: f64,
    #[serde(default = "default_radius")]
    pub radius: f64,
}

/// Configuration for a single body's initial state
#[derive(Deserialize, Debug, Clone)]
pub struct BodyConfig {
    pub x: Vec<f64>, // Initial position vector `x`
    pub v: Vec<f64>, // Initial velocity vector `v`
    pub m: f64,      // Mass of the body
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub parameters: ParametersConfig, // Global numerical and physical parameters
    #[serde(default)]
    pub galaxies: Vec<GalaxyConfig>, // Generated galaxies, in order
    #[serde(default)]
    pub bodies: Vec<BodyConfig>, // Explicit bodies, appended after the galaxies
}

fn default_g() -> f64 {
    G_SI
}

fn default_dt() -> f64 {
    TIME_STEP
}

fn default_num_steps() -> usize {
    NUM_STEPS
}

fn default_softening() -> f64 {
    SOFTENING_LENGTH
}

fn default_snapshot_interval() -> usize {
    SNAPSHOT_INTERVAL
}

fn default_stars() -> usize {
    NUM_STARS
}

fn default_dark_matter() -> usize {
    NUM_DM_PARTICLES
}

fn default_star_mass() -> f64 {
    STAR_MASS
}

fn default_dark_matter_mass() -> f64 {
    DM_PARTICLE_MASS
}

fn default_radius() -> f64 {
    GALAXY_RADIUS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_merger_scenario() {
        let yaml = r#"
parameters:
  G: 6.67430e-11
  dt: 1.0e13
  num_steps: 100
  softening: 1.0e19
  snapshot_interval: 10
  kernel: "parallel"
galaxies:
  - center: [ -1.0e21, 0.0, 0.0 ]
    velocity: [ 0.0, 1.0e4, 0.0 ]
  - center: [ 1.0e21, 0.0, 0.0 ]
    velocity: [ 0.0, -1.0e4, 0.0 ]
    stars: 250
"#;
        let cfg: ScenarioConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.parameters.num_steps, 100);
        assert_eq!(cfg.parameters.kernel, KernelConfig::Parallel);
        assert_eq!(cfg.galaxies.len(), 2);
        assert_eq!(cfg.galaxies[0].stars, NUM_STARS);
        assert_eq!(cfg.galaxies[1].stars, 250);
        assert_eq!(cfg.galaxies[1].dark_matter, NUM_DM_PARTICLES);
        assert!(cfg.bodies.is_empty());
    }

    #[test]
    fn missing_parameters_use_defaults() {
        let yaml = "bodies:\n  - x: [0.0, 0.0, 0.0]\n    v: [0.0, 0.0, 0.0]\n    m: 1.0\n";
        let cfg: ScenarioConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.parameters.dt, TIME_STEP);
        assert_eq!(cfg.parameters.snapshot_interval, SNAPSHOT_INTERVAL);
        assert_eq!(cfg.parameters.kernel, KernelConfig::Direct);
        assert_eq!(cfg.bodies.len(), 1);
    }

    #[test]
    fn unknown_kernel_is_rejected() {
        let yaml = "parameters:\n  kernel: \"tree\"\n";
        assert!(serde_yaml::from_str::<ScenarioConfig>(yaml).is_err());
    }
}
