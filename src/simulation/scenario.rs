//! Build fully-initialized simulation scenarios from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces a runtime bundle
//! containing:
//! - numerical parameters (`Parameters`)
//! - system state (`ParticleSystem` with every particle at t = 0)
//!
//! Galaxies are generated first, in config order, from one `ChaCha8Rng`
//! seeded with `parameters.seed`; explicit bodies are appended after them.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::configuration::config::{BodyConfig, GalaxyConfig, ScenarioConfig};
use crate::error::{SimError, SimResult};
use crate::initial::galaxy::{create_galaxy, merger_pair, GalaxySpec};
use crate::simulation::params::Parameters;
use crate::simulation::states::{NVec3, Particle, ParticleKind, ParticleSystem};

/// Parameters plus initial state, ready to hand to a driver
#[derive(Debug, Clone)]
pub struct Scenario {
    pub parameters: Parameters,
    pub system: ParticleSystem,
}

impl Scenario {
    pub fn build_scenario(cfg: ScenarioConfig) -> SimResult<Self> {
        // Parameters (runtime) from ParametersConfig
        let p_cfg = cfg.parameters;
        let parameters = Parameters {
            G: p_cfg.G,
            softening: p_cfg.softening,
            dt: p_cfg.dt,
            num_steps: p_cfg.num_steps,
            snapshot_interval: p_cfg.snapshot_interval,
            max_acceleration: p_cfg.max_acceleration,
            kernel: p_cfg.kernel,
        };
        parameters.validate()?;

        // Galaxies: map `GalaxyConfig` -> `GalaxySpec` and generate in order
        let mut rng = ChaCha8Rng::seed_from_u64(p_cfg.seed);
        let mut system: Option<ParticleSystem> = None;
        for (i, g_cfg) in cfg.galaxies.iter().enumerate() {
            let spec = galaxy_spec(g_cfg).map_err(|e| context(e, &format!("galaxy {i}")))?;
            let galaxy = create_galaxy(&spec, &mut rng)?;
            info!("galaxy {i}: {} stars, {} dark matter", spec.stars, spec.dark_matter);
            append(&mut system, galaxy);
        }

        // Bodies: map `BodyConfig` -> `Particle` using nalgebra vectors
        if !cfg.bodies.is_empty() {
            let particles = cfg
                .bodies
                .iter()
                .enumerate()
                .map(|(i, b)| body_particle(b).map_err(|e| context(e, &format!("body {i}"))))
                .collect::<SimResult<Vec<_>>>()?;
            append(&mut system, ParticleSystem::from_particles(&particles)?);
        }

        let system = system.ok_or_else(|| SimError::Configuration("scenario has no galaxies and no bodies".into()))?;
        info!("scenario ready: {} particles", system.len());

        Ok(Self { parameters, system })
    }

    /// Two default galaxies on a collision course
    pub fn merger(parameters: Parameters, seed: u64) -> SimResult<Self> {
        parameters.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let [left, right] = merger_pair();
        let mut system = create_galaxy(&left, &mut rng)?;
        system.extend(create_galaxy(&right, &mut rng)?);
        Ok(Self { parameters, system })
    }
}

fn append(acc: &mut Option<ParticleSystem>, next: ParticleSystem) {
    match acc {
        Some(sys) => sys.extend(next),
        None => *acc = Some(next),
    }
}

fn galaxy_spec(cfg: &GalaxyConfig) -> SimResult<GalaxySpec> {
    Ok(GalaxySpec {
        center: vec3(&cfg.center, "center")?,
        velocity: vec3(&cfg.velocity, "velocity")?,
        stars: cfg.stars,
        dark_matter: cfg.dark_matter,
        star_mass: cfg.star_mass,
        dark_matter_mass: cfg.dark_matter_mass,
        radius: cfg.radius,
    })
}

fn body_particle(cfg: &BodyConfig) -> SimResult<Particle> {
    Ok(Particle {
        x: vec3(&cfg.x, "x")?,
        v: vec3(&cfg.v, "v")?,
        m: cfg.m,
        kind: ParticleKind::Body,
    })
}

/// Exactly three components, no implicit reshaping
fn vec3(values: &[f64], field: &str) -> SimResult<NVec3> {
    match values {
        [x, y, z] => Ok(NVec3::new(*x, *y, *z)),
        _ => Err(SimError::Configuration(format!(
            "`{field}` needs 3 components, got {}",
            values.len()
        ))),
    }
}

fn context(err: SimError, what: &str) -> SimError {
    match err {
        SimError::Configuration(msg) => SimError::Configuration(format!("{what}: {msg}")),
        other => other,
    }
}
