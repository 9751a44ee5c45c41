//! Numerical and physical parameters for the simulation
//!
//! `Parameters` holds the immutable run settings:
//! - gravitational constant and softening length (`G`, `softening`),
//! - fixed step size, step count and snapshot interval,
//! - optional strict acceleration bound for the divergence guard,
//! - which force kernel evaluates the pairwise sum

use crate::configuration::config::KernelConfig;
use crate::error::{SimError, SimResult};

/// Gravitational constant in m^3 kg^-1 s^-2
pub const G_SI: f64 = 6.67430e-11;

/// Default step size in seconds (about 300k years)
pub const TIME_STEP: f64 = 1e13;

/// Default number of integration steps
pub const NUM_STEPS: usize = 10_000;

/// Default softening length in meters
pub const SOFTENING_LENGTH: f64 = 1e19;

/// Default number of steps between snapshots
pub const SNAPSHOT_INTERVAL: usize = 10;

#[allow(non_snake_case)]
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub G: f64, // gravitational constant
    pub softening: f64, // softening length epsilon (not squared)
    pub dt: f64, // fixed step size
    pub num_steps: usize, // steps per run
    pub snapshot_interval: usize, // steps between captures
    pub max_acceleration: Option<f64>, // strict divergence bound, off when None
    pub kernel: KernelConfig, // force kernel
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            G: G_SI,
            softening: SOFTENING_LENGTH,
            dt: TIME_STEP,
            num_steps: NUM_STEPS,
            snapshot_interval: SNAPSHOT_INTERVAL,
            max_acceleration: None,
            kernel: KernelConfig::Direct,
        }
    }
}

impl Parameters {
    /// Check every scalar before a run starts
    pub fn validate(&self) -> SimResult<()> {
        if !self.G.is_finite() {
            return Err(SimError::Configuration(format!("G must be finite, got {}", self.G)));
        }
        if !(self.softening.is_finite() && self.softening > 0.0) {
            return Err(SimError::Configuration(format!(
                "softening length must be positive, got {}",
                self.softening
            )));
        }
        if !self.dt.is_finite() || self.dt == 0.0 {
            return Err(SimError::Configuration(format!(
                "time step must be finite and non-zero, got {}",
                self.dt
            )));
        }
        if self.snapshot_interval < 1 {
            return Err(SimError::Configuration("snapshot interval must be at least 1".into()));
        }
        if let Some(bound) = self.max_acceleration {
            if !(bound.is_finite() && bound > 0.0) {
                return Err(SimError::Configuration(format!(
                    "max acceleration must be positive, got {bound}"
                )));
            }
        }
        Ok(())
    }

    /// Squared softening as it enters the force law
    pub fn eps2(&self) -> f64 {
        self.softening * self.softening
    }

    /// Number of snapshots a full run records, the step-0 capture included
    pub fn expected_snapshots(&self) -> usize {
        1 + self.num_steps / self.snapshot_interval.max(1)
    }
}
