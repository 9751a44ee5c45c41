pub mod error;
pub mod simulation;
pub mod configuration;
pub mod initial;
pub mod output;
pub mod benchmark;
#[cfg(feature = "viewer")]
pub mod visualization;

pub use error::{SimError, SimResult};

pub use simulation::states::{NVec3, Particle, ParticleKind, ParticleSystem, Snapshot};
pub use simulation::params::Parameters;
pub use simulation::forces::{build_force_model, ForceModel, NewtonianGravity3, PairwiseGravity3, ParallelGravity3};
pub use simulation::integrator::{kick_drift_kick, leapfrog_step, StepState};
pub use simulation::driver::{run, DriverState, LogProgress, NoProgress, ProgressObserver, SimulationDriver};
pub use simulation::scenario::Scenario;

pub use configuration::config::{BodyConfig, GalaxyConfig, KernelConfig, ParametersConfig, ScenarioConfig};

pub use initial::galaxy::{create_galaxy, generate, Distribution, GalaxySpec};

pub use output::sink::{MemorySink, SnapshotSink};
pub use output::archive::{load_snapshots, save_snapshots, NpzArchive};

pub use benchmark::benchmark::{bench_forces, bench_leapfrog_curve};

#[cfg(feature = "viewer")]
pub use visualization::playback::run_playback;
