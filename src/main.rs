use galsim::{bench_forces, bench_leapfrog_curve};
use galsim::{LogProgress, NpzArchive, Parameters, Scenario, ScenarioConfig, SimulationDriver};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "galsim")]
#[command(about = "Direct-summation N-body galaxy merger simulator")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scenario and write its snapshots to an .npz archive
    Run {
        /// Scenario YAML, looked up under scenarios/ when not found as given.
        /// Without one, the default two-galaxy merger runs.
        #[arg(short, long)]
        file_name: Option<String>,

        /// Output archive
        #[arg(short, long, default_value = "galaxy_merge_data.npz")]
        output: PathBuf,

        /// Log progress every this many steps
        #[arg(long, default_value_t = 100)]
        progress_every: usize,
    },

    /// Time the force kernels
    Bench {
        /// Largest particle count
        #[arg(long, default_value_t = 3200)]
        max_n: usize,

        /// Print a CSV curve of leapfrog step times instead of a table
        #[arg(long)]
        curve: bool,
    },

    /// Play back an archive in a 3D viewer
    #[cfg(feature = "viewer")]
    View {
        #[arg(default_value = "galaxy_merge_data.npz")]
        archive: PathBuf,
    },
}

// resolve here to keep main clean
fn scenario_path(file_name: &str) -> PathBuf {
    let given = PathBuf::from(file_name);
    if given.exists() {
        return given;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name)
}

fn load_scenario_from_yaml(path: &Path) -> Result<ScenarioConfig> {
    let file = File::open(path).with_context(|| format!("opening scenario {}", path.display()))?;
    let reader = BufReader::new(file);
    let scenario_cfg: ScenarioConfig = serde_yaml::from_reader(reader)
        .with_context(|| format!("parsing scenario {}", path.display()))?;
    Ok(scenario_cfg)
}

fn run(file_name: Option<String>, output: PathBuf, progress_every: usize) -> Result<()> {
    let scenario = match file_name {
        Some(name) => {
            let path = scenario_path(&name);
            info!("loading scenario {}", path.display());
            Scenario::build_scenario(load_scenario_from_yaml(&path)?)?
        }
        None => Scenario::merger(Parameters::default(), 0)?,
    };

    let kinds = scenario.system.kinds().to_vec();
    let mut sink = NpzArchive::new(&output, kinds);
    let mut driver = SimulationDriver::new(scenario.system, scenario.parameters)?;
    let mut progress = LogProgress { every: progress_every };

    let state = driver.run_and_persist(&mut progress, &mut sink)?;
    info!("{:?}: data saved to {}", state, sink.path().display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    match args.command {
        Command::Run { file_name, output, progress_every } => run(file_name, output, progress_every)?,
        Command::Bench { max_n, curve } => {
            if curve {
                bench_leapfrog_curve(max_n, 200);
            } else {
                let ns: Vec<usize> = std::iter::successors(Some(200), |n| Some(n * 2))
                    .take_while(|n| *n <= max_n)
                    .collect();
                bench_forces(&ns);
            }
        }
        #[cfg(feature = "viewer")]
        Command::View { archive } => {
            let loaded = galsim::load_snapshots(&archive)?;
            galsim::run_playback(loaded);
        }
    }

    Ok(())
}
