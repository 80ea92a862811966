//! Headless driver for the tidelock pendulum/PLL simulation.
//!
//! ```text
//! tidelock run --frames 2000 --speed 50 --json
//! tidelock example-config > tidelock.yaml
//! ```

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

use tidelock_core::prelude::*;

mod report;

use report::{Report, RunStats};

#[derive(Parser)]
#[command(author, version, about = "Headless driver for the tidelock pendulum/PLL simulation")]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the simulation for a number of frames and print a report
    Run(RunArgs),

    /// Print an example configuration file
    ExampleConfig,
}

#[derive(Args)]
struct RunArgs {
    /// Frames to simulate
    #[arg(long, default_value_t = 1000)]
    frames: u64,

    /// Integrator steps per frame (capped by the driver's step ceiling)
    #[arg(long)]
    speed: Option<f64>,

    /// Pendulum length in centimetres
    #[arg(long)]
    length_cm: Option<f64>,

    /// Bob mass in kilograms
    #[arg(long)]
    mass_kg: Option<f64>,

    /// Quality factor
    #[arg(long = "q")]
    q_factor: Option<f64>,

    /// Energy injected at each zero crossing, in joules
    #[arg(long)]
    impulse_j: Option<f64>,

    /// M2 modulation frequency in Hz
    #[arg(long)]
    lunar_hz: Option<f64>,

    /// PLL proportional gain
    #[arg(long)]
    gain: Option<f64>,

    /// Configuration file (otherwise the standard search path is used)
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn load_config(path: Option<&PathBuf>) -> Result<TidelockConfig> {
    match path {
        Some(path) => TidelockConfig::load_from(path).with_context(|| format!("loading {}", path.display())),
        None => TidelockConfig::load().context("loading configuration"),
    }
}

fn apply_overrides(sim: &mut SimulationCore, args: &RunArgs) -> Result<()> {
    if let Some(v) = args.length_cm {
        sim.set_length_cm(v).context("--length-cm")?;
    }
    if let Some(v) = args.mass_kg {
        sim.set_mass_kg(v).context("--mass-kg")?;
    }
    if let Some(v) = args.q_factor {
        sim.set_q_factor(v).context("--q")?;
    }
    if let Some(v) = args.impulse_j {
        sim.set_energy_impulse_j(v).context("--impulse-j")?;
    }
    if let Some(v) = args.lunar_hz {
        sim.set_lunar_freq_hz(v).context("--lunar-hz")?;
    }
    if let Some(v) = args.gain {
        sim.set_loop_gain(v).context("--gain")?;
    }
    if let Some(v) = args.speed {
        sim.set_simulation_speed(v).context("--speed")?;
    }
    Ok(())
}

fn run(args: RunArgs, verbose: u8) -> Result<()> {
    let config = load_config(args.config.as_ref())?;

    let mut logging = config.logging.clone();
    for _ in 0..verbose {
        logging.level = logging.level.more_verbose();
    }
    init_logging(&logging);

    let mut sim = SimulationCore::new(&config).context("building simulation")?;
    apply_overrides(&mut sim, &args)?;

    tracing::info!(
        frames = args.frames,
        steps_per_frame = sim.steps_per_frame(),
        natural_hz = sim.natural_frequency_hz(),
        "starting run"
    );

    let mut stats = RunStats::default();
    for frame in 0..args.frames {
        let report = sim
            .advance_frame()
            .with_context(|| format!("frame {frame} of {}", args.frames))?;
        stats.record(&report);
    }

    let report = Report::collect(&sim, stats).context("analyzing spectra")?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args, cli.verbose),
        Command::ExampleConfig => {
            print!("{}", TidelockConfig::example_yaml());
            Ok(())
        }
    }
}
