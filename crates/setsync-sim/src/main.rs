//! `setsync-sim` command line entry point.

use clap::{Parser, Subcommand};
use setsync_sim::{Scenario, ScenarioRunner, SimResult};
use setsync_store::PersistentStore;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "setsync-sim", version, about = "Replay setting synchronization scenarios")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file.
    Run {
        /// Path to the YAML scenario.
        scenario: PathBuf,

        /// Override the link seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Override the command drop probability.
        #[arg(long)]
        drop_rate: Option<f64>,

        /// Persist offline settings in this JSON file.
        #[arg(long)]
        store: Option<PathBuf>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn run(
    path: PathBuf,
    seed: Option<u64>,
    drop_rate: Option<f64>,
    store_path: Option<PathBuf>,
    json: bool,
) -> SimResult<()> {
    let mut scenario = Scenario::load(&path)?;
    if let Some(seed) = seed {
        scenario.seed = seed;
    }
    if let Some(drop_rate) = drop_rate {
        scenario.drop_rate = drop_rate;
    }
    let store = match &store_path {
        Some(path) => PersistentStore::open(path)?,
        None => PersistentStore::in_memory(),
    };

    let mut runner = ScenarioRunner::from_scenario(&scenario, store)?;
    let report = runner.run(&scenario)?;
    runner.controller().save_store()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }
    info!("scenario '{}' passed", scenario.name);
    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    setsync_metrics::describe_metrics();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            scenario,
            seed,
            drop_rate,
            store,
            json,
        } => run(scenario, seed, drop_rate, store, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
