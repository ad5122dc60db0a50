//! # Distance-matrix CLI
//!
//! Command-line interface for the distance-matrix library.
//! Reads a CSV of named coordinates and writes the distance for every pair.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use distance_matrix::{
    CalculatorKind, CalculatorSpec, MatrixOptions, Pairing, Strategy, DEFAULT_EARTH_RADIUS_KM,
    DEFAULT_QUEUE_CAPACITY,
};
use log::{debug, error};

mod cli;

/// Command-line interface for distance-matrix
#[derive(Parser)]
#[command(name = "distance-matrix")]
#[command(about = "Pairwise distances between CSV locations with pluggable execution strategies")]
#[command(long_about = "Computes the distance between every pair of locations in a CSV file:
  distance-matrix cities.csv                        # Sequential, writes output.csv next to input
  distance-matrix cities.csv out.csv -s pool -w 8   # Eight pool workers
  distance-matrix cities.csv -s process             # One worker process per chunk
  distance-matrix cities.csv -s vectorized --partitions 4

Input rows are name,latitude,longitude with no header.
Output rows are origin,destination,distance in kilometres with no header.

Strategies:
  sequential, threaded, pool, process (multiprocess), cooperative (async), vectorized")]
#[command(version = env!("DISTANCE_MATRIX_VERSION"))]
struct Cli {
    /// Input CSV file of name,latitude,longitude rows
    #[arg(required_unless_present = "worker")]
    input: Option<PathBuf>,

    /// Output file, or directory for --partitions (defaults next to the input)
    output: Option<PathBuf>,

    /// Execution strategy
    #[arg(short, long, default_value_t = Strategy::Sequential)]
    strategy: Strategy,

    /// Pair convention: "ordered" (A→B and B→A) or "unordered" (A→B only)
    #[arg(long, default_value_t = Pairing::Ordered)]
    pairing: Pairing,

    /// Distance formula: "haversine" or "equirectangular"
    #[arg(short, long, default_value_t = CalculatorKind::Haversine)]
    formula: CalculatorKind,

    /// Mean Earth radius in kilometres
    #[arg(long, default_value_t = DEFAULT_EARTH_RADIUS_KM)]
    earth_radius: f64,

    /// Worker threads (pool) or worker processes (process), defaults to CPU count
    #[arg(short, long)]
    workers: Option<usize>,

    /// Bound of each queue in the cooperative pipeline
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Split vectorized output into this many numbered files
    #[arg(long)]
    partitions: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Show a progress bar
    #[arg(long)]
    progress: bool,

    /// Serve one batch of pairs on stdin/stdout (used by the process strategy)
    #[arg(long, hide = true)]
    worker: bool,
}

fn main() {
    if let Err(e) = run() {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.worker {
        let served = distance_matrix::run_worker(io::stdin().lock(), io::stdout().lock())
            .context("worker could not serve its batch")?;
        debug!("Worker {} served {served} pairs", std::process::id());
        return Ok(());
    }

    let input = cli.input.as_deref().context("no input file given")?;

    if cli.verbose {
        eprintln!(
            "📏 Distance-matrix v{} starting...",
            env!("DISTANCE_MATRIX_VERSION")
        );
    }

    let mut options = MatrixOptions {
        strategy: cli.strategy,
        pairing: cli.pairing,
        calculator: CalculatorSpec::new(cli.formula, cli.earth_radius)?,
        queue_capacity: cli.queue_capacity,
        partitions: cli.partitions,
        ..Default::default()
    };
    if let Some(workers) = cli.workers {
        options.workers = workers;
    }

    if cli.verbose {
        eprintln!(
            "⚙️  Strategy: {}, pairing: {}, formula: {} (R = {} km)",
            options.strategy,
            options.pairing,
            options.calculator.kind(),
            options.calculator.earth_radius()
        );
    }

    let progress_manager = cli
        .progress
        .then(|| cli::ProgressManager::new(&format!("🧮 Computing distances for {}", input.display())));
    if let Some(manager) = &progress_manager {
        let pb = manager.pb.clone();
        options.progress = Some(Arc::new(move |done, total| {
            if total > 0 && pb.length() != Some(total) {
                pb.set_length(total);
            }
            pb.set_position(done);
        }));
    }

    let summary = distance_matrix::run_with_options(input, cli.output.as_deref(), &options)?;

    if let Some(manager) = progress_manager {
        manager.pb.finish_with_message("✅ Done");
    }
    for path in &summary.outputs {
        eprintln!("📁 Saved to: {}", path.display());
    }
    eprintln!(
        "✅ {} records from {} locations",
        summary.records, summary.locations
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use distance_matrix::WORKER_FLAG;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["distance-matrix", "cities.csv"]).unwrap();
        assert_eq!(cli.strategy, Strategy::Sequential);
        assert_eq!(cli.pairing, Pairing::Ordered);
        assert_eq!(cli.formula, CalculatorKind::Haversine);
        assert_eq!(cli.earth_radius, DEFAULT_EARTH_RADIUS_KM);
        assert!(cli.output.is_none());
        assert!(cli.workers.is_none());
    }

    #[test]
    fn test_strategy_aliases() {
        let cli =
            Cli::try_parse_from(["distance-matrix", "cities.csv", "--strategy", "async"]).unwrap();
        assert_eq!(cli.strategy, Strategy::Cooperative);
    }

    #[test]
    fn test_unknown_strategy_suggests() {
        let err = Cli::try_parse_from(["distance-matrix", "cities.csv", "-s", "threded"])
            .err()
            .unwrap();
        assert!(err.to_string().contains("Did you mean 'threaded'?"));
    }

    #[test]
    fn test_worker_flag_needs_no_input() {
        let cli = Cli::try_parse_from(["distance-matrix", WORKER_FLAG]).unwrap();
        assert!(cli.worker);
        assert!(cli.input.is_none());
    }

    #[test]
    fn test_input_required_otherwise() {
        assert!(Cli::try_parse_from(["distance-matrix"]).is_err());
    }
}
