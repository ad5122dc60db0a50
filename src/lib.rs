//! # Distance-matrix Library
//!
//! Pairwise distances between named locations, with the scheduling strategy
//! chosen once at startup.
//!
//! ## Features
//!
//! - **Validated input**: coordinates are range-checked when constructed
//! - **Two formulas**: haversine great-circle and equirectangular approximation
//! - **Six strategies**: sequential, thread-per-pair, worker pool, worker
//!   processes, a cooperative pipeline and whole-array evaluation
//! - **Progress tracking**: optional progress callbacks for custom UIs
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Distances for every ordered pair, in memory
//!     let records = distance_matrix::compute("cities.csv")?;
//!     println!("{} pairs", records.len());
//!
//!     // Read, compute and write output.csv next to the input
//!     distance_matrix::run("cities.csv", None)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Choosing a strategy
//!
//! ```rust,no_run
//! use distance_matrix::{MatrixOptions, Pairing, Strategy};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = MatrixOptions {
//!         strategy: "pool".parse::<Strategy>()?,
//!         pairing: Pairing::Unordered,
//!         workers: 4,
//!         ..Default::default()
//!     };
//!     let summary = distance_matrix::run_with_options("cities.csv", None, &options)?;
//!     println!("Wrote {} records", summary.records);
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};

use log::{info, warn};

// Re-export core types that users might need
pub use crate::core::calculator::{
    equirectangular, equirectangular_with, haversine, haversine_with, CalculatorKind,
    CalculatorSpec, DistanceCalculator, Equirectangular, Haversine, PairColumns,
    VectorizedCalculator, DEFAULT_EARTH_RADIUS_KM,
};
pub use crate::core::coordinates::{
    validate_latitude, validate_longitude, Coordinates, Location, MAX_LAT, MAX_LON, MIN_LAT,
    MIN_LON,
};
pub use crate::core::error::{CoordinateField, Error, Result, ValidationError};
pub use crate::core::executor::cooperative::PipelineStats;
pub use crate::core::executor::vectorized::LocationTable;
pub use crate::core::executor::{
    build_executor, CooperativeExecutor, DistanceRecord, Executor, PoolExecutor,
    ProcessExecutor, SequentialExecutor, Strategy, ThreadedExecutor, VectorizedExecutor,
};
pub use crate::core::io::{
    parse_line, read_locations, read_table, resolve_output_path, resolve_partition_dir,
    write_partitioned, write_records,
};
pub use crate::core::options::{MatrixOptions, DEFAULT_QUEUE_CAPACITY};
pub use crate::core::pairs::{ordered_pairs, pairs, unordered_pairs, PairIndices, Pairing, Pairs};
pub use crate::core::progress::{Progress, ProgressCallback};
pub use crate::core::worker::{
    run_worker, PairResult, PairTask, WorkerRequest, WorkerResponse, WORKER_FLAG,
};

// Internal modules
mod core;

/// What a file-to-file run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Locations read from the input
    pub locations: usize,
    /// Distance records written
    pub records: usize,
    /// Files written, one per partition for partitioned runs
    pub outputs: Vec<PathBuf>,
}

fn start_progress(options: &MatrixOptions, locations: usize, strategy: &str) -> Progress {
    if locations < 2 {
        warn!("Only {locations} location(s) in input, no pairs to compute");
    }
    let total = options.pairing.count(locations);
    info!(
        "Computing {total} {} pairs with the {strategy} strategy",
        options.pairing
    );
    Progress::new(options.progress.clone(), total)
}

/// Compute distances for every ordered pair of locations in a CSV file
///
/// Uses the sequential strategy and the haversine formula.
///
/// # Arguments
/// * `path` - Headerless CSV of `name,latitude,longitude` rows
pub fn compute(path: impl AsRef<Path>) -> Result<Vec<DistanceRecord>> {
    compute_with_options(path, &MatrixOptions::default())
}

/// Compute distances with custom options
///
/// The options are checked before the input is read.
///
/// # Examples
/// ```rust,no_run
/// use distance_matrix::{CalculatorKind, CalculatorSpec, MatrixOptions, Strategy};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let options = MatrixOptions {
///     strategy: Strategy::Threaded,
///     calculator: CalculatorSpec::new(CalculatorKind::Equirectangular, 6371.0)?,
///     progress: Some(Arc::new(|done, total| {
///         println!("Computed: {} / {}", done, total);
///     })),
///     ..Default::default()
/// };
///
/// let records = distance_matrix::compute_with_options("cities.csv", &options)?;
/// # Ok(())
/// # }
/// ```
pub fn compute_with_options(
    path: impl AsRef<Path>,
    options: &MatrixOptions,
) -> Result<Vec<DistanceRecord>> {
    let executor = build_executor(options)?;
    let locations = read_locations(path)?;
    let progress = start_progress(options, locations.len(), executor.name());
    executor.execute(&locations, options.pairing, &progress)
}

/// Read, compute and write in one call
///
/// # Arguments
/// * `input` - Headerless CSV of `name,latitude,longitude` rows
/// * `output` - Output file. If None, writes `output.csv` next to the input
pub fn run(input: impl AsRef<Path>, output: Option<&Path>) -> Result<RunSummary> {
    run_with_options(input, output, &MatrixOptions::default())
}

/// Read, compute and write with custom options
///
/// The cooperative strategy streams from file to file. The vectorized
/// strategy with `partitions` set writes numbered part files into `output`,
/// which then names a directory (default `output/` next to the input).
/// Nothing is written when any row is invalid.
pub fn run_with_options(
    input: impl AsRef<Path>,
    output: Option<&Path>,
    options: &MatrixOptions,
) -> Result<RunSummary> {
    let input = input.as_ref();
    options.validate()?;

    match (options.strategy, options.partitions) {
        (Strategy::Vectorized, Some(partitions)) => {
            let dir = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| resolve_partition_dir(input));
            let table = read_table(input)?;
            let progress = start_progress(options, table.len(), "vectorized");

            let parts = VectorizedExecutor::new(options.calculator).run_partitioned(
                &table,
                options.pairing,
                partitions,
                &progress,
            )?;
            let outputs = write_partitioned(&dir, &parts)?;
            info!("Wrote {} partitions to {}", outputs.len(), dir.display());

            Ok(RunSummary {
                locations: table.len(),
                records: parts.iter().map(Vec::len).sum(),
                outputs,
            })
        }
        (Strategy::Cooperative, _) => {
            let path = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| resolve_output_path(input));
            info!("Streaming {} pairs with the cooperative strategy", options.pairing);
            // The pair count is unknown until the input has been read
            let progress = Progress::new(options.progress.clone(), 0);

            let stats = CooperativeExecutor::new(options.calculator, options.queue_capacity)
                .run_file(input, &path, options.pairing, &progress)?;
            if stats.locations < 2 {
                warn!("Only {} location(s) in input, no pairs computed", stats.locations);
            }

            Ok(RunSummary {
                locations: stats.locations,
                records: stats.records,
                outputs: vec![path],
            })
        }
        _ => {
            let executor = build_executor(options)?;
            let locations = read_locations(input)?;
            let progress = start_progress(options, locations.len(), executor.name());
            let records = executor.execute(&locations, options.pairing, &progress)?;

            let path = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| resolve_output_path(input));
            write_records(&path, &records)?;

            Ok(RunSummary {
                locations: locations.len(),
                records: records.len(),
                outputs: vec![path],
            })
        }
    }
}
