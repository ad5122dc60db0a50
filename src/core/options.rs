//! Run configuration

use std::path::PathBuf;

use crate::core::calculator::CalculatorSpec;
use crate::core::error::{Error, Result};
use crate::core::executor::Strategy;
use crate::core::pairs::Pairing;
use crate::core::progress::ProgressCallback;

/// Default capacity of each cooperative pipeline queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Options for a distance-matrix run
#[derive(Clone)]
pub struct MatrixOptions {
    /// Execution strategy
    pub strategy: Strategy,

    /// Pairing convention, applied uniformly to every strategy
    pub pairing: Pairing,

    /// Formula and Earth radius
    pub calculator: CalculatorSpec,

    /// Worker threads (pool) or worker processes (process)
    pub workers: usize,

    /// Bound of each queue in the cooperative pipeline
    pub queue_capacity: usize,

    /// Split vectorized output into this many numbered part files
    pub partitions: Option<usize>,

    /// Program spawned for process workers, defaults to the running binary
    pub worker_program: Option<PathBuf>,

    /// Optional progress callback
    pub progress: Option<ProgressCallback>,
}

impl Default for MatrixOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            pairing: Pairing::default(),
            calculator: CalculatorSpec::default(),
            workers: num_cpus::get(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            partitions: None,
            worker_program: None,
            progress: None,
        }
    }
}

impl std::fmt::Debug for MatrixOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixOptions")
            .field("strategy", &self.strategy)
            .field("pairing", &self.pairing)
            .field("calculator", &self.calculator)
            .field("workers", &self.workers)
            .field("queue_capacity", &self.queue_capacity)
            .field("partitions", &self.partitions)
            .field("worker_program", &self.worker_program)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl MatrixOptions {
    /// Reject conflicting or degenerate settings before any work starts
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::InvalidInput(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(Error::InvalidInput(
                "queue capacity must be at least 1".to_string(),
            ));
        }
        match self.partitions {
            Some(0) => Err(Error::InvalidInput(
                "partitions must be at least 1".to_string(),
            )),
            Some(_) if self.strategy != Strategy::Vectorized => Err(Error::InvalidInput(format!(
                "partitions require the vectorized strategy, not '{}'",
                self.strategy
            ))),
            _ => Ok(()),
        }
    }
}
