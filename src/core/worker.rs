//! Multi-process worker protocol
//!
//! The parent writes one JSON [`WorkerRequest`] to the worker's stdin and
//! closes it. The worker answers with one JSON [`WorkerResponse`] on stdout.
//! Only [`CalculatorSpec`] travels with the request, so the calculator a
//! worker runs is always reconstructible from primitive fields.

use std::io::{Read, Write};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::calculator::{CalculatorSpec, DistanceCalculator};
use crate::core::coordinates::Coordinates;
use crate::core::error::{Error, Result};

/// Flag that switches the binary into worker mode
pub const WORKER_FLAG: &str = "--worker";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairTask {
    pub index: usize,
    pub from: Coordinates,
    pub to: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairResult {
    pub index: usize,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub calculator: CalculatorSpec,
    pub tasks: Vec<PairTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub results: Vec<PairResult>,
}

impl WorkerRequest {
    /// Compute every task in the request
    pub fn handle(&self) -> WorkerResponse {
        let results = self
            .tasks
            .iter()
            .map(|task| PairResult {
                index: task.index,
                distance: self.calculator.distance(&task.from, &task.to),
            })
            .collect();
        WorkerResponse { results }
    }
}

/// Serve one request from `input` and write the response to `output`.
///
/// Returns the number of pairs computed.
pub fn run_worker<R: Read, W: Write>(mut input: R, mut output: W) -> Result<usize> {
    let mut buffer = Vec::new();
    input.read_to_end(&mut buffer)?;

    let request: WorkerRequest = serde_json::from_slice(&buffer).map_err(|e| {
        Error::Serialization(format!("worker could not decode request: {e}"))
    })?;
    debug!(
        "Worker {} received {} tasks",
        std::process::id(),
        request.tasks.len()
    );

    let response = request.handle();
    serde_json::to_writer(&mut output, &response)?;
    output.flush()?;

    Ok(response.results.len())
}
