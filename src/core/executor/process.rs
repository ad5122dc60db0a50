//! One OS process per chunk of pairs
//!
//! Pairs are split into contiguous chunks and each chunk is shipped, as
//! JSON, to a child running the same binary in worker mode. Every request is
//! serialized before the first child is spawned, so a configuration that
//! cannot cross the process boundary fails before any work starts.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use log::{debug, info};

use crate::core::calculator::CalculatorSpec;
use crate::core::coordinates::Location;
use crate::core::error::{Error, Result};
use crate::core::executor::{collect_indexed, DistanceRecord, Executor};
use crate::core::pairs::{pairs, Pairing};
use crate::core::progress::Progress;
use crate::core::worker::{PairTask, WorkerRequest, WorkerResponse, WORKER_FLAG};

pub struct ProcessExecutor {
    calculator: CalculatorSpec,
    workers: usize,
    program: Option<PathBuf>,
}

impl ProcessExecutor {
    /// Create an executor that spawns up to `workers` child processes.
    ///
    /// The radius must be finite: JSON cannot carry NaN or infinity, so such
    /// a calculator would not survive the trip to a worker.
    pub fn new(calculator: CalculatorSpec, workers: usize) -> Result<Self> {
        if !calculator.earth_radius().is_finite() {
            return Err(Error::Serialization(format!(
                "earth radius {} cannot be sent to a worker process",
                calculator.earth_radius()
            )));
        }
        Ok(Self {
            calculator,
            workers: workers.max(1),
            program: None,
        })
    }

    /// Use `program` instead of the running executable as the worker
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    fn program(&self) -> Result<PathBuf> {
        match &self.program {
            Some(program) => Ok(program.clone()),
            None => Ok(std::env::current_exe()?),
        }
    }

    /// Build and serialize one request per chunk
    fn encode_requests(&self, tasks: Vec<PairTask>) -> Result<Vec<(usize, Vec<u8>)>> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }
        let chunk_size = tasks.len().div_ceil(self.workers);

        tasks
            .chunks(chunk_size)
            .map(|chunk| -> Result<(usize, Vec<u8>)> {
                let request = WorkerRequest {
                    calculator: self.calculator,
                    tasks: chunk.to_vec(),
                };
                let payload = serde_json::to_vec(&request)?;
                Ok((chunk.len(), payload))
            })
            .collect()
    }
}

/// Run one worker process to completion and decode its answer
fn run_child(program: &Path, payload: &[u8], expected: usize) -> Result<WorkerResponse> {
    let mut child = Command::new(program)
        .arg(WORKER_FLAG)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| {
            Error::Worker(format!("failed to spawn {}: {e}", program.display()))
        })?;
    debug!("Spawned worker process {} for {expected} pairs", child.id());

    // The worker reads its whole request before writing, so writing
    // everything up front cannot deadlock on the stdout pipe.
    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(payload) {
            let id = child.id();
            drop(stdin);
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::Worker(format!(
                "failed to send tasks to worker {id}: {e}"
            )));
        }
    }

    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(Error::Worker(format!(
            "worker process exited with {}",
            output.status
        )));
    }

    let response: WorkerResponse = serde_json::from_slice(&output.stdout)
        .map_err(|e| Error::Worker(format!("unreadable worker response: {e}")))?;
    if response.results.len() != expected {
        return Err(Error::Worker(format!(
            "worker returned {} results for {expected} pairs",
            response.results.len()
        )));
    }

    Ok(response)
}

impl Executor for ProcessExecutor {
    fn name(&self) -> &'static str {
        "process"
    }

    fn execute(
        &self,
        locations: &[Location],
        pairing: Pairing,
        progress: &Progress,
    ) -> Result<Vec<DistanceRecord>> {
        let generator = pairs(locations, pairing);
        let index_pairs: Vec<(usize, usize)> = generator.indices().collect();
        let expected = index_pairs.len();

        let tasks: Vec<PairTask> = generator
            .enumerate()
            .map(|(index, (from, to))| PairTask {
                index,
                from: *from.coordinates(),
                to: *to.coordinates(),
            })
            .collect();

        let requests = self.encode_requests(tasks)?;
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let program = self.program()?;
        info!(
            "Dispatching {expected} pairs to {} worker process(es)",
            requests.len()
        );

        let responses: Vec<Result<WorkerResponse>> = thread::scope(|scope| {
            let handles: Vec<_> = requests
                .iter()
                .map(|(count, payload)| {
                    let program = program.as_path();
                    scope.spawn(move || -> Result<WorkerResponse> {
                        let response = run_child(program, payload, *count)?;
                        progress.advance(*count as u64);
                        Ok(response)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(Error::Worker("worker supervisor thread panicked".to_string()))
                    })
                })
                .collect()
        });

        let mut results = Vec::with_capacity(expected);
        for response in responses {
            for result in response?.results {
                let (i, j) = *index_pairs.get(result.index).ok_or_else(|| {
                    Error::Worker(format!("worker returned unknown pair index {}", result.index))
                })?;
                results.push((
                    result.index,
                    DistanceRecord::new(&locations[i], &locations[j], result.distance),
                ));
            }
        }

        collect_indexed(results, expected)
    }
}
