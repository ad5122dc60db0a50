//! Single-threaded cooperative pipeline
//!
//! Three stages run concurrently on a current-thread tokio runtime: read
//! locations, calculate distances, write records. Bounded channels connect
//! them, so a fast stage waits for a slow one instead of buffering without
//! limit. Dropping a sender closes the channel and ends the next stage.
//!
//! A stage only yields at channel operations and file I/O. Distance math is
//! CPU-bound and never yields, so this strategy shows scheduling behaviour,
//! not parallel speedup.

use std::path::{Path, PathBuf};

use log::{debug, info};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc::{channel, Receiver, Sender};

use crate::core::calculator::DistanceCalculator;
use crate::core::coordinates::Location;
use crate::core::error::{Error, Result};
use crate::core::executor::{DistanceRecord, Executor};
use crate::core::io::{encode_record, parse_line};
use crate::core::pairs::Pairing;
use crate::core::progress::Progress;

/// Counts from a file-to-file pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    pub locations: usize,
    pub records: usize,
}

pub struct CooperativeExecutor<C> {
    calculator: C,
    capacity: usize,
}

/// Sibling path that collects output until the pipeline succeeds
fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

/// Runtime for one pipeline run.
///
/// Must not be called from inside another tokio runtime.
fn runtime() -> Result<Runtime> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}

async fn feed(locations: &[Location], tx: Sender<Location>) -> Result<usize> {
    let mut sent = 0;
    for location in locations {
        if tx.send(location.clone()).await.is_err() {
            break;
        }
        sent += 1;
    }
    Ok(sent)
}

async fn read_file(path: &Path, tx: Sender<Location>) -> Result<usize> {
    let file = tokio::fs::File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    let mut line_no = 0u64;
    let mut record_line = 0u64;
    let mut pending = String::new();
    let mut sent = 0;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if pending.is_empty() {
            record_line = line_no;
        } else {
            pending.push('\n');
        }
        pending.push_str(&line);
        // An odd quote count means a quoted field continues on the next line
        if pending.matches('"').count() % 2 == 1 {
            continue;
        }

        let record = std::mem::take(&mut pending);
        let Some(location) = parse_line(&record, record_line)? else {
            continue;
        };
        if tx.send(location).await.is_err() {
            return Ok(sent);
        }
        sent += 1;
    }
    // Unterminated quote: let the CSV parser read it to end of input
    if !pending.is_empty() {
        if let Some(location) = parse_line(&pending, record_line)? {
            if tx.send(location).await.is_ok() {
                sent += 1;
            }
        }
    }

    info!("Read {sent} locations from {}", path.display());
    Ok(sent)
}

async fn collect(mut rx: Receiver<DistanceRecord>) -> Vec<DistanceRecord> {
    let mut records = Vec::new();
    while let Some(record) = rx.recv().await {
        records.push(record);
    }
    records
}

async fn write_file(path: &Path, mut rx: Receiver<DistanceRecord>) -> Result<usize> {
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);

    let mut written = 0;
    while let Some(record) = rx.recv().await {
        writer.write_all(&encode_record(&record)?).await?;
        written += 1;
    }
    writer.flush().await?;

    Ok(written)
}

impl<C: DistanceCalculator> CooperativeExecutor<C> {
    pub fn new(calculator: C, capacity: usize) -> Self {
        Self {
            calculator,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pair each arriving location with every location seen before it.
    ///
    /// A closed downstream channel ends the stage quietly; the downstream
    /// stage reports its own error.
    async fn calculate(
        &self,
        pairing: Pairing,
        mut rx: Receiver<Location>,
        tx: Sender<DistanceRecord>,
        progress: &Progress,
    ) -> Result<usize> {
        let mut seen: Vec<Location> = Vec::new();
        let mut emitted = 0;

        while let Some(location) = rx.recv().await {
            for earlier in &seen {
                let mut batch = vec![(earlier, &location)];
                if pairing == Pairing::Ordered {
                    batch.push((&location, earlier));
                }

                for (from, to) in batch {
                    let distance = self.calculator.distance(from.coordinates(), to.coordinates());
                    if tx.send(DistanceRecord::new(from, to, distance)).await.is_err() {
                        return Ok(emitted);
                    }
                    emitted += 1;
                    progress.advance(1);
                }
            }
            seen.push(location);
        }

        debug!(
            "Calculate stage paired {} locations into {emitted} records",
            seen.len()
        );
        Ok(emitted)
    }

    /// Stream `input` to `output` through the pipeline.
    ///
    /// Records go to a `.partial` sibling that is renamed over `output` only
    /// when every stage succeeded; on failure it is removed and `output` is
    /// left untouched.
    pub fn run_file(
        &self,
        input: &Path,
        output: &Path,
        pairing: Pairing,
        progress: &Progress,
    ) -> Result<PipelineStats> {
        let partial = partial_path(output);
        let runtime = runtime()?;
        let (location_tx, location_rx) = channel(self.capacity);
        let (record_tx, record_rx) = channel(self.capacity);

        let outcome = runtime.block_on(async {
            let (read, calculated, written) = tokio::join!(
                read_file(input, location_tx),
                self.calculate(pairing, location_rx, record_tx, progress),
                write_file(&partial, record_rx),
            );
            // Earliest stage wins: its failure is the cause of the others
            let locations = read?;
            calculated?;
            let records = written?;
            Ok::<_, Error>(PipelineStats { locations, records })
        });

        match outcome {
            Ok(stats) => {
                std::fs::rename(&partial, output)?;
                info!("Wrote {} records to {}", stats.records, output.display());
                Ok(stats)
            }
            Err(e) => {
                if partial.exists() {
                    let _ = std::fs::remove_file(&partial);
                }
                Err(e)
            }
        }
    }
}

impl<C> Executor for CooperativeExecutor<C>
where
    C: DistanceCalculator + Send + Sync,
{
    fn name(&self) -> &'static str {
        "cooperative"
    }

    /// Run the pipeline over an in-memory source and collector.
    ///
    /// Records come back in arrival order, not generator order.
    fn execute(
        &self,
        locations: &[Location],
        pairing: Pairing,
        progress: &Progress,
    ) -> Result<Vec<DistanceRecord>> {
        let runtime = runtime()?;
        let (location_tx, location_rx) = channel(self.capacity);
        let (record_tx, record_rx) = channel(self.capacity);

        runtime.block_on(async {
            let (fed, calculated, records) = tokio::join!(
                feed(locations, location_tx),
                self.calculate(pairing, location_rx, record_tx, progress),
                collect(record_rx),
            );
            fed?;
            calculated?;
            Ok::<_, Error>(records)
        })
    }
}
