//! One OS thread per pair
//!
//! Maximum dispatch, maximum overhead: every pair pays for a thread spawn.
//! Kept as the contrast case for the pool. Threads are started in waves of
//! at most `max_live` so large inputs stay under the OS thread limit.

use std::thread;

use crossbeam_channel::unbounded;
use log::debug;

use crate::core::calculator::DistanceCalculator;
use crate::core::coordinates::Location;
use crate::core::error::{Error, Result};
use crate::core::executor::{collect_indexed, DistanceRecord, Executor};
use crate::core::pairs::{pairs, Pairing};
use crate::core::progress::Progress;

/// Pair threads alive at once
pub const DEFAULT_MAX_LIVE_THREADS: usize = 256;

pub struct ThreadedExecutor<C> {
    calculator: C,
    max_live: usize,
    stack_size: Option<usize>,
}

impl<C: DistanceCalculator> ThreadedExecutor<C> {
    pub fn new(calculator: C) -> Self {
        Self {
            calculator,
            max_live: DEFAULT_MAX_LIVE_THREADS,
            stack_size: None,
        }
    }

    /// Cap how many pair threads run at the same time
    pub fn with_max_live_threads(mut self, max_live: usize) -> Self {
        self.max_live = max_live.max(1);
        self
    }

    /// Stack size for each pair thread, in bytes
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    fn builder(&self) -> thread::Builder {
        let builder = thread::Builder::new();
        match self.stack_size {
            Some(size) => builder.stack_size(size),
            None => builder,
        }
    }
}

impl<C> Executor for ThreadedExecutor<C>
where
    C: DistanceCalculator + Send + Sync,
{
    fn name(&self) -> &'static str {
        "threaded"
    }

    fn execute(
        &self,
        locations: &[Location],
        pairing: Pairing,
        progress: &Progress,
    ) -> Result<Vec<DistanceRecord>> {
        let generator = pairs(locations, pairing);
        let expected = generator.len();
        let (tx, rx) = unbounded::<(usize, DistanceRecord)>();
        let calculator = &self.calculator;
        let mut tasks = generator.enumerate();

        let outcome = thread::scope(|scope| -> Result<usize> {
            let mut panicked = 0;
            let mut waves = 0;
            loop {
                let mut handles = Vec::with_capacity(self.max_live.min(expected));
                let mut spawn_error = None;

                for (index, (from, to)) in tasks.by_ref().take(self.max_live) {
                    let tx = tx.clone();
                    let spawned = self.builder().spawn_scoped(scope, move || {
                        let distance = calculator.distance(from.coordinates(), to.coordinates());
                        // Receiver outlives the scope, send cannot fail here
                        let _ = tx.send((index, DistanceRecord::new(from, to, distance)));
                        progress.advance(1);
                    });
                    match spawned {
                        Ok(handle) => handles.push(handle),
                        Err(e) => {
                            spawn_error = Some(e);
                            break;
                        }
                    }
                }

                if handles.is_empty() && spawn_error.is_none() {
                    break;
                }
                // Joined before returning: an unjoined panicked thread would
                // make the scope itself panic
                for handle in handles {
                    if handle.join().is_err() {
                        panicked += 1;
                    }
                }
                if let Some(e) = spawn_error {
                    return Err(Error::Worker(format!("failed to spawn pair thread: {e}")));
                }
                waves += 1;
            }
            debug!("Ran {expected} pair threads in {waves} wave(s)");
            Ok(panicked)
        });
        drop(tx);

        let panicked = outcome?;
        if panicked > 0 {
            return Err(Error::Worker(format!("{panicked} pair thread(s) panicked")));
        }

        collect_indexed(rx.iter(), expected)
    }
}
