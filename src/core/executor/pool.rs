//! Fixed-size worker pool
//!
//! `workers` threads drain one bounded queue of pending pairs. Each task is
//! received by exactly one worker; results come back tagged with the pair
//! index and are put back in generator order.

use std::thread;

use crossbeam_channel::{bounded, unbounded};
use log::{debug, warn};

use crate::core::calculator::DistanceCalculator;
use crate::core::coordinates::Location;
use crate::core::error::{Error, Result};
use crate::core::executor::{collect_indexed, DistanceRecord, Executor};
use crate::core::pairs::{pairs, Pairing};
use crate::core::progress::Progress;

/// Pending tasks allowed per worker before the producer blocks
const QUEUE_DEPTH_PER_WORKER: usize = 256;

pub struct PoolExecutor<C> {
    calculator: C,
    workers: usize,
}

impl<C: DistanceCalculator> PoolExecutor<C> {
    pub fn new(calculator: C, workers: usize) -> Self {
        Self {
            calculator,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl<C> Executor for PoolExecutor<C>
where
    C: DistanceCalculator + Send + Sync,
{
    fn name(&self) -> &'static str {
        "pool"
    }

    fn execute(
        &self,
        locations: &[Location],
        pairing: Pairing,
        progress: &Progress,
    ) -> Result<Vec<DistanceRecord>> {
        let generator = pairs(locations, pairing);
        let expected = generator.len();
        let calculator = &self.calculator;

        let (task_tx, task_rx) = bounded::<(usize, &Location, &Location)>(
            self.workers * QUEUE_DEPTH_PER_WORKER,
        );
        let (result_tx, result_rx) = unbounded::<(usize, DistanceRecord)>();

        let failed_workers = thread::scope(|scope| {
            let handles: Vec<_> = (0..self.workers)
                .map(|worker_id| {
                    let tasks = task_rx.clone();
                    let results = result_tx.clone();
                    scope.spawn(move || {
                        let mut handled = 0usize;
                        for (index, from, to) in tasks.iter() {
                            let distance =
                                calculator.distance(from.coordinates(), to.coordinates());
                            let _ = results.send((index, DistanceRecord::new(from, to, distance)));
                            progress.advance(1);
                            handled += 1;
                        }
                        debug!("Pool worker {worker_id} handled {handled} pairs");
                    })
                })
                .collect();
            drop(task_rx);

            for (index, (from, to)) in generator.enumerate() {
                if task_tx.send((index, from, to)).is_err() {
                    warn!("All pool workers stopped before the queue was drained");
                    break;
                }
            }
            // Closing the queue lets idle workers exit their loop
            drop(task_tx);

            handles
                .into_iter()
                .map(|handle| handle.join())
                .filter(|joined| joined.is_err())
                .count()
        });
        drop(result_tx);

        if failed_workers > 0 {
            return Err(Error::Worker(format!(
                "{failed_workers} of {} pool worker(s) panicked",
                self.workers
            )));
        }

        collect_indexed(result_rx.iter(), expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calculator::{Equirectangular, Haversine};
    use crate::core::coordinates::Coordinates;
    use crate::core::executor::sequential::SequentialExecutor;
    use crate::core::executor::test_support::cities;

    #[test]
    fn test_pool_matches_sequential_for_any_worker_count() {
        let locations = cities();
        let calculator = Equirectangular::default();
        let expected = SequentialExecutor::new(calculator)
            .execute(&locations, Pairing::Unordered, &Progress::silent(10))
            .unwrap();

        for workers in [1, 2, 3, 8] {
            let actual = PoolExecutor::new(calculator, workers)
                .execute(&locations, Pairing::Unordered, &Progress::silent(10))
                .unwrap();
            assert_eq!(actual, expected, "workers = {workers}");
        }
    }

    #[test]
    fn test_zero_workers_clamped_to_one() {
        let executor = PoolExecutor::new(Haversine::default(), 0);
        assert_eq!(executor.workers(), 1);
    }

    #[test]
    fn test_worker_panic_is_not_swallowed() {
        let locations = cities();
        let calculator = |_from: &Coordinates, to: &Coordinates| -> f64 {
            if to.longitude() > 150.0 {
                panic!("refusing to compute towards Sydney");
            }
            0.0
        };
        let result = PoolExecutor::new(calculator, 2).execute(
            &locations,
            Pairing::Ordered,
            &Progress::silent(20),
        );
        assert!(matches!(result, Err(Error::Worker(_))));
    }
}
