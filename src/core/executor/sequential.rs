//! Single-threaded baseline

use crate::core::calculator::DistanceCalculator;
use crate::core::coordinates::Location;
use crate::core::error::Result;
use crate::core::executor::{DistanceRecord, Executor};
use crate::core::pairs::{pairs, Pairing};
use crate::core::progress::Progress;

/// Pairs reported to the progress callback at a time
const PROGRESS_BATCH: u64 = 1024;

/// Walks the pairs in generator order on the calling thread.
///
/// Output order matches the pair generator, which makes this the reference
/// the other strategies are checked against.
pub struct SequentialExecutor<C> {
    calculator: C,
}

impl<C: DistanceCalculator> SequentialExecutor<C> {
    pub fn new(calculator: C) -> Self {
        Self { calculator }
    }
}

impl<C> Executor for SequentialExecutor<C>
where
    C: DistanceCalculator + Send + Sync,
{
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn execute(
        &self,
        locations: &[Location],
        pairing: Pairing,
        progress: &Progress,
    ) -> Result<Vec<DistanceRecord>> {
        let generator = pairs(locations, pairing);
        let mut records = Vec::with_capacity(generator.len());
        let mut pending = 0;

        for (from, to) in generator {
            let distance = self
                .calculator
                .distance(from.coordinates(), to.coordinates());
            records.push(DistanceRecord::new(from, to, distance));

            pending += 1;
            if pending == PROGRESS_BATCH {
                progress.advance(pending);
                pending = 0;
            }
        }
        if pending > 0 {
            progress.advance(pending);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calculator::{haversine_with, Haversine, DEFAULT_EARTH_RADIUS_KM};
    use crate::core::executor::test_support::cities;

    #[test]
    fn test_sequential_ordered_output() {
        let locations = cities();
        let executor = SequentialExecutor::new(Haversine::default());
        let records = executor
            .execute(&locations, Pairing::Ordered, &Progress::silent(20))
            .unwrap();

        assert_eq!(records.len(), 20);
        assert_eq!(records[0].origin, "Ann Arbor");
        assert_eq!(records[0].destination, "Pleasant Grove");
        assert!((records[0].distance - 2336.96).abs() < 1.0);
        assert_eq!(records[4].origin, "Pleasant Grove");
        assert_eq!(records[4].destination, "Ann Arbor");
        assert!(records.iter().all(|r| r.origin != r.destination));
    }

    #[test]
    fn test_sequential_unordered_count() {
        let locations = cities();
        let executor = SequentialExecutor::new(haversine_with(DEFAULT_EARTH_RADIUS_KM));
        let progress = Progress::silent(10);
        let records = executor
            .execute(&locations, Pairing::Unordered, &progress)
            .unwrap();
        assert_eq!(records.len(), 10);
        assert_eq!(progress.done(), 10);
    }

    #[test]
    fn test_sequential_empty_input() {
        let executor = SequentialExecutor::new(Haversine::default());
        let records = executor
            .execute(&[], Pairing::Ordered, &Progress::silent(0))
            .unwrap();
        assert!(records.is_empty());
    }
}
