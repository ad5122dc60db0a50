//! Execution strategies
//!
//! Every strategy implements [`Executor`]: apply one calculator to every
//! pair of locations and return one [`DistanceRecord`] per pair. They differ
//! only in how the work is scheduled. The strategy is picked once, at
//! startup, through [`build_executor`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::coordinates::Location;
use crate::core::error::{suggest_strategy, Error, Result};
use crate::core::options::MatrixOptions;
use crate::core::pairs::Pairing;
use crate::core::progress::Progress;

pub mod cooperative;
pub mod pool;
pub mod process;
pub mod sequential;
pub mod threaded;
pub mod vectorized;

pub use cooperative::CooperativeExecutor;
pub use pool::PoolExecutor;
pub use process::ProcessExecutor;
pub use sequential::SequentialExecutor;
pub use threaded::ThreadedExecutor;
pub use vectorized::VectorizedExecutor;

/// One output row: distance from `origin` to `destination`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceRecord {
    pub origin: String,
    pub destination: String,
    pub distance: f64,
}

impl DistanceRecord {
    pub fn new(origin: &Location, destination: &Location, distance: f64) -> Self {
        Self {
            origin: origin.name().to_string(),
            destination: destination.name().to_string(),
            distance,
        }
    }
}

/// Apply a calculator across all pairs of a location list
pub trait Executor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn execute(
        &self,
        locations: &[Location],
        pairing: Pairing,
        progress: &Progress,
    ) -> Result<Vec<DistanceRecord>>;
}

/// Available execution strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    #[default]
    Sequential,
    Threaded,
    Pool,
    Process,
    Cooperative,
    Vectorized,
}

impl Strategy {
    pub const ALL: [Strategy; 6] = [
        Strategy::Sequential,
        Strategy::Threaded,
        Strategy::Pool,
        Strategy::Process,
        Strategy::Cooperative,
        Strategy::Vectorized,
    ];

    /// Accepted names, aliases included
    pub const NAMES: &'static [(&'static str, Strategy)] = &[
        ("sequential", Strategy::Sequential),
        ("threaded", Strategy::Threaded),
        ("pool", Strategy::Pool),
        ("process", Strategy::Process),
        ("multiprocess", Strategy::Process),
        ("cooperative", Strategy::Cooperative),
        ("async", Strategy::Cooperative),
        ("vectorized", Strategy::Vectorized),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Sequential => "sequential",
            Strategy::Threaded => "threaded",
            Strategy::Pool => "pool",
            Strategy::Process => "process",
            Strategy::Cooperative => "cooperative",
            Strategy::Vectorized => "vectorized",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Strategy::NAMES
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, strategy)| *strategy)
            .ok_or_else(|| Error::UnknownStrategy {
                name: s.to_string(),
                suggestion: suggest_strategy(s),
            })
    }
}

/// Build the executor selected by `options`
pub fn build_executor(options: &MatrixOptions) -> Result<Box<dyn Executor>> {
    options.validate()?;
    let calculator = options.calculator;

    let executor: Box<dyn Executor> = match options.strategy {
        Strategy::Sequential => Box::new(SequentialExecutor::new(calculator)),
        Strategy::Threaded => Box::new(ThreadedExecutor::new(calculator)),
        Strategy::Pool => Box::new(PoolExecutor::new(calculator, options.workers)),
        Strategy::Process => {
            let mut executor = ProcessExecutor::new(calculator, options.workers)?;
            if let Some(program) = &options.worker_program {
                executor = executor.with_program(program.clone());
            }
            Box::new(executor)
        }
        Strategy::Cooperative => {
            Box::new(CooperativeExecutor::new(calculator, options.queue_capacity))
        }
        Strategy::Vectorized => Box::new(VectorizedExecutor::new(calculator)),
    };

    Ok(executor)
}

/// Put index-tagged results back into pair order, checking every index
/// arrived exactly once.
pub(crate) fn collect_indexed(
    results: impl IntoIterator<Item = (usize, DistanceRecord)>,
    expected: usize,
) -> Result<Vec<DistanceRecord>> {
    let mut slots: Vec<Option<DistanceRecord>> = vec![None; expected];
    for (index, record) in results {
        let slot = slots.get_mut(index).ok_or_else(|| {
            Error::Worker(format!("result for unknown pair index {index}"))
        })?;
        if slot.replace(record).is_some() {
            return Err(Error::Worker(format!("duplicate result for pair index {index}")));
        }
    }

    let missing = slots.iter().filter(|slot| slot.is_none()).count();
    if missing > 0 {
        return Err(Error::Worker(format!(
            "{missing} of {expected} pair results missing"
        )));
    }

    Ok(slots.into_iter().flatten().collect())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parse_names_and_aliases() {
        assert_eq!("sequential".parse::<Strategy>().unwrap(), Strategy::Sequential);
        assert_eq!("Threaded".parse::<Strategy>().unwrap(), Strategy::Threaded);
        assert_eq!("multiprocess".parse::<Strategy>().unwrap(), Strategy::Process);
        assert_eq!("async".parse::<Strategy>().unwrap(), Strategy::Cooperative);
        assert_eq!(" vectorized ".parse::<Strategy>().unwrap(), Strategy::Vectorized);
    }

    #[test]
    fn test_strategy_parse_unknown_suggests() {
        match "poool".parse::<Strategy>() {
            Err(Error::UnknownStrategy { name, suggestion }) => {
                assert_eq!(name, "poool");
                assert_eq!(suggestion, Some("pool".to_string()));
            }
            other => panic!("expected unknown strategy error, got {other:?}"),
        }
    }

    #[test]
    fn test_every_strategy_round_trips_through_its_name() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.as_str().parse::<Strategy>().unwrap(), strategy);
        }
    }

    #[test]
    fn test_build_executor_names() {
        for strategy in Strategy::ALL {
            let options = MatrixOptions {
                strategy,
                ..Default::default()
            };
            let executor = build_executor(&options).unwrap();
            assert_eq!(executor.name(), strategy.as_str());
        }
    }

    #[test]
    fn test_collect_indexed_reorders() {
        let record = |name: &str| DistanceRecord {
            origin: name.to_string(),
            destination: name.to_string(),
            distance: 0.0,
        };
        let results = vec![(2, record("c")), (0, record("a")), (1, record("b"))];
        let ordered = collect_indexed(results, 3).unwrap();
        let names: Vec<_> = ordered.iter().map(|r| r.origin.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_collect_indexed_reports_missing_and_duplicates() {
        let record = DistanceRecord {
            origin: "a".to_string(),
            destination: "b".to_string(),
            distance: 1.0,
        };
        assert!(matches!(
            collect_indexed(vec![(0, record.clone())], 2),
            Err(Error::Worker(_))
        ));
        assert!(matches!(
            collect_indexed(vec![(0, record.clone()), (0, record.clone())], 2),
            Err(Error::Worker(_))
        ));
        assert!(matches!(
            collect_indexed(vec![(5, record)], 2),
            Err(Error::Worker(_))
        ));
    }
}
