//! Whole-array evaluation
//!
//! Locations are held as columns, pair coordinates are gathered into four
//! parallel arrays and the formula runs over the arrays in one pass.
//! Partitioned runs split the pair arrays into chunks evaluated on the rayon
//! pool, one output part per chunk.

use log::debug;
use ndarray::Array1;
use rayon::prelude::*;

use crate::core::calculator::{PairColumns, VectorizedCalculator};
use crate::core::coordinates::{validate_latitude, validate_longitude, Coordinates, Location};
use crate::core::error::{Error, Result, ValidationError};
use crate::core::executor::{DistanceRecord, Executor};
use crate::core::pairs::{PairIndices, Pairing};
use crate::core::progress::Progress;

/// Locations stored column-wise
#[derive(Debug, Clone, PartialEq)]
pub struct LocationTable {
    names: Vec<String>,
    latitude: Array1<f64>,
    longitude: Array1<f64>,
}

impl LocationTable {
    /// Find the first row whose coordinates are out of range.
    ///
    /// Both columns are checked as arrays; within a row latitude is reported
    /// before longitude.
    pub fn check_columns(
        latitude: &Array1<f64>,
        longitude: &Array1<f64>,
    ) -> std::result::Result<(), (usize, ValidationError)> {
        let latitude_ok = latitude.mapv(|v| validate_latitude(v).is_ok());
        let longitude_ok = longitude.mapv(|v| validate_longitude(v).is_ok());

        let first_bad = latitude_ok
            .iter()
            .zip(longitude_ok.iter())
            .position(|(lat, lon)| !(*lat && *lon));

        match first_bad {
            None => Ok(()),
            Some(row) => match Coordinates::new(latitude[row], longitude[row]) {
                Err(error) => Err((row, error)),
                Ok(_) => Ok(()),
            },
        }
    }

    /// Build a table from raw columns.
    ///
    /// A bad value is reported as [`Error::InvalidRow`] with the 1-based row.
    pub fn from_columns(
        names: Vec<String>,
        latitude: Array1<f64>,
        longitude: Array1<f64>,
    ) -> Result<Self> {
        if names.len() != latitude.len() || names.len() != longitude.len() {
            return Err(Error::InvalidInput(format!(
                "column lengths differ: {} names, {} latitudes, {} longitudes",
                names.len(),
                latitude.len(),
                longitude.len()
            )));
        }

        Self::check_columns(&latitude, &longitude).map_err(|(row, error)| Error::InvalidRow {
            line: row as u64 + 1,
            error,
        })?;

        Ok(Self {
            names,
            latitude,
            longitude,
        })
    }

    /// Columns of already validated locations
    pub fn from_locations(locations: &[Location]) -> Self {
        Self {
            names: locations.iter().map(|l| l.name().to_string()).collect(),
            latitude: locations.iter().map(|l| l.coordinates().latitude()).collect(),
            longitude: locations.iter().map(|l| l.coordinates().longitude()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Pair positions and the matching coordinate columns, in generator order
    pub fn pair_columns(&self, pairing: Pairing) -> (Vec<(usize, usize)>, PairColumns) {
        let indices: Vec<(usize, usize)> = PairIndices::new(self.len(), pairing).collect();

        let columns = PairColumns {
            lat1: indices.iter().map(|&(i, _)| self.latitude[i]).collect(),
            lon1: indices.iter().map(|&(i, _)| self.longitude[i]).collect(),
            lat2: indices.iter().map(|&(_, j)| self.latitude[j]).collect(),
            lon2: indices.iter().map(|&(_, j)| self.longitude[j]).collect(),
        };

        (indices, columns)
    }

    fn records(&self, indices: &[(usize, usize)], distances: &Array1<f64>) -> Vec<DistanceRecord> {
        indices
            .iter()
            .zip(distances.iter())
            .map(|(&(i, j), &distance)| DistanceRecord {
                origin: self.names[i].clone(),
                destination: self.names[j].clone(),
                distance,
            })
            .collect()
    }
}

pub struct VectorizedExecutor<V> {
    calculator: V,
}

impl<V: VectorizedCalculator> VectorizedExecutor<V> {
    pub fn new(calculator: V) -> Self {
        Self { calculator }
    }

    /// Evaluate every pair of a table in one array pass
    pub fn run_table(
        &self,
        table: &LocationTable,
        pairing: Pairing,
        progress: &Progress,
    ) -> Vec<DistanceRecord> {
        let (indices, columns) = table.pair_columns(pairing);
        let distances = self.calculator.distances(&columns);
        progress.advance(indices.len() as u64);
        table.records(&indices, &distances)
    }
}

impl<V: VectorizedCalculator + Sync> VectorizedExecutor<V> {
    /// Evaluate the pairs of a table in `partitions` contiguous chunks.
    ///
    /// Always returns exactly `partitions` parts; trailing parts are empty
    /// when there are fewer pairs than partitions. Concatenating the parts
    /// gives generator order.
    pub fn run_partitioned(
        &self,
        table: &LocationTable,
        pairing: Pairing,
        partitions: usize,
        progress: &Progress,
    ) -> Result<Vec<Vec<DistanceRecord>>> {
        if partitions == 0 {
            return Err(Error::InvalidInput(
                "partitions must be at least 1".to_string(),
            ));
        }

        let (indices, columns) = table.pair_columns(pairing);
        let total = indices.len();
        let chunk = total.div_ceil(partitions).max(1);
        let bounds: Vec<(usize, usize)> = (0..partitions)
            .map(|p| ((p * chunk).min(total), ((p + 1) * chunk).min(total)))
            .collect();
        debug!("Splitting {total} pairs into {partitions} partitions of up to {chunk}");

        let calculator = &self.calculator;
        let parts: Vec<Vec<DistanceRecord>> = bounds
            .par_iter()
            .map(|&(start, end)| {
                let distances = calculator.distances(&columns.slice(start, end));
                progress.advance((end - start) as u64);
                table.records(&indices[start..end], &distances)
            })
            .collect();

        Ok(parts)
    }
}

impl<V> Executor for VectorizedExecutor<V>
where
    V: VectorizedCalculator + Send + Sync,
{
    fn name(&self) -> &'static str {
        "vectorized"
    }

    fn execute(
        &self,
        locations: &[Location],
        pairing: Pairing,
        progress: &Progress,
    ) -> Result<Vec<DistanceRecord>> {
        let table = LocationTable::from_locations(locations);
        Ok(self.run_table(&table, pairing, progress))
    }
}
