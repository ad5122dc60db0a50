//! Distance calculators
//!
//! Two formulas are provided, each usable as a plain function, a closure
//! capturing its Earth radius, or an object holding the radius as state.
//! All of them satisfy [`DistanceCalculator`]. The array forms in
//! [`VectorizedCalculator`] evaluate the same expressions over whole columns.

use std::fmt;
use std::str::FromStr;

use ndarray::{s, Array1};
use serde::{Deserialize, Serialize};

use crate::core::coordinates::Coordinates;
use crate::core::error::{Error, Result};

/// Mean Earth radius in kilometres
pub const DEFAULT_EARTH_RADIUS_KM: f64 = 6371.0088;

/// Anything that maps two points to a scalar distance
pub trait DistanceCalculator {
    fn distance(&self, from: &Coordinates, to: &Coordinates) -> f64;
}

impl<F> DistanceCalculator for F
where
    F: Fn(&Coordinates, &Coordinates) -> f64,
{
    fn distance(&self, from: &Coordinates, to: &Coordinates) -> f64 {
        self(from, to)
    }
}

/// Great-circle distance on a sphere of radius `earth_radius`.
///
/// The result is in the unit of `earth_radius`.
pub fn haversine(from: &Coordinates, to: &Coordinates, earth_radius: f64) -> f64 {
    let lat1 = from.latitude().to_radians();
    let lon1 = from.longitude().to_radians();
    let lat2 = to.latitude().to_radians();
    let lon2 = to.longitude().to_radians();

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon * 0.5).sin().powi(2);
    // Rounding can push `a` just past 1 near antipodes
    let a = a.clamp(0.0, 1.0);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    earth_radius * c
}

/// Planar approximation with a cosine correction at the mean latitude.
///
/// Cheap, but degrades with distance and near the poles.
pub fn equirectangular(from: &Coordinates, to: &Coordinates, earth_radius: f64) -> f64 {
    let lat1 = from.latitude().to_radians();
    let lon1 = from.longitude().to_radians();
    let lat2 = to.latitude().to_radians();
    let lon2 = to.longitude().to_radians();

    let x = (lon2 - lon1) * ((lat1 + lat2) * 0.5).cos();
    let y = lat2 - lat1;
    earth_radius * (x * x + y * y).sqrt()
}

/// Haversine as a closure capturing its radius
pub fn haversine_with(earth_radius: f64) -> impl Fn(&Coordinates, &Coordinates) -> f64 + Clone {
    move |from, to| haversine(from, to, earth_radius)
}

/// Equirectangular as a closure capturing its radius
pub fn equirectangular_with(
    earth_radius: f64,
) -> impl Fn(&Coordinates, &Coordinates) -> f64 + Clone {
    move |from, to| equirectangular(from, to, earth_radius)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Haversine {
    pub earth_radius: f64,
}

impl Default for Haversine {
    fn default() -> Self {
        Self {
            earth_radius: DEFAULT_EARTH_RADIUS_KM,
        }
    }
}

impl DistanceCalculator for Haversine {
    fn distance(&self, from: &Coordinates, to: &Coordinates) -> f64 {
        haversine(from, to, self.earth_radius)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equirectangular {
    pub earth_radius: f64,
}

impl Default for Equirectangular {
    fn default() -> Self {
        Self {
            earth_radius: DEFAULT_EARTH_RADIUS_KM,
        }
    }
}

impl DistanceCalculator for Equirectangular {
    fn distance(&self, from: &Coordinates, to: &Coordinates) -> f64 {
        equirectangular(from, to, self.earth_radius)
    }
}

/// Formula selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalculatorKind {
    #[default]
    Haversine,
    Equirectangular,
}

impl CalculatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculatorKind::Haversine => "haversine",
            CalculatorKind::Equirectangular => "equirectangular",
        }
    }
}

impl fmt::Display for CalculatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalculatorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "haversine" => Ok(CalculatorKind::Haversine),
            "equirectangular" | "planar" => Ok(CalculatorKind::Equirectangular),
            other => Err(Error::InvalidInput(format!(
                "unknown formula '{other}', expected 'haversine' or 'equirectangular'"
            ))),
        }
    }
}

/// Serializable calculator configuration.
///
/// Carries only primitive fields, which is what lets it cross a process
/// boundary. Closures cannot be sent to worker processes; this can.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "formula", rename_all = "snake_case")]
pub enum CalculatorSpec {
    Haversine { earth_radius: f64 },
    Equirectangular { earth_radius: f64 },
}

impl Default for CalculatorSpec {
    fn default() -> Self {
        CalculatorSpec::Haversine {
            earth_radius: DEFAULT_EARTH_RADIUS_KM,
        }
    }
}

impl CalculatorSpec {
    /// Build a calculator, rejecting radii that are not finite and positive
    pub fn new(kind: CalculatorKind, earth_radius: f64) -> Result<Self> {
        if !earth_radius.is_finite() || earth_radius <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "earth radius must be finite and positive, got {earth_radius}"
            )));
        }
        Ok(match kind {
            CalculatorKind::Haversine => CalculatorSpec::Haversine { earth_radius },
            CalculatorKind::Equirectangular => CalculatorSpec::Equirectangular { earth_radius },
        })
    }

    pub fn kind(&self) -> CalculatorKind {
        match self {
            CalculatorSpec::Haversine { .. } => CalculatorKind::Haversine,
            CalculatorSpec::Equirectangular { .. } => CalculatorKind::Equirectangular,
        }
    }

    pub fn earth_radius(&self) -> f64 {
        match self {
            CalculatorSpec::Haversine { earth_radius }
            | CalculatorSpec::Equirectangular { earth_radius } => *earth_radius,
        }
    }
}

impl DistanceCalculator for CalculatorSpec {
    fn distance(&self, from: &Coordinates, to: &Coordinates) -> f64 {
        match self {
            CalculatorSpec::Haversine { earth_radius } => haversine(from, to, *earth_radius),
            CalculatorSpec::Equirectangular { earth_radius } => {
                equirectangular(from, to, *earth_radius)
            }
        }
    }
}

/// Coordinates of many pairs laid out as four parallel columns, in degrees
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairColumns {
    pub lat1: Array1<f64>,
    pub lon1: Array1<f64>,
    pub lat2: Array1<f64>,
    pub lon2: Array1<f64>,
}

impl PairColumns {
    pub fn len(&self) -> usize {
        self.lat1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lat1.is_empty()
    }

    /// Gather the columns for a list of coordinate pairs
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a Coordinates, &'a Coordinates)>,
    {
        let mut lat1 = Vec::new();
        let mut lon1 = Vec::new();
        let mut lat2 = Vec::new();
        let mut lon2 = Vec::new();
        for (from, to) in pairs {
            lat1.push(from.latitude());
            lon1.push(from.longitude());
            lat2.push(to.latitude());
            lon2.push(to.longitude());
        }
        Self {
            lat1: Array1::from(lat1),
            lon1: Array1::from(lon1),
            lat2: Array1::from(lat2),
            lon2: Array1::from(lon2),
        }
    }

    /// Copy of rows `start..end`
    pub fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            lat1: self.lat1.slice(s![start..end]).to_owned(),
            lon1: self.lon1.slice(s![start..end]).to_owned(),
            lat2: self.lat2.slice(s![start..end]).to_owned(),
            lon2: self.lon2.slice(s![start..end]).to_owned(),
        }
    }
}

/// Calculators restated over whole arrays
pub trait VectorizedCalculator {
    fn distances(&self, columns: &PairColumns) -> Array1<f64>;
}

fn haversine_columns(columns: &PairColumns, earth_radius: f64) -> Array1<f64> {
    let lat1 = columns.lat1.mapv(f64::to_radians);
    let lon1 = columns.lon1.mapv(f64::to_radians);
    let lat2 = columns.lat2.mapv(f64::to_radians);
    let lon2 = columns.lon2.mapv(f64::to_radians);

    let dlat = &lat2 - &lat1;
    let dlon = &lon2 - &lon1;
    let a = (&dlat * 0.5).mapv(|v| v.sin().powi(2))
        + lat1.mapv(f64::cos) * lat2.mapv(f64::cos) * (&dlon * 0.5).mapv(|v| v.sin().powi(2));

    let c = a.mapv(|a| {
        let a = a.clamp(0.0, 1.0);
        2.0 * a.sqrt().atan2((1.0 - a).sqrt())
    });
    c * earth_radius
}

fn equirectangular_columns(columns: &PairColumns, earth_radius: f64) -> Array1<f64> {
    let lat1 = columns.lat1.mapv(f64::to_radians);
    let lon1 = columns.lon1.mapv(f64::to_radians);
    let lat2 = columns.lat2.mapv(f64::to_radians);
    let lon2 = columns.lon2.mapv(f64::to_radians);

    let x = (&lon2 - &lon1) * ((&lat1 + &lat2) * 0.5).mapv(f64::cos);
    let y = &lat2 - &lat1;
    (&x * &x + &y * &y).mapv(f64::sqrt) * earth_radius
}

impl VectorizedCalculator for Haversine {
    fn distances(&self, columns: &PairColumns) -> Array1<f64> {
        haversine_columns(columns, self.earth_radius)
    }
}

impl VectorizedCalculator for Equirectangular {
    fn distances(&self, columns: &PairColumns) -> Array1<f64> {
        equirectangular_columns(columns, self.earth_radius)
    }
}

impl VectorizedCalculator for CalculatorSpec {
    fn distances(&self, columns: &PairColumns) -> Array1<f64> {
        match self {
            CalculatorSpec::Haversine { earth_radius } => haversine_columns(columns, *earth_radius),
            CalculatorSpec::Equirectangular { earth_radius } => {
                equirectangular_columns(columns, *earth_radius)
            }
        }
    }
}
