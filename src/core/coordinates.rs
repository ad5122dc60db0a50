//! Always-valid coordinate and location types
//!
//! A [`Coordinates`] value can only exist with latitude in [-90, 90] and
//! longitude in [-180, 180]. Deserialization goes through the same check so
//! values received from worker processes are held to the same rule.

use serde::{Deserialize, Serialize};

use crate::core::error::{CoordinateField, ValidationError};

/// Valid latitude range, inclusive
pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;

/// Valid longitude range, inclusive
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

pub(crate) const LATITUDE_RULE: &str = "must be between -90 and 90 inclusive";
pub(crate) const LONGITUDE_RULE: &str = "must be between -180 and 180 inclusive";

/// Check a latitude against the valid range.
///
/// NaN is never in range.
pub fn validate_latitude(value: f64) -> Result<f64, ValidationError> {
    if (MIN_LAT..=MAX_LAT).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError {
            field: CoordinateField::Latitude,
            rule: LATITUDE_RULE,
            value,
        })
    }
}

/// Check a longitude against the valid range.
pub fn validate_longitude(value: f64) -> Result<f64, ValidationError> {
    if (MIN_LON..=MAX_LON).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError {
            field: CoordinateField::Longitude,
            rule: LONGITUDE_RULE,
            value,
        })
    }
}

/// A validated point in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Build a coordinate, rejecting out-of-range values.
    ///
    /// Latitude is checked first, so a value with both fields invalid reports
    /// the latitude.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        Ok(Self {
            latitude: validate_latitude(latitude)?,
            longitude: validate_longitude(longitude)?,
        })
    }

    #[inline]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[inline]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Unchecked wire form of [`Coordinates`]
#[derive(Deserialize)]
struct RawCoordinates {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = ValidationError;

    fn try_from(raw: RawCoordinates) -> Result<Self, Self::Error> {
        Coordinates::new(raw.latitude, raw.longitude)
    }
}

/// A named point read from one input row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    name: String,
    coordinates: Coordinates,
}

impl Location {
    pub fn new(name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            name: name.into(),
            coordinates,
        }
    }

    /// Build a location straight from raw degrees
    pub fn from_degrees(
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self, ValidationError> {
        Ok(Self::new(name, Coordinates::new(latitude, longitude)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }
}
