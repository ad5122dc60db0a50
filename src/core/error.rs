//! Error types for distance-matrix
//!
//! Provides the error taxonomy shared by validation, execution and I/O.

use std::fmt;

use strsim::{jaro_winkler, normalized_levenshtein};

use crate::core::executor::Strategy;

/// Coordinate field that failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateField {
    Latitude,
    Longitude,
}

impl CoordinateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinateField::Latitude => "latitude",
            CoordinateField::Longitude => "longitude",
        }
    }
}

impl fmt::Display for CoordinateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coordinate value rejected at construction.
///
/// Names the offending field, the rule it broke and the value supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: CoordinateField,
    pub rule: &'static str,
    pub value: f64,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}, got {}", self.field, self.rule, self.value)
    }
}

impl std::error::Error for ValidationError {}

/// Minimum combined similarity for a strategy name suggestion
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Suggest a known strategy name for a misspelled one
///
/// Scores every accepted name (aliases included) with 70% Jaro-Winkler and
/// 30% normalized Levenshtein, and returns the canonical name of the best
/// candidate above the threshold.
pub fn suggest_strategy(input: &str) -> Option<String> {
    let input_lower = input.trim().to_lowercase();
    if input_lower.is_empty() {
        return None;
    }

    let mut best: Option<(f64, Strategy)> = None;
    for (name, strategy) in Strategy::NAMES {
        let score =
            jaro_winkler(&input_lower, name) * 0.7 + normalized_levenshtein(&input_lower, name) * 0.3;
        if score >= SUGGESTION_THRESHOLD && best.map_or(true, |(s, _)| score > s) {
            best = Some((score, *strategy));
        }
    }

    best.map(|(_, strategy)| strategy.as_str().to_string())
}

/// Main error type for distance-matrix operations
#[derive(Debug)]
pub enum Error {
    /// Coordinate out of range
    Validation(ValidationError),

    /// Input row parsed but carried an out-of-range coordinate
    InvalidRow { line: u64, error: ValidationError },

    /// Input row could not be parsed into a location
    MalformedRow { line: u64, reason: String },

    /// Strategy name not recognized
    UnknownStrategy {
        name: String,
        suggestion: Option<String>,
    },

    /// Invalid configuration or parameters
    InvalidInput(String),

    /// A worker thread or process failed or lost results
    Worker(String),

    /// Task could not be serialized for a worker process
    Serialization(String),

    /// CSV encoding or decoding failure
    Csv(csv::Error),

    /// File I/O error
    IoError(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(err) => {
                write!(f, "Validation error: {}", err)
            }
            Error::InvalidRow { line, error } => {
                write!(f, "Invalid row at line {}: {}", line, error)
            }
            Error::MalformedRow { line, reason } => {
                write!(f, "Malformed row at line {}: {}", line, reason)
            }
            Error::UnknownStrategy { name, suggestion } => match suggestion {
                Some(suggestion) => write!(
                    f,
                    "Unknown strategy '{}'. Did you mean '{}'?",
                    name, suggestion
                ),
                None => write!(
                    f,
                    "Unknown strategy '{}'. Expected one of: {}",
                    name,
                    Strategy::ALL
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            },
            Error::InvalidInput(msg) => {
                write!(f, "Invalid input: {}", msg)
            }
            Error::Worker(msg) => {
                write!(f, "Worker failed: {}", msg)
            }
            Error::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            Error::Csv(err) => {
                write!(f, "CSV error: {}", err)
            }
            Error::IoError(err) => {
                write!(f, "I/O error: {}", err)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Validation(err) => Some(err),
            Error::InvalidRow { error, .. } => Some(error),
            Error::Csv(err) => Some(err),
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Csv(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Convenience result type for distance-matrix operations
pub type Result<T> = std::result::Result<T, Error>;
