//! Core library modules for distance-matrix
//!
//! This module contains the internal implementation details of the distance-matrix library.

pub mod calculator;
pub mod coordinates;
pub mod error;
pub mod executor;
pub mod io;
pub mod options;
pub mod pairs;
pub mod progress;
pub mod worker;

