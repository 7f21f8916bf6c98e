//! The crate-wide error type.
//!
//! Setup plumbing touches a handful of foreign error sources: JSON parameter
//! documents, CSV report files, plain IO, and numeric parsing. [`EpiError`]
//! folds those together with the engine's own validation failures so every
//! init-time path can propagate with `?`. The daily kernels never construct
//! one; a broken invariant mid-simulation is a bug and asserts instead.

use std::fmt::{self, Display};
use std::io;

/// Anything that can go wrong while configuring a simulation or writing its
/// reports.
#[derive(Debug)]
pub enum EpiError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    ParseIntError(std::num::ParseIntError),
    ParseFloatError(std::num::ParseFloatError),
    /// A validation failure, carrying a human-readable reason.
    EpiError(String),
}

impl From<io::Error> for EpiError {
    fn from(error: io::Error) -> Self {
        EpiError::IoError(error)
    }
}

impl From<serde_json::Error> for EpiError {
    fn from(error: serde_json::Error) -> Self {
        EpiError::JsonError(error)
    }
}

impl From<csv::Error> for EpiError {
    fn from(error: csv::Error) -> Self {
        EpiError::CsvError(error)
    }
}

impl From<std::num::ParseIntError> for EpiError {
    fn from(error: std::num::ParseIntError) -> Self {
        EpiError::ParseIntError(error)
    }
}

impl From<std::num::ParseFloatError> for EpiError {
    fn from(error: std::num::ParseFloatError) -> Self {
        EpiError::ParseFloatError(error)
    }
}

impl From<String> for EpiError {
    fn from(reason: String) -> Self {
        EpiError::EpiError(reason)
    }
}

impl From<&str> for EpiError {
    fn from(reason: &str) -> Self {
        EpiError::EpiError(reason.to_string())
    }
}

impl std::error::Error for EpiError {}

impl Display for EpiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EpiError::IoError(error) => write!(f, "io error: {error}"),
            EpiError::JsonError(error) => write!(f, "json error: {error}"),
            EpiError::CsvError(error) => write!(f, "csv error: {error}"),
            EpiError::ParseIntError(error) => write!(f, "parse error: {error}"),
            EpiError::ParseFloatError(error) => write!(f, "parse error: {error}"),
            EpiError::EpiError(reason) => write!(f, "{reason}"),
        }
    }
}
