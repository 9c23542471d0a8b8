//! Error types for circuit construction, execution, search, configuration and records.

use std::path::PathBuf;

use crate::labeling::Label;

/// An error from building or validating a circuit.
#[derive(Debug, thiserror::Error)]
pub enum CircuitError {
    /// A generic error.
    #[error("{0}")]
    Generic(String),
}

impl CircuitError {
    /// Construct a new error.
    pub fn new<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::Generic(msg.into())
    }
}

/// A result which may contain a circuit error.
pub type CircuitResult<T> = Result<T, CircuitError>;

/// Failures reported by an execution backend. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend could not be reached.
    #[error("backend at {endpoint} is unavailable: {message}")]
    Unavailable {
        /// Address the submission was sent to.
        endpoint: String,
        /// Transport failure description.
        message: String,
    },
    /// The circuit was rejected before execution.
    #[error("malformed circuit: {0}")]
    MalformedCircuit(String),
    /// The backend answered with an unexpected status.
    #[error("backend rejected submission with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },
    /// The backend answered, but its response could not be interpreted.
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),
    /// The backend returned no outcomes at all.
    #[error("backend returned no measurement outcomes")]
    EmptyResult,
}

/// Errors surfaced by a search query.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Circuit construction failed.
    #[error(transparent)]
    Circuit(#[from] CircuitError),
    /// Circuit execution failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// A query was issued before any collection was loaded.
    #[error("no collection has been loaded")]
    NoCollection,
    /// Two active slots share a label, so marking would be ambiguous.
    #[error("indices {first} and {second} share label {label}")]
    LabelCollision {
        /// Lower index of the colliding pair.
        first: usize,
        /// Higher index of the colliding pair.
        second: usize,
        /// The shared label.
        label: Label,
    },
}

/// Errors from loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file at {path:?}")]
    ReadConfig {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for the expected schema.
    #[error("failed to parse config file at {path:?}")]
    ParseConfig {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying parse error.
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("{message}")]
    Validation {
        /// What is wrong.
        message: String,
    },
}

/// Errors from writing a calibration record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The record file could not be written.
    #[error("failed to write calibration record to {path:?}")]
    Io {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The record could not be serialized.
    #[error("failed to serialize calibration record")]
    Serialize(#[from] serde_json::Error),
    /// The current time could not be formatted.
    #[error("failed to format calibration timestamp")]
    Timestamp(#[from] time::error::Format),
}
