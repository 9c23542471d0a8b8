//! Calibration record published by a backend server when it starts.
//!
//! The record is informational: the search core never reads it back.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::errors::RecordError;

/// A metric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// A rate or other real quantity.
    Float(f64),
    /// A flag.
    Bool(bool),
}

/// The declared type of a metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Marks a [`MetricValue::Float`].
    Float,
    /// Marks a [`MetricValue::Bool`].
    Bool,
}

/// One named, timestamped metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationMetric {
    /// Metric name, e.g. `SPAMErrorRate`.
    pub id: String,
    /// Measured value.
    pub value: MetricValue,
    /// Serialized as `type`.
    #[serde(rename = "type")]
    pub kind: MetricKind,
    /// When the metric was taken.
    pub timestamp: String,
}

impl CalibrationMetric {
    /// A float metric.
    pub fn float<S: Into<String>>(id: S, value: f64, timestamp: &str) -> Self {
        Self {
            id: id.into(),
            value: MetricValue::Float(value),
            kind: MetricKind::Float,
            timestamp: timestamp.to_string(),
        }
    }

    /// A boolean metric.
    pub fn bool<S: Into<String>>(id: S, value: bool, timestamp: &str) -> Self {
        Self {
            id: id.into(),
            value: MetricValue::Bool(value),
            kind: MetricKind::Bool,
            timestamp: timestamp.to_string(),
        }
    }
}

/// The full record, serialized as a JSON list of metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationRecord(pub Vec<CalibrationMetric>);

impl CalibrationRecord {
    /// Record for a backend without noise or error correction.
    pub fn noiseless(timestamp: &str) -> Self {
        Self(vec![
            CalibrationMetric::float("OneQubitGateErrorRate", 0.0, timestamp),
            CalibrationMetric::float("TwoQubitGateErrorRate", 0.0, timestamp),
            CalibrationMetric::float("SPAMErrorRate", 0.0, timestamp),
            CalibrationMetric::bool("ErrorCorrectionEnabled", false, timestamp),
        ])
    }

    /// Metrics in publication order.
    pub fn metrics(&self) -> &[CalibrationMetric] {
        &self.0
    }

    /// Pretty JSON with four space indentation.
    pub fn to_json(&self) -> Result<String, RecordError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Overwrite `path` with this record.
    pub fn write(&self, path: &Path) -> Result<(), RecordError> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|err| RecordError::Io {
            path: path.to_path_buf(),
            source: err,
        })?;
        tracing::info!(path = %path.display(), metrics = self.0.len(), "Wrote calibration record.");
        Ok(())
    }
}

/// Current UTC time as `YYYY-MM-DD HH:MM:SS`.
pub fn now_timestamp() -> Result<String, RecordError> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    Ok(OffsetDateTime::now_utc().format(format)?)
}
