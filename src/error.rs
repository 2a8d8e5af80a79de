//! Error types for wear-ingest
//!
//! Two layers: [`FieldError`] describes why a single raw record could not be
//! mapped and never escapes the batch processor, while [`IngestError`] covers
//! setup and fetch failures that the caller has to deal with.

use thiserror::Error;

/// Reason a single raw record was rejected by a device mapper
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("Raw record is not a JSON object")]
    NotAnObject,

    #[error("Missing required field: {0}")]
    Missing(&'static str),

    #[error("Raw record has an unexpected shape: {0}")]
    Malformed(String),

    #[error("Field {key} is not a valid ISO-8601 date-time: {value}")]
    InvalidDate { key: &'static str, value: String },

    #[error("Field {field} is out of range: {reason}")]
    OutOfRange {
        field: &'static str,
        reason: &'static str,
    },
}

impl From<serde_json::Error> for FieldError {
    fn from(e: serde_json::Error) -> Self {
        FieldError::Malformed(e.to_string())
    }
}

/// Errors that can occur while setting up or feeding the ingest pipeline
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported device: {0}")]
    UnsupportedDevice(String),

    #[error("Unsupported data kind: {0}")]
    UnsupportedKind(String),

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
