//! Error types for the VEGA monitor
//!
//! Steady-state frame processing never fails; these errors surface only from
//! construction, persistence and input parsing.

use thiserror::Error;

/// Errors that can occur outside the per-frame hot path
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Insufficient calibration samples: {0}")]
    InsufficientSamples(String),

    #[error("Calibration training failed: {0}")]
    TrainingError(String),

    #[error("Corrupt calibration model: {0}")]
    CorruptModel(String),
}
