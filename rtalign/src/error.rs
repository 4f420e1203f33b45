//! Error types for pose clustering alignment

use thiserror::Error;

/// Errors raised by a superimposer run.
///
/// Every variant is fatal for the run that produced it; the algorithm is deterministic,
/// so repeating a failed run with the same inputs reproduces the error.
#[derive(Error, Debug)]
pub enum AlignmentError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid value: {message} (value: {value})")]
    InvalidValue { message: String, value: f64 },

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AlignmentError>;
