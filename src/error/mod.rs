//! Error handling module for VidShrink

use thiserror::Error;

/// Main error type for VidShrink operations
#[derive(Error, Debug)]
pub enum ShrinkError {
    /// Encoder binary missing or not executable
    #[error("Encoder binary not found: {path}")]
    EncoderNotFound { path: String },

    /// Conversion request rejected before a job was created
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Probe could not determine the input duration
    #[error("Cannot read video duration: {path}")]
    DurationUnavailable { path: String },

    /// Non-positive duration reached the estimator
    #[error("Invalid duration: {seconds}s")]
    InvalidDuration { seconds: f64 },

    /// OS-level failure to start the encoder subprocess
    #[error("Failed to launch encoder: {message}")]
    LaunchFailure { message: String },

    /// Encoder exited but the output file never materialized
    #[error("Conversion produced no output file: {path}")]
    OutputMissing { path: String },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for VidShrink operations
pub type ShrinkResult<T> = std::result::Result<T, ShrinkError>;
