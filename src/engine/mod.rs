//! Conversion engine: request model, encoder invocations, progress, pipeline

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ShrinkError, ShrinkResult};
use crate::estimate;

pub mod invocation;
pub mod pipeline;
pub mod progress;

pub use invocation::{cleanup_pass_logs, Encoder, EncoderInvocation};
pub use pipeline::{ConversionOutcome, PipelineController};
pub use progress::{JobStatus, Phase, StatusTracker};

/// Conversion modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionMode {
    /// Two-pass encode targeting `input_size * (1 - reduction)`
    TargetSize,
    /// Single-pass constant-quality encode
    QualityPriority,
}

impl ConversionMode {
    /// Parse a mode name as given on the command line.
    pub fn parse(mode: &str) -> ShrinkResult<Self> {
        match mode.to_ascii_lowercase().as_str() {
            "size" | "target-size" => Ok(ConversionMode::TargetSize),
            "quality" | "quality-priority" => Ok(ConversionMode::QualityPriority),
            other => Err(ShrinkError::InvalidRequest {
                message: format!("Unknown mode '{}'. Expected 'size' or 'quality'", other),
            }),
        }
    }
}

/// Everything needed to start one conversion job
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Input file path
    pub input: PathBuf,
    /// Output file path; extension implies container (.mp4/.mkv)
    pub output: PathBuf,
    /// Requested reduction percentage, clamped to the supported range
    pub reduction_percent: u8,
    /// Conversion mode
    pub mode: ConversionMode,
}

impl ConversionRequest {
    /// Build a validated request. Both paths must be non-empty and the input
    /// must resolve on disk before any job is created.
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        reduction_percent: u8,
        mode: ConversionMode,
    ) -> ShrinkResult<Self> {
        let input = input.into();
        let output = output.into();

        if input.as_os_str().is_empty() || output.as_os_str().is_empty() {
            return Err(ShrinkError::InvalidRequest {
                message: "Select input and output files".to_string(),
            });
        }
        // Passes run with the output directory as their working directory,
        // so both paths must survive a cwd change. Canonicalization doubles
        // as the existence check; either failure rejects the request.
        let input = input.canonicalize().map_err(|_| ShrinkError::InvalidRequest {
            message: format!("Input file does not exist: {}", input.display()),
        })?;
        let output = if output.is_absolute() {
            output
        } else {
            std::env::current_dir()?.join(output)
        };

        Ok(Self {
            input,
            output,
            reduction_percent: estimate::clamp_reduction(reduction_percent),
            mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing() {
        assert_eq!(
            ConversionMode::parse("size").unwrap(),
            ConversionMode::TargetSize
        );
        assert_eq!(
            ConversionMode::parse("Quality").unwrap(),
            ConversionMode::QualityPriority
        );
        assert!(ConversionMode::parse("turbo").is_err());
    }

    #[test]
    fn request_rejects_empty_paths() {
        let err = ConversionRequest::new("", "out.mp4", 20, ConversionMode::TargetSize)
            .err()
            .unwrap();
        assert!(matches!(err, ShrinkError::InvalidRequest { .. }));
    }

    #[test]
    fn request_rejects_missing_input() {
        let err = ConversionRequest::new(
            "/no/such/input.mp4",
            "out.mp4",
            20,
            ConversionMode::QualityPriority,
        )
        .err()
        .unwrap();
        assert!(matches!(err, ShrinkError::InvalidRequest { .. }));
    }

    #[test]
    fn request_clamps_reduction() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.mp4");
        std::fs::write(&input, b"data").unwrap();

        let request = ConversionRequest::new(
            &input,
            dir.path().join("out.mp4"),
            99,
            ConversionMode::TargetSize,
        )
        .unwrap();
        assert_eq!(request.reduction_percent, 80);
    }
}
