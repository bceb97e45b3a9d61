//! VidShrink video compressor library
//!
//! A conversion orchestration core that drives an external ffmpeg binary to
//! shrink video files: duration probing, bitrate/CRF estimation, two-pass
//! pipeline sequencing, progress parsing and cooperative cancellation. The
//! CLI in `main.rs` is a thin presentation shell over this library.

pub mod cli;
pub mod engine;
pub mod error;
pub mod estimate;
pub mod probe;

// Re-export commonly used types
pub use engine::{
    ConversionMode, ConversionOutcome, ConversionRequest, Encoder, EncoderInvocation, JobStatus,
    Phase, PipelineController, StatusTracker,
};
pub use error::{ShrinkError, ShrinkResult};
pub use probe::DurationProbe;
