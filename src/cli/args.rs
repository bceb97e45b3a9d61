//! Command-line argument definitions

use clap::Args;

/// Arguments for the convert command
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: String,

    /// Output file path (.mp4 or .mkv)
    #[arg(short, long)]
    pub output: String,

    /// Requested size reduction percentage (5-80)
    #[arg(short, long, default_value_t = 20)]
    pub reduction: u8,

    /// Conversion mode: "size" (two-pass target size) or "quality" (CRF)
    #[arg(long, default_value = "size")]
    pub mode: String,

    /// Encoder binary to invoke
    #[arg(long, default_value = "ffmpeg", env = "VIDSHRINK_ENCODER")]
    pub encoder: String,

    /// Emit progress as JSON events instead of a console bar
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the estimate command
#[derive(Args, Debug)]
pub struct EstimateArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: String,

    /// Requested size reduction percentage (5-80)
    #[arg(short, long, default_value_t = 20)]
    pub reduction: u8,

    /// Encoder binary to invoke for duration probing
    #[arg(long, default_value = "ffmpeg", env = "VIDSHRINK_ENCODER")]
    pub encoder: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
