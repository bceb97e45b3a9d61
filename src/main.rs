//! VidShrink command-line video compressor
//!
//! Drives an external ffmpeg binary to shrink video files with either a
//! target-output-size mode (two-pass bitrate encoding) or a quality-priority
//! mode (single-pass CRF), with live progress output and an estimated-size
//! preview.
//!
//! # Usage
//!
//! ```bash
//! vidshrink convert --input big.mp4 --output small.mp4 --reduction 30
//! vidshrink convert --input big.mp4 --output small.mkv --mode quality
//! vidshrink estimate --input big.mp4 --reduction 30
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vidshrink::cli::{commands, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG overrides the --log-level flag.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone())),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting VidShrink");

    match cli.command {
        Commands::Convert(args) => commands::convert(args)?,
        Commands::Estimate(args) => commands::estimate(args)?,
    }

    Ok(())
}
