//! CLI module for VidShrink
//!
//! This module handles command-line argument parsing and command execution.

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// VidShrink video compressor
///
/// A command-line video compressor that drives an external ffmpeg binary,
/// with a target-size mode (two-pass) and a quality-priority mode (CRF).
#[derive(Parser)]
#[command(name = "vidshrink")]
#[command(about = "VidShrink - smart video compression from the command line")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Compress a video file
    Convert(args::ConvertArgs),
    /// Preview the estimated output size for a reduction
    Estimate(args::EstimateArgs),
}
