//! Encoder binary handle and invocation descriptors
//!
//! An [`EncoderInvocation`] is the argument list for exactly one subprocess
//! execution; the pipeline owns it for the duration of one pass. The
//! argument sets follow the x264/aac conventions of the encoder's own
//! two-pass protocol.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use tracing::{debug, warn};

use crate::error::{ShrinkError, ShrinkResult};

/// Names of the transient first-pass statistics artifacts, relative to the
/// working directory (the encoder's default pass-log location).
pub const PASS_LOG_FILES: [&str; 4] = [
    "ffmpeg2pass-0.log",
    "ffmpeg2pass-0.log.mbtree",
    "ffmpeg2pass-0.log.temp",
    "ffmpeg2pass-0.log.mbtree.temp",
];

/// One external-process execution descriptor
#[derive(Debug, Clone)]
pub struct EncoderInvocation {
    /// Argument list passed to the encoder binary
    pub args: Vec<String>,
    /// True when the invocation writes no primary output (first pass)
    pub discards_output: bool,
    /// True when the invocation produces or consumes pass statistics
    pub uses_pass_stats: bool,
}

impl EncoderInvocation {
    /// Single-pass constant-quality encode.
    pub fn quality_pass(input: &Path, output: &Path, crf: u8) -> Self {
        let args = vec![
            "-y".into(),
            "-i".into(),
            input.to_string_lossy().into_owned(),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "fast".into(),
            "-crf".into(),
            crf.to_string(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            "128k".into(),
            output.to_string_lossy().into_owned(),
        ];
        Self {
            args,
            discards_output: false,
            uses_pass_stats: false,
        }
    }

    /// First pass of a two-pass encode: statistics only, null output, no audio.
    pub fn analysis_pass(input: &Path, bitrate_kbps: u32) -> Self {
        let args = vec![
            "-y".into(),
            "-i".into(),
            input.to_string_lossy().into_owned(),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "fast".into(),
            "-b:v".into(),
            format!("{}k", bitrate_kbps),
            "-pass".into(),
            "1".into(),
            "-an".into(),
            "-f".into(),
            "null".into(),
            "-".into(),
        ];
        Self {
            args,
            discards_output: true,
            uses_pass_stats: true,
        }
    }

    /// Second pass: real output, consuming the first pass's statistics.
    pub fn encode_pass(input: &Path, output: &Path, bitrate_kbps: u32) -> Self {
        let args = vec![
            "-y".into(),
            "-i".into(),
            input.to_string_lossy().into_owned(),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "fast".into(),
            "-b:v".into(),
            format!("{}k", bitrate_kbps),
            "-pass".into(),
            "2".into(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            "128k".into(),
            output.to_string_lossy().into_owned(),
        ];
        Self {
            args,
            discards_output: false,
            uses_pass_stats: true,
        }
    }
}

/// Handle on the external encoder binary
#[derive(Debug, Clone)]
pub struct Encoder {
    binary: PathBuf,
}

impl Encoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Verify the binary can be executed at all, before any job starts.
    ///
    /// A bare-name binary (resolved through `PATH`) is exercised with
    /// `-version`; an explicit path only needs to exist.
    pub fn check_available(&self) -> ShrinkResult<()> {
        let not_found = || ShrinkError::EncoderNotFound {
            path: self.binary.to_string_lossy().into_owned(),
        };

        if self.binary.components().count() > 1 {
            if self.binary.exists() {
                return Ok(());
            }
            return Err(not_found());
        }

        Command::new(&self.binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|_| ())
            .map_err(|_| not_found())
    }

    /// Spawn one invocation with its progress stream piped back to us.
    ///
    /// The encoder writes progress chatter on stderr; stdout is discarded
    /// (the analysis pass muxes to null via stdout). `workdir` becomes the
    /// subprocess working directory, which is where the encoder drops its
    /// pass-statistics files.
    pub fn spawn(&self, invocation: &EncoderInvocation, workdir: &Path) -> ShrinkResult<Child> {
        debug!("Spawning encoder: {:?} {:?}", self.binary, invocation.args);
        Command::new(&self.binary)
            .args(&invocation.args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ShrinkError::LaunchFailure {
                message: e.to_string(),
            })
    }
}

/// Best-effort removal of first-pass statistics files in `dir`.
///
/// Runs on every terminal transition. Deletion failures never fail the job;
/// they are logged and dropped.
pub fn cleanup_pass_logs(dir: &Path) {
    for name in PASS_LOG_FILES {
        let path = dir.join(name);
        if !path.exists() {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => debug!("Removed pass statistics file {:?}", path),
            Err(e) => warn!("Could not remove pass statistics file {:?}: {}", path, e),
        }
    }
}
