//! Duration probing via the encoder's inspect invocation
//!
//! The encoder run with only `-i <input>` prints stream metadata on its
//! diagnostic stream and exits; the duration marker is fished out of that
//! text. This is the only metadata the pipeline needs.

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

/// Probes media duration by running the encoder in inspect-only mode.
pub struct DurationProbe {
    encoder_path: String,
}

impl DurationProbe {
    pub fn new(encoder_path: impl Into<String>) -> Self {
        Self {
            encoder_path: encoder_path.into(),
        }
    }

    /// Probe the duration of `input` in seconds.
    ///
    /// Returns `None` when the encoder cannot be launched or its output
    /// carries no duration marker. Absence is the only failure mode; the
    /// probe never errors to the caller.
    pub fn probe_duration(&self, input: &Path) -> Option<f64> {
        let output = Command::new(&self.encoder_path)
            .arg("-i")
            .arg(input)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output();

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                warn!("Duration probe failed to launch encoder: {}", e);
                return None;
            }
        };

        let diagnostics = String::from_utf8_lossy(&output.stderr);
        let duration = parse_duration_marker(&diagnostics);
        match duration {
            Some(seconds) => debug!("Probed duration: {:.2}s for {:?}", seconds, input),
            None => warn!("No duration marker in encoder output for {:?}", input),
        }
        duration
    }
}

/// Extract a `Duration: HH:MM:SS.frac` marker from encoder diagnostics.
pub fn parse_duration_marker(text: &str) -> Option<f64> {
    static DURATION_MARKER: OnceLock<Regex> = OnceLock::new();
    let re = DURATION_MARKER.get_or_init(|| {
        Regex::new(r"Duration: (\d+):(\d+):(\d+\.?\d*)").expect("valid marker pattern")
    });
    let caps = re.captures(text)?;
    let hours: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_from_diagnostics() {
        let text = "Input #0, mov,mp4, from 'in.mp4':\n  Duration: 00:03:00.05, start: 0.000000, bitrate: 1131 kb/s";
        let seconds = parse_duration_marker(text).unwrap();
        assert!((seconds - 180.05).abs() < 1e-9);
    }

    #[test]
    fn parses_hours_and_fractions() {
        let seconds = parse_duration_marker("Duration: 01:02:03.50").unwrap();
        assert!((seconds - 3723.5).abs() < 1e-9);
    }

    #[test]
    fn no_marker_yields_none() {
        assert!(parse_duration_marker("Stream mapping: ...").is_none());
    }

    #[test]
    fn missing_binary_yields_none() {
        let probe = DurationProbe::new("/nonexistent/encoder-binary");
        assert!(probe.probe_duration(Path::new("input.mp4")).is_none());
    }
}
