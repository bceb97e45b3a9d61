//! Progress parsing and observable job status
//!
//! The encoder streams free-form text while it works; the only machine-usable
//! signal in it is the `time=HH:MM:SS.frac` marker. This module extracts that
//! marker, maps it into an overall completion percentage, and publishes the
//! result through a thread-safe tracker the presentation shell can poll.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Conversion phases, in lifecycle order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No job active
    Idle,
    /// Awaiting duration from the probe
    Probing,
    /// First pass of a two-pass encode (statistics only)
    Analyzing,
    /// Encoding the real output
    Converting,
    /// Cancelled by the user
    Stopped,
    /// Output produced and verified on disk
    Completed,
    /// Job failed
    Failed,
}

impl Phase {
    /// Terminal phases end the job; a new one may then be started.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Stopped | Phase::Completed | Phase::Failed)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Idle => "Idle",
            Phase::Probing => "Probing",
            Phase::Analyzing => "Analyzing",
            Phase::Converting => "Converting",
            Phase::Stopped => "Stopped",
            Phase::Completed => "Completed",
            Phase::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

/// A point-in-time snapshot of the running job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    /// Current phase
    pub phase: Phase,
    /// Overall completion percentage (0-100)
    pub percent: f64,
    /// Human-readable status text
    pub message: String,
}

impl JobStatus {
    fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            percent: 0.0,
            message: "Idle".to_string(),
        }
    }
}

/// Extract the last elapsed-time marker from one line of encoder output.
///
/// Lines without a `time=` marker yield `None` and must leave the published
/// progress untouched.
pub fn parse_elapsed(line: &str) -> Option<f64> {
    static ELAPSED_MARKER: OnceLock<Regex> = OnceLock::new();
    let re = ELAPSED_MARKER
        .get_or_init(|| Regex::new(r"time=(\d+):(\d+):(\d+\.?\d*)").expect("valid marker pattern"));
    let caps = re.captures_iter(line).last()?;
    let hours: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Convert an elapsed time into a completion fraction, clamped to [0, 1].
pub fn completion_fraction(elapsed: f64, total_duration: f64) -> f64 {
    if total_duration <= 0.0 {
        return 0.0;
    }
    (elapsed / total_duration).clamp(0.0, 1.0)
}

/// Maps a single pass's 0-1 completion onto a window of overall progress.
///
/// Quality mode runs one pass over the full window; size mode maps pass 1
/// onto 0-50% and pass 2 onto 50-100%.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSpan {
    start_percent: f64,
    end_percent: f64,
}

impl ProgressSpan {
    pub const FULL: ProgressSpan = ProgressSpan {
        start_percent: 0.0,
        end_percent: 100.0,
    };
    pub const FIRST_HALF: ProgressSpan = ProgressSpan {
        start_percent: 0.0,
        end_percent: 50.0,
    };
    pub const SECOND_HALF: ProgressSpan = ProgressSpan {
        start_percent: 50.0,
        end_percent: 100.0,
    };

    /// Map a 0-1 pass fraction onto this window's overall percentage.
    pub fn overall_percent(&self, fraction: f64) -> f64 {
        let fraction = fraction.clamp(0.0, 1.0);
        self.start_percent + fraction * (self.end_percent - self.start_percent)
    }
}

/// Thread-safe observable status shared between worker and shell.
///
/// The worker is the only writer of phase/progress; the shell polls
/// [`StatusTracker::snapshot`] and may set the cancellation flag. Percent is
/// monotonically non-decreasing within a phase: stale or markerless updates
/// never move the bar backwards.
#[derive(Clone)]
pub struct StatusTracker {
    status: Arc<Mutex<JobStatus>>,
    cancel: Arc<AtomicBool>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self {
            status: Arc::new(Mutex::new(JobStatus::idle())),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Reset to a fresh job about to start.
    pub fn begin(&self) {
        self.cancel.store(false, Ordering::SeqCst);
        if let Ok(mut status) = self.status.lock() {
            status.phase = Phase::Probing;
            status.percent = 0.0;
            status.message = "Starting".to_string();
        }
    }

    /// Enter a new phase; progress may restart from the phase floor.
    pub fn set_phase(&self, phase: Phase, message: impl Into<String>) {
        if let Ok(mut status) = self.status.lock() {
            status.phase = phase;
            status.message = message.into();
            if phase == Phase::Completed {
                status.percent = 100.0;
            }
        }
    }

    /// Publish a new overall percentage; lower values are ignored.
    pub fn update_percent(&self, percent: f64, message: impl Into<String>) {
        if let Ok(mut status) = self.status.lock() {
            if percent > status.percent {
                status.percent = percent;
                status.message = message.into();
            }
        }
    }

    /// Read the current `(phase, percent, message)` tuple.
    pub fn snapshot(&self) -> JobStatus {
        self.status
            .lock()
            .map(|status| status.clone())
            .unwrap_or_else(|_| JobStatus::idle())
    }

    /// Ask the worker to stop at its next progress line.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Checked by the worker once per consumed output line.
    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_elapsed_marker() {
        let line = "frame= 1234 fps= 56 q=28.0 size=    2048kB time=00:01:30.00 bitrate= 186.2kbits/s";
        let elapsed = parse_elapsed(line).unwrap();
        assert!((elapsed - 90.0).abs() < 1e-9);
    }

    #[test]
    fn takes_last_marker_on_line() {
        let line = "time=00:00:10.00 ... time=00:00:40.00";
        assert!((parse_elapsed(line).unwrap() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn line_without_marker_is_none() {
        assert!(parse_elapsed("Press [q] to stop, [?] for help").is_none());
        assert!(parse_elapsed("").is_none());
    }

    #[test]
    fn fraction_is_clamped() {
        assert!((completion_fraction(90.0, 180.0) - 0.5).abs() < 1e-9);
        assert_eq!(completion_fraction(400.0, 180.0), 1.0);
        assert_eq!(completion_fraction(10.0, 0.0), 0.0);
    }

    #[test]
    fn spans_map_pass_progress() {
        assert_eq!(ProgressSpan::FULL.overall_percent(0.5), 50.0);
        assert_eq!(ProgressSpan::FIRST_HALF.overall_percent(1.0), 50.0);
        assert_eq!(ProgressSpan::SECOND_HALF.overall_percent(0.0), 50.0);
        assert_eq!(ProgressSpan::SECOND_HALF.overall_percent(0.5), 75.0);
    }

    #[test]
    fn percent_is_monotone() {
        let tracker = StatusTracker::new();
        tracker.begin();
        tracker.update_percent(40.0, "forward");
        tracker.update_percent(25.0, "stale");
        let status = tracker.snapshot();
        assert_eq!(status.percent, 40.0);
        assert_eq!(status.message, "forward");
    }

    #[test]
    fn markerless_line_leaves_progress_untouched() {
        let tracker = StatusTracker::new();
        tracker.begin();
        tracker.update_percent(30.0, "Converting");
        if let Some(elapsed) = parse_elapsed("configuration: --enable-gpl") {
            tracker.update_percent(elapsed, "unexpected");
        }
        assert_eq!(tracker.snapshot().percent, 30.0);
    }

    #[test]
    fn cancel_flag_round_trip() {
        let tracker = StatusTracker::new();
        assert!(!tracker.cancel_requested());
        tracker.request_cancel();
        assert!(tracker.cancel_requested());
        tracker.begin();
        assert!(!tracker.cancel_requested());
    }

    #[test]
    fn completion_pins_percent() {
        let tracker = StatusTracker::new();
        tracker.begin();
        tracker.set_phase(Phase::Completed, "done");
        assert_eq!(tracker.snapshot().percent, 100.0);
        assert!(tracker.snapshot().phase.is_terminal());
    }
}
