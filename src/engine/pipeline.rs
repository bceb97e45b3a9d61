//! Pipeline controller: sequences encoder passes on a background worker
//!
//! One worker thread owns the active job and its subprocess handles. The
//! presentation shell only calls [`PipelineController::start`] and
//! [`PipelineController::cancel`] and polls the status snapshot; no other
//! shared mutable state crosses the boundary. At most one encoder subprocess
//! is alive at any instant: a pass is fully waited on before the next one
//! launches.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread::JoinHandle;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine::invocation::{cleanup_pass_logs, Encoder, EncoderInvocation};
use crate::engine::progress::{
    completion_fraction, parse_elapsed, Phase, ProgressSpan, StatusTracker,
};
use crate::engine::{ConversionMode, ConversionRequest};
use crate::error::{ShrinkError, ShrinkResult};
use crate::estimate;
use crate::probe::DurationProbe;

/// Result of a completed conversion
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutcome {
    /// Input size in bytes
    pub input_bytes: u64,
    /// Output size in bytes
    pub output_bytes: u64,
    /// Achieved reduction fraction, `1 - output/input`
    pub achieved_reduction: f64,
}

/// How a job ended, short of an error
enum JobEnd {
    Completed(ConversionOutcome),
    Stopped,
}

/// How a single pass ended
#[derive(Debug, PartialEq, Eq)]
enum PassEnd {
    Finished,
    Cancelled,
}

/// Per-job derived values, computed once at job start and immutable after
struct ConversionJob {
    request: ConversionRequest,
    duration_seconds: f64,
    input_bytes: u64,
    plan: PassPlan,
}

/// The encode parameters a job runs with
enum PassPlan {
    /// Single constant-quality pass
    Quality { crf: u8 },
    /// Two sequential passes sharing one bitrate
    TargetSize { bitrate_kbps: u32 },
}

/// Drives conversion jobs and publishes their observable state.
pub struct PipelineController {
    encoder: Encoder,
    tracker: StatusTracker,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PipelineController {
    pub fn new(encoder: Encoder) -> Self {
        Self {
            encoder,
            tracker: StatusTracker::new(),
            worker: Mutex::new(None),
        }
    }

    /// The observable `(phase, percent, message)` tuple for the shell.
    pub fn status(&self) -> crate::engine::progress::JobStatus {
        self.tracker.snapshot()
    }

    /// Ask the active job to stop; honored at the next consumed output line.
    pub fn cancel(&self) {
        info!("Cancellation requested");
        self.tracker.request_cancel();
    }

    /// Start a conversion job on the background worker.
    ///
    /// Fails with `InvalidRequest` while another job is active and with
    /// `EncoderNotFound` when the binary is missing; in both cases no job is
    /// created.
    pub fn start(&self, request: ConversionRequest) -> ShrinkResult<()> {
        self.encoder.check_available()?;

        let mut worker = self.worker.lock().map_err(|_| ShrinkError::InvalidRequest {
            message: "Pipeline state poisoned".to_string(),
        })?;

        let phase = self.tracker.snapshot().phase;
        if !(phase == Phase::Idle || phase.is_terminal()) {
            return Err(ShrinkError::InvalidRequest {
                message: "A conversion job is already running".to_string(),
            });
        }
        // Reap the previous job's thread, if any.
        if let Some(handle) = worker.take() {
            let _ = handle.join();
        }

        info!(
            "Starting conversion: {} -> {} ({}%, {:?})",
            request.input.display(),
            request.output.display(),
            request.reduction_percent,
            request.mode
        );

        self.tracker.begin();
        let encoder = self.encoder.clone();
        let tracker = self.tracker.clone();
        let handle = std::thread::spawn(move || run_worker(encoder, tracker, request));
        *worker = Some(handle);
        Ok(())
    }

    /// Block until the current worker (if any) has finished.
    pub fn wait(&self) {
        if let Ok(mut worker) = self.worker.lock() {
            if let Some(handle) = worker.take() {
                let _ = handle.join();
            }
        }
    }
}

/// Worker entry point: run the job, clean up, publish the terminal phase.
fn run_worker(encoder: Encoder, tracker: StatusTracker, request: ConversionRequest) {
    // Passes run in the output directory; pass statistics land there too.
    let workdir = request
        .output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let result = run_job(&encoder, &tracker, &request, &workdir);

    // Statistics artifacts are removed on every terminal transition,
    // successful or not; failures are logged, never surfaced.
    cleanup_pass_logs(&workdir);

    match result {
        Ok(JobEnd::Completed(outcome)) => {
            info!(
                "Conversion completed: {:.1}% reduced ({} -> {} bytes)",
                outcome.achieved_reduction * 100.0,
                outcome.input_bytes,
                outcome.output_bytes
            );
            tracker.set_phase(
                Phase::Completed,
                format!(
                    "Completed ({:.1}% reduced)",
                    outcome.achieved_reduction * 100.0
                ),
            );
        }
        Ok(JobEnd::Stopped) => {
            info!("Conversion stopped by user");
            tracker.set_phase(Phase::Stopped, "Stopped");
        }
        Err(e) => {
            warn!("Conversion failed: {}", e);
            tracker.set_phase(Phase::Failed, e.to_string());
        }
    }
}

fn run_job(
    encoder: &Encoder,
    tracker: &StatusTracker,
    request: &ConversionRequest,
    workdir: &Path,
) -> ShrinkResult<JobEnd> {
    let job = prepare_job(encoder, tracker, request)?;

    match job.plan {
        PassPlan::Quality { crf } => {
            tracker.set_phase(Phase::Converting, "Converting");
            let invocation = EncoderInvocation::quality_pass(&job.request.input, &job.request.output, crf);
            let end = run_pass(
                encoder,
                &invocation,
                workdir,
                job.duration_seconds,
                ProgressSpan::FULL,
                "Converting",
                tracker,
            )?;
            if end == PassEnd::Cancelled {
                return Ok(JobEnd::Stopped);
            }
        }
        PassPlan::TargetSize { bitrate_kbps } => {
            tracker.set_phase(Phase::Analyzing, "Analyzing");
            let first = EncoderInvocation::analysis_pass(&job.request.input, bitrate_kbps);
            let end = run_pass(
                encoder,
                &first,
                workdir,
                job.duration_seconds,
                ProgressSpan::FIRST_HALF,
                "Analyzing",
                tracker,
            )?;
            if end == PassEnd::Cancelled || tracker.cancel_requested() {
                return Ok(JobEnd::Stopped);
            }

            tracker.set_phase(Phase::Converting, "Converting");
            let second =
                EncoderInvocation::encode_pass(&job.request.input, &job.request.output, bitrate_kbps);
            let end = run_pass(
                encoder,
                &second,
                workdir,
                job.duration_seconds,
                ProgressSpan::SECOND_HALF,
                "Converting",
                tracker,
            )?;
            if end == PassEnd::Cancelled {
                return Ok(JobEnd::Stopped);
            }
        }
    }

    finish_job(&job)
}

/// Probe the input and derive the job's immutable encode parameters.
fn prepare_job(
    encoder: &Encoder,
    tracker: &StatusTracker,
    request: &ConversionRequest,
) -> ShrinkResult<ConversionJob> {
    tracker.set_phase(Phase::Probing, "Reading input duration");

    let probe = DurationProbe::new(encoder.binary().to_string_lossy().into_owned());
    let duration_seconds = probe
        .probe_duration(&request.input)
        .filter(|&seconds| seconds > 0.0)
        .ok_or_else(|| ShrinkError::DurationUnavailable {
            path: request.input.to_string_lossy().into_owned(),
        })?;

    let input_bytes = std::fs::metadata(&request.input)?.len();

    let plan = match request.mode {
        ConversionMode::QualityPriority => PassPlan::Quality {
            crf: estimate::quality_for_reduction(request.reduction_percent),
        },
        ConversionMode::TargetSize => {
            let input_mb = input_bytes as f64 / 1024.0 / 1024.0;
            let target_mb = input_mb * (1.0 - request.reduction_percent as f64 / 100.0);
            PassPlan::TargetSize {
                bitrate_kbps: estimate::bitrate_kbps(target_mb, duration_seconds)?,
            }
        }
    };

    match &plan {
        PassPlan::Quality { crf } => debug!("Planned quality pass, crf={}", crf),
        PassPlan::TargetSize { bitrate_kbps } => {
            debug!("Planned two-pass encode, bitrate={}kbps", bitrate_kbps)
        }
    }

    Ok(ConversionJob {
        request: request.clone(),
        duration_seconds,
        input_bytes,
        plan,
    })
}

/// Completion check: the output must exist on disk, whatever the encoder's
/// exit code claimed.
fn finish_job(job: &ConversionJob) -> ShrinkResult<JobEnd> {
    if !job.request.output.exists() {
        return Err(ShrinkError::OutputMissing {
            path: job.request.output.to_string_lossy().into_owned(),
        });
    }

    let output_bytes = std::fs::metadata(&job.request.output)?.len();
    let achieved_reduction = if job.input_bytes > 0 {
        1.0 - output_bytes as f64 / job.input_bytes as f64
    } else {
        0.0
    };

    Ok(JobEnd::Completed(ConversionOutcome {
        input_bytes: job.input_bytes,
        output_bytes,
        achieved_reduction,
    }))
}

/// Run one encoder invocation to completion, streaming its progress.
///
/// The subprocess is fully waited on before this returns, so the caller may
/// launch the next pass immediately.
fn run_pass(
    encoder: &Encoder,
    invocation: &EncoderInvocation,
    workdir: &Path,
    duration_seconds: f64,
    span: ProgressSpan,
    label: &str,
    tracker: &StatusTracker,
) -> ShrinkResult<PassEnd> {
    let mut child = encoder.spawn(invocation, workdir)?;
    let stderr = child.stderr.take().ok_or_else(|| ShrinkError::LaunchFailure {
        message: "Encoder stderr was not captured".to_string(),
    })?;

    let end = drive_progress(BufReader::new(stderr), duration_seconds, span, label, tracker);

    if end == PassEnd::Cancelled {
        debug!("Terminating encoder subprocess after cancellation");
        let _ = child.kill();
    }
    let status = child.wait()?;
    if end == PassEnd::Finished && !status.success() {
        // Exit codes are advisory only; the completion check decides.
        debug!("Encoder exited with status {:?}", status.code());
    }
    Ok(end)
}

/// Consume progress lines, checking the cancellation flag once per line.
///
/// Cancellation latency is bounded by the gap between two progress lines,
/// not instantaneous.
fn drive_progress<R: BufRead>(
    mut reader: R,
    duration_seconds: f64,
    span: ProgressSpan,
    label: &str,
    tracker: &StatusTracker,
) -> PassEnd {
    let mut line = String::new();
    while next_output_line(&mut reader, &mut line) {
        if tracker.cancel_requested() {
            return PassEnd::Cancelled;
        }
        if let Some(elapsed) = parse_elapsed(&line) {
            let fraction = completion_fraction(elapsed, duration_seconds);
            let percent = span.overall_percent(fraction);
            tracker.update_percent(percent, format!("{}… {:.0}%", label, percent));
        }
    }
    PassEnd::Finished
}

/// Read one encoder output line, treating both `\r` and `\n` as terminators.
///
/// The encoder rewrites its status line in place: updates are `\r`-terminated
/// with no trailing newline, so splitting on `\n` alone would buffer an
/// entire pass as one line and starve both progress and the cancellation
/// check. Returns false at end of stream or on a read error.
fn next_output_line<R: BufRead>(reader: &mut R, line: &mut String) -> bool {
    let mut bytes = Vec::new();
    loop {
        let (found_terminator, used) = {
            let available = match reader.fill_buf() {
                Ok(available) => available,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => return false,
            };
            if available.is_empty() {
                // End of stream; flush an unterminated tail, if any.
                if bytes.is_empty() {
                    return false;
                }
                (true, 0)
            } else {
                match available.iter().position(|&b| b == b'\r' || b == b'\n') {
                    Some(i) => {
                        bytes.extend_from_slice(&available[..i]);
                        (true, i + 1)
                    }
                    None => {
                        bytes.extend_from_slice(available);
                        (false, available.len())
                    }
                }
            }
        };
        reader.consume(used);
        if found_terminator {
            *line = String::from_utf8_lossy(&bytes).into_owned();
            return true;
        }
    }
}
