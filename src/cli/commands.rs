//! Command implementations

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::cli::args::{ConvertArgs, EstimateArgs};
use crate::engine::{
    ConversionMode, ConversionRequest, Encoder, JobStatus, Phase, PipelineController,
};
use crate::estimate;
use crate::probe::DurationProbe;

/// How often the shell polls the controller's published status
const POLL_INTERVAL: Duration = Duration::from_millis(150);

/// Execute the convert command
pub fn convert(args: ConvertArgs) -> Result<()> {
    let mode = ConversionMode::parse(&args.mode)?;
    let request = ConversionRequest::new(&args.input, &args.output, args.reduction, mode)?;

    let controller = PipelineController::new(Encoder::new(&args.encoder));
    controller.start(request)?;

    let mut reporter: Box<dyn ProgressReporter> = if args.json {
        Box::new(JsonReporter::new())
    } else {
        Box::new(ConsoleReporter::new())
    };

    // The shell only polls the snapshot; the worker owns the job.
    loop {
        let status = controller.status();
        reporter.report(&status);
        if status.phase.is_terminal() {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    controller.wait();
    reporter.finish();

    let status = controller.status();
    match status.phase {
        Phase::Completed => print_summary(Path::new(&args.input), Path::new(&args.output)),
        Phase::Stopped => {
            info!("Conversion stopped");
            Ok(())
        }
        _ => bail!("Conversion failed: {}", status.message),
    }
}

/// Execute the estimate command
pub fn estimate(args: EstimateArgs) -> Result<()> {
    let input = Path::new(&args.input);
    if !input.exists() {
        bail!("Input file does not exist: {}", args.input);
    }
    let reduction = estimate::clamp_reduction(args.reduction);
    let input_bytes = std::fs::metadata(input)
        .context("Failed to read input file size")?
        .len();

    let estimated_bytes = estimate::estimated_output_bytes(input_bytes, reduction);
    let crf = estimate::quality_for_reduction(reduction);

    // Best effort: without a duration there is no bitrate preview.
    let duration = DurationProbe::new(args.encoder.as_str()).probe_duration(input);
    let bitrate_kbps = duration.and_then(|seconds| {
        let input_mb = input_bytes as f64 / 1024.0 / 1024.0;
        let target_mb = input_mb * (1.0 - reduction as f64 / 100.0);
        estimate::bitrate_kbps(target_mb, seconds).ok()
    });

    if args.json {
        let event = serde_json::json!({
            "input": args.input,
            "input_bytes": input_bytes,
            "reduction_percent": reduction,
            "estimated_bytes": estimated_bytes,
            "crf": crf,
            "duration_seconds": duration,
            "bitrate_kbps": bitrate_kbps,
        });
        println!("{}", event);
    } else {
        println!("Input:           {:.2} MB", mb(input_bytes));
        println!("Reduction:       {}%", reduction);
        println!("Estimated size:  {:.2} MB (linear approximation)", mb(estimated_bytes));
        println!("Quality mode:    crf {}", crf);
        match (duration, bitrate_kbps) {
            (Some(seconds), Some(kbps)) => {
                println!("Duration:        {:.1}s", seconds);
                println!("Size mode:       {} kbps video", kbps);
            }
            _ => println!("Size mode:       unavailable (could not read duration)"),
        }
    }
    Ok(())
}

fn mb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

/// Final report mirroring the conversion dialog of the desktop shell
fn print_summary(input: &Path, output: &Path) -> Result<()> {
    let input_bytes = std::fs::metadata(input)?.len();
    let output_bytes = std::fs::metadata(output)?.len();
    let achieved = if input_bytes > 0 {
        (1.0 - output_bytes as f64 / input_bytes as f64) * 100.0
    } else {
        0.0
    };
    println!("Original: {:.2} MB", mb(input_bytes));
    println!("New:      {:.2} MB", mb(output_bytes));
    println!("Reduction: {:.1}%", achieved);
    Ok(())
}

/// Renders successive status snapshots for the user
trait ProgressReporter {
    fn report(&mut self, status: &JobStatus);
    fn finish(&mut self) {}
}

/// Console progress bar, redrawn in place
struct ConsoleReporter {
    last_phase: Option<Phase>,
    last_percent: f64,
}

impl ConsoleReporter {
    fn new() -> Self {
        Self {
            last_phase: None,
            last_percent: -1.0,
        }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn report(&mut self, status: &JobStatus) {
        if self.last_phase == Some(status.phase) && status.percent == self.last_percent {
            return;
        }
        self.last_phase = Some(status.phase);
        self.last_percent = status.percent;

        let bar_length = 20;
        let filled = (status.percent / 100.0 * bar_length as f64) as usize;
        let bar = "#".repeat(filled) + &"-".repeat(bar_length - filled);
        print!("\r[{}] {:>5.1}% {}        ", bar, status.percent, status.message);
        let _ = std::io::stdout().flush();
    }

    fn finish(&mut self) {
        println!();
    }
}

/// JSON event stream for machine consumers
struct JsonReporter {
    last_phase: Option<Phase>,
    last_percent: f64,
}

impl JsonReporter {
    fn new() -> Self {
        Self {
            last_phase: None,
            last_percent: -1.0,
        }
    }
}

impl ProgressReporter for JsonReporter {
    fn report(&mut self, status: &JobStatus) {
        if self.last_phase == Some(status.phase) && status.percent == self.last_percent {
            return;
        }
        self.last_phase = Some(status.phase);
        self.last_percent = status.percent;

        let event = serde_json::json!({
            "event": if status.phase.is_terminal() { "end" } else { "progress" },
            "phase": status.phase,
            "percent": status.percent,
            "message": status.message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        println!("{}", event);
    }
}
