use std::path::PathBuf;

use clap::Parser;

use crate::worker::{ReportVerbosity, WorkerCfg, WorkerError};

/// Watch a job queue for candidate videos and report footage copied from a
/// reference video.
#[derive(Parser, Debug)]
#[command(name = "vid_copy_detect_worker", version, about)]
struct Args {
    /// Root directory of the filesystem job queue.
    #[arg(long, value_name = "DIR")]
    queue_dir: PathBuf,

    /// Staging directory for downloads and extracted frames.
    #[arg(long, value_name = "DIR", default_value = "/tmp/vid_copy_detect")]
    scratch_dir: PathBuf,

    /// The reference video candidates are checked against.
    #[arg(long, value_name = "FILE")]
    reference_video: PathBuf,

    /// Object detector command line. Invoked once per sampled frame with the
    /// frame image path appended; must print a JSON detection array on stdout.
    #[arg(long, value_name = "CMD")]
    detector_cmd: String,

    /// Per-frame similarity required to count a frame as matched (0 to 1).
    #[arg(long, default_value_t = 0.5)]
    threshold: f64,

    /// Ignore detections below this confidence (0 to 1).
    #[arg(long, default_value_t = 0.3)]
    weight_threshold: f64,

    /// Discard matched segments shorter than this many seconds.
    #[arg(long, default_value_t = 0.5)]
    min_duration: f64,

    /// Flag the whole video as copied when at least this fraction of frames
    /// matched (0 to 1).
    #[arg(long, default_value_t = 0.5)]
    copied_fraction: f64,

    /// Sample every Nth frame of each video.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    frame_interval: u32,

    /// Seconds to sleep between queue polls when no work is pending.
    #[arg(long, default_value_t = 30)]
    poll_secs: u64,

    /// Drain the queue once and exit instead of polling forever.
    #[arg(long)]
    once: bool,

    /// Only log warnings and errors.
    #[arg(long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log everything.
    #[arg(long)]
    verbose: bool,
}

pub fn parse_args() -> Result<WorkerCfg, WorkerError> {
    let args = Args::parse();

    let detector_cmd = shell_words::split(&args.detector_cmd)
        .map_err(|e| WorkerError::DetectorCmd(e.to_string()))?;
    if detector_cmd.is_empty() {
        return Err(WorkerError::DetectorCmd(
            "detector command is empty".to_string(),
        ));
    }

    let verbosity = if args.quiet {
        ReportVerbosity::Quiet
    } else if args.verbose {
        ReportVerbosity::Verbose
    } else {
        ReportVerbosity::Default
    };

    Ok(WorkerCfg {
        queue_dir: args.queue_dir,
        scratch_dir: args.scratch_dir,
        reference_video: args.reference_video,
        detector_cmd,
        match_threshold: args.threshold,
        weight_threshold: args.weight_threshold,
        min_duration_secs: args.min_duration,
        copied_fraction: args.copied_fraction,
        frame_interval: args.frame_interval,
        poll_secs: args.poll_secs,
        once: args.once,
        verbosity,
    })
}
