use std::path::PathBuf;

/// All frames are scaled to this size before detection. Reference and
/// candidate must agree on it or bounding boxes would live in different
/// coordinate spaces and the spatial comparison term would be meaningless.
pub const DETECT_FRAME_SIZE: (u32, u32) = (640, 360);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportVerbosity {
    Quiet,
    Default,
    Verbose,
}

/// Fully-resolved worker configuration, produced by argument parsing.
#[derive(Debug, Clone)]
pub struct WorkerCfg {
    /// Root of the filesystem job queue (pending/claimed/processed/failed
    /// live underneath).
    pub queue_dir: PathBuf,

    /// Where downloaded videos and extracted frames are staged. One
    /// subdirectory per job, removed after the job finishes.
    pub scratch_dir: PathBuf,

    /// The video whose footage candidates are checked against.
    pub reference_video: PathBuf,

    /// External object detector invocation, argv-style. The frame image path
    /// is appended as the final argument.
    pub detector_cmd: Vec<String>,

    /// Per-frame similarity required to count a frame as matched, 0..=1.
    pub match_threshold: f64,

    /// Detections below this confidence are ignored, 0..=1.
    pub weight_threshold: f64,

    /// Matched runs shorter than this many seconds are discarded.
    pub min_duration_secs: f64,

    /// Fraction of matched frames above which the whole video is flagged
    /// as copied, 0..=1.
    pub copied_fraction: f64,

    /// Sample every Nth frame of each video.
    pub frame_interval: u32,

    /// How long to sleep between queue polls when no work is pending.
    pub poll_secs: u64,

    /// Drain the queue once and exit instead of polling forever.
    pub once: bool,

    pub verbosity: ReportVerbosity,
}
