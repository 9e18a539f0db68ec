use std::path::PathBuf;

use ffmpeg_frame_utils::FfmpegError;
use thiserror::Error;
use vid_copy_detect_lib::TimelineError;

#[derive(Error, Debug)]
pub enum WorkerError {
    /////////////////////////////////
    //job queue problems
    #[error("job queue error at {path}: {source}")]
    JobQueue {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed job file {path}: {reason}")]
    JobParse { path: PathBuf, reason: String },

    #[error("scratch directory error at {path}: {source}")]
    Scratch {
        path: PathBuf,
        source: std::io::Error,
    },

    /////////////////////////////////
    //fetching the candidate video
    #[error("failed to download video {video_id}: {reason}")]
    Download { video_id: String, reason: String },

    #[error("yt-dlp not found. Make sure yt-dlp is installed and visible on the command line")]
    YtDlpNotFound,

    /////////////////////////////////
    //frame extraction and detection
    #[error(transparent)]
    FrameExtraction(#[from] FfmpegError),

    #[error("no frames could be decoded from {}", .0.display())]
    NoFrames(PathBuf),

    #[error("bad detector command: {0}")]
    DetectorCmd(String),

    /////////////////////////////////
    //comparison configuration
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    /////////////////////////////////
    //reporting
    #[error("failed to write report for {video_id}: {reason}")]
    Report { video_id: String, reason: String },

    /// Shutdown was requested mid-job. The claimed job is deliberately left
    /// in place so a later run picks it up again.
    #[error("shutdown requested")]
    Aborted,
}

impl WorkerError {
    pub(crate) fn job_queue(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::JobQueue {
            path: path.into(),
            source,
        }
    }
}
