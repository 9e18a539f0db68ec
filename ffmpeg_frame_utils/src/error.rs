use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::probe::VideoInfoError;

/// Various causes of failure for ffmpeg/ffprobe operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum FfmpegError {
    /// Ffmpeg/Ffprobe command was not found. Make sure ffmpeg is installed and
    /// can be found on the command line.
    #[error("ffmpeg/ffprobe not found. Make sure ffmpeg/ffprobe are installed and visible on the command line")]
    FfmpegNotFound,

    /// Io error occurred while executing the ffmpeg/ffprobe command.
    #[error("Ffmpeg IO error: {0}")]
    Io(String),

    /// Ffmpeg/Ffprobe returned a nonzero exit code. Because ffmpeg sometimes
    /// prints very long error strings, only the first few hundred characters
    /// are kept.
    #[error("Internal Ffmpeg failure: {0}")]
    FfmpegInternal(String),

    /// Failed to interpret ffmpeg/ffprobe output as a utf8 string.
    #[error("utf8 parsing/conversion failure")]
    Utf8Conversion,

    /// The probed X or Y dimension of the video was zero, so no frame buffer
    /// size can be computed. Sometimes occurs when probing an audio file.
    #[error("video has an invalid resolution")]
    InvalidResolution,

    /// Frame decoding exceeded its deadline; any frames already produced
    /// cover only a prefix of the video.
    #[error("timed out while decoding video frames")]
    DecodeTimeout,

    /// Failed to obtain video information from ffprobe output.
    #[error("failed to get video properties")]
    Info(#[from] VideoInfoError),
}
