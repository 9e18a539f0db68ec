//! Thin wrapper around the ffmpeg and ffprobe command line tools.
//!
//! Provides what a frame-comparison pipeline needs from a video file and
//! nothing more:
//! * [`VideoInfo`]: duration, resolution, frame rate and file size via
//!   ffprobe;
//! * [`FrameSamplerBuilder`]: an iterator of RGB frames, sampling every Nth
//!   frame of the source at an optional reduced resolution, decoded by an
//!   ffmpeg child process and streamed over a pipe.
//!
//! ffmpeg and ffprobe must be installed and visible on the command line.
//! Calling them as subprocesses avoids linking problems and the licensing
//! questions static ffmpeg bindings raise.

pub(crate) mod error;
pub(crate) mod frame_iter;
pub(crate) mod probe;

pub use error::FfmpegError;
pub use frame_iter::{ffmpeg_and_ffprobe_are_callable, is_video_file, FrameIter, FrameSamplerBuilder};
pub use probe::{VideoInfo, VideoInfoError};
