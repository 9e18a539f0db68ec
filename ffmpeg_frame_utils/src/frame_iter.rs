use std::{
    ffi::OsStr,
    io::prelude::*,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    time::{Duration, SystemTime},
};

use image::RgbImage;
use FfmpegCommandName::*;
use FfmpegError::*;

use crate::{error::FfmpegError, probe::VideoInfo};

const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Builder for an ffmpeg child process that samples every Nth frame of a
/// video and streams the sampled frames back as raw RGB over a pipe.
#[derive(Clone, Debug)]
pub struct FrameSamplerBuilder {
    src_path: PathBuf,
    frame_interval: u32,
    target_size: Option<(u32, u32)>,
    timeout_secs: Option<u64>,
}

impl FrameSamplerBuilder {
    pub fn new(src_path: impl AsRef<Path>) -> Self {
        Self {
            src_path: src_path.as_ref().to_path_buf(),
            frame_interval: 1,
            target_size: None,
            timeout_secs: None,
        }
    }

    pub fn src_path(&self) -> &Path {
        &self.src_path
    }

    /// Keep only every Nth frame of the source (1 keeps all frames).
    pub fn frame_interval(&mut self, frame_interval: u32) -> &mut Self {
        assert!(frame_interval >= 1, "frame_interval must be at least 1");
        self.frame_interval = frame_interval;
        self
    }

    /// Scale sampled frames to the given (width, height) before they are
    /// returned. Without this, frames come back at source resolution.
    pub fn target_size(&mut self, width: u32, height: u32) -> &mut Self {
        self.target_size = Some((width, height));
        self
    }

    /// Abandon decoding if it has not finished after this long.
    pub fn timeout_secs(&mut self, timeout_secs: u64) -> &mut Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    /// Probe the video and spawn the decoding child process.
    ///
    /// Returns the frame iterator together with the probed [`VideoInfo`]
    /// (the caller usually needs the frame rate to interpret frame indices).
    pub fn spawn(&self) -> Result<(FrameIter, VideoInfo), FfmpegError> {
        let info = VideoInfo::new(&self.src_path)?;

        //bail out early if the frame buffer size cannot be computed.
        let (src_x, src_y) = info.resolution();
        if src_x == 0 || src_y == 0 {
            return Err(FfmpegError::InvalidResolution);
        }
        let (x, y) = self.target_size.unwrap_or((src_x, src_y));
        if x == 0 || y == 0 {
            return Err(FfmpegError::InvalidResolution);
        }

        // select keeps every Nth frame; scale reduces resolution before the
        // pipe. -vsync 0 stops ffmpeg re-duplicating dropped frames.
        let mut filters = vec![format!("select=not(mod(n\\,{}))", self.frame_interval)];
        if self.target_size.is_some() {
            filters.push(format!("scale={x}:{y}"));
        }
        let filter_string = filters.join(",");

        #[rustfmt::skip]
        let args = vec![
            OsStr::new("-hide_banner"),
            OsStr::new("-loglevel"), OsStr::new("warning"),
            OsStr::new("-nostats"),
            OsStr::new("-threads"), OsStr::new("1"),
            OsStr::new("-i"),       self.src_path.as_os_str(),
            OsStr::new("-vf"),      OsStr::new(&filter_string),
            OsStr::new("-vsync"),   OsStr::new("0"),
            OsStr::new("-pix_fmt"), OsStr::new("rgb24"),
            OsStr::new("-c:v"),     OsStr::new("rawvideo"),
            OsStr::new("-f"),       OsStr::new("image2pipe"),
            OsStr::new("-"),
        ];

        let child = spawn_ffmpeg_command(Ffmpeg, &args)?;

        let timeout = Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let frame_iter = FrameIter {
            x,
            y,
            child,
            timeout_time: SystemTime::now() + timeout,
            finished: false,
            timed_out: false,
        };

        Ok((frame_iter, info))
    }
}

/// Iterator over the sampled frames of one video, decoded by an ffmpeg child
/// process. Yields frames in playback order; the position in this iterator is
/// the frame's index in the sampled sequence.
#[derive(Debug)]
pub struct FrameIter {
    x: u32,
    y: u32,
    child: Child,
    timeout_time: SystemTime,
    finished: bool,
    timed_out: bool,
}

impl FrameIter {
    /// True when iteration stopped because the decode deadline passed rather
    /// than because the stream ended. The frames already yielded then cover
    /// only a prefix of the video; callers must not treat them as complete.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }
}

impl Iterator for FrameIter {
    type Item = RgbImage;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if SystemTime::now() > self.timeout_time {
            self.finished = true;
            self.timed_out = true;
            let _kill_error = self.child.kill();
            let _wait_error = self.child.wait();
            return None;
        }

        let raw_buf_size = usize::try_from(self.x)
            .ok()?
            .checked_mul(usize::try_from(self.y).ok()?)?
            .checked_mul(3)?;
        let mut raw_buf = vec![0u8; raw_buf_size];

        // Read exactly one frame's worth of bytes, or give up on timeout/EOF.
        let stdout = self.child.stdout.as_mut()?;
        let mut buf_head = 0;
        while buf_head < raw_buf.len() {
            if SystemTime::now() > self.timeout_time {
                self.finished = true;
                self.timed_out = true;
                return None;
            }

            match stdout.read(&mut raw_buf[buf_head..]) {
                //something went wrong, or no more data can be read
                Err(_) | Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(bytes_read) => buf_head += bytes_read,
            }
        }

        RgbImage::from_raw(self.x, self.y, raw_buf)
    }
}

// to prevent accumulation of zombie processes, reap the return code of
// the ffmpeg subcommand (if nothing else has done so already) here
impl Drop for FrameIter {
    fn drop(&mut self) {
        let _kill_error = self.child.kill();
        let _wait_error = self.child.wait();
    }
}

pub(crate) fn get_video_stats<P: AsRef<Path>>(src_path: P) -> Result<String, FfmpegError> {
    let args = &[
        OsStr::new("-v"),
        OsStr::new("quiet"),
        OsStr::new("-show_format"),
        OsStr::new("-show_streams"),
        OsStr::new("-print_format"),
        OsStr::new("json"),
        OsStr::new(src_path.as_ref()),
    ];

    let stdout = run_ffmpeg_command(Ffprobe, args)?;

    String::from_utf8(stdout).map_err(|_| Utf8Conversion)
}

/// Ask ffprobe whether the file at src_path holds a playable video stream
/// at least one second long.
pub fn is_video_file<P: AsRef<Path>>(src_path: P) -> Result<bool, FfmpegError> {
    #[rustfmt::skip]
    let args = &[
        OsStr::new("-v"),              OsStr::new("error"),
        OsStr::new("-select_streams"), OsStr::new("v"),
        OsStr::new("-show_entries"),   OsStr::new("stream=codec_type,codec_name,duration"),
        OsStr::new("-of"),             OsStr::new("compact=p=0:nk=1"),
        OsStr::new(src_path.as_ref()),
    ];

    let streams_string = run_ffmpeg_command(Ffprobe, args).and_then(|stdout| {
        String::from_utf8(stdout)
            .map_err(|_| Utf8Conversion)
            .map(|s| s.trim().to_string())
    })?;

    let mut fields_iter = streams_string.split('|');

    let _codec_name = fields_iter.next().unwrap_or("");
    let codec_type = fields_iter.next().unwrap_or("");
    let duration = fields_iter
        .next()
        .unwrap_or("")
        .trim()
        .parse::<f64>()
        .unwrap_or(999.0);

    if codec_type != "video" {
        return Ok(false);
    }

    if duration < 1.0 {
        return Ok(false);
    }

    Ok(true)
}

pub fn ffmpeg_and_ffprobe_are_callable() -> bool {
    //check ffprobe is callable.
    if run_ffmpeg_command(Ffprobe, &[OsStr::new("-version")]).is_err() {
        return false;
    }

    //now ffmpeg.
    if run_ffmpeg_command(Ffmpeg, &[OsStr::new("-version")]).is_err() {
        return false;
    }

    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FfmpegCommandName {
    Ffprobe,
    Ffmpeg,
}

impl FfmpegCommandName {
    pub fn as_os_str(&self) -> &'static OsStr {
        match self {
            Self::Ffprobe => OsStr::new("ffprobe"),
            Self::Ffmpeg => OsStr::new("ffmpeg"),
        }
    }
}

fn spawn_ffmpeg_command(name: FfmpegCommandName, args: &[&OsStr]) -> Result<Child, FfmpegError> {
    let mut command = Command::new(name.as_os_str());
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    command.spawn().map_err(|e| match e.kind() {
        //shell failed to execute the command. Separate out FileNotFound from all other errors
        //as by far the most likely cause is ffmpeg is not installed.
        std::io::ErrorKind::NotFound => FfmpegNotFound,
        _ => Io(format!("{:?}", e.kind())),
    })
}

fn run_ffmpeg_command(name: FfmpegCommandName, args: &[&OsStr]) -> Result<Vec<u8>, FfmpegError> {
    let output = Command::new(name.as_os_str())
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FfmpegNotFound,
            _ => Io(format!("{:?}", e.kind())),
        })?;

    if !output.status.success() {
        return Err(match std::str::from_utf8(&output.stderr) {
            Ok(error_text) => FfmpegInternal(error_text.chars().take(500).collect::<String>()),
            Err(_) => Utf8Conversion,
        });
    }

    Ok(output.stdout)
}
