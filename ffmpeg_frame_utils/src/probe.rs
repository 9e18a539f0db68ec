use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{error::FfmpegError, frame_iter::get_video_stats};

#[derive(Debug, Deserialize, Serialize, Clone, Error)]
pub enum VideoInfoError {
    #[error("Error parsing stats: {0}")]
    JsonError(String),
    #[error("Error parsing stats: {0}")]
    ParseIntError(String),
    #[error("Error parsing stats: {0}")]
    ParseFloatError(String),
}

impl From<serde_json::Error> for VideoInfoError {
    fn from(e: serde_json::Error) -> Self {
        //limit maximum number of characters
        let error_string = format!("{e}").chars().take(500).collect::<String>();
        VideoInfoError::JsonError(error_string)
    }
}

impl From<std::num::ParseIntError> for VideoInfoError {
    fn from(e: std::num::ParseIntError) -> Self {
        VideoInfoError::ParseIntError(format!("{e}"))
    }
}

impl From<std::num::ParseFloatError> for VideoInfoError {
    fn from(e: std::num::ParseFloatError) -> Self {
        VideoInfoError::ParseFloatError(format!("{e}"))
    }
}

/// The video metadata a frame-sampling pipeline needs, obtained with ffprobe.
#[derive(PartialEq, Clone, Debug, Serialize, Deserialize, Default)]
pub struct VideoInfo {
    duration: std::time::Duration,
    file_size: u64,
    resolution: (u32, u32),
    fps: f64,
}

impl VideoInfo {
    /// Use ffprobe to get the duration, resolution and frame rate of a video.
    /// If the video contains multiple streams only the first video stream is
    /// considered.
    ///
    /// # errors
    /// * The file cannot be read or is not recognized as a video by ffprobe
    /// * The output from ffprobe could not be parsed as JSON
    pub fn new<P>(src_path: P) -> Result<Self, FfmpegError>
    where
        P: AsRef<Path>,
    {
        let stats_string = get_video_stats(&src_path)?;
        Self::parse(&stats_string).map_err(FfmpegError::from)
    }

    fn parse(stats_string: &str) -> Result<Self, VideoInfoError> {
        let stats_parsed: Value = serde_json::from_str(stats_string)?;

        let duration = if let Value::String(d) = &stats_parsed["format"]["duration"] {
            std::time::Duration::from_secs_f64(d.parse().map_err(VideoInfoError::from)?)
        } else {
            std::time::Duration::from_secs_f64(0.0)
        };

        let file_size = if let Value::String(s) = &stats_parsed["format"]["size"] {
            s.parse().map_err(VideoInfoError::from)?
        } else {
            0
        };

        let resolution = {
            let width = Self::first_vid_u32(&stats_parsed, "width").unwrap_or(0);
            let height = Self::first_vid_u32(&stats_parsed, "height").unwrap_or(0);
            (width, height)
        };

        // ffprobe reports frame rates as fractions ("30000/1001"). Prefer the
        // average rate; fall back to the declared rate when it is absent.
        let fps = Self::first_vid_fraction(&stats_parsed, "avg_frame_rate")
            .or_else(|| Self::first_vid_fraction(&stats_parsed, "r_frame_rate"))
            .unwrap_or(0.0);

        Ok(VideoInfo {
            duration,
            file_size,
            resolution,
            fps,
        })
    }

    /// The duration of the video.
    pub fn duration(&self) -> std::time::Duration {
        self.duration
    }

    /// The size of the video file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// The resolution of the video in pixels.
    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    /// The frame rate of the first video stream, in frames per second.
    /// 0.0 when ffprobe reported no usable rate; callers requiring time
    /// conversion must treat that as an error.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    fn first_video(stats_parsed: &Value) -> Option<&Value> {
        if let Value::Array(streams) = &stats_parsed["streams"] {
            streams.iter().find(|s| match &s["codec_type"] {
                Value::String(codec_type) => codec_type == "video",
                _ => false,
            })
        } else {
            None
        }
    }

    fn first_vid_u32(stats_parsed: &Value, field_name: &str) -> Option<u32> {
        let stream = Self::first_video(stats_parsed)?;
        if let Value::Number(v) = &stream[field_name] {
            Some(v.as_u64()? as u32)
        } else {
            None
        }
    }

    fn first_vid_fraction(stats_parsed: &Value, field_name: &str) -> Option<f64> {
        let stream = Self::first_video(stats_parsed)?;
        let Value::String(raw) = &stream[field_name] else {
            return None;
        };

        parse_fraction(raw).filter(|fps| *fps > 0.0)
    }
}

//ffprobe rational, e.g. "30000/1001", "25/1". "0/0" means unknown.
fn parse_fraction(raw: &str) -> Option<f64> {
    match raw.split_once('/') {
        Some((numerator, denominator)) => {
            let numerator: f64 = numerator.trim().parse().ok()?;
            let denominator: f64 = denominator.trim().parse().ok()?;
            (denominator != 0.0).then(|| numerator / denominator)
        }
        None => raw.trim().parse().ok(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const FFPROBE_JSON: &str = r#"{
        "streams": [
            {"codec_type": "audio", "codec_name": "aac"},
            {
                "codec_type": "video",
                "codec_name": "h264",
                "width": 1920,
                "height": 1080,
                "avg_frame_rate": "30000/1001",
                "r_frame_rate": "30/1"
            }
        ],
        "format": {"duration": "12.480000", "size": "1048576"}
    }"#;

    #[test]
    fn test_parse_ffprobe_output() {
        let info = VideoInfo::parse(FFPROBE_JSON).unwrap();
        assert_eq!(info.resolution(), (1920, 1080));
        assert_eq!(info.file_size(), 1048576);
        assert_eq!(info.duration(), std::time::Duration::from_secs_f64(12.48));
        assert!((info.fps() - 30000.0 / 1001.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_frame_rate_falls_back_then_zero() {
        let json = r#"{
            "streams": [{"codec_type": "video", "width": 640, "height": 360,
                         "avg_frame_rate": "0/0", "r_frame_rate": "25/1"}],
            "format": {}
        }"#;
        let info = VideoInfo::parse(json).unwrap();
        assert_eq!(info.fps(), 25.0);

        let json = r#"{
            "streams": [{"codec_type": "video", "width": 640, "height": 360,
                         "avg_frame_rate": "0/0", "r_frame_rate": "0/0"}],
            "format": {}
        }"#;
        let info = VideoInfo::parse(json).unwrap();
        assert_eq!(info.fps(), 0.0);
    }

    #[test]
    fn test_parse_fraction() {
        assert_eq!(parse_fraction("25/1"), Some(25.0));
        assert_eq!(parse_fraction("0/0"), None);
        assert_eq!(parse_fraction("24"), Some(24.0));
        assert_eq!(parse_fraction("garbage"), None);
    }

    #[test]
    fn test_missing_video_stream() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {}}"#;
        let info = VideoInfo::parse(json).unwrap();
        assert_eq!(info.resolution(), (0, 0));
        assert_eq!(info.fps(), 0.0);
    }
}
