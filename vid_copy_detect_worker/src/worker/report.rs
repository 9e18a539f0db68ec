use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use vid_copy_detect_lib::{ReuseReport, Segment};

use crate::worker::WorkerError;

/// The JSON document written for a successfully processed video.
#[derive(Debug, Clone, Serialize)]
pub struct VideoReport {
    pub video_id: String,
    pub status: &'static str,
    pub copied: bool,
    pub copy_percentage: f64,
    pub matched_frames: usize,
    pub total_frames: usize,
    pub failed_frames: usize,
    pub timestamps: Vec<Segment>,
    pub processed_at: String,
}

impl VideoReport {
    /// `copied_fraction` is the share of matched frames at which the whole
    /// video is flagged as copied. A video with no frames is never copied.
    pub fn new(video_id: &str, report: &ReuseReport, copied_fraction: f64) -> Self {
        let total_frames = report.total_frames();
        let matched_frames = report.matched_frames();
        let copied =
            total_frames > 0 && matched_frames as f64 / total_frames as f64 >= copied_fraction;

        Self {
            video_id: video_id.to_string(),
            status: "processed",
            copied,
            copy_percentage: round2(report.copy_percentage),
            matched_frames,
            total_frames,
            failed_frames: report.failed_frames(),
            timestamps: report.segments.clone(),
            processed_at: now_rfc3339(),
        }
    }

    pub fn to_json(&self) -> Result<String, WorkerError> {
        serde_json::to_string_pretty(self).map_err(|e| WorkerError::Report {
            video_id: self.video_id.clone(),
            reason: e.to_string(),
        })
    }
}

/// The JSON document written when processing a video failed outright.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub video_id: String,
    pub status: &'static str,
    pub error: String,
    pub processed_at: String,
}

impl FailureReport {
    pub fn new(video_id: &str, error: &WorkerError) -> Self {
        Self {
            video_id: video_id.to_string(),
            status: "failed",
            error: error.to_string(),
            processed_at: now_rfc3339(),
        }
    }

    pub fn to_json(&self) -> Result<String, WorkerError> {
        serde_json::to_string_pretty(self).map_err(|e| WorkerError::Report {
            video_id: self.video_id.clone(),
            reason: e.to_string(),
        })
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
