use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for timeline-level misconfiguration.
///
/// An fps at or below zero means the video metadata upstream is defective;
/// the segmenter fails fast rather than silently dividing by zero.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    #[error("invalid frames-per-second value (expected > 0): {0}")]
    InvalidFps(f64),
}

/// A maximal run of consecutive matched frames, reported as a time range.
///
/// Segments are non-overlapping and ordered by start frame. Frame indices are
/// positions in the *sampled* frame sequence, so `fps` must be the sampled
/// stream's rate (source fps divided by the sampling stride).
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Segment {
    pub start_frame: usize,
    pub end_frame: usize,
    /// Start of the range, formatted `HH:MM:SS.mmm` (hour field omitted when zero).
    pub start_time: String,
    /// End of the range (time of the last matched frame), same format.
    pub end_time: String,
    /// Human-readable duration, e.g. `"12.3s"`, `"2m 5.0s"`, `"1h 3m 2.0s"`.
    pub duration: String,
    /// Duration in seconds, rounded to 2 decimals.
    pub duration_secs: f64,
    pub frame_count: usize,
}

/// Frame indices whose flag is set, in ascending order.
pub fn matched_indices(flags: &[bool]) -> Vec<usize> {
    flags
        .iter()
        .enumerate()
        .filter_map(|(index, matched)| matched.then_some(index))
        .collect()
}

/// Convert a dense per-frame boolean sequence into contiguous time segments.
///
/// Runs of consecutive `true` frames are merged with strict adjacency (no gap
/// tolerance); segments shorter than `min_duration_secs` are discarded as
/// detector flicker. Pure: identical inputs always yield an identical list.
pub fn segment(flags: &[bool], fps: f64, min_duration_secs: f64) -> Result<Vec<Segment>, TimelineError> {
    segment_indices(matched_indices(flags), fps, min_duration_secs)
}

/// [`segment`] over pre-extracted matched frame indices.
///
/// Robust to duplicate and out-of-order indices (they are sorted and
/// deduplicated first), for callers that matched frames out of order.
pub fn segment_indices(
    indices: impl IntoIterator<Item = usize>,
    fps: f64,
    min_duration_secs: f64,
) -> Result<Vec<Segment>, TimelineError> {
    if !(fps > 0.0) {
        return Err(TimelineError::InvalidFps(fps));
    }

    let mut indices: Vec<usize> = indices.into_iter().collect();
    indices.sort_unstable();
    indices.dedup();

    let mut segments = vec![];
    let mut run: Option<(usize, usize)> = None;

    for index in indices {
        run = match run {
            None => Some((index, index)),
            Some((start, end)) if index == end + 1 => Some((start, index)),
            Some((start, end)) => {
                segments.extend(close_run(start, end, fps, min_duration_secs));
                Some((index, index))
            }
        };
    }
    if let Some((start, end)) = run {
        segments.extend(close_run(start, end, fps, min_duration_secs));
    }

    Ok(segments)
}

fn close_run(start_frame: usize, end_frame: usize, fps: f64, min_duration_secs: f64) -> Option<Segment> {
    let frame_count = end_frame - start_frame + 1;
    let duration_secs = frame_count as f64 / fps;
    if duration_secs < min_duration_secs {
        return None;
    }

    Some(Segment {
        start_frame,
        end_frame,
        start_time: frame_to_time(start_frame, fps),
        end_time: frame_to_time(end_frame, fps),
        duration: format_duration(duration_secs),
        duration_secs: (duration_secs * 100.0).round() / 100.0,
        frame_count,
    })
}

/// Format a frame index as a timestamp, `MM:SS.mmm` below one hour and
/// `HH:MM:SS.mmm` from one hour up.
///
/// # Panics
/// If fps is not greater than zero. Segmentation validates fps before any
/// conversion; direct callers carry the same precondition.
pub fn frame_to_time(frame_index: usize, fps: f64) -> String {
    assert!(fps > 0.0, "fps must be > 0, got {fps}");

    let total_seconds = frame_index as f64 / fps;
    let total_millis = (total_seconds * 1000.0).round() as u64;

    let hours = total_millis / 3_600_000;
    let minutes = (total_millis / 60_000) % 60;
    let seconds = (total_millis / 1000) % 60;
    let millis = total_millis % 1000;

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
    } else {
        format!("{minutes:02}:{seconds:02}.{millis:03}")
    }
}

/// Human-readable duration: `"12.3s"`, `"2m 5.0s"`, `"1h 3m 2.0s"`.
pub fn format_duration(duration_secs: f64) -> String {
    let whole_seconds = duration_secs as u64;

    if whole_seconds < 60 {
        format!("{duration_secs:.1}s")
    } else if whole_seconds < 3600 {
        let minutes = whole_seconds / 60;
        let seconds = duration_secs - (minutes * 60) as f64;
        format!("{minutes}m {seconds:.1}s")
    } else {
        let hours = whole_seconds / 3600;
        let minutes = (whole_seconds / 60) % 60;
        let seconds = duration_secs - (hours * 3600 + minutes * 60) as f64;
        format!("{hours}h {minutes}m {seconds:.1}s")
    }
}
