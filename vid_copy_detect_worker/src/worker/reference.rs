use std::path::Path;

use ffmpeg_frame_utils::{FfmpegError, FrameSamplerBuilder};
use vid_copy_detect_lib::{DetectionProvider, ReferenceCorpus};

use crate::worker::{detector::CmdlineDetector, WorkerError, DETECT_FRAME_SIZE};

/// Sample the reference video and run the detector over every sampled frame,
/// producing the corpus candidates are compared against.
///
/// Frames whose detection fails are skipped with a warning; the corpus is
/// built from the rest. A video yielding no usable frames at all is an error
/// because every comparison downstream would be meaningless.
pub fn build_reference_corpus(
    reference_video: &Path,
    frame_interval: u32,
    detector: &mut CmdlineDetector,
) -> Result<ReferenceCorpus, WorkerError> {
    let (width, height) = DETECT_FRAME_SIZE;
    let (mut frames, info) = FrameSamplerBuilder::new(reference_video)
        .frame_interval(frame_interval)
        .target_size(width, height)
        .spawn()?;

    info!(
        "reference video: {:.1}s, {} bytes, {:.2} fps source",
        info.duration().as_secs_f64(),
        info.file_size(),
        info.fps()
    );

    let mut frame_sets = Vec::new();
    for (frame_index, frame) in frames.by_ref().enumerate() {
        match detector.detect(&frame) {
            Ok(detections) => frame_sets.push(detections),
            Err(e) => warn!("reference frame {frame_index}: detection failed: {e}"),
        }
    }

    // A truncated corpus would silently weaken every comparison this worker
    // ever makes, so a decode timeout here is fatal.
    if frames.timed_out() {
        return Err(WorkerError::FrameExtraction(FfmpegError::DecodeTimeout));
    }

    if frame_sets.is_empty() {
        return Err(WorkerError::NoFrames(reference_video.to_path_buf()));
    }

    Ok(ReferenceCorpus::new(frame_sets))
}
