use log::warn;

use crate::{
    comparison::similarity::{similarity, MatchThreshold, SimilarityCfg, SimilarityScore},
    detection::{DetectionSet, ReferenceCorpus},
};

/// Typed per-frame outcome of matching one candidate frame against the
/// reference corpus.
///
/// `Failed` records a frame whose detections could not be produced at all
/// (unreadable image, detector error). It collapses to "unmatched" at the
/// segmentation edge, but stays distinguishable from a genuine non-match so
/// failures remain observable.
#[derive(Clone, PartialEq, Debug)]
pub enum FrameVerdict {
    /// Best similarity over the corpus reached the threshold.
    Matched(SimilarityScore),
    /// Best similarity over the corpus fell short of the threshold.
    Unmatched(SimilarityScore),
    /// Detection failed for this frame; the reason is kept for diagnostics.
    Failed(String),
}

impl FrameVerdict {
    pub fn is_match(&self) -> bool {
        matches!(self, FrameVerdict::Matched(_))
    }

    /// The best similarity score found, if detection succeeded.
    pub fn best_score(&self) -> Option<SimilarityScore> {
        match self {
            FrameVerdict::Matched(score) | FrameVerdict::Unmatched(score) => Some(*score),
            FrameVerdict::Failed(_) => None,
        }
    }
}

/// Match every candidate frame against the reference corpus.
///
/// Each frame's best similarity over all corpus entries decides its verdict.
/// The scan short-circuits once the threshold is reached, which cannot change
/// the verdict (only the exact best score recorded for an already-matched
/// frame).
///
/// The output always has one verdict per input frame, in input order:
/// * a frame whose detection failed upstream becomes [`FrameVerdict::Failed`]
///   and processing continues with the next frame;
/// * an empty corpus yields all-unmatched verdicts at any threshold,
///   including 0 (and a logged warning, since that almost certainly means
///   reference preparation went wrong).
pub fn match_frames<I, E>(
    corpus: &ReferenceCorpus,
    candidate_frames: I,
    threshold: MatchThreshold,
    similarity_cfg: &SimilarityCfg,
) -> Vec<FrameVerdict>
where
    I: IntoIterator<Item = Result<DetectionSet, E>>,
    E: std::fmt::Display,
{
    if corpus.is_empty() {
        warn!("reference corpus is empty: no candidate frame can match");
    }

    candidate_frames
        .into_iter()
        .enumerate()
        .map(|(frame_index, frame)| match frame {
            Err(e) => {
                warn!("frame {frame_index}: detection failed: {e}");
                FrameVerdict::Failed(e.to_string())
            }
            Ok(detections) => {
                let mut best = SimilarityScore::zero();
                for reference in corpus.frames() {
                    let score = similarity(similarity_cfg, reference, &detections);
                    if score > best {
                        best = score;
                    }
                    if best.meets(threshold) {
                        break;
                    }
                }

                // An empty corpus matches nothing, even at threshold 0
                // (where the zero best score would otherwise pass).
                if !corpus.is_empty() && best.meets(threshold) {
                    FrameVerdict::Matched(best)
                } else {
                    FrameVerdict::Unmatched(best)
                }
            }
        })
        .collect()
}

/// Collapse verdicts to the dense boolean sequence the segmenter consumes.
pub fn match_flags(verdicts: &[FrameVerdict]) -> Vec<bool> {
    verdicts.iter().map(FrameVerdict::is_match).collect()
}

/// Share of matched frames, as a 0..=100 percentage.
///
/// This is the only place a percentage scale appears; all thresholds and
/// scores stay in 0..=1.
pub fn copy_percentage(verdicts: &[FrameVerdict]) -> f64 {
    if verdicts.is_empty() {
        return 0.0;
    }

    let matched = verdicts.iter().filter(|v| v.is_match()).count();
    100.0 * matched as f64 / verdicts.len() as f64
}
