use crate::{
    comparison::{
        frame_match::{copy_percentage, match_flags, match_frames, FrameVerdict},
        similarity::{MatchThreshold, SimilarityCfg},
        timeline::{segment, Segment, TimelineError},
    },
    definitions::DEFAULT_MIN_SEGMENT_SECS,
    detection::{DetectionSet, ReferenceCorpus},
};

/// Configuration for one candidate video's comparison pass.
///
/// `fps` is the rate of the *sampled* frame sequence (source fps divided by
/// the sampling stride) and must be greater than zero.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct MatchCfg {
    pub threshold: MatchThreshold,
    pub similarity: SimilarityCfg,
    pub fps: f64,
    pub min_duration_secs: f64,
}

impl MatchCfg {
    /// Create a configuration with default threshold, confidence floor and
    /// minimum segment duration. Fails fast on a non-positive fps, which
    /// indicates defective video metadata upstream.
    pub fn new(fps: f64) -> Result<Self, TimelineError> {
        if !(fps > 0.0) {
            return Err(TimelineError::InvalidFps(fps));
        }

        Ok(Self {
            threshold: MatchThreshold::default(),
            similarity: SimilarityCfg::default(),
            fps,
            min_duration_secs: DEFAULT_MIN_SEGMENT_SECS,
        })
    }

    pub fn with_threshold(mut self, threshold: MatchThreshold) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_similarity(mut self, similarity: SimilarityCfg) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn with_min_duration(mut self, min_duration_secs: f64) -> Self {
        self.min_duration_secs = min_duration_secs;
        self
    }
}

/// The outcome of comparing one candidate video against the reference corpus.
#[derive(Clone, PartialEq, Debug)]
pub struct ReuseReport {
    /// Per-frame verdicts, one per candidate frame, in frame order.
    pub verdicts: Vec<FrameVerdict>,
    /// Share of matched frames, 0..=100.
    pub copy_percentage: f64,
    /// Contiguous matched time ranges, ordered by start frame.
    pub segments: Vec<Segment>,
}

impl ReuseReport {
    pub fn total_frames(&self) -> usize {
        self.verdicts.len()
    }

    pub fn matched_frames(&self) -> usize {
        self.verdicts.iter().filter(|v| v.is_match()).count()
    }

    /// Frames whose detection failed (distinct from genuine non-matches).
    pub fn failed_frames(&self) -> usize {
        self.verdicts
            .iter()
            .filter(|v| matches!(v, FrameVerdict::Failed(_)))
            .count()
    }
}

/// Run the whole comparison pass for one candidate video: match every frame
/// against the corpus, then segment the matched frames into time ranges.
///
/// `candidate_frames` are per-frame detection results in playback order;
/// failed frames are isolated (counted as unmatched) rather than aborting the
/// pass. The only error is a pipeline-level misconfiguration (invalid fps).
pub fn detect_reuse<I, E>(
    corpus: &ReferenceCorpus,
    candidate_frames: I,
    cfg: &MatchCfg,
) -> Result<ReuseReport, TimelineError>
where
    I: IntoIterator<Item = Result<DetectionSet, E>>,
    E: std::fmt::Display,
{
    let verdicts = match_frames(corpus, candidate_frames, cfg.threshold, &cfg.similarity);
    let segments = segment(&match_flags(&verdicts), cfg.fps, cfg.min_duration_secs)?;

    Ok(ReuseReport {
        copy_percentage: copy_percentage(&verdicts),
        segments,
        verdicts,
    })
}
