use thiserror::Error;

use crate::{
    definitions::{
        CONFIDENCE_BLEND_WEIGHT, DEFAULT_MATCH_THRESHOLD, DEFAULT_WEIGHT_THRESHOLD, LABEL_BLEND_WEIGHT,
        SPATIAL_BLEND_WEIGHT,
    },
    detection::DetectionSet,
};

/// Error type for malformed similarity/matching configuration values.
///
/// Out-of-range values indicate an upstream configuration defect and are
/// surfaced to the caller rather than silently clamped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimilarityConfigError {
    /// The match threshold must lie in the inclusive range 0..=1.
    #[error("match threshold out of range 0..=1: {0}")]
    ThresholdOutOfRange(f64),

    /// The per-detection confidence floor must lie in the inclusive range 0..=1.
    #[error("weight threshold out of range 0..=1: {0}")]
    WeightThresholdOutOfRange(f64),
}

/// Similarity between two detection sets, in the range 0..=1.
///
/// 0.0 means no shared content (or an empty side); 1.0 means the candidate
/// contains every reference object with the same placement and confidence.
#[derive(Clone, Copy, PartialEq, PartialOrd, Debug, Default)]
pub struct SimilarityScore(f64);

impl SimilarityScore {
    pub(crate) fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub(crate) fn zero() -> Self {
        Self(0.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn meets(self, threshold: MatchThreshold) -> bool {
        self.0 >= threshold.value()
    }
}

/// Match strictness applied to the best per-frame similarity score.
///
/// Specified in the inclusive range 0..=1. The higher the value, the more a
/// candidate frame must resemble a reference frame before it counts as a
/// match. At 0 every frame matches (any score passes, including 0.0), except
/// against an empty corpus, which matches nothing; 1 requires a perfect
/// score.
#[derive(Clone, Copy, PartialEq, PartialOrd, Debug)]
pub struct MatchThreshold {
    value: f64,
}

impl MatchThreshold {
    pub fn new(value: f64) -> Result<Self, SimilarityConfigError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(SimilarityConfigError::ThresholdOutOfRange(value));
        }
        Ok(Self { value })
    }

    pub fn value(self) -> f64 {
        self.value
    }
}

impl Default for MatchThreshold {
    fn default() -> Self {
        Self {
            value: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

/// Configuration for the similarity metric itself.
///
/// `weight_threshold` is the per-detection confidence floor: detections below
/// it are ignored entirely, so low-confidence noise neither helps nor hurts a
/// comparison.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SimilarityCfg {
    weight_threshold: f64,
}

impl SimilarityCfg {
    pub fn new(weight_threshold: f64) -> Result<Self, SimilarityConfigError> {
        if !(0.0..=1.0).contains(&weight_threshold) {
            return Err(SimilarityConfigError::WeightThresholdOutOfRange(weight_threshold));
        }
        Ok(Self { weight_threshold })
    }

    pub fn weight_threshold(self) -> f64 {
        self.weight_threshold
    }
}

impl Default for SimilarityCfg {
    fn default() -> Self {
        Self {
            weight_threshold: DEFAULT_WEIGHT_THRESHOLD,
        }
    }
}

/// Similarity between a reference frame's detections and a candidate frame's
/// detections, in 0..=1.
///
/// The score blends three terms:
/// * label overlap: for each label present in both per-label weight maps, the
///   smaller weight is credited; the sum is normalized by the total reference
///   weight. This is deliberately asymmetric -- the reference is the template
///   being searched for, so extra candidate objects do not dilute the score.
/// * spatial: mean best-pair IoU under a greedy one-to-one assignment
///   (highest IoU pairs first, no candidate box reused), normalized over the
///   reference detections.
/// * confidence alignment: one minus the absolute difference of the mean
///   confidences of the two (floored) sets.
///
/// Returns 0.0 whenever either side has no detection at or above the
/// confidence floor. Pure and deterministic: identical inputs always yield an
/// identical score.
pub fn similarity(cfg: &SimilarityCfg, reference: &DetectionSet, candidate: &DetectionSet) -> SimilarityScore {
    let floor = cfg.weight_threshold;

    let ref_weights = reference.label_weights(floor);
    let cand_weights = candidate.label_weights(floor);
    if ref_weights.is_empty() || cand_weights.is_empty() {
        return SimilarityScore::zero();
    }

    let label_term = {
        let intersection: f64 = ref_weights
            .iter()
            .filter_map(|(label, ref_weight)| cand_weights.get(label).map(|cand_weight| ref_weight.min(*cand_weight)))
            .sum();
        let union: f64 = ref_weights.values().sum();

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    };

    let spatial_term = greedy_box_overlap(reference, candidate, floor);

    let confidence_term = {
        let ref_mean = mean_confidence(reference, floor);
        let cand_mean = mean_confidence(candidate, floor);
        (1.0 - (ref_mean - cand_mean).abs()).max(0.0)
    };

    SimilarityScore::new(
        LABEL_BLEND_WEIGHT * label_term
            + SPATIAL_BLEND_WEIGHT * spatial_term
            + CONFIDENCE_BLEND_WEIGHT * confidence_term,
    )
}

/// Mean best-pair IoU between the floored detections of two sets.
///
/// Pairs are assigned greedily in descending IoU order, each candidate box
/// used at most once, then averaged over the reference detections (unpaired
/// reference boxes contribute 0).
fn greedy_box_overlap(reference: &DetectionSet, candidate: &DetectionSet, floor: f64) -> f64 {
    let ref_boxes: Vec<_> = reference.above_floor(floor).map(|d| d.bounding_box).collect();
    let cand_boxes: Vec<_> = candidate.above_floor(floor).map(|d| d.bounding_box).collect();

    if ref_boxes.is_empty() || cand_boxes.is_empty() {
        return 0.0;
    }

    let mut pairs: Vec<(f64, usize, usize)> = ref_boxes
        .iter()
        .enumerate()
        .flat_map(|(ri, rb)| {
            cand_boxes
                .iter()
                .enumerate()
                .map(move |(ci, cb)| (rb.iou(cb), ri, ci))
        })
        .collect();

    //descending by IoU; index order breaks ties so the assignment is deterministic
    pairs.sort_by(|(iou_a, ra, ca), (iou_b, rb, cb)| {
        iou_b
            .total_cmp(iou_a)
            .then_with(|| ra.cmp(rb))
            .then_with(|| ca.cmp(cb))
    });

    let mut ref_used = vec![false; ref_boxes.len()];
    let mut cand_used = vec![false; cand_boxes.len()];
    let mut total_iou = 0.0;
    for (iou, ri, ci) in pairs {
        if ref_used[ri] || cand_used[ci] {
            continue;
        }
        ref_used[ri] = true;
        cand_used[ci] = true;
        total_iou += iou;
    }

    total_iou / ref_boxes.len() as f64
}

fn mean_confidence(set: &DetectionSet, floor: f64) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for det in set.above_floor(floor) {
        sum += det.confidence;
        count += 1;
    }

    if count > 0 {
        sum / count as f64
    } else {
        0.0
    }
}

#[cfg(test)]
mod test {
    use rand::prelude::*;

    use super::*;
    use crate::detection::{Detection, DetectionSet};

    fn cfg() -> SimilarityCfg {
        SimilarityCfg::default()
    }

    #[test]
    fn test_self_similarity_is_maximal() {
        let set = DetectionSet::from_labels(&[("car", 0.9), ("person", 0.7)]);
        let score = similarity(&cfg(), &set, &set);
        assert!((score.value() - 1.0).abs() < 1e-12, "got {}", score.value());
    }

    #[test]
    fn test_either_empty_side_scores_zero() {
        let set = DetectionSet::from_labels(&[("car", 0.9)]);
        let empty = DetectionSet::empty();

        assert_eq!(similarity(&cfg(), &empty, &set).value(), 0.0);
        assert_eq!(similarity(&cfg(), &set, &empty).value(), 0.0);
        assert_eq!(similarity(&cfg(), &empty, &empty).value(), 0.0);
    }

    #[test]
    fn test_below_floor_detections_are_invisible() {
        let reference = DetectionSet::from_labels(&[("car", 0.9)]);
        let weak_candidate = DetectionSet::from_labels(&[("car", 0.2)]);

        assert_eq!(similarity(&cfg(), &reference, &weak_candidate).value(), 0.0);
    }

    #[test]
    fn test_duplicate_labels_use_max_confidence_not_sum() {
        let reference = DetectionSet::from_labels(&[("car", 0.8)]);
        let one_car = DetectionSet::from_labels(&[("car", 0.8)]);
        let many_cars = DetectionSet::from_labels(&[("car", 0.8), ("car", 0.8), ("car", 0.8)]);

        let single = similarity(&cfg(), &reference, &one_car);
        let multi = similarity(&cfg(), &reference, &many_cars);
        assert!(multi.value() <= single.value() + 1e-12, "redundant detections must not be rewarded");
    }

    #[test]
    fn test_reference_normalization_is_asymmetric() {
        let small = DetectionSet::from_labels(&[("car", 0.9)]);
        let large = DetectionSet::from_labels(&[("car", 0.9), ("person", 0.9)]);

        // Every reference object is present in the candidate: full label credit.
        let forwards = similarity(&cfg(), &small, &large);
        // Only half the reference objects are present in the candidate.
        let backwards = similarity(&cfg(), &large, &small);
        assert!(forwards.value() > backwards.value());
    }

    #[test]
    fn test_score_is_always_in_range_for_adversarial_inputs() {
        let adversarial = [
            DetectionSet::from_labels(&[("car", 0.0), ("car", 0.0)]),
            DetectionSet::from_labels(&[("unknown", 1.0), ("unknown", 1.0), ("unknown", 0.3)]),
            DetectionSet::from_labels(&[("car", 5.0)]), // malformed confidence above 1
            DetectionSet::empty(),
        ];

        for a in &adversarial {
            for b in &adversarial {
                let score = similarity(&cfg(), a, b).value();
                assert!((0.0..=1.0).contains(&score), "out of range: {score}");
            }
        }
    }

    #[test]
    fn test_score_is_deterministic() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let vocab = ["car", "person", "dog", "truck"];
        for _ in 0..500 {
            let a = DetectionSet::random_set(&mut rng, &vocab, 6);
            let b = DetectionSet::random_set(&mut rng, &vocab, 6);

            let first = similarity(&cfg(), &a, &b);
            let second = similarity(&cfg(), &a, &b);
            assert_eq!(first, second);
            assert!((0.0..=1.0).contains(&first.value()));
        }
    }

    #[test]
    fn test_more_label_overlap_scores_higher() {
        let reference = DetectionSet::from_labels(&[("car", 0.9), ("person", 0.9), ("dog", 0.9)]);
        let none = DetectionSet::from_labels(&[("truck", 0.9)]);
        let one = DetectionSet::from_labels(&[("car", 0.9), ("truck", 0.9)]);
        let all = DetectionSet::from_labels(&[("car", 0.9), ("person", 0.9), ("dog", 0.9)]);

        let s_none = similarity(&cfg(), &reference, &none).value();
        let s_one = similarity(&cfg(), &reference, &one).value();
        let s_all = similarity(&cfg(), &reference, &all).value();
        assert!(s_none < s_one && s_one < s_all);
    }

    #[test]
    fn test_spatial_term_rewards_aligned_boxes() {
        use crate::detection::BoundingBox;

        let reference = DetectionSet::new([Detection::new("car", 0.9, BoundingBox::new(0.0, 0.0, 100.0, 100.0))]);
        let aligned = DetectionSet::new([Detection::new("car", 0.9, BoundingBox::new(0.0, 0.0, 100.0, 100.0))]);
        let offset = DetectionSet::new([Detection::new("car", 0.9, BoundingBox::new(300.0, 300.0, 100.0, 100.0))]);

        let s_aligned = similarity(&cfg(), &reference, &aligned).value();
        let s_offset = similarity(&cfg(), &reference, &offset).value();
        assert!(s_aligned > s_offset);
    }

    #[test]
    fn test_threshold_and_floor_validation() {
        assert!(MatchThreshold::new(0.0).is_ok());
        assert!(MatchThreshold::new(1.0).is_ok());
        assert_eq!(
            MatchThreshold::new(1.5),
            Err(SimilarityConfigError::ThresholdOutOfRange(1.5))
        );
        assert_eq!(
            MatchThreshold::new(-0.1),
            Err(SimilarityConfigError::ThresholdOutOfRange(-0.1))
        );

        assert!(SimilarityCfg::new(0.3).is_ok());
        assert_eq!(
            SimilarityCfg::new(2.0),
            Err(SimilarityConfigError::WeightThresholdOutOfRange(2.0))
        );
    }
}
