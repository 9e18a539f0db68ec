use rand::prelude::*;
use vid_copy_detect_lib::*;

const VOCAB: &[&str] = &["car", "person", "dog", "truck", "bicycle", "bus"];

/// A synthetic "video": one detection set per sampled frame, drawn from a
/// seeded rng so every run sees the same footage.
fn random_video(rng: &mut StdRng, num_frames: usize) -> Vec<DetectionSet> {
    (0..num_frames)
        .map(|_| DetectionSet::random_set(rng, VOCAB, 5))
        .collect()
}

fn as_frame_results(frames: &[DetectionSet]) -> Vec<Result<DetectionSet, String>> {
    frames.iter().cloned().map(Ok).collect()
}

#[test]
// A candidate identical to the reference must report (close to) full reuse:
// one segment spanning the whole video and a copy percentage of 100.
fn test_identical_candidate_reports_full_reuse() {
    let mut rng = StdRng::seed_from_u64(1);

    // Keep every frame non-empty and above the confidence floor so each one
    // is capable of matching itself.
    let frames: Vec<DetectionSet> = (0..40)
        .map(|i| {
            DetectionSet::from_labels(&[
                (VOCAB[i % VOCAB.len()], rng.gen_range(0.5..=1.0)),
                (VOCAB[(i + 1) % VOCAB.len()], rng.gen_range(0.5..=1.0)),
            ])
        })
        .collect();

    let corpus = ReferenceCorpus::new(frames.clone());
    let cfg = MatchCfg::new(10.0).unwrap();
    let report = detect_reuse(&corpus, as_frame_results(&frames), &cfg).unwrap();

    assert_eq!(report.copy_percentage, 100.0);
    assert_eq!(report.segments.len(), 1);
    assert_eq!(report.segments[0].start_frame, 0);
    assert_eq!(report.segments[0].end_frame, 39);
    assert_eq!(report.segments[0].frame_count, 40);
    assert_eq!(report.segments[0].duration_secs, 4.0);
}

#[test]
// A candidate sharing no labels with the reference must report zero reuse.
fn test_unrelated_candidate_reports_no_reuse() {
    let reference: Vec<DetectionSet> = (0..20)
        .map(|_| DetectionSet::from_labels(&[("car", 0.9), ("truck", 0.8)]))
        .collect();
    let candidate: Vec<DetectionSet> = (0..20)
        .map(|_| DetectionSet::from_labels(&[("dog", 0.9), ("person", 0.8)]))
        .collect();

    let corpus = ReferenceCorpus::new(reference);
    let cfg = MatchCfg::new(10.0).unwrap();
    let report = detect_reuse(&corpus, as_frame_results(&candidate), &cfg).unwrap();

    assert_eq!(report.copy_percentage, 0.0);
    assert!(report.segments.is_empty());
}

#[test]
// A candidate that splices a run of reference frames into unrelated footage
// is reported with a single segment covering exactly the spliced range.
fn test_spliced_reference_content_is_localized() {
    let reference: Vec<DetectionSet> = (0..10)
        .map(|_| DetectionSet::from_labels(&[("car", 0.9), ("person", 0.85)]))
        .collect();

    let unrelated = DetectionSet::from_labels(&[("dog", 0.9)]);
    let mut candidate = vec![unrelated.clone(); 15];
    // frames 15..=24 reuse reference content
    candidate.extend(reference.iter().cloned());
    // frames 25..=29 unrelated again
    candidate.extend(vec![unrelated; 5]);

    let corpus = ReferenceCorpus::new(reference);
    let cfg = MatchCfg::new(10.0).unwrap();
    let report = detect_reuse(&corpus, as_frame_results(&candidate), &cfg).unwrap();

    assert_eq!(report.segments.len(), 1);
    assert_eq!(report.segments[0].start_frame, 15);
    assert_eq!(report.segments[0].end_frame, 24);
    assert_eq!(report.segments[0].start_time, "00:01.500");
    assert_eq!(report.segments[0].end_time, "00:02.400");
    assert!((report.copy_percentage - 100.0 * 10.0 / 30.0).abs() < 1e-9);
}

#[test]
// Detector failures on individual frames shrink the reported reuse but never
// abort the pass or change its length.
fn test_per_frame_failures_do_not_abort_the_pass() {
    let reference: Vec<DetectionSet> = (0..8)
        .map(|_| DetectionSet::from_labels(&[("car", 0.9)]))
        .collect();
    let corpus = ReferenceCorpus::new(reference.clone());

    let frames: Vec<Result<DetectionSet, String>> = reference
        .iter()
        .enumerate()
        .map(|(i, set)| {
            if i % 3 == 2 {
                Err(format!("frame {i}: decode error"))
            } else {
                Ok(set.clone())
            }
        })
        .collect();

    let cfg = MatchCfg::new(10.0).unwrap().with_min_duration(0.0);
    let report = detect_reuse(&corpus, frames, &cfg).unwrap();

    assert_eq!(report.total_frames(), 8);
    assert_eq!(report.failed_frames(), 2);
    assert_eq!(report.matched_frames(), 6);
}

#[test]
// detect_reuse is a pure function of its inputs: two passes over the same
// data produce identical reports.
fn test_detection_pass_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(7);
    let reference = random_video(&mut rng, 25);
    let candidate = random_video(&mut rng, 60);
    let corpus = ReferenceCorpus::new(reference);

    let cfg = MatchCfg::new(12.5)
        .unwrap()
        .with_threshold(MatchThreshold::new(0.4).unwrap())
        .with_min_duration(0.0);

    let first = detect_reuse(&corpus, as_frame_results(&candidate), &cfg).unwrap();
    let second = detect_reuse(&corpus, as_frame_results(&candidate), &cfg).unwrap();
    assert_eq!(first, second);
}

#[test]
// Raising the threshold can only shrink the set of matched frames.
fn test_stricter_threshold_matches_fewer_frames() {
    let mut rng = StdRng::seed_from_u64(11);
    let reference = random_video(&mut rng, 20);
    let candidate = random_video(&mut rng, 50);
    let corpus = ReferenceCorpus::new(reference);

    let mut previous_matched = usize::MAX;
    for threshold in [0.0, 0.25, 0.5, 0.75, 1.0] {
        let cfg = MatchCfg::new(10.0)
            .unwrap()
            .with_threshold(MatchThreshold::new(threshold).unwrap())
            .with_min_duration(0.0);
        let report = detect_reuse(&corpus, as_frame_results(&candidate), &cfg).unwrap();
        assert!(report.matched_frames() <= previous_matched);
        previous_matched = report.matched_frames();
    }
}
