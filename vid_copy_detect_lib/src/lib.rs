#![allow(clippy::len_without_is_empty)]

//! # Overview
//! vid_copy_detect_lib detects whether a candidate video reuses visual content
//! from a fixed reference video, by comparing object-detection signatures
//! extracted from sampled frames of each.
//!
//! # How it works
//! An external object detector (any implementation of [`DetectionProvider`])
//! turns each sampled frame into a [`DetectionSet`]: labeled, confidence-scored
//! bounding boxes. The library then:
//! * scores every candidate frame against every frame of a precomputed
//!   [`ReferenceCorpus`] with a blended similarity metric (label overlap,
//!   box overlap, confidence alignment), normalized by the reference side;
//! * reduces each candidate frame to a per-frame [`FrameVerdict`] by taking
//!   the best score over the corpus and applying a [`MatchThreshold`];
//! * merges consecutive matched frames into contiguous [`Segment`]s with
//!   human-readable time ranges, discarding runs shorter than a configurable
//!   minimum duration (detector flicker).
//!
//! All functions here are pure and synchronous. Frame decoding, video download
//! and the detector itself live outside the library; per-frame detector
//! failures are isolated and never abort a comparison pass.
//!
//! # High Level API
//! Build a reference corpus once, then run [`detect_reuse`] per candidate
//! video:
//! ```rust
//! use vid_copy_detect_lib::{
//!     detect_reuse, BoundingBox, Detection, DetectionSet, MatchCfg, ReferenceCorpus,
//! };
//!
//! let car = |conf| Detection::new("car", conf, BoundingBox::new(10.0, 20.0, 100.0, 50.0));
//! let corpus = ReferenceCorpus::new([DetectionSet::new([car(0.9)])]);
//!
//! // Detection results for three sampled candidate frames. The error type is
//! // whatever the detection provider produces; failed frames count as unmatched.
//! let frames: Vec<Result<DetectionSet, std::convert::Infallible>> = vec![
//!     Ok(DetectionSet::new([car(0.85)])),
//!     Ok(DetectionSet::new([car(0.88)])),
//!     Ok(DetectionSet::empty()),
//! ];
//!
//! let cfg = MatchCfg::new(30.0).unwrap().with_min_duration(0.0);
//! let report = detect_reuse(&corpus, frames, &cfg).unwrap();
//!
//! assert_eq!(report.segments.len(), 1);
//! assert_eq!(report.segments[0].start_frame, 0);
//! assert_eq!(report.segments[0].end_frame, 1);
//! assert!((report.copy_percentage - 200.0 / 3.0).abs() < 1e-9);
//! ```
//!
//! # Limitations
//! The similarity metric is deliberately asymmetric: the reference is the
//! template being searched for, so a candidate frame containing the reference
//! objects plus extra clutter still scores highly. The metric sees only what
//! the detector reports; content the detector cannot label is invisible to it.

pub(crate) mod comparison;
pub(crate) mod definitions;
pub(crate) mod detection;

pub use comparison::{
    frame_match::{copy_percentage, match_flags, match_frames, FrameVerdict},
    reuse_detector::{detect_reuse, MatchCfg, ReuseReport},
    similarity::{similarity, MatchThreshold, SimilarityCfg, SimilarityConfigError, SimilarityScore},
    timeline::{frame_to_time, format_duration, matched_indices, segment, segment_indices, Segment, TimelineError},
};
pub use detection::{BoundingBox, Detection, DetectionProvider, DetectionSet, ReferenceCorpus};
