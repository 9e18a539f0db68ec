use std::collections::BTreeMap;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::definitions::UNKNOWN_LABEL;

/// An axis-aligned rectangle in pixel coordinates of the frame it was
/// detected in. Serialized as `[x, y, width, height]`, matching the wire
/// format detectors produce.
#[derive(Clone, Copy, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Intersection-over-union with another box, in 0..=1.
    ///
    /// Degenerate boxes (zero area on both sides) yield 0.0.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix_min = self.x.max(other.x);
        let iy_min = self.y.max(other.y);
        let ix_max = (self.x + self.width).min(other.x + other.width);
        let iy_max = (self.y + self.height).min(other.y + other.height);

        let intersection = (ix_max - ix_min).max(0.0) * (iy_max - iy_min).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([x, y, width, height]: [f64; 4]) -> Self {
        Self { x, y, width, height }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

/// One object instance found in one frame.
///
/// A record with a missing label or confidence on the wire deserializes to
/// `"unknown"` / `0.0` rather than failing; such detections fall below any
/// sensible confidence floor and drop out of comparisons naturally.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Detection {
    #[serde(default = "unknown_label")]
    pub label: String,

    #[serde(default)]
    pub confidence: f64,

    #[serde(rename = "box", default)]
    pub bounding_box: BoundingBox,
}

fn unknown_label() -> String {
    UNKNOWN_LABEL.to_string()
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f64, bounding_box: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bounding_box,
        }
    }
}

/// All detections for a single frame. May be empty (nothing detected).
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionSet(Vec<Detection>);

impl DetectionSet {
    pub fn new(detections: impl IntoIterator<Item = Detection>) -> Self {
        Self(detections.into_iter().collect())
    }

    pub fn empty() -> Self {
        Self(vec![])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.0.iter()
    }

    /// Per-label weight map: the maximum confidence observed for each label,
    /// ignoring detections below the confidence floor. Duplicate labels
    /// contribute their highest confidence only, never a sum.
    ///
    /// Ordered by label so that downstream float summation over the map is
    /// deterministic.
    pub(crate) fn label_weights(&self, weight_threshold: f64) -> BTreeMap<&str, f64> {
        let mut weights: BTreeMap<&str, f64> = BTreeMap::new();
        for det in &self.0 {
            if det.confidence < weight_threshold {
                continue;
            }
            let entry = weights.entry(det.label.as_str()).or_insert(det.confidence);
            if det.confidence > *entry {
                *entry = det.confidence;
            }
        }
        weights
    }

    /// Detections at or above the confidence floor, in input order.
    pub(crate) fn above_floor(&self, weight_threshold: f64) -> impl Iterator<Item = &Detection> {
        self.0.iter().filter(move |d| d.confidence >= weight_threshold)
    }
}

impl FromIterator<Detection> for DetectionSet {
    fn from_iter<I: IntoIterator<Item = Detection>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// The fixed collection of reference-video detection sets used as the
/// "known content" template.
///
/// Built once (typically at worker startup) and passed by reference into
/// every matching call; it is an ordinary immutable value, never ambient
/// global state, so tests can construct synthetic corpora freely.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct ReferenceCorpus {
    frames: Vec<DetectionSet>,
}

impl ReferenceCorpus {
    pub fn new(frames: impl IntoIterator<Item = DetectionSet>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Number of reference frames in the corpus.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[DetectionSet] {
        &self.frames
    }
}

impl FromIterator<DetectionSet> for ReferenceCorpus {
    fn from_iter<I: IntoIterator<Item = DetectionSet>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// The object-detection capability the pipeline runs on top of.
///
/// Implementations turn one frame image into a [`DetectionSet`]. The library
/// never calls this itself; callers drive detection and feed the per-frame
/// results (including failures) into [`crate::match_frames`], which isolates
/// errors to the frame they occurred on.
pub trait DetectionProvider {
    type Error: std::fmt::Display;

    fn detect(&mut self, frame: &RgbImage) -> Result<DetectionSet, Self::Error>;
}

//Utilities for testing
#[doc(hidden)]
pub mod test_util {
    use rand::prelude::*;

    use super::{BoundingBox, Detection, DetectionSet};

    #[doc(hidden)]
    impl Detection {
        /// A detection covering a fixed full-frame box. Two labeled detections
        /// with the same label therefore have IoU 1, so label-only synthetic
        /// sets behave like perfectly-aligned real ones.
        pub fn labeled(label: &str, confidence: f64) -> Self {
            Detection::new(label, confidence, BoundingBox::new(0.0, 0.0, 640.0, 360.0))
        }
    }

    #[doc(hidden)]
    impl DetectionSet {
        pub fn from_labels(labels: &[(&str, f64)]) -> Self {
            labels
                .iter()
                .map(|(label, confidence)| Detection::labeled(label, *confidence))
                .collect()
        }

        /// A random detection set drawn from a vocabulary, for property tests.
        pub fn random_set(rng: &mut StdRng, vocab: &[&str], max_detections: usize) -> Self {
            let num = rng.gen_range(0..=max_detections);
            (0..num)
                .map(|_| {
                    let label = vocab[rng.gen_range(0..vocab.len())];
                    let confidence = rng.gen_range(0.0..=1.0);
                    let x = rng.gen_range(0.0..500.0);
                    let y = rng.gen_range(0.0..300.0);
                    let w = rng.gen_range(1.0..140.0);
                    let h = rng.gen_range(1.0..60.0);
                    Detection::new(label, confidence, BoundingBox::new(x, y, w, h))
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_missing_fields_deserialize_to_defaults() {
        let det: Detection = serde_json::from_str(r#"{"box": [1.0, 2.0, 3.0, 4.0]}"#).unwrap();
        assert_eq!(det.label, "unknown");
        assert_eq!(det.confidence, 0.0);
        assert_eq!(det.bounding_box, BoundingBox::new(1.0, 2.0, 3.0, 4.0));

        let det: Detection = serde_json::from_str(r#"{"label": "car", "confidence": 0.9}"#).unwrap();
        assert_eq!(det.label, "car");
        assert_eq!(det.bounding_box, BoundingBox::default());
    }

    #[test]
    fn test_box_serializes_as_array() {
        let det = Detection::new("car", 0.9, BoundingBox::new(10.0, 20.0, 30.0, 40.0));
        let json = serde_json::to_string(&det).unwrap();
        assert!(json.contains(r#""box":[10.0,20.0,30.0,40.0]"#), "got: {json}");

        let back: Detection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, det);
    }

    #[test]
    fn test_iou_of_identical_boxes_is_1() {
        let b = BoundingBox::new(5.0, 5.0, 100.0, 50.0);
        assert_eq!(b.iou(&b), 1.0);
    }

    #[test]
    fn test_iou_of_disjoint_boxes_is_0() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(100.0, 100.0, 10.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_of_degenerate_boxes_is_0() {
        let a = BoundingBox::default();
        assert_eq!(a.iou(&a), 0.0);
    }

    #[test]
    fn test_label_weights_keep_max_confidence_only() {
        let set = DetectionSet::from_labels(&[("car", 0.4), ("car", 0.8), ("dog", 0.2)]);
        let weights = set.label_weights(0.3);
        assert_eq!(weights.len(), 1);
        assert_eq!(weights["car"], 0.8);
    }

    #[test]
    fn test_label_weights_iterate_in_label_order() {
        // Summing the weight map must visit labels in a fixed order, or
        // float addition makes equal sets score unequally between calls.
        let set = DetectionSet::from_labels(&[("dog", 0.5), ("car", 0.6), ("person", 0.9)]);
        let labels: Vec<&str> = set.label_weights(0.0).keys().copied().collect();
        assert_eq!(labels, vec!["car", "dog", "person"]);
    }
}
