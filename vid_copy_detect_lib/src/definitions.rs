// Similarity definitions
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.5;
pub const DEFAULT_WEIGHT_THRESHOLD: f64 = 0.3;

// Blend weights for the three similarity terms. Label overlap dominates;
// box positions and confidence levels refine it.
pub const LABEL_BLEND_WEIGHT: f64 = 0.5;
pub const SPATIAL_BLEND_WEIGHT: f64 = 0.3;
pub const CONFIDENCE_BLEND_WEIGHT: f64 = 0.2;

// Timeline definitions. Matched runs shorter than this are detector
// flicker, not reused content.
pub const DEFAULT_MIN_SEGMENT_SECS: f64 = 0.5;

// Label substituted when the detector omits one.
pub const UNKNOWN_LABEL: &str = "unknown";
