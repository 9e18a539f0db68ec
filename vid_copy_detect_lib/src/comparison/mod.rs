pub mod frame_match;
pub mod reuse_detector;
pub mod similarity;
pub mod timeline;
