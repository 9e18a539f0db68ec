use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use image::RgbImage;
use thiserror::Error;
use vid_copy_detect_lib::{Detection, DetectionProvider, DetectionSet};

use crate::worker::WorkerError;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("detector command not found. Make sure it is installed and visible on the command line")]
    NotFound,

    #[error("detector IO error: {0}")]
    Io(String),

    #[error("failed to encode frame image: {0}")]
    Encode(String),

    /// The detector exited nonzero. Only the first few hundred characters of
    /// its stderr are kept.
    #[error("detector failed: {0}")]
    NonZeroExit(String),

    #[error("failed to parse detector output: {0}")]
    Parse(String),
}

/// Runs an external object detector once per frame.
///
/// Each frame is written to a temporary PNG; the configured command is
/// invoked with that path appended as its final argument and must print a
/// JSON array of detections on stdout:
///
/// ```json
/// [{"label": "car", "confidence": 0.93, "box": [10.0, 20.0, 64.0, 48.0]}]
/// ```
#[derive(Debug, Clone)]
pub struct CmdlineDetector {
    program: String,
    args: Vec<String>,
    scratch_dir: PathBuf,
}

impl CmdlineDetector {
    pub fn new(cmd: &[String], scratch_dir: impl AsRef<Path>) -> Result<Self, WorkerError> {
        let [program, args @ ..] = cmd else {
            return Err(WorkerError::DetectorCmd(
                "detector command is empty".to_string(),
            ));
        };

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            scratch_dir: scratch_dir.as_ref().to_path_buf(),
        })
    }

    fn run_on_image(&self, frame_path: &Path) -> Result<DetectionSet, DetectorError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(frame_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => DetectorError::NotFound,
                _ => DetectorError::Io(format!("{:?}", e.kind())),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DetectorError::NonZeroExit(
                stderr.chars().take(500).collect(),
            ));
        }

        let stdout =
            std::str::from_utf8(&output.stdout).map_err(|e| DetectorError::Parse(e.to_string()))?;
        parse_detections(stdout)
    }
}

impl DetectionProvider for CmdlineDetector {
    type Error = DetectorError;

    fn detect(&mut self, frame: &RgbImage) -> Result<DetectionSet, DetectorError> {
        let frame_file = tempfile::Builder::new()
            .prefix("frame_")
            .suffix(".png")
            .tempfile_in(&self.scratch_dir)
            .map_err(|e| DetectorError::Io(e.to_string()))?;

        frame
            .save(frame_file.path())
            .map_err(|e| DetectorError::Encode(e.to_string()))?;

        self.run_on_image(frame_file.path())
    }
}

fn parse_detections(stdout: &str) -> Result<DetectionSet, DetectorError> {
    let detections: Vec<Detection> =
        serde_json::from_str(stdout.trim()).map_err(|e| DetectorError::Parse(e.to_string()))?;
    Ok(DetectionSet::new(detections))
}

#[cfg(test)]
mod test {
    use super::*;
    use vid_copy_detect_lib::BoundingBox;

    #[test]
    fn test_parse_full_detection_array() {
        let stdout = r#"[
            {"label": "car", "confidence": 0.93, "box": [10.0, 20.0, 64.0, 48.0]},
            {"label": "person", "confidence": 0.71, "box": [0.0, 0.0, 32.0, 90.0]}
        ]"#;

        let detections = parse_detections(stdout).unwrap();
        assert_eq!(detections.len(), 2);

        let car = detections.iter().find(|d| d.label == "car").unwrap();
        assert_eq!(car.confidence, 0.93);
        assert_eq!(car.bounding_box, BoundingBox::new(10.0, 20.0, 64.0, 48.0));

        let person = detections.iter().find(|d| d.label == "person").unwrap();
        assert_eq!(person.confidence, 0.71);
    }

    #[test]
    fn test_parse_empty_array_and_surrounding_whitespace() {
        assert!(parse_detections("[]").unwrap().is_empty());
        assert!(parse_detections("\n  []  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_fills_in_missing_fields() {
        //detectors that emit only labels still produce usable detections
        let detections = parse_detections(r#"[{"label": "car"}]"#).unwrap();
        assert_eq!(detections.len(), 1);

        let detection = detections.iter().next().unwrap();
        assert_eq!(detection.label, "car");
        assert_eq!(detection.confidence, 0.0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_detections("not json"),
            Err(DetectorError::Parse(_))
        ));
        assert!(matches!(
            parse_detections(r#"{"label": "car"}"#),
            Err(DetectorError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(matches!(
            CmdlineDetector::new(&[], "/tmp"),
            Err(WorkerError::DetectorCmd(_))
        ));
    }
}
