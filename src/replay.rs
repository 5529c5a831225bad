//! Scripted frame replay
//!
//! A replay frame carries what a face detector and an emotion model would
//! have reported for one video frame. Scripts drive the CLI, the C ABI and
//! the scenario tests through the same two input capabilities as a live
//! camera would.
//!
//! # Frame format
//!
//! One JSON object per frame (NDJSON) or a JSON array of them:
//!
//! ```json
//! {"frame_width": 640, "frame_height": 480,
//!  "bbox": {"x": 270, "y": 190, "width": 100, "height": 100},
//!  "eyes_detected": 2,
//!  "probabilities": {"stressed": 0.05, "focused": 0.2, "confused": 0.05, "calm": 0.7}}
//! ```
//!
//! `bbox` omitted means no face. `logits` (8 raw FER+ values) may replace
//! `probabilities`. `head_pose` forces a pose instead of deriving it.

use crate::emotion::{FerPlusMapping, FERPLUS_CLASSES};
use crate::error::MonitorError;
use crate::movement::FaceGeometry;
use crate::pipeline::{EmotionSource, FaceLocator};
use crate::types::{BoundingBox, FaceObservation, HeadPose, ProbabilityVector};
use serde::{Deserialize, Serialize};

/// Eye count assumed when a frame does not say
const DEFAULT_EYES: u32 = 2;

/// One scripted video frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub frame_width: u32,
    pub frame_height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    /// Eye features found in the upper half of the face box
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eyes_detected: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_pose: Option<HeadPose>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<ProbabilityVector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logits: Option<[f32; FERPLUS_CLASSES]>,
}

impl ReplayFrame {
    /// Frame with no face
    pub fn empty(frame_width: u32, frame_height: u32) -> Self {
        Self {
            frame_width,
            frame_height,
            bbox: None,
            eyes_detected: None,
            head_pose: None,
            probabilities: None,
            logits: None,
        }
    }

    /// Frame with a face box
    pub fn with_face(frame_width: u32, frame_height: u32, bbox: BoundingBox) -> Self {
        Self {
            bbox: Some(bbox),
            ..Self::empty(frame_width, frame_height)
        }
    }

    pub fn probabilities(mut self, probabilities: ProbabilityVector) -> Self {
        self.probabilities = Some(probabilities);
        self
    }

    pub fn logits(mut self, logits: [f32; FERPLUS_CLASSES]) -> Self {
        self.logits = Some(logits);
        self
    }

    pub fn head_pose(mut self, pose: HeadPose) -> Self {
        self.head_pose = Some(pose);
        self
    }

    pub fn eyes(mut self, count: u32) -> Self {
        self.eyes_detected = Some(count);
        self
    }

    /// Structural checks; the pipeline tolerates every failure listed here
    /// but a script that trips one is probably wrong
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(ValidationError::ZeroFrameSize {
                width: self.frame_width,
                height: self.frame_height,
            });
        }
        if let Some(bbox) = self.bbox {
            if bbox.width == 0 || bbox.height == 0 {
                return Err(ValidationError::EmptyBox);
            }
            let right = bbox.x as u64 + bbox.width as u64;
            let bottom = bbox.y as u64 + bbox.height as u64;
            if right > self.frame_width as u64 || bottom > self.frame_height as u64 {
                return Err(ValidationError::BoxOutOfBounds {
                    right,
                    bottom,
                    width: self.frame_width,
                    height: self.frame_height,
                });
            }
        }
        if self.probabilities.is_some() && self.logits.is_some() {
            return Err(ValidationError::AmbiguousEmotion);
        }
        if let Some(p) = self.probabilities {
            let values = p.to_array();
            if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(ValidationError::InvalidProbabilities(
                    "values must be finite and non-negative".to_string(),
                ));
            }
            let sum = p.sum();
            if (sum - 1.0).abs() > 0.01 {
                return Err(ValidationError::InvalidProbabilities(format!(
                    "values sum to {:.4}, expected 1.0",
                    sum
                )));
            }
        }
        if let Some(logits) = &self.logits {
            if logits.iter().any(|l| !l.is_finite()) {
                return Err(ValidationError::NonFiniteLogits);
            }
        }
        Ok(())
    }
}

/// Validation errors for replay frames
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Frame size must be non-zero, got {width}x{height}")]
    ZeroFrameSize { width: u32, height: u32 },

    #[error("Face box has zero area")]
    EmptyBox,

    #[error("Face box extends to ({right}, {bottom}) outside a {width}x{height} frame")]
    BoxOutOfBounds {
        right: u64,
        bottom: u64,
        width: u32,
        height: u32,
    },

    #[error("Frame has both probabilities and logits")]
    AmbiguousEmotion,

    #[error("Invalid probabilities: {0}")]
    InvalidProbabilities(String),

    #[error("Logits must be finite")]
    NonFiniteLogits,
}

/// A frame that failed validation
#[derive(Debug, Clone, PartialEq)]
pub struct FrameIssue {
    /// Zero-based frame index
    pub index: usize,
    pub error: ValidationError,
}

/// Parse a JSON array of frames
pub fn parse_array(json: &str) -> Result<Vec<ReplayFrame>, MonitorError> {
    Ok(serde_json::from_str(json)?)
}

/// Parse newline-delimited frames, skipping blank lines
pub fn parse_ndjson(ndjson: &str) -> Result<Vec<ReplayFrame>, MonitorError> {
    let mut frames = Vec::new();
    for (line_num, line) in ndjson.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        frames.push(parse_line(trimmed, line_num + 1)?);
    }
    Ok(frames)
}

/// Parse one NDJSON line; `line_num` is one-based and only used in errors
pub fn parse_line(line: &str, line_num: usize) -> Result<ReplayFrame, MonitorError> {
    serde_json::from_str(line).map_err(|e| {
        MonitorError::ParseError(format!("Failed to parse line {}: {}", line_num, e))
    })
}

/// Parse either format, choosing by the first non-blank character
pub fn parse_frames(input: &str) -> Result<Vec<ReplayFrame>, MonitorError> {
    if input.trim_start().starts_with('[') {
        parse_array(input)
    } else {
        parse_ndjson(input)
    }
}

/// Every frame that fails validation
pub fn validate_frames(frames: &[ReplayFrame]) -> Vec<FrameIssue> {
    frames
        .iter()
        .enumerate()
        .filter_map(|(index, frame)| {
            frame
                .validate()
                .err()
                .map(|error| FrameIssue { index, error })
        })
        .collect()
}

/// Face locator reading the scripted box and eye count
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedLocator;

impl FaceLocator for ScriptedLocator {
    type Frame = ReplayFrame;

    fn locate(&self, frame: &ReplayFrame) -> FaceObservation {
        let Some(bbox) = frame.bbox else {
            return FaceObservation::absent(frame.frame_width, frame.frame_height);
        };
        if let Some(pose) = frame.head_pose {
            return FaceObservation::with_pose(bbox, pose, frame.frame_width, frame.frame_height);
        }
        FaceGeometry {
            bbox,
            frame_width: frame.frame_width,
            frame_height: frame.frame_height,
            eyes_in_upper_half: frame.eyes_detected.unwrap_or(DEFAULT_EYES),
        }
        .observe()
    }
}

/// Emotion source reading scripted probabilities or FER+ logits
#[derive(Debug, Clone, Default)]
pub struct ScriptedEmotion {
    mapping: FerPlusMapping,
    inferences: u64,
}

impl ScriptedEmotion {
    pub fn new(mapping: FerPlusMapping) -> Self {
        Self {
            mapping,
            inferences: 0,
        }
    }

    /// Number of inference calls made so far
    pub fn inferences(&self) -> u64 {
        self.inferences
    }
}

impl EmotionSource for ScriptedEmotion {
    type Frame = ReplayFrame;

    fn infer(&mut self, frame: &ReplayFrame, _bbox: &BoundingBox) -> ProbabilityVector {
        self.inferences += 1;
        match (&frame.probabilities, &frame.logits) {
            (Some(p), _) => p.normalized(),
            (None, Some(logits)) => self.mapping.map_logits(logits),
            (None, None) => ProbabilityVector::uniform(),
        }
    }
}
