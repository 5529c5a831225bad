//! Core types for the VEGA monitor
//!
//! This module defines the data that flows through each stage of the per-frame
//! engine: face observations, movement signals, emotion probability vectors and
//! the discrete behavioral states the classifier emits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed label set produced by the emotion source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionLabel {
    Stressed,
    Focused,
    Confused,
    Calm,
}

impl EmotionLabel {
    /// Canonical feature order used by vectors, scalers and classifiers
    pub const ALL: [EmotionLabel; 4] = [
        EmotionLabel::Stressed,
        EmotionLabel::Focused,
        EmotionLabel::Confused,
        EmotionLabel::Calm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Stressed => "stressed",
            EmotionLabel::Focused => "focused",
            EmotionLabel::Confused => "confused",
            EmotionLabel::Calm => "calm",
        }
    }

    /// Position of this label in [`EmotionLabel::ALL`]
    pub fn index(&self) -> usize {
        match self {
            EmotionLabel::Stressed => 0,
            EmotionLabel::Focused => 1,
            EmotionLabel::Confused => 2,
            EmotionLabel::Calm => 3,
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stressed" => Ok(EmotionLabel::Stressed),
            "focused" => Ok(EmotionLabel::Focused),
            "confused" => Ok(EmotionLabel::Confused),
            "calm" => Ok(EmotionLabel::Calm),
            other => Err(format!("unknown emotion label '{}'", other)),
        }
    }
}

/// Probability distribution over the closed label set.
///
/// Fields are named rather than keyed so that every consumer handles all four
/// labels. Values are expected to sum to 1.0; [`ProbabilityVector::normalized`]
/// repairs vectors that do not.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityVector {
    #[serde(default)]
    pub stressed: f64,
    #[serde(default)]
    pub focused: f64,
    #[serde(default)]
    pub confused: f64,
    #[serde(default)]
    pub calm: f64,
}

impl Default for ProbabilityVector {
    fn default() -> Self {
        Self::uniform()
    }
}

impl ProbabilityVector {
    pub fn new(stressed: f64, focused: f64, confused: f64, calm: f64) -> Self {
        Self {
            stressed,
            focused,
            confused,
            calm,
        }
    }

    /// Neutral vector (0.25 per label)
    pub fn uniform() -> Self {
        Self::new(0.25, 0.25, 0.25, 0.25)
    }

    /// Build from an array in [`EmotionLabel::ALL`] order
    pub fn from_array(values: [f64; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    /// Values in [`EmotionLabel::ALL`] order
    pub fn to_array(&self) -> [f64; 4] {
        [self.stressed, self.focused, self.confused, self.calm]
    }

    pub fn get(&self, label: EmotionLabel) -> f64 {
        self.to_array()[label.index()]
    }

    pub fn sum(&self) -> f64 {
        self.to_array().iter().sum()
    }

    /// Clamp negative or non-finite entries to zero and rescale to sum 1.0.
    /// A vector with no mass becomes uniform.
    pub fn normalized(&self) -> Self {
        let cleaned = self
            .to_array()
            .map(|v| if v.is_finite() && v > 0.0 { v } else { 0.0 });
        let total: f64 = cleaned.iter().sum();
        if total <= 0.0 {
            return Self::uniform();
        }
        Self::from_array(cleaned.map(|v| v / total))
    }

    /// Label with the highest probability (first in canonical order on ties)
    pub fn argmax(&self) -> EmotionLabel {
        let values = self.to_array();
        let mut best = 0;
        for (i, v) in values.iter().enumerate() {
            if *v > values[best] {
                best = i;
            }
        }
        EmotionLabel::ALL[best]
    }

    /// Copy with every entry rounded to `decimals` places
    pub fn rounded(&self, decimals: i32) -> Self {
        Self::from_array(self.to_array().map(|v| round_to(v, decimals)))
    }
}

/// Face bounding box in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Normalized face center, both axes in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub x: f64,
    pub y: f64,
}

impl Centroid {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }

    pub fn distance(&self, other: &Centroid) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Coarse head orientation derived from face geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadPose {
    Frontal,
    Down,
    Away,
    #[default]
    Unknown,
}

impl HeadPose {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeadPose::Frontal => "frontal",
            HeadPose::Down => "down",
            HeadPose::Away => "away",
            HeadPose::Unknown => "unknown",
        }
    }
}

/// Per-frame output of the face locator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    /// Whether a face was found in the frame
    pub present: bool,
    /// Dominant face box (pixel space)
    pub bbox: Option<BoundingBox>,
    /// Head orientation
    pub head_pose: HeadPose,
    /// True only for frontal faces; gates emotion inference
    pub valid_for_emotion: bool,
    /// Frame width in pixels
    pub frame_width: u32,
    /// Frame height in pixels
    pub frame_height: u32,
}

impl FaceObservation {
    /// Observation for a frame with no detectable face
    pub fn absent(frame_width: u32, frame_height: u32) -> Self {
        Self {
            present: false,
            bbox: None,
            head_pose: HeadPose::Unknown,
            valid_for_emotion: false,
            frame_width,
            frame_height,
        }
    }

    /// Observation for a face with an already-known head pose
    pub fn with_pose(
        bbox: BoundingBox,
        head_pose: HeadPose,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        Self {
            present: true,
            bbox: Some(bbox),
            head_pose,
            valid_for_emotion: head_pose == HeadPose::Frontal,
            frame_width,
            frame_height,
        }
    }

    /// Normalized center of the face box, if a face is present
    pub fn centroid(&self) -> Option<Centroid> {
        if !self.present || self.frame_width == 0 || self.frame_height == 0 {
            return None;
        }
        let bbox = self.bbox?;
        let cx = (bbox.x as f64 + bbox.width as f64 / 2.0) / self.frame_width as f64;
        let cy = (bbox.y as f64 + bbox.height as f64 / 2.0) / self.frame_height as f64;
        Some(Centroid::new(cx, cy))
    }
}

/// Movement and stability signal derived from the centroid history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementSignal {
    /// 0 = still, 1 = erratic
    pub movement_score: f64,
    /// Left-right direction reversals within the history window
    pub direction_changes: u32,
    /// Whether movement is below the stability threshold
    pub is_stable: bool,
}

impl Default for MovementSignal {
    fn default() -> Self {
        Self {
            movement_score: 0.0,
            direction_changes: 0,
            is_stable: true,
        }
    }
}

impl MovementSignal {
    /// 1 = perfectly still
    pub fn stability_score(&self) -> f64 {
        (1.0 - self.movement_score).clamp(0.0, 1.0)
    }
}

/// Discrete behavioral state emitted per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorState {
    #[default]
    Calm,
    Focused,
    Confused,
    Stressed,
    Working,
    FaceNotVisible,
}

impl BehaviorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorState::Calm => "calm",
            BehaviorState::Focused => "focused",
            BehaviorState::Confused => "confused",
            BehaviorState::Stressed => "stressed",
            BehaviorState::Working => "working",
            BehaviorState::FaceNotVisible => "face_not_visible",
        }
    }
}

impl fmt::Display for BehaviorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<EmotionLabel> for BehaviorState {
    fn from(label: EmotionLabel) -> Self {
        match label {
            EmotionLabel::Stressed => BehaviorState::Stressed,
            EmotionLabel::Focused => BehaviorState::Focused,
            EmotionLabel::Confused => BehaviorState::Confused,
            EmotionLabel::Calm => BehaviorState::Calm,
        }
    }
}

/// Round to a fixed number of decimal places
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip() {
        for label in EmotionLabel::ALL {
            assert_eq!(label.as_str().parse::<EmotionLabel>().unwrap(), label);
            assert_eq!(EmotionLabel::ALL[label.index()], label);
        }
        assert!("bored".parse::<EmotionLabel>().is_err());
    }

    #[test]
    fn test_normalized_repairs_bad_vectors() {
        let v = ProbabilityVector::new(2.0, -1.0, f64::NAN, 2.0).normalized();
        assert!((v.sum() - 1.0).abs() < 1e-9);
        assert_eq!(v.focused, 0.0);
        assert_eq!(v.confused, 0.0);
        assert!((v.stressed - 0.5).abs() < 1e-9);

        let empty = ProbabilityVector::new(0.0, 0.0, 0.0, 0.0).normalized();
        assert_eq!(empty, ProbabilityVector::uniform());
    }

    #[test]
    fn test_argmax_prefers_canonical_order_on_ties() {
        assert_eq!(ProbabilityVector::uniform().argmax(), EmotionLabel::Stressed);
        let v = ProbabilityVector::new(0.1, 0.2, 0.1, 0.6);
        assert_eq!(v.argmax(), EmotionLabel::Calm);
    }

    #[test]
    fn test_centroid_from_observation() {
        let obs = FaceObservation::with_pose(
            BoundingBox::new(270, 190, 100, 100),
            HeadPose::Frontal,
            640,
            480,
        );
        let c = obs.centroid().unwrap();
        assert!((c.x - 0.5).abs() < 1e-9);
        assert!((c.y - 0.5).abs() < 1e-9);
        assert!(obs.valid_for_emotion);

        assert!(FaceObservation::absent(640, 480).centroid().is_none());
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&BehaviorState::FaceNotVisible).unwrap();
        assert_eq!(json, "\"face_not_visible\"");
        let pose: HeadPose = serde_json::from_str("\"down\"").unwrap();
        assert_eq!(pose, HeadPose::Down);
    }
}
