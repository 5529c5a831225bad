//! Output record assembly
//!
//! One immutable record per processed frame. Scores are rounded here, at the
//! boundary, so internal state keeps full precision.

use crate::error::MonitorError;
use crate::types::{
    round_to, BehaviorState, FaceObservation, HeadPose, MovementSignal, ProbabilityVector,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Decimal places for stress score and probabilities
pub const SCORE_DECIMALS: i32 = 4;
/// Decimal places for movement and stability scores
pub const MOVEMENT_DECIMALS: i32 = 3;

/// Snapshot of one frame's outcome, handed to the logging collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// ISO-8601 UTC, second precision
    pub timestamp: String,
    pub state: BehaviorState,
    pub stress_score: f64,
    pub probabilities: ProbabilityVector,
    pub face_detected: bool,
    pub head_pose: HeadPose,
    pub valid_for_emotion: bool,
    pub movement_score: f64,
    pub stability_score: f64,
    pub direction_changes: u32,
    pub is_stable: bool,
}

impl OutputRecord {
    /// Assemble a record from the frame's signals
    pub fn assemble(
        at: DateTime<Utc>,
        state: BehaviorState,
        stress_score: f64,
        probabilities: &ProbabilityVector,
        observation: &FaceObservation,
        movement: &MovementSignal,
    ) -> Self {
        Self {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Secs, true),
            state,
            stress_score: round_to(stress_score.clamp(0.0, 1.0), SCORE_DECIMALS),
            probabilities: probabilities.rounded(SCORE_DECIMALS),
            face_detected: observation.present,
            head_pose: observation.head_pose,
            valid_for_emotion: observation.valid_for_emotion,
            movement_score: round_to(movement.movement_score, MOVEMENT_DECIMALS),
            stability_score: round_to(movement.stability_score(), MOVEMENT_DECIMALS),
            direction_changes: movement.direction_changes,
            is_stable: movement.is_stable,
        }
    }

    /// Single-line JSON, as written to NDJSON streams
    pub fn to_json(&self) -> Result<String, MonitorError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, MonitorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
