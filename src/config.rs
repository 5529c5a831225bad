//! Monitor configuration
//!
//! Every tunable the engine uses lives here with its documented default.
//! Configurations are validated once, when a pipeline is built.

use crate::error::MonitorError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default emotion inference stride (frames)
pub const DEFAULT_EMOTION_STRIDE: usize = 2;
/// Default emotion window size (accepted vectors)
pub const DEFAULT_EMOTION_WINDOW: usize = 10;
/// Default centroid history size (frames)
pub const DEFAULT_MOVEMENT_WINDOW: usize = 15;
/// Default session log write cadence (records)
pub const DEFAULT_LOG_EVERY: usize = 5;

/// Movement tracker tunables.
///
/// The stable and erratic thresholds are also the classifier's still and
/// erratic gates, so both stages always agree on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Centroid history capacity
    pub window: usize,
    /// movement_score below this is stable
    pub stable_threshold: f64,
    /// Average velocity that maps to movement_score 1.0
    pub erratic_threshold: f64,
    /// Horizontal displacements at or below this are ignored for reversals
    pub jitter_threshold: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_MOVEMENT_WINDOW,
            stable_threshold: 0.03,
            erratic_threshold: 0.18,
            jitter_threshold: 0.005,
        }
    }
}

/// Hybrid classifier tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// EMA weight of the current raw score
    pub ema_alpha: f64,
    /// Weight of movement in the raw score; emotion gets the remainder
    pub movement_weight: f64,
    /// Frames of absence held as noise before decaying
    pub absence_grace_frames: u32,
    /// Decay per absent frame when the head was stable
    pub working_decay: f64,
    /// Decay per absent frame when the head was not stable
    pub unknown_decay: f64,
    /// Lower bound of the smoothed score
    pub score_floor: f64,
    /// Smoothed score at session start
    pub initial_score: f64,
    /// Reversals needed for the scanning rule
    pub confused_direction_changes: u32,
    /// Minimum movement for the scanning rule
    pub scan_movement_min: f64,
    /// Smoothed score at or above this triggers the erratic rule
    pub high_score_gate: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            ema_alpha: 0.75,
            movement_weight: 0.65,
            absence_grace_frames: 8,
            working_decay: 0.98,
            unknown_decay: 0.95,
            score_floor: 0.02,
            initial_score: 0.2,
            confused_direction_changes: 3,
            scan_movement_min: 0.10,
            high_score_gate: 0.55,
        }
    }
}

/// Personal calibration tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Samples required for each of calm and stressed
    pub min_samples_per_class: usize,
    /// Minimum class probability for an override
    pub min_confidence: f64,
    /// Gradient descent epochs
    pub epochs: usize,
    /// Gradient descent step size
    pub learning_rate: f64,
    /// L2 penalty on weights
    pub l2_penalty: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_samples_per_class: 15,
            min_confidence: 0.45,
            epochs: 500,
            learning_rate: 0.5,
            l2_penalty: 1e-3,
        }
    }
}

/// Top-level configuration for one monitoring session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Run emotion inference every N frames
    pub emotion_stride: usize,
    /// Accepted probability vectors kept for averaging
    pub emotion_window: usize,
    /// Session log write cadence
    pub log_every: usize,
    pub tracker: TrackerConfig,
    pub classifier: ClassifierConfig,
    pub calibration: CalibrationConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            emotion_stride: DEFAULT_EMOTION_STRIDE,
            emotion_window: DEFAULT_EMOTION_WINDOW,
            log_every: DEFAULT_LOG_EVERY,
            tracker: TrackerConfig::default(),
            classifier: ClassifierConfig::default(),
            calibration: CalibrationConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from a JSON file; missing fields take defaults
    pub fn load(path: &Path) -> Result<Self, MonitorError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, MonitorError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, MonitorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every parameter; the first violation is reported
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.emotion_stride == 0 {
            return invalid("emotion_stride must be a positive integer");
        }
        if self.emotion_window == 0 {
            return invalid("emotion_window must be at least 1");
        }
        if self.log_every == 0 {
            return invalid("log_every must be at least 1");
        }

        let t = &self.tracker;
        if t.window < 3 {
            return invalid("tracker.window must be at least 3");
        }
        check_unit("tracker.stable_threshold", t.stable_threshold)?;
        check_unit("tracker.erratic_threshold", t.erratic_threshold)?;
        if t.stable_threshold >= t.erratic_threshold {
            return invalid("tracker.stable_threshold must be below tracker.erratic_threshold");
        }
        if !(t.jitter_threshold.is_finite() && t.jitter_threshold >= 0.0) {
            return invalid("tracker.jitter_threshold must be non-negative");
        }

        let c = &self.classifier;
        check_unit("classifier.ema_alpha", c.ema_alpha)?;
        if !(0.0..=1.0).contains(&c.movement_weight) {
            return invalid("classifier.movement_weight must be within [0, 1]");
        }
        check_unit("classifier.working_decay", c.working_decay)?;
        check_unit("classifier.unknown_decay", c.unknown_decay)?;
        if !(0.0..1.0).contains(&c.score_floor) {
            return invalid("classifier.score_floor must be within [0, 1)");
        }
        if !(c.score_floor..=1.0).contains(&c.initial_score) {
            return invalid("classifier.initial_score must be within [score_floor, 1]");
        }
        check_unit("classifier.scan_movement_min", c.scan_movement_min)?;
        check_unit("classifier.high_score_gate", c.high_score_gate)?;

        let k = &self.calibration;
        if k.min_samples_per_class == 0 {
            return invalid("calibration.min_samples_per_class must be at least 1");
        }
        check_unit("calibration.min_confidence", k.min_confidence)?;
        if k.epochs == 0 {
            return invalid("calibration.epochs must be at least 1");
        }
        if !(k.learning_rate.is_finite() && k.learning_rate > 0.0) {
            return invalid("calibration.learning_rate must be positive");
        }
        if !(k.l2_penalty.is_finite() && k.l2_penalty >= 0.0) {
            return invalid("calibration.l2_penalty must be non-negative");
        }

        Ok(())
    }
}

fn invalid(message: &str) -> Result<(), MonitorError> {
    Err(MonitorError::InvalidConfig(message.to_string()))
}

/// Require a finite value in (0, 1]
fn check_unit(name: &str, value: f64) -> Result<(), MonitorError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(MonitorError::InvalidConfig(format!(
            "{} must be within (0, 1], got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.emotion_stride, 2);
        assert_eq!(config.tracker.window, 15);
        assert_eq!(config.classifier.absence_grace_frames, 8);
    }

    #[test]
    fn test_zero_stride_rejected() {
        let config = MonitorConfig {
            emotion_stride: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("emotion_stride"));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = MonitorConfig::default();
        config.tracker.stable_threshold = 0.2;
        config.tracker.erratic_threshold = 0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tracker_thresholds_have_one_home() {
        let config = MonitorConfig::from_json(
            r#"{"tracker": {"stable_threshold": 0.05, "erratic_threshold": 0.3}}"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.tracker.stable_threshold, 0.05);
        assert_eq!(config.tracker.erratic_threshold, 0.3);

        let json: serde_json::Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert!(json["classifier"].get("stable_threshold").is_none());
        assert!(json["classifier"].get("erratic_threshold").is_none());
    }

    #[test]
    fn test_bad_alpha_rejected() {
        let mut config = MonitorConfig::default();
        config.classifier.ema_alpha = 0.0;
        assert!(config.validate().is_err());
        config.classifier.ema_alpha = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config =
            MonitorConfig::from_json(r#"{"emotion_stride": 3, "tracker": {"window": 20}}"#)
                .unwrap();
        assert_eq!(config.emotion_stride, 3);
        assert_eq!(config.tracker.window, 20);
        assert_eq!(config.tracker.stable_threshold, 0.03);
        assert_eq!(config.classifier, ClassifierConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let config = MonitorConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(MonitorConfig::from_json(&json).unwrap(), config);
    }
}
