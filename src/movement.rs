//! Head movement tracking
//!
//! This module turns a sequence of face centroids into a movement signal:
//! - Average frame-to-frame velocity, scaled against an erratic reference
//! - Left-right direction reversals (scanning)
//! - Stability classification
//!
//! It also classifies head pose from raw face geometry, which gates emotion
//! inference downstream.

use crate::config::TrackerConfig;
use crate::record::MOVEMENT_DECIMALS;
use crate::ring::RingBuffer;
use crate::types::{round_to, BoundingBox, Centroid, FaceObservation, HeadPose, MovementSignal};
use serde::{Deserialize, Serialize};

/// Minimum centroids needed before movement is measured
pub const MIN_CENTROIDS: usize = 3;

/// Face top below this fraction of the frame height can read as looking down
const DOWN_FACE_TOP_RATIO: f64 = 0.72;
/// Width/height aspect below this reads as turned away
const AWAY_ASPECT_RATIO: f64 = 0.38;

/// Raw face geometry as reported by a detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceGeometry {
    pub bbox: BoundingBox,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Eye features found in the upper half of the face box
    pub eyes_in_upper_half: u32,
}

impl FaceGeometry {
    /// Build the observation this geometry implies
    pub fn observe(&self) -> FaceObservation {
        FaceObservation::with_pose(
            self.bbox,
            classify_head_pose(self),
            self.frame_width,
            self.frame_height,
        )
    }
}

/// Classify head pose from box geometry.
///
/// A face low in the frame with no visible eyes is looking down; a very narrow
/// box is turned away; anything else is frontal.
pub fn classify_head_pose(geometry: &FaceGeometry) -> HeadPose {
    if geometry.frame_height == 0 {
        return HeadPose::Unknown;
    }
    let bbox = geometry.bbox;
    let aspect = bbox.width as f64 / bbox.height.max(1) as f64;
    let face_top = bbox.y as f64 / geometry.frame_height as f64;
    let eyes_ok = geometry.eyes_in_upper_half >= 1;

    if face_top > DOWN_FACE_TOP_RATIO && !eyes_ok {
        HeadPose::Down
    } else if aspect < AWAY_ASPECT_RATIO {
        HeadPose::Away
    } else {
        HeadPose::Frontal
    }
}

/// Rolling centroid history with derived movement signal
#[derive(Debug, Clone)]
pub struct MovementTracker {
    config: TrackerConfig,
    centroids: RingBuffer<Centroid>,
    last_signal: MovementSignal,
    frames_without_face: u32,
}

impl Default for MovementTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl MovementTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let centroids = RingBuffer::with_capacity(config.window);
        Self {
            config,
            centroids,
            last_signal: MovementSignal::default(),
            frames_without_face: 0,
        }
    }

    /// Feed one frame's observation and return the current movement signal.
    ///
    /// With no face, the previous signal is carried forward unchanged.
    pub fn update(&mut self, observation: &FaceObservation) -> MovementSignal {
        let centroid = match observation.centroid() {
            Some(c) => c,
            None => {
                self.frames_without_face = self.frames_without_face.saturating_add(1);
                return self.last_signal;
            }
        };

        self.frames_without_face = 0;
        self.centroids.push(centroid);
        self.last_signal = self.analyze();
        self.last_signal
    }

    /// Last computed signal
    pub fn last_signal(&self) -> MovementSignal {
        self.last_signal
    }

    /// Stability as of the last frame with a face
    pub fn was_stable(&self) -> bool {
        self.last_signal.is_stable
    }

    /// Consecutive frames since a face was last seen
    pub fn frames_without_face(&self) -> u32 {
        self.frames_without_face
    }

    pub fn history_len(&self) -> usize {
        self.centroids.len()
    }

    pub fn reset(&mut self) {
        self.centroids.clear();
        self.last_signal = MovementSignal::default();
        self.frames_without_face = 0;
    }

    fn analyze(&self) -> MovementSignal {
        if self.centroids.len() < MIN_CENTROIDS {
            return MovementSignal::default();
        }

        let movement_score = self.movement_score();
        let direction_changes = self.direction_changes();

        // Stability is judged on the exact score; downstream rules see the rounded one
        MovementSignal {
            movement_score: round_to(movement_score, MOVEMENT_DECIMALS),
            direction_changes,
            is_stable: movement_score < self.config.stable_threshold,
        }
    }

    /// Mean consecutive distance over the erratic reference, clamped to [0, 1]
    fn movement_score(&self) -> f64 {
        let steps = self.centroids.len() - 1;
        let total: f64 = self
            .centroids
            .iter()
            .zip(self.centroids.iter().skip(1))
            .map(|(a, b)| a.distance(b))
            .sum();
        let avg_velocity = total / steps as f64;
        (avg_velocity / self.config.erratic_threshold).clamp(0.0, 1.0)
    }

    /// Sign flips between consecutive non-jitter horizontal displacements
    fn direction_changes(&self) -> u32 {
        let jitter = self.config.jitter_threshold;
        let mut previous_sign: Option<bool> = None;
        let mut changes = 0;

        for (a, b) in self.centroids.iter().zip(self.centroids.iter().skip(1)) {
            let dx = b.x - a.x;
            if dx.abs() <= jitter {
                continue;
            }
            let positive = dx > 0.0;
            if let Some(prev) = previous_sign {
                if prev != positive {
                    changes += 1;
                }
            }
            previous_sign = Some(positive);
        }

        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_W: u32 = 1000;
    const FRAME_H: u32 = 1000;

    /// Observation whose centroid lands at pixel (cx, cy) of a 1000x1000 frame
    fn face_at(cx: u32, cy: u32) -> FaceObservation {
        let size = 100;
        let x = cx - size / 2;
        let y = cy - size / 2;
        FaceObservation::with_pose(
            BoundingBox::new(x, y, size, size),
            HeadPose::Frontal,
            FRAME_W,
            FRAME_H,
        )
    }

    #[test]
    fn test_short_history_is_still() {
        let mut tracker = MovementTracker::default();
        let s1 = tracker.update(&face_at(200, 500));
        let s2 = tracker.update(&face_at(800, 500));
        for signal in [s1, s2] {
            assert_eq!(signal.movement_score, 0.0);
            assert_eq!(signal.direction_changes, 0);
            assert!(signal.is_stable);
        }
    }

    #[test]
    fn test_still_head_is_stable() {
        let mut tracker = MovementTracker::default();
        let mut signal = MovementSignal::default();
        for _ in 0..15 {
            signal = tracker.update(&face_at(500, 500));
        }
        assert_eq!(signal.movement_score, 0.0);
        assert!(signal.is_stable);
        assert_eq!(signal.stability_score(), 1.0);
    }

    #[test]
    fn test_velocity_normalization() {
        let mut tracker = MovementTracker::default();
        // Steady rightward drift of 0.009 per frame -> 0.009 / 0.18 = 0.05
        let mut signal = MovementSignal::default();
        for i in 0..5 {
            signal = tracker.update(&face_at(300 + 9 * i, 500));
        }
        assert!((signal.movement_score - 0.05).abs() < 0.002);
        assert!(!signal.is_stable);
        assert_eq!(signal.direction_changes, 0);
    }

    #[test]
    fn test_score_rounded_before_classification() {
        let mut tracker = MovementTracker::default();
        // Steps of 11, 11, 11, 10 px: 0.01075 / 0.18 = 0.05972, reported as 0.06
        let mut signal = MovementSignal::default();
        for x in [300, 311, 322, 333, 343] {
            signal = tracker.update(&face_at(x, 500));
        }
        assert_eq!(signal.movement_score, 0.06);
        assert!(!signal.is_stable);
    }

    #[test]
    fn test_erratic_motion_clamps_to_one() {
        let mut tracker = MovementTracker::default();
        let mut signal = MovementSignal::default();
        for i in 0..6 {
            let x = if i % 2 == 0 { 200 } else { 800 };
            signal = tracker.update(&face_at(x, 500));
        }
        assert_eq!(signal.movement_score, 1.0);
        assert_eq!(signal.direction_changes, 4);
    }

    #[test]
    fn test_jitter_ignored_for_reversals() {
        let mut tracker = MovementTracker::default();
        let mut signal = MovementSignal::default();
        // Alternating 0.003 wiggles stay under the 0.005 jitter threshold
        for i in 0..10 {
            let x = if i % 2 == 0 { 500 } else { 503 };
            signal = tracker.update(&face_at(x, 500));
        }
        assert_eq!(signal.direction_changes, 0);
        assert!(signal.is_stable);
    }

    #[test]
    fn test_absent_face_carries_signal_forward() {
        let mut tracker = MovementTracker::default();
        for i in 0..6 {
            let x = if i % 2 == 0 { 300 } else { 700 };
            tracker.update(&face_at(x, 500));
        }
        let before = tracker.last_signal();
        let absent = FaceObservation::absent(FRAME_W, FRAME_H);

        assert_eq!(tracker.update(&absent), before);
        assert_eq!(tracker.update(&absent), before);
        assert_eq!(tracker.frames_without_face(), 2);
        assert!(!tracker.was_stable());
        assert_eq!(tracker.history_len(), 6);

        tracker.update(&face_at(500, 500));
        assert_eq!(tracker.frames_without_face(), 0);
    }

    #[test]
    fn test_history_capped_at_window() {
        let mut tracker = MovementTracker::default();
        for _ in 0..40 {
            tracker.update(&face_at(500, 500));
        }
        assert_eq!(tracker.history_len(), 15);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut tracker = MovementTracker::default();
        for i in 0..5 {
            tracker.update(&face_at(100 + 100 * i, 500));
        }
        tracker.reset();
        assert_eq!(tracker.history_len(), 0);
        assert_eq!(tracker.last_signal(), MovementSignal::default());
    }

    #[test]
    fn test_head_pose_geometry() {
        let frontal = FaceGeometry {
            bbox: BoundingBox::new(200, 100, 120, 140),
            frame_width: 640,
            frame_height: 480,
            eyes_in_upper_half: 2,
        };
        assert_eq!(classify_head_pose(&frontal), HeadPose::Frontal);
        assert!(frontal.observe().valid_for_emotion);

        let down = FaceGeometry {
            bbox: BoundingBox::new(200, 360, 100, 100),
            eyes_in_upper_half: 0,
            ..frontal
        };
        assert_eq!(classify_head_pose(&down), HeadPose::Down);
        assert!(!down.observe().valid_for_emotion);

        // Low in the frame but eyes visible is still frontal
        let low_with_eyes = FaceGeometry {
            eyes_in_upper_half: 1,
            ..down
        };
        assert_eq!(classify_head_pose(&low_with_eyes), HeadPose::Frontal);

        let away = FaceGeometry {
            bbox: BoundingBox::new(200, 100, 40, 140),
            ..frontal
        };
        assert_eq!(classify_head_pose(&away), HeadPose::Away);
    }
}
