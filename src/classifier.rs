//! Hybrid stress classification
//!
//! Movement is the primary signal and emotion the secondary one. The two are
//! fused into a raw score, smoothed with an EMA, and a priority-ordered rule
//! tree assigns the discrete state:
//!
//! 1. Still head: calm or focused, emotion breaks the tie
//! 2. Rapid left-right scanning: confused
//! 3. Erratic movement or high score: confused or stressed
//! 4. Moderate movement: emotion thresholds decide
//!
//! Prolonged face absence decays the score and reports `working` when the head
//! was still before it vanished, `face_not_visible` otherwise.

use crate::config::{ClassifierConfig, TrackerConfig};
use crate::types::{BehaviorState, MovementSignal, ProbabilityVector};
use tracing::debug;

// Emotion fractions used by the rule tree
const CONFUSED_FRACTION: f64 = 0.15;
const CALM_FRACTION: f64 = 0.20;
const STRESSED_FRACTION: f64 = 0.28;

/// Fused signals for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierInput {
    pub face_detected: bool,
    pub movement: MovementSignal,
    /// Tracker's stability memory from before the face vanished
    pub was_stable: bool,
    /// Windowed average of accepted emotion vectors
    pub emotion_average: Option<ProbabilityVector>,
    /// Scalar emotion stress component of that window
    pub emotion_component: f64,
}

/// Result of one classifier step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub stress_score: f64,
    pub state: BehaviorState,
}

/// Per-session classifier state
#[derive(Debug, Clone)]
pub struct HybridClassifier {
    config: ClassifierConfig,
    stable_threshold: f64,
    erratic_threshold: f64,
    smoothed_score: f64,
    last_state: BehaviorState,
    no_face_count: u32,
    last_was_stable: bool,
}

impl Default for HybridClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default(), &TrackerConfig::default())
    }
}

impl HybridClassifier {
    /// Build a classifier whose still and erratic gates follow the tracker's thresholds
    pub fn new(config: ClassifierConfig, tracker: &TrackerConfig) -> Self {
        let smoothed_score = config.initial_score;
        Self {
            config,
            stable_threshold: tracker.stable_threshold,
            erratic_threshold: tracker.erratic_threshold,
            smoothed_score,
            last_state: BehaviorState::Calm,
            no_face_count: 0,
            last_was_stable: true,
        }
    }

    /// Advance one frame
    pub fn update(&mut self, input: &ClassifierInput) -> Classification {
        if !input.face_detected {
            return self.update_absent(input.was_stable);
        }

        self.no_face_count = 0;
        self.last_was_stable = input.movement.is_stable;

        let movement_weight = self.config.movement_weight;
        let raw = (movement_weight * input.movement.movement_score
            + (1.0 - movement_weight) * input.emotion_component)
            .clamp(0.0, 1.0);
        self.smooth(raw);

        let average = input
            .emotion_average
            .unwrap_or_else(|| ProbabilityVector::new(0.0, 0.0, 0.0, 0.0));
        let state = self.classify(&input.movement, &average);
        self.transition(state);

        Classification {
            stress_score: self.smoothed_score,
            state,
        }
    }

    pub fn smoothed_score(&self) -> f64 {
        self.smoothed_score
    }

    pub fn last_state(&self) -> BehaviorState {
        self.last_state
    }

    /// Consecutive frames without a face
    pub fn no_face_count(&self) -> u32 {
        self.no_face_count
    }

    /// Restore session-start state
    pub fn reset(&mut self) {
        self.smoothed_score = self.config.initial_score;
        self.last_state = BehaviorState::Calm;
        self.no_face_count = 0;
        self.last_was_stable = true;
    }

    fn update_absent(&mut self, was_stable: bool) -> Classification {
        self.no_face_count = self.no_face_count.saturating_add(1);

        // Brief disappearance (blink, quick glance) is noise
        if self.no_face_count < self.config.absence_grace_frames {
            return Classification {
                stress_score: self.smoothed_score,
                state: self.last_state,
            };
        }

        let (decay, state) = if was_stable || self.last_was_stable {
            (self.config.working_decay, BehaviorState::Working)
        } else {
            (self.config.unknown_decay, BehaviorState::FaceNotVisible)
        };
        self.smoothed_score = (self.smoothed_score * decay).max(self.config.score_floor);
        self.transition(state);

        Classification {
            stress_score: self.smoothed_score,
            state,
        }
    }

    fn smooth(&mut self, raw: f64) {
        let alpha = self.config.ema_alpha;
        let blended = alpha * raw + (1.0 - alpha) * self.smoothed_score;
        self.smoothed_score = if blended.is_finite() {
            blended.clamp(self.config.score_floor, 1.0)
        } else {
            self.smoothed_score
        };
    }

    fn classify(&self, movement: &MovementSignal, average: &ProbabilityVector) -> BehaviorState {
        let cfg = &self.config;
        let k = average.calm;
        let s = average.stressed;
        let c = average.confused;
        let score = movement.movement_score;

        if movement.is_stable || score < self.stable_threshold * 2.0 {
            return if k >= s {
                BehaviorState::Calm
            } else {
                BehaviorState::Focused
            };
        }

        if movement.direction_changes >= cfg.confused_direction_changes
            && score >= cfg.scan_movement_min
        {
            return BehaviorState::Confused;
        }

        if score >= self.erratic_threshold || self.smoothed_score >= cfg.high_score_gate {
            return if c >= CONFUSED_FRACTION {
                BehaviorState::Confused
            } else {
                BehaviorState::Stressed
            };
        }

        if k >= CALM_FRACTION {
            BehaviorState::Calm
        } else if c >= CONFUSED_FRACTION {
            BehaviorState::Confused
        } else if s >= STRESSED_FRACTION {
            BehaviorState::Stressed
        } else {
            BehaviorState::Focused
        }
    }

    fn transition(&mut self, state: BehaviorState) {
        if state != self.last_state {
            debug!(
                from = self.last_state.as_str(),
                to = state.as_str(),
                score = self.smoothed_score,
                "state transition"
            );
        }
        self.last_state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn present(movement: MovementSignal, average: ProbabilityVector) -> ClassifierInput {
        ClassifierInput {
            face_detected: true,
            movement,
            was_stable: movement.is_stable,
            emotion_average: Some(average),
            emotion_component: crate::emotion::emotion_component(&average),
        }
    }

    fn absent(was_stable: bool) -> ClassifierInput {
        ClassifierInput {
            face_detected: false,
            movement: MovementSignal::default(),
            was_stable,
            emotion_average: None,
            emotion_component: 0.3,
        }
    }

    fn stable() -> MovementSignal {
        MovementSignal::default()
    }

    fn moving(score: f64, changes: u32) -> MovementSignal {
        MovementSignal {
            movement_score: score,
            direction_changes: changes,
            is_stable: false,
        }
    }

    #[test]
    fn test_initial_state() {
        let clf = HybridClassifier::default();
        assert_eq!(clf.smoothed_score(), 0.2);
        assert_eq!(clf.last_state(), BehaviorState::Calm);
    }

    #[test]
    fn test_stable_calm() {
        let mut clf = HybridClassifier::default();
        let avg = ProbabilityVector::new(0.1, 0.2, 0.1, 0.6);
        assert_eq!(clf.update(&present(stable(), avg)).state, BehaviorState::Calm);
    }

    #[test]
    fn test_stable_focused_when_stress_outweighs_calm() {
        let mut clf = HybridClassifier::default();
        let avg = ProbabilityVector::new(0.4, 0.3, 0.1, 0.2);
        assert_eq!(clf.update(&present(stable(), avg)).state, BehaviorState::Focused);
    }

    #[test]
    fn test_near_stable_counts_as_still() {
        let mut clf = HybridClassifier::default();
        let avg = ProbabilityVector::new(0.1, 0.2, 0.1, 0.6);
        // Not flagged stable, but below twice the stable threshold
        let result = clf.update(&present(moving(0.05, 6), avg));
        assert_eq!(result.state, BehaviorState::Calm);
    }

    #[test]
    fn test_scanning_is_confused_regardless_of_emotion() {
        let vectors = [
            ProbabilityVector::new(0.0, 0.0, 0.0, 1.0),
            ProbabilityVector::new(1.0, 0.0, 0.0, 0.0),
            ProbabilityVector::uniform(),
        ];
        for avg in vectors {
            let mut clf = HybridClassifier::default();
            let result = clf.update(&present(moving(0.25, 5), avg));
            assert_eq!(result.state, BehaviorState::Confused);
        }
    }

    #[test]
    fn test_erratic_without_confusion_is_stressed() {
        let mut clf = HybridClassifier::default();
        let avg = ProbabilityVector::new(0.7, 0.1, 0.1, 0.1);
        let result = clf.update(&present(moving(0.5, 1), avg));
        assert_eq!(result.state, BehaviorState::Stressed);
    }

    #[test]
    fn test_erratic_with_confusion_is_confused() {
        let mut clf = HybridClassifier::default();
        let avg = ProbabilityVector::new(0.5, 0.1, 0.3, 0.1);
        let result = clf.update(&present(moving(0.5, 0), avg));
        assert_eq!(result.state, BehaviorState::Confused);
    }

    #[test]
    fn test_moderate_movement_falls_back_to_emotion() {
        let cases = [
            (ProbabilityVector::new(0.2, 0.3, 0.1, 0.4), BehaviorState::Calm),
            (ProbabilityVector::new(0.2, 0.5, 0.2, 0.1), BehaviorState::Confused),
            (ProbabilityVector::new(0.3, 0.55, 0.05, 0.1), BehaviorState::Stressed),
            (ProbabilityVector::new(0.1, 0.75, 0.05, 0.1), BehaviorState::Focused),
        ];
        for (avg, expected) in cases {
            let mut clf = HybridClassifier::default();
            let result = clf.update(&present(moving(0.1, 0), avg));
            assert_eq!(result.state, expected, "average {:?}", avg);
        }
    }

    #[test]
    fn test_slow_reversals_are_not_scanning() {
        let avg = ProbabilityVector::new(0.1, 0.3, 0.05, 0.55);
        for changes in [3, 8] {
            let mut clf = HybridClassifier::default();
            let result = clf.update(&present(moving(0.099, changes), avg));
            assert_eq!(result.state, BehaviorState::Calm);
        }

        let mut clf = HybridClassifier::default();
        let result = clf.update(&present(moving(0.10, 3), avg));
        assert_eq!(result.state, BehaviorState::Confused);
    }

    #[test]
    fn test_high_score_gate_without_erratic_movement() {
        let config = ClassifierConfig {
            ema_alpha: 0.3,
            ..Default::default()
        };
        let tracker = TrackerConfig::default();
        let calm_leaning = ProbabilityVector::new(0.1, 0.4, 0.05, 0.45);

        // Same frame on a fresh session reads through the emotion fallback
        let mut fresh = HybridClassifier::new(config.clone(), &tracker);
        let result = fresh.update(&present(moving(0.12, 0), calm_leaning));
        assert_eq!(result.state, BehaviorState::Calm);

        // After an erratic burst the slow EMA keeps the score above the gate
        let mut clf = HybridClassifier::new(config, &tracker);
        for _ in 0..20 {
            clf.update(&present(moving(1.0, 0), ProbabilityVector::new(1.0, 0.0, 0.0, 0.0)));
        }
        let result = clf.update(&present(moving(0.12, 0), calm_leaning));
        assert!(result.stress_score >= 0.55);
        assert_eq!(result.state, BehaviorState::Stressed);
    }

    #[test]
    fn test_gates_follow_tracker_thresholds() {
        let stress_leaning = ProbabilityVector::new(0.6, 0.3, 0.05, 0.05);
        let mut default_clf = HybridClassifier::default();
        let result = default_clf.update(&present(moving(0.08, 0), stress_leaning));
        assert_eq!(result.state, BehaviorState::Stressed);

        let looser = TrackerConfig {
            stable_threshold: 0.05,
            ..Default::default()
        };
        let mut clf = HybridClassifier::new(ClassifierConfig::default(), &looser);
        let result = clf.update(&present(moving(0.08, 0), stress_leaning));
        assert_eq!(result.state, BehaviorState::Focused);

        let calm_leaning = ProbabilityVector::new(0.5, 0.2, 0.05, 0.25);
        let mut default_clf = HybridClassifier::default();
        let result = default_clf.update(&present(moving(0.2, 0), calm_leaning));
        assert_eq!(result.state, BehaviorState::Stressed);

        let wider = TrackerConfig {
            erratic_threshold: 0.3,
            ..Default::default()
        };
        let mut clf = HybridClassifier::new(ClassifierConfig::default(), &wider);
        let result = clf.update(&present(moving(0.2, 0), calm_leaning));
        assert_eq!(result.state, BehaviorState::Calm);
    }

    #[test]
    fn test_ema_update() {
        let mut clf = HybridClassifier::default();
        let avg = ProbabilityVector::new(0.0, 0.0, 0.0, 1.0);
        // raw = 0.65 * 0.4 + 0.35 * 0.0 = 0.26; smoothed = 0.75 * 0.26 + 0.25 * 0.2
        let result = clf.update(&present(moving(0.4, 0), avg));
        assert!((result.stress_score - 0.245).abs() < 1e-9);
    }

    #[test]
    fn test_brief_absence_holds_state_and_score() {
        let mut clf = HybridClassifier::default();
        let avg = ProbabilityVector::new(0.7, 0.1, 0.1, 0.1);
        let before = clf.update(&present(moving(0.5, 1), avg));

        for _ in 0..5 {
            let held = clf.update(&absent(false));
            assert_eq!(held, before);
        }
        assert_eq!(clf.no_face_count(), 5);
    }

    #[test]
    fn test_grace_boundary() {
        let mut clf = HybridClassifier::default();
        clf.update(&present(stable(), ProbabilityVector::uniform()));
        for _ in 0..7 {
            assert_eq!(clf.update(&absent(true)).state, BehaviorState::Calm);
        }
        assert_eq!(clf.update(&absent(true)).state, BehaviorState::Working);
    }

    #[test]
    fn test_long_absence_after_stable_is_working() {
        let mut clf = HybridClassifier::default();
        clf.update(&present(stable(), ProbabilityVector::uniform()));
        let score_before = clf.smoothed_score();

        let mut last = None;
        for _ in 0..12 {
            last = Some(clf.update(&absent(true)));
        }
        let last = last.unwrap();
        assert_eq!(last.state, BehaviorState::Working);
        assert!(last.stress_score < score_before);
    }

    #[test]
    fn test_long_absence_after_erratic_is_not_visible() {
        let mut clf = HybridClassifier::default();
        clf.update(&present(moving(0.6, 0), ProbabilityVector::uniform()));

        let mut state = BehaviorState::Calm;
        for _ in 0..10 {
            state = clf.update(&absent(false)).state;
        }
        assert_eq!(state, BehaviorState::FaceNotVisible);
    }

    #[test]
    fn test_decay_stops_at_floor() {
        let mut clf = HybridClassifier::default();
        for _ in 0..1000 {
            clf.update(&absent(false));
        }
        assert!((clf.smoothed_score() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_reappearance_resets_absence_counter() {
        let mut clf = HybridClassifier::default();
        for _ in 0..6 {
            clf.update(&absent(true));
        }
        clf.update(&present(stable(), ProbabilityVector::uniform()));
        assert_eq!(clf.no_face_count(), 0);
    }

    #[test]
    fn test_reset() {
        let mut clf = HybridClassifier::default();
        clf.update(&present(moving(1.0, 0), ProbabilityVector::new(1.0, 0.0, 0.0, 0.0)));
        clf.reset();
        assert_eq!(clf.smoothed_score(), 0.2);
        assert_eq!(clf.last_state(), BehaviorState::Calm);
    }

    #[test]
    fn test_missing_average_degrades_to_calm_when_still() {
        let mut clf = HybridClassifier::default();
        let input = ClassifierInput {
            face_detected: true,
            movement: stable(),
            was_stable: true,
            emotion_average: None,
            emotion_component: 0.3,
        };
        assert_eq!(clf.update(&input).state, BehaviorState::Calm);
    }

    fn arb_input() -> impl Strategy<Value = ClassifierInput> {
        (
            any::<bool>(),
            0.0f64..=1.0,
            0u32..20,
            any::<bool>(),
            any::<bool>(),
            [0.0f64..=1.0, 0.0f64..=1.0, 0.0f64..=1.0, 0.0f64..=1.0],
            0.0f64..=1.0,
        )
            .prop_map(
                |(face, score, changes, is_stable, was_stable, probs, component)| {
                    ClassifierInput {
                        face_detected: face,
                        movement: MovementSignal {
                            movement_score: score,
                            direction_changes: changes,
                            is_stable,
                        },
                        was_stable,
                        emotion_average: Some(ProbabilityVector::from_array(probs).normalized()),
                        emotion_component: component,
                    }
                },
            )
    }

    proptest! {
        #[test]
        fn prop_score_stays_within_bounds(inputs in prop::collection::vec(arb_input(), 1..200)) {
            let mut clf = HybridClassifier::default();
            for input in &inputs {
                let result = clf.update(input);
                prop_assert!(result.stress_score >= 0.02);
                prop_assert!(result.stress_score <= 1.0);
            }
        }
    }
}
