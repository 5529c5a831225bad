//! Pipeline orchestration
//!
//! [`MonitorPipeline`] owns every stateful component of one monitoring
//! session and sequences them per frame:
//!
//! 1. Face locator - presence, box, head pose
//! 2. Movement tracker - every frame
//! 3. Emotion source - every `emotion_stride` frames, frontal faces only
//! 4. Emotion aggregator - windowed average and stress component
//! 5. Hybrid classifier - smoothed score and discrete state
//! 6. Personal calibration - optional state override
//! 7. Output record - handed to the record sink
//!
//! Frame processing never fails. Every degraded input still yields a record.

use crate::calibration::{CalibrationStore, ModelHandle, PersonalCalibration};
use crate::classifier::{ClassifierInput, HybridClassifier};
use crate::config::MonitorConfig;
use crate::emotion::EmotionAggregator;
use crate::error::MonitorError;
use crate::movement::MovementTracker;
use crate::record::OutputRecord;
use crate::session_log::RecordSink;
use crate::types::{BehaviorState, BoundingBox, FaceObservation, ProbabilityVector};
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

/// User id for sessions without a named user
pub const DEFAULT_USER: &str = "default";

/// Finds the dominant face in a frame.
///
/// Must be deterministic for a given frame and free of side effects.
pub trait FaceLocator {
    type Frame;

    fn locate(&self, frame: &Self::Frame) -> FaceObservation;
}

/// Produces an emotion probability vector for a face.
///
/// Implementations return [`ProbabilityVector::uniform`] on any internal
/// failure instead of erroring.
pub trait EmotionSource {
    type Frame;

    fn infer(&mut self, frame: &Self::Frame, bbox: &BoundingBox) -> ProbabilityVector;
}

/// Per-session frame processor
pub struct MonitorPipeline<L, E> {
    config: MonitorConfig,
    locator: L,
    emotion: E,
    tracker: MovementTracker,
    aggregator: EmotionAggregator,
    classifier: HybridClassifier,
    calibration: PersonalCalibration,
    sink: Option<Box<dyn RecordSink>>,
    session_id: Uuid,
    frame_count: u64,
    last_probs: ProbabilityVector,
    last_record: Option<OutputRecord>,
}

impl<L, E> MonitorPipeline<L, E>
where
    L: FaceLocator,
    E: EmotionSource<Frame = L::Frame>,
{
    /// Build a session. Fails only on an invalid configuration.
    pub fn new(config: MonitorConfig, locator: L, emotion: E) -> Result<Self, MonitorError> {
        config.validate()?;

        let session_id = Uuid::new_v4();
        info!(
            session = %session_id,
            stride = config.emotion_stride,
            window = config.emotion_window,
            "monitor pipeline ready"
        );

        Ok(Self {
            tracker: MovementTracker::new(config.tracker.clone()),
            aggregator: EmotionAggregator::new(config.emotion_window),
            classifier: HybridClassifier::new(config.classifier.clone(), &config.tracker),
            calibration: PersonalCalibration::in_memory(config.calibration.clone(), DEFAULT_USER),
            sink: None,
            session_id,
            frame_count: 0,
            last_probs: ProbabilityVector::uniform(),
            last_record: None,
            config,
            locator,
            emotion,
        })
    }

    /// Attach a persisted per-user calibration, loading any existing model
    pub fn with_calibration(mut self, store: CalibrationStore, user_id: &str) -> Self {
        self.calibration = PersonalCalibration::open(self.config.calibration.clone(), user_id, store);
        info!(
            session = %self.session_id,
            user = user_id,
            personal_model = self.calibration.has_model(),
            "calibration attached"
        );
        self
    }

    /// Send every record to `sink`
    pub fn with_sink(mut self, sink: impl RecordSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Process one frame to completion
    pub fn process_frame(&mut self, frame: &L::Frame) -> OutputRecord {
        self.frame_count += 1;

        let observation = self.locator.locate(frame);
        let movement = self.tracker.update(&observation);
        let valid = observation.present && observation.valid_for_emotion;

        let probs = match observation.bbox {
            Some(bbox) if valid && self.frame_count % self.config.emotion_stride as u64 == 0 => {
                let probs = self.emotion.infer(frame, &bbox).normalized();
                self.last_probs = probs;
                probs
            }
            _ => self.last_probs,
        };
        self.aggregator.admit(&probs, valid);

        let classification = self.classifier.update(&ClassifierInput {
            face_detected: observation.present,
            movement,
            was_stable: self.tracker.was_stable(),
            emotion_average: self.aggregator.average(),
            emotion_component: self.aggregator.component(),
        });

        let mut state = classification.state;
        if valid {
            if let Some(label) = self.calibration.predict(&probs) {
                let personal = BehaviorState::from(label);
                if personal != state {
                    debug!(from = %state, to = %personal, "personal calibration override");
                }
                state = personal;
            }
        }

        let record = OutputRecord::assemble(
            Utc::now(),
            state,
            classification.stress_score,
            &probs,
            &observation,
            &movement,
        );
        if let Some(sink) = self.sink.as_mut() {
            sink.accept(&record);
        }
        self.last_record = Some(record.clone());
        record
    }

    /// Restore session-start state. Calibration and sink are kept.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.aggregator.clear();
        self.classifier.reset();
        self.frame_count = 0;
        self.last_probs = ProbabilityVector::uniform();
        self.last_record = None;
        info!(session = %self.session_id, "session reset");
    }

    /// Re-read the calibration artifact. Call between frames.
    pub fn reload_calibration(&mut self) -> bool {
        self.calibration.reload()
    }

    /// Delete the calibration artifact and stop overriding
    pub fn forget_calibration(&mut self) -> Result<bool, MonitorError> {
        self.calibration.forget()
    }

    pub fn calibration(&self) -> &PersonalCalibration {
        &self.calibration
    }

    /// Mutable calibration access, for sample collection and training
    /// between frames
    pub fn calibration_mut(&mut self) -> &mut PersonalCalibration {
        &mut self.calibration
    }

    /// Shared handle onto the active personal model
    pub fn model_handle(&self) -> ModelHandle {
        self.calibration.handle()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Vector reused on frames without fresh inference
    pub fn last_probabilities(&self) -> ProbabilityVector {
        self.last_probs
    }

    pub fn last_record(&self) -> Option<&OutputRecord> {
        self.last_record.as_ref()
    }

    pub fn emotion_source(&self) -> &E {
        &self.emotion
    }

    pub fn tracker(&self) -> &MovementTracker {
        &self.tracker
    }

    pub fn classifier(&self) -> &HybridClassifier {
        &self.classifier
    }
}
