//! Personal calibration overlay
//!
//! Collects labeled probability vectors for one user, trains a small
//! per-user classifier on them and, once a model is loaded, offers a
//! personal prediction that can override the rule-based state.
//!
//! Training and persistence happen outside the frame loop. The frame loop
//! only ever reads the current model through a [`ModelHandle`], so a newly
//! trained model takes effect on the next frame without tearing.

mod model;
mod store;

pub use model::{CalibrationModel, SoftmaxClassifier, StandardScaler, MODEL_FORMAT_VERSION};
pub use store::CalibrationStore;

use crate::config::CalibrationConfig;
use crate::error::MonitorError;
use crate::types::{EmotionLabel, ProbabilityVector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

/// Labels that must each reach the sample minimum before training
pub const REQUIRED_LABELS: [EmotionLabel; 2] = [EmotionLabel::Calm, EmotionLabel::Stressed];

/// One labeled probability vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSample {
    pub probabilities: ProbabilityVector,
    pub label: EmotionLabel,
}

/// Whether enough samples exist to train
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady {
        label: EmotionLabel,
        have: usize,
        need: usize,
    },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readiness::Ready => f.write_str("ready"),
            Readiness::NotReady { label, have, need } => {
                write!(f, "need {} {} samples, have {}", need, label, have)
            }
        }
    }
}

/// Shared slot holding the active model.
///
/// Clones share the same slot. Swaps replace the whole model at once and bump
/// a version counter readers can poll.
#[derive(Debug, Clone, Default)]
pub struct ModelHandle {
    slot: Arc<RwLock<Option<Arc<CalibrationModel>>>>,
    version: Arc<AtomicU64>,
}

impl ModelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the active model
    pub fn current(&self) -> Option<Arc<CalibrationModel>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Install a model, returning the new version
    pub fn swap(&self, model: CalibrationModel) -> u64 {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(model));
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Remove the active model, returning the new version
    pub fn clear(&self) -> u64 {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }
}

/// Per-user calibration state: sample buffer, store and active model
#[derive(Debug)]
pub struct PersonalCalibration {
    config: CalibrationConfig,
    user_id: String,
    store: Option<CalibrationStore>,
    samples: Vec<CalibrationSample>,
    handle: ModelHandle,
}

impl PersonalCalibration {
    /// Calibration with no persistence
    pub fn in_memory(config: CalibrationConfig, user_id: impl Into<String>) -> Self {
        Self {
            config,
            user_id: user_id.into(),
            store: None,
            samples: Vec::new(),
            handle: ModelHandle::new(),
        }
    }

    /// Calibration backed by a store. An existing artifact is loaded; a
    /// missing or unreadable one leaves the overlay inactive.
    pub fn open(
        config: CalibrationConfig,
        user_id: impl Into<String>,
        store: CalibrationStore,
    ) -> Self {
        let mut calibration = Self::in_memory(config, user_id);
        calibration.store = Some(store);
        calibration.reload();
        calibration
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn store(&self) -> Option<&CalibrationStore> {
        self.store.as_ref()
    }

    /// Handle onto the active model, shareable with a background trainer
    pub fn handle(&self) -> ModelHandle {
        self.handle.clone()
    }

    pub fn has_model(&self) -> bool {
        self.handle.is_loaded()
    }

    /// Buffer a labeled vector for training
    pub fn collect(&mut self, probabilities: ProbabilityVector, label: EmotionLabel) {
        self.samples.push(CalibrationSample {
            probabilities: probabilities.normalized(),
            label,
        });
    }

    pub fn sample_count(&self, label: EmotionLabel) -> usize {
        self.samples.iter().filter(|s| s.label == label).count()
    }

    pub fn total_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[CalibrationSample] {
        &self.samples
    }

    pub fn clear_samples(&mut self) {
        self.samples.clear();
    }

    /// First required label still short of the minimum, if any
    pub fn ready_to_train(&self) -> Readiness {
        let need = self.config.min_samples_per_class;
        for label in REQUIRED_LABELS {
            let have = self.sample_count(label);
            if have < need {
                return Readiness::NotReady { label, have, need };
            }
        }
        Readiness::Ready
    }

    /// Train on the buffered samples without installing the result
    pub fn train(&self) -> Result<CalibrationModel, MonitorError> {
        if let readiness @ Readiness::NotReady { .. } = self.ready_to_train() {
            return Err(MonitorError::InsufficientSamples(readiness.to_string()));
        }
        CalibrationModel::train(&self.samples, &self.config)
    }

    /// Train, persist and hot-swap. Returns false when nothing changed.
    pub fn train_and_persist(&mut self) -> bool {
        let model = match self.train() {
            Ok(model) => model,
            Err(e) => {
                warn!(user = %self.user_id, error = %e, "calibration not trained");
                return false;
            }
        };

        if let Some(store) = &self.store {
            match store.save(&self.user_id, &model) {
                Ok(path) => info!(user = %self.user_id, path = %path.display(), "calibration saved"),
                Err(e) => {
                    warn!(user = %self.user_id, error = %e, "failed to persist calibration");
                    return false;
                }
            }
        }

        let samples = model.sample_count;
        let version = self.handle.swap(model);
        info!(user = %self.user_id, samples, version, "calibration model active");
        true
    }

    /// Personal prediction, present only with a loaded model and enough
    /// confidence
    pub fn predict(&self, probabilities: &ProbabilityVector) -> Option<EmotionLabel> {
        self.handle
            .current()?
            .predict(probabilities, self.config.min_confidence)
    }

    /// Re-read the artifact from the store. Returns whether a model is active.
    pub fn reload(&mut self) -> bool {
        let Some(store) = &self.store else {
            return self.has_model();
        };
        match store.load(&self.user_id) {
            Ok(Some(model)) => {
                let version = self.handle.swap(model);
                info!(user = %self.user_id, version, "calibration loaded");
                true
            }
            Ok(None) => {
                self.handle.clear();
                false
            }
            Err(e) => {
                warn!(user = %self.user_id, error = %e, "ignoring unreadable calibration");
                self.handle.clear();
                false
            }
        }
    }

    /// Delete the persisted artifact and deactivate the overlay
    pub fn forget(&mut self) -> Result<bool, MonitorError> {
        let removed = match &self.store {
            Some(store) => store.delete(&self.user_id)?,
            None => false,
        };
        self.handle.clear();
        info!(user = %self.user_id, removed, "calibration forgotten");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const CALM: ProbabilityVector = ProbabilityVector {
        stressed: 0.05,
        focused: 0.15,
        confused: 0.05,
        calm: 0.75,
    };
    const STRESSED: ProbabilityVector = ProbabilityVector {
        stressed: 0.7,
        focused: 0.1,
        confused: 0.15,
        calm: 0.05,
    };

    fn jittered(base: ProbabilityVector, i: usize) -> ProbabilityVector {
        let d = (i % 5) as f64 * 0.005;
        ProbabilityVector::new(base.stressed + d, base.focused, base.confused, base.calm - d)
    }

    fn fill(calibration: &mut PersonalCalibration, calm: usize, stressed: usize) {
        for i in 0..calm {
            calibration.collect(jittered(CALM, i), EmotionLabel::Calm);
        }
        for i in 0..stressed {
            calibration.collect(jittered(STRESSED, i), EmotionLabel::Stressed);
        }
    }

    #[test]
    fn test_readiness_reports_shortfall() {
        let mut cal = PersonalCalibration::in_memory(CalibrationConfig::default(), "u");
        fill(&mut cal, 15, 14);
        assert_eq!(
            cal.ready_to_train(),
            Readiness::NotReady {
                label: EmotionLabel::Stressed,
                have: 14,
                need: 15
            }
        );
        assert_eq!(
            cal.ready_to_train().to_string(),
            "need 15 stressed samples, have 14"
        );
        assert!(!cal.train_and_persist());
        assert!(!cal.has_model());

        cal.collect(STRESSED, EmotionLabel::Stressed);
        assert!(cal.ready_to_train().is_ready());
    }

    #[test]
    fn test_insufficient_samples_error() {
        let cal = PersonalCalibration::in_memory(CalibrationConfig::default(), "u");
        assert!(matches!(
            cal.train(),
            Err(MonitorError::InsufficientSamples(_))
        ));
    }

    #[test]
    fn test_predict_without_model_is_none() {
        let cal = PersonalCalibration::in_memory(CalibrationConfig::default(), "u");
        assert_eq!(cal.predict(&CALM), None);
    }

    #[test]
    fn test_train_persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let store = CalibrationStore::new(dir.path());

        let mut cal =
            PersonalCalibration::open(CalibrationConfig::default(), "alice", store.clone());
        assert!(!cal.has_model());
        fill(&mut cal, 20, 20);
        assert!(cal.train_and_persist());
        assert!(store.exists("alice"));
        assert_eq!(cal.predict(&CALM), Some(EmotionLabel::Calm));
        assert_eq!(cal.predict(&STRESSED), Some(EmotionLabel::Stressed));

        // A fresh session picks the artifact up
        let fresh = PersonalCalibration::open(CalibrationConfig::default(), "alice", store);
        assert!(fresh.has_model());
        assert_eq!(fresh.predict(&CALM), Some(EmotionLabel::Calm));
        assert_eq!(fresh.total_samples(), 0);
    }

    #[test]
    fn test_corrupt_artifact_leaves_overlay_inactive() {
        let dir = TempDir::new().unwrap();
        let store = CalibrationStore::new(dir.path());
        fs::write(store.path_for("mallory"), "[]").unwrap();

        let cal = PersonalCalibration::open(CalibrationConfig::default(), "mallory", store);
        assert!(!cal.has_model());
        assert_eq!(cal.predict(&STRESSED), None);
    }

    #[test]
    fn test_forget_removes_model_and_artifact() {
        let dir = TempDir::new().unwrap();
        let store = CalibrationStore::new(dir.path());
        let mut cal =
            PersonalCalibration::open(CalibrationConfig::default(), "dave", store.clone());
        fill(&mut cal, 15, 15);
        assert!(cal.train_and_persist());

        assert!(cal.forget().unwrap());
        assert!(!cal.has_model());
        assert!(!store.exists("dave"));
        assert!(!cal.forget().unwrap());
    }

    #[test]
    fn test_handle_swap_visible_to_clones() {
        let mut cal = PersonalCalibration::in_memory(CalibrationConfig::default(), "u");
        let reader = cal.handle();
        assert_eq!(reader.version(), 0);

        fill(&mut cal, 15, 15);
        assert!(cal.train_and_persist());
        assert!(reader.is_loaded());
        assert_eq!(reader.version(), 1);

        reader.clear();
        assert!(!cal.has_model());
        assert_eq!(cal.handle().version(), 2);
    }

    #[test]
    fn test_handle_swap_across_threads() {
        let mut cal = PersonalCalibration::in_memory(CalibrationConfig::default(), "u");
        fill(&mut cal, 15, 15);
        let model = cal.train().unwrap();
        let handle = cal.handle();

        let trainer = std::thread::spawn(move || handle.swap(model));
        assert_eq!(trainer.join().unwrap(), 1);
        assert_eq!(cal.predict(&STRESSED), Some(EmotionLabel::Stressed));
    }
}
