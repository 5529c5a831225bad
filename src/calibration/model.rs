//! Personal calibration model
//!
//! A standardizing scaler followed by a multinomial logistic-regression
//! classifier over the four-element probability vector. Small enough to train
//! in a few milliseconds on a few hundred samples.

use crate::calibration::CalibrationSample;
use crate::config::CalibrationConfig;
use crate::error::MonitorError;
use crate::types::{EmotionLabel, ProbabilityVector};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Artifact format written by this version
pub const MODEL_FORMAT_VERSION: u32 = 1;

const FEATURES: usize = 4;

/// Zero-mean, unit-variance feature scaling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: [f64; FEATURES],
    pub scale: [f64; FEATURES],
}

impl StandardScaler {
    /// Fit on a sample matrix. Constant features get a unit scale.
    pub fn fit(rows: &[[f64; FEATURES]]) -> Self {
        let n = rows.len().max(1) as f64;
        let mut mean = [0.0; FEATURES];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }

        let mut variance = [0.0; FEATURES];
        for row in rows {
            for i in 0..FEATURES {
                let d = row[i] - mean[i];
                variance[i] += d * d / n;
            }
        }

        let scale = variance.map(|v| {
            let std = v.sqrt();
            if std > f64::EPSILON {
                std
            } else {
                1.0
            }
        });

        Self { mean, scale }
    }

    pub fn transform(&self, row: &[f64; FEATURES]) -> [f64; FEATURES] {
        let mut out = [0.0; FEATURES];
        for i in 0..FEATURES {
            out[i] = (row[i] - self.mean[i]) / self.scale[i];
        }
        out
    }
}

/// Softmax regression: one weight row and bias per class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxClassifier {
    pub weights: Vec<[f64; FEATURES]>,
    pub bias: Vec<f64>,
}

impl SoftmaxClassifier {
    /// Full-batch gradient descent on cross-entropy with an L2 penalty
    pub fn fit(
        features: &[[f64; FEATURES]],
        targets: &[usize],
        n_classes: usize,
        config: &CalibrationConfig,
    ) -> Self {
        let mut model = Self {
            weights: vec![[0.0; FEATURES]; n_classes],
            bias: vec![0.0; n_classes],
        };
        let n = features.len().max(1) as f64;

        for _ in 0..config.epochs {
            let mut grad_w = vec![[0.0; FEATURES]; n_classes];
            let mut grad_b = vec![0.0; n_classes];

            for (x, &target) in features.iter().zip(targets) {
                let probs = model.predict_proba(x);
                for k in 0..n_classes {
                    let err = probs[k] - if k == target { 1.0 } else { 0.0 };
                    for i in 0..FEATURES {
                        grad_w[k][i] += err * x[i];
                    }
                    grad_b[k] += err;
                }
            }

            for k in 0..n_classes {
                for i in 0..FEATURES {
                    let grad = grad_w[k][i] / n + config.l2_penalty * model.weights[k][i];
                    model.weights[k][i] -= config.learning_rate * grad;
                }
                model.bias[k] -= config.learning_rate * grad_b[k] / n;
            }
        }

        model
    }

    pub fn predict_proba(&self, x: &[f64; FEATURES]) -> Vec<f64> {
        let logits: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(w, b)| w.iter().zip(x).map(|(wi, xi)| wi * xi).sum::<f64>() + b)
            .collect();
        softmax(&logits)
    }
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    if logits.is_empty() || logits.iter().any(|l| !l.is_finite()) {
        let n = logits.len().max(1) as f64;
        return vec![1.0 / n; logits.len()];
    }
    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|e| e / total).collect()
}

/// Trained per-user model with everything needed to predict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationModel {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    pub sample_count: usize,
    pub scaler: StandardScaler,
    pub classifier: SoftmaxClassifier,
    /// Class labels, aligned with classifier rows
    pub classes: Vec<EmotionLabel>,
}

impl CalibrationModel {
    /// Fit scaler and classifier on collected samples
    pub fn train(
        samples: &[CalibrationSample],
        config: &CalibrationConfig,
    ) -> Result<Self, MonitorError> {
        let mut classes: Vec<EmotionLabel> = samples.iter().map(|s| s.label).collect();
        classes.sort();
        classes.dedup();
        if classes.len() < 2 {
            return Err(MonitorError::TrainingError(format!(
                "need at least two classes, got {}",
                classes.len()
            )));
        }

        let rows: Vec<[f64; FEATURES]> = samples
            .iter()
            .map(|s| s.probabilities.normalized().to_array())
            .collect();
        let targets: Vec<usize> = samples
            .iter()
            .filter_map(|s| classes.iter().position(|c| *c == s.label))
            .collect();

        let scaler = StandardScaler::fit(&rows);
        let scaled: Vec<[f64; FEATURES]> = rows.iter().map(|r| scaler.transform(r)).collect();
        let classifier = SoftmaxClassifier::fit(&scaled, &targets, classes.len(), config);

        let model = Self {
            format_version: MODEL_FORMAT_VERSION,
            trained_at: Utc::now(),
            sample_count: samples.len(),
            scaler,
            classifier,
            classes,
        };
        model.validate()?;
        Ok(model)
    }

    /// Class probabilities for a vector
    pub fn predict_proba(&self, vector: &ProbabilityVector) -> Vec<(EmotionLabel, f64)> {
        let x = self.scaler.transform(&vector.normalized().to_array());
        self.classes
            .iter()
            .copied()
            .zip(self.classifier.predict_proba(&x))
            .collect()
    }

    /// Most likely class if its probability reaches `min_confidence`
    pub fn predict(&self, vector: &ProbabilityVector, min_confidence: f64) -> Option<EmotionLabel> {
        let (label, confidence) = self
            .predict_proba(vector)
            .into_iter()
            .fold(None, |best: Option<(EmotionLabel, f64)>, (label, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((label, p)),
            })?;
        (confidence >= min_confidence).then_some(label)
    }

    /// Structural checks run on every trained or loaded model
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(MonitorError::CorruptModel(format!(
                "unsupported format version {}",
                self.format_version
            )));
        }
        let n = self.classes.len();
        if n < 2 || self.classifier.weights.len() != n || self.classifier.bias.len() != n {
            return Err(MonitorError::CorruptModel(format!(
                "class count mismatch: {} classes, {} weight rows, {} biases",
                n,
                self.classifier.weights.len(),
                self.classifier.bias.len()
            )));
        }
        let finite = self.scaler.mean.iter().all(|v| v.is_finite())
            && self.scaler.scale.iter().all(|v| v.is_finite() && *v > 0.0)
            && self
                .classifier
                .weights
                .iter()
                .flatten()
                .chain(&self.classifier.bias)
                .all(|v| v.is_finite());
        if !finite {
            return Err(MonitorError::CorruptModel(
                "non-finite or non-positive parameters".to_string(),
            ));
        }
        Ok(())
    }
}
