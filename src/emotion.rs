//! Emotion signal aggregation
//!
//! This module keeps a short rolling window of accepted probability vectors and
//! reduces it to:
//! - An element-wise average over the window
//! - A scalar emotion stress component in [0, 1]
//!
//! It also reduces raw FER+ model output to the four-label vector.

use crate::ring::RingBuffer;
use crate::types::ProbabilityVector;
use serde::{Deserialize, Serialize};

/// Emotion component assumed when nothing has been accepted yet
pub const NEUTRAL_COMPONENT: f64 = 0.3;

// Affine calibration of the emotion component. Fixed knobs, not learned.
const STRESSED_WEIGHT: f64 = 0.60;
const CONFUSED_WEIGHT: f64 = 0.30;
const CALM_WEIGHT: f64 = -0.40;
const FOCUSED_WEIGHT: f64 = -0.10;
const COMPONENT_OFFSET: f64 = 0.3;
const COMPONENT_SPAN: f64 = 0.9;

/// Scalar stress reading of a probability vector.
///
/// All-calm maps near 0, all-stressed near 1.
pub fn emotion_component(vector: &ProbabilityVector) -> f64 {
    let raw = STRESSED_WEIGHT * vector.stressed
        + CONFUSED_WEIGHT * vector.confused
        + CALM_WEIGHT * vector.calm
        + FOCUSED_WEIGHT * vector.focused;
    ((raw + COMPONENT_OFFSET) / COMPONENT_SPAN).clamp(0.0, 1.0)
}

/// Rolling window of accepted emotion vectors
#[derive(Debug, Clone)]
pub struct EmotionAggregator {
    window: RingBuffer<ProbabilityVector>,
}

impl EmotionAggregator {
    pub fn new(window_size: usize) -> Self {
        Self {
            window: RingBuffer::with_capacity(window_size),
        }
    }

    /// Offer a vector; it is kept only when the frame was valid for emotion.
    ///
    /// Returns whether the vector was admitted.
    pub fn admit(&mut self, vector: &ProbabilityVector, valid_for_emotion: bool) -> bool {
        if !valid_for_emotion {
            return false;
        }
        self.window.push(vector.normalized());
        true
    }

    /// Element-wise mean of the window, `None` when empty
    pub fn average(&self) -> Option<ProbabilityVector> {
        if self.window.is_empty() {
            return None;
        }
        let mut sums = [0.0; 4];
        for vector in self.window.iter() {
            for (sum, value) in sums.iter_mut().zip(vector.to_array()) {
                *sum += value;
            }
        }
        let n = self.window.len() as f64;
        Some(ProbabilityVector::from_array(sums.map(|s| s / n)))
    }

    /// Emotion component of the window average, neutral when empty
    pub fn component(&self) -> f64 {
        self.average()
            .map(|avg| emotion_component(&avg))
            .unwrap_or(NEUTRAL_COMPONENT)
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

/// Number of FER+ output classes
pub const FERPLUS_CLASSES: usize = 8;

/// FER+ output order: neutral, happiness, surprise, sadness, anger, disgust,
/// fear, contempt. Indices into [`crate::types::EmotionLabel::ALL`].
const FERPLUS_TO_LABEL: [usize; FERPLUS_CLASSES] = [1, 3, 2, 0, 0, 0, 0, 2];
const FERPLUS_NEUTRAL: usize = 0;

/// Reduction of FER+ logits to the four-label vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FerPlusMapping {
    /// Logits are divided by this before softmax; below 1 sharpens
    pub temperature: f64,
    /// Scale applied to the neutral class mass.
    ///
    /// FER+ collapses resting faces into neutral; this empirical correction
    /// stops the focused bucket from swamping every other label.
    pub neutral_scale: f64,
}

impl Default for FerPlusMapping {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            neutral_scale: 0.15,
        }
    }
}

impl FerPlusMapping {
    /// Map raw logits to a normalized vector; degenerate input yields uniform
    pub fn map_logits(&self, logits: &[f32; FERPLUS_CLASSES]) -> ProbabilityVector {
        if logits.iter().any(|l| !l.is_finite()) || self.temperature <= 0.0 {
            return ProbabilityVector::uniform();
        }

        let scaled: Vec<f64> = logits
            .iter()
            .map(|&l| l as f64 / self.temperature)
            .collect();
        let max = scaled.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = scaled.iter().map(|v| (v - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return ProbabilityVector::uniform();
        }

        let mut buckets = [0.0; 4];
        for (idx, e) in exps.iter().enumerate() {
            let mut p = e / total;
            if idx == FERPLUS_NEUTRAL {
                p *= self.neutral_scale;
            }
            buckets[FERPLUS_TO_LABEL[idx]] += p;
        }
        ProbabilityVector::from_array(buckets).normalized()
    }
}
