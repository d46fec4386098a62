//! Classifier seam and adapter
//!
//! [`Classifier`] is what a trained model must provide. [`ClassifierAdapter`]
//! wraps one, records its capabilities once at construction, and exposes
//! prediction with confidence and top-k ranking independent of the
//! underlying algorithm.

use crate::errors::ClassifierError;
use crate::preprocessing::LabelEncoders;
use crate::types::TopKEntry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder confidence for classifiers without probabilities.
/// Not a calibrated estimate.
pub const DEFAULT_CONFIDENCE: f64 = 0.85;

/// Default number of ranked alternatives
pub const DEFAULT_TOP_K: usize = 5;

/// Optional capabilities a classifier declares at load time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub probabilities: bool,
    pub feature_importance: bool,
}

/// A trained classifier
pub trait Classifier: Send + Sync + fmt::Debug {
    /// Algorithm name reported to callers
    fn model_type(&self) -> &str;

    /// Input dimensionality
    fn n_features(&self) -> usize;

    fn n_classes(&self) -> usize;

    fn capabilities(&self) -> Capabilities;

    fn predict(&self, features: &[f64]) -> Result<usize, ClassifierError>;

    /// Only called when `capabilities().probabilities` is set
    fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        Err(ClassifierError::Capability("probabilities"))
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        None
    }

    /// Feature indices consulted by the decision, one entry per split.
    /// `None` when the model cannot report decision paths.
    fn split_features(&self, _features: &[f64]) -> Option<Vec<usize>> {
        None
    }
}

/// Raw model output for one feature vector
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    pub class_id: usize,
    pub probabilities: Option<Vec<f64>>,
}

/// Confidence value plus whether it came from real probabilities
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Confidence {
    pub value: f64,
    pub calibrated: bool,
}

/// Capability-tagged wrapper around a trained classifier
#[derive(Debug)]
pub struct ClassifierAdapter {
    inner: Box<dyn Classifier>,
    capabilities: Capabilities,
}

impl ClassifierAdapter {
    pub fn new(inner: Box<dyn Classifier>) -> Self {
        let capabilities = inner.capabilities();
        Self {
            inner,
            capabilities,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn model_type(&self) -> &str {
        self.inner.model_type()
    }

    pub fn n_features(&self) -> usize {
        self.inner.n_features()
    }

    pub fn n_classes(&self) -> usize {
        self.inner.n_classes()
    }

    pub fn inner(&self) -> &dyn Classifier {
        self.inner.as_ref()
    }

    /// Predict a class and, when supported, the full distribution
    pub fn predict(&self, features: &[f64]) -> Result<RawPrediction, ClassifierError> {
        if features.len() != self.n_features() {
            return Err(ClassifierError::DimensionMismatch {
                expected: self.n_features(),
                actual: features.len(),
            });
        }

        let class_id = self.inner.predict(features)?;
        let probabilities = if self.capabilities.probabilities {
            let proba = self.inner.predict_proba(features)?;
            if proba.len() != self.n_classes() || proba.iter().any(|p| !p.is_finite()) {
                return Err(ClassifierError::Evaluation(format!(
                    "Malformed probability vector of length {}",
                    proba.len()
                )));
            }
            Some(proba)
        } else {
            None
        };

        Ok(RawPrediction {
            class_id,
            probabilities,
        })
    }

    pub fn feature_importances(&self) -> Option<&[f64]> {
        if self.capabilities.feature_importance {
            self.inner.feature_importances()
        } else {
            None
        }
    }
}

/// Maximum probability, or `default` when no distribution is available
pub fn confidence(probabilities: Option<&[f64]>, default: f64) -> Confidence {
    match probabilities {
        Some(p) if !p.is_empty() => Confidence {
            value: p.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            calibrated: true,
        },
        _ => Confidence {
            value: default,
            calibrated: false,
        },
    }
}

/// Rank classes by descending probability, keeping at most `k`.
///
/// Ties keep ascending class order. Probabilities are rounded to 4 places.
pub fn top_k(probabilities: &[f64], labels: &LabelEncoders, k: usize) -> Vec<TopKEntry> {
    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    // stable sort keeps equal probabilities in class order
    order.sort_by(|&a, &b| {
        probabilities[b]
            .partial_cmp(&probabilities[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    order
        .into_iter()
        .take(k.min(probabilities.len()))
        .map(|idx| TopKEntry {
            label: labels.label_for(idx),
            probability: round_to(probabilities[idx], 4),
        })
        .collect()
}

/// Round half away from zero to `places` decimals
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
