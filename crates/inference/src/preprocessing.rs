//! Companion preprocessing artifacts: the vitals scaler and label encoders

use crate::errors::{ArtifactError, ClassifierError};
use crate::types::VITALS_DIMENSION;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Standard scaler fitted on the vitals schema: `(x - mean) / scale`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self { mean, scale }
    }

    /// Number of features the scaler was fitted on
    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.mean.len() != self.scale.len() {
            return Err(ArtifactError::Invalid(format!(
                "Scaler mean has {} entries but scale has {}",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self.mean.len() != VITALS_DIMENSION {
            return Err(ArtifactError::Invalid(format!(
                "Scaler fitted on {} features, vitals schema has {VITALS_DIMENSION}",
                self.mean.len()
            )));
        }
        if self
            .mean
            .iter()
            .chain(self.scale.iter())
            .any(|v| !v.is_finite())
        {
            return Err(ArtifactError::Invalid("Scaler has non-finite parameters".into()));
        }
        Ok(())
    }

    /// Scale one feature vector. A zero scale leaves the centred value as is.
    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        if features.len() != self.dimension() {
            return Err(ClassifierError::DimensionMismatch {
                expected: self.dimension(),
                actual: features.len(),
            });
        }
        Ok(features
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(&x, (&mean, &scale))| {
                let scale = if scale == 0.0 { 1.0 } else { scale };
                (x - mean) / scale
            })
            .collect())
    }
}

/// Maps class ids back to human-readable labels
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new<S: Into<String>>(classes: impl IntoIterator<Item = S>) -> Self {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn inverse_transform(&self, class_id: usize) -> Option<&str> {
        self.classes.get(class_id).map(String::as_str)
    }
}

/// Semantic role of a label encoder in the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelRole {
    Disease,
    Target,
}

impl LabelRole {
    /// Roles in lookup precedence order
    pub const PRECEDENCE: [LabelRole; 2] = [LabelRole::Disease, LabelRole::Target];

    pub fn key(self) -> &'static str {
        match self {
            LabelRole::Disease => "disease",
            LabelRole::Target => "target",
        }
    }
}

/// Label encoders keyed by role, as stored in `label_encoders.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct LabelEncoders {
    encoders: BTreeMap<String, LabelEncoder>,
}

impl LabelEncoders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: LabelRole, encoder: LabelEncoder) -> Self {
        self.encoders.insert(role.key().to_string(), encoder);
        self
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        for (role, encoder) in &self.encoders {
            if encoder.classes.is_empty() {
                return Err(ArtifactError::Invalid(format!(
                    "Label encoder '{role}' has no classes"
                )));
            }
        }
        for role in self.encoders.keys() {
            if !LabelRole::PRECEDENCE.iter().any(|r| r.key() == role) {
                debug!("Ignoring label encoder with unknown role '{}'", role);
            }
        }
        Ok(())
    }

    /// The populated encoder: `disease` first, then `target`
    pub fn active(&self) -> Option<&LabelEncoder> {
        LabelRole::PRECEDENCE
            .iter()
            .find_map(|role| self.encoders.get(role.key()))
    }

    /// Label for a class id, falling back to the numeric id
    pub fn label_for(&self, class_id: usize) -> String {
        self.active()
            .and_then(|encoder| encoder.inverse_transform(class_id))
            .map(str::to_string)
            .unwrap_or_else(|| class_id.to_string())
    }

    /// All class labels of the active encoder
    pub fn classes(&self) -> Vec<String> {
        self.active()
            .map(|encoder| encoder.classes.clone())
            .unwrap_or_default()
    }
}
