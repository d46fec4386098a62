//! Engine configuration

use crate::classifier::{DEFAULT_CONFIDENCE, DEFAULT_TOP_K};
use crate::errors::ConfigError;
use crate::response::RiskThresholds;
use crate::validation::{MAX_BATCH, MAX_SYMPTOMS};
use serde::{Deserialize, Serialize};

/// Inference engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of ranked alternatives in each result
    pub top_k: usize,
    /// Confidence reported for classifiers without probabilities
    pub default_confidence: f64,
    /// Maximum symptom list length per request
    pub max_symptoms: usize,
    /// Maximum requests per batch
    pub max_batch: usize,
    /// Lower edge of the High tier
    pub high_risk_threshold: f64,
    /// Lower edge of the Medium tier
    pub medium_risk_threshold: f64,
    /// Run explanation add-ons on `/explain`
    pub explanation_addons: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let thresholds = RiskThresholds::default();
        Self {
            top_k: DEFAULT_TOP_K,
            default_confidence: DEFAULT_CONFIDENCE,
            max_symptoms: MAX_SYMPTOMS,
            max_batch: MAX_BATCH,
            high_risk_threshold: thresholds.high,
            medium_risk_threshold: thresholds.medium,
            explanation_addons: true,
        }
    }
}

impl EngineConfig {
    pub fn risk_thresholds(&self) -> RiskThresholds {
        RiskThresholds {
            high: self.high_risk_threshold,
            medium: self.medium_risk_threshold,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::Invalid("top_k must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.default_confidence) {
            return Err(ConfigError::Invalid(
                "default_confidence must be within [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.medium_risk_threshold)
            || !(0.0..=1.0).contains(&self.high_risk_threshold)
            || self.medium_risk_threshold > self.high_risk_threshold
        {
            return Err(ConfigError::Invalid(
                "Risk thresholds must satisfy 0 <= medium <= high <= 1".into(),
            ));
        }
        if self.max_batch == 0 {
            return Err(ConfigError::Invalid("max_batch must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.default_confidence, 0.85);
        assert_eq!(config.max_symptoms, 50);
        assert_eq!(config.max_batch, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str("top_k = 3\nhigh_risk_threshold = 0.9").unwrap();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.risk_thresholds().high, 0.9);
        assert_eq!(config.medium_risk_threshold, 0.6);
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let config = EngineConfig {
            high_risk_threshold: 0.5,
            medium_risk_threshold: 0.7,
            ..EngineConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Invalid(
                "Risk thresholds must satisfy 0 <= medium <= high <= 1".into()
            ))
        );
    }
}
