//! Response composition: risk tiers, rounding, labels and rationale text

use crate::classifier::{round_to, top_k, Confidence, RawPrediction};
use crate::features::FeatureSet;
use crate::preprocessing::LabelEncoders;
use crate::types::{PredictionRequest, PredictionResult, RiskLevel, VitalField};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Confidence bands for [`RiskLevel`]; both bounds are inclusive lower edges
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high: 0.8,
            medium: 0.6,
        }
    }
}

impl RiskThresholds {
    pub fn classify(&self, confidence: f64) -> RiskLevel {
        if confidence >= self.high {
            RiskLevel::High
        } else if confidence >= self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Current time in the result timestamp format
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Builds [`PredictionResult`]s for one loaded model
#[derive(Debug, Clone)]
pub struct ResponseComposer<'a> {
    labels: &'a LabelEncoders,
    model_type: &'a str,
    thresholds: RiskThresholds,
    top_k: usize,
}

impl<'a> ResponseComposer<'a> {
    pub fn new(
        labels: &'a LabelEncoders,
        model_type: &'a str,
        thresholds: RiskThresholds,
        top_k: usize,
    ) -> Self {
        Self {
            labels,
            model_type,
            thresholds,
            top_k,
        }
    }

    pub fn compose(
        &self,
        raw: &RawPrediction,
        confidence: Confidence,
        features: &FeatureSet,
    ) -> PredictionResult {
        let ranked = raw
            .probabilities
            .as_deref()
            .map(|p| top_k(p, self.labels, self.top_k))
            .unwrap_or_default();

        PredictionResult {
            predicted_disease: self.labels.label_for(raw.class_id),
            disease_code: raw.class_id,
            confidence: round_to(confidence.value, 4),
            confidence_percent: round_to(confidence.value * 100.0, 2),
            // tier comes from the unrounded value
            risk_level: self.thresholds.classify(confidence.value),
            used_symptoms_path: features.used_symptoms_path(),
            matched_symptoms: features.active_positions,
            model_type: self.model_type.to_string(),
            top_k: ranked,
            timestamp: timestamp(),
            confidence_calibrated: confidence.calibrated,
            unmatched_symptoms: features.unmatched.clone(),
        }
    }
}

/// Natural-language rationale for a prediction
pub fn explanation_text(result: &PredictionResult, request: &PredictionRequest) -> String {
    let mut text = format!(
        "Based on the provided health metrics, the model predicts {} with {:.1}% confidence. Risk level: {}. ",
        result.predicted_disease,
        result.confidence * 100.0,
        result.risk_level
    );

    let exceeds = |field: VitalField, limit: f64| request.vital(field).is_some_and(|v| v > limit);
    if exceeds(VitalField::Glucose, 125.0) {
        text.push_str("High glucose levels detected. ");
    }
    if exceeds(VitalField::Cholesterol, 200.0) {
        text.push_str("High cholesterol levels detected. ");
    }
    if exceeds(VitalField::BloodPressureSystolic, 140.0) {
        text.push_str("High blood pressure detected. ");
    }

    text
}

/// Which input schema importances are reported against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSchema {
    Vitals,
    Symptoms,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportancePair {
    pub feature: String,
    pub importance: f64,
}

/// Raw per-feature importances of the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportanceReport {
    /// `tree_based`, or `unknown` when the classifier has none
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<FeatureSchema>,
    pub importances: Vec<f64>,
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feature_importance_pairs: Vec<FeatureImportancePair>,
}

impl FeatureImportanceReport {
    pub fn unknown() -> Self {
        Self {
            kind: "unknown".to_string(),
            schema: None,
            importances: Vec::new(),
            features: Vec::new(),
            feature_importance_pairs: Vec::new(),
        }
    }

    /// Pair importances positionally with feature names
    pub fn tree_based(importances: &[f64], names: &[String], schema: FeatureSchema) -> Self {
        let feature_importance_pairs = names
            .iter()
            .zip(importances)
            .map(|(feature, &importance)| FeatureImportancePair {
                feature: feature.clone(),
                importance,
            })
            .collect();
        Self {
            kind: "tree_based".to_string(),
            schema: Some(schema),
            importances: importances.to_vec(),
            features: names.to_vec(),
            feature_importance_pairs,
        }
    }

    pub fn is_available(&self) -> bool {
        !self.importances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::{LabelEncoder, LabelRole};
    use crate::types::FeaturePath;

    fn vitals_features() -> FeatureSet {
        FeatureSet {
            values: vec![0.0; 7],
            path: FeaturePath::Vitals,
            matched: Vec::new(),
            unmatched: Vec::new(),
            active_positions: 0,
        }
    }

    #[test]
    fn test_risk_tier_boundaries() {
        let t = RiskThresholds::default();
        assert_eq!(t.classify(0.79999), RiskLevel::Medium);
        assert_eq!(t.classify(0.8), RiskLevel::High);
        assert_eq!(t.classify(0.59999), RiskLevel::Low);
        assert_eq!(t.classify(0.6), RiskLevel::Medium);
        assert_eq!(t.classify(1.0), RiskLevel::High);
        assert_eq!(t.classify(0.0), RiskLevel::Low);
    }

    #[test]
    fn test_compose_rounds_and_labels() {
        let labels = LabelEncoders::new()
            .with(LabelRole::Disease, LabelEncoder::new(["Healthy", "Diabetes", "Hypertension"]));
        let composer = ResponseComposer::new(&labels, "RandomForestClassifier", RiskThresholds::default(), 5);
        let raw = RawPrediction {
            class_id: 1,
            probabilities: Some(vec![0.123456, 0.799996, 0.076548]),
        };
        let confidence = Confidence {
            value: 0.799996,
            calibrated: true,
        };

        let result = composer.compose(&raw, confidence, &vitals_features());
        assert_eq!(result.predicted_disease, "Diabetes");
        assert_eq!(result.disease_code, 1);
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.confidence_percent, 80.0);
        // rounded value would say High
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert_eq!(result.top_k.len(), 3);
        assert_eq!(result.top_k[0].label, "Diabetes");
        assert!(!result.used_symptoms_path);
        assert!(chrono::DateTime::parse_from_rfc3339(&result.timestamp).is_ok());
    }

    #[test]
    fn test_compose_without_probabilities() {
        let labels = LabelEncoders::new();
        let composer = ResponseComposer::new(&labels, "DecisionTreeClassifier", RiskThresholds::default(), 5);
        let raw = RawPrediction {
            class_id: 2,
            probabilities: None,
        };
        let confidence = Confidence {
            value: 0.85,
            calibrated: false,
        };
        let result = composer.compose(&raw, confidence, &vitals_features());
        assert_eq!(result.predicted_disease, "2");
        assert!(result.top_k.is_empty());
        assert_eq!(result.risk_level, RiskLevel::High);
        assert!(!result.confidence_calibrated);
    }

    #[test]
    fn test_explanation_clauses() {
        let labels = LabelEncoders::new();
        let composer = ResponseComposer::new(&labels, "X", RiskThresholds::default(), 5);
        let raw = RawPrediction {
            class_id: 0,
            probabilities: None,
        };
        let result = composer.compose(
            &raw,
            Confidence {
                value: 0.85,
                calibrated: false,
            },
            &vitals_features(),
        );

        let request = PredictionRequest::from_vitals([60.0, 0.0, 95.0, 150.0, 90.0, 130.0, 200.0]);
        assert_eq!(
            explanation_text(&result, &request),
            "Based on the provided health metrics, the model predicts 0 with 85.0% confidence. \
             Risk level: High. High glucose levels detected. High blood pressure detected. "
        );

        let bare = PredictionRequest::from_symptoms(&["fever"]);
        assert!(explanation_text(&result, &bare).ends_with("Risk level: High. "));
    }

    #[test]
    fn test_importance_report_pairs() {
        let names = vec!["age".to_string(), "glucose".to_string()];
        let report = FeatureImportanceReport::tree_based(&[0.3, 0.7], &names, FeatureSchema::Vitals);
        assert_eq!(report.feature_importance_pairs[1].feature, "glucose");
        assert!(report.is_available());

        let json = serde_json::to_value(FeatureImportanceReport::unknown()).unwrap();
        assert_eq!(json["type"], "unknown");
        assert!(json.get("schema").is_none());
    }
}
