//! Inference engine façade
//!
//! Ties validation, feature construction, classification and response
//! composition together over one shared [`ArtifactBundle`]. Every operation
//! takes `&self`; the engine holds no mutable state and is shared across
//! request handlers behind an `Arc`.

use crate::artifacts::ArtifactBundle;
use crate::classifier::confidence;
use crate::config::EngineConfig;
use crate::errors::{InferenceError, Result};
use crate::explain::{run_addons, skipped_addons, DecisionPathAddon, Explanation, ExplanationAddon};
use crate::features::{FeatureBuilder, FeatureSet};
use crate::response::{
    explanation_text, timestamp, FeatureImportanceReport, FeatureSchema, ResponseComposer,
};
use crate::types::{
    vital_feature_names, BatchPrediction, FeaturePath, ModelInfo, PredictionRequest,
    PredictionResult,
};
use crate::validation::{InputValidator, ValidationReport};
use crate::vocabulary::VocabularyIndex;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

const SYMPTOM_PATH_IMPORTANCE_NOTE: &str =
    "Feature importance is reported for the vitals schema only and is omitted for symptom-based predictions";

pub struct InferenceEngine {
    bundle: Arc<ArtifactBundle>,
    index: Option<VocabularyIndex>,
    validator: InputValidator,
    config: EngineConfig,
    addons: Vec<Box<dyn ExplanationAddon>>,
}

impl fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("model_type", &self.bundle.classifier().model_type())
            .field("vocabulary_size", &self.bundle.vocabulary_size())
            .field("config", &self.config)
            .field("addons", &self.addons.iter().map(|a| a.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl InferenceEngine {
    /// Build an engine over a loaded bundle with the built-in add-ons
    pub fn new(bundle: Arc<ArtifactBundle>, config: EngineConfig) -> Self {
        let index = bundle.vocabulary().map(VocabularyIndex::build);
        let validator = InputValidator::new(config.max_symptoms, config.max_batch);
        info!(
            "Inference engine ready: model={}, vocabulary={}, scaler={}",
            bundle.classifier().model_type(),
            bundle.vocabulary_size(),
            bundle.scaler().is_some()
        );
        Self {
            bundle,
            index,
            validator,
            config,
            addons: vec![Box::new(DecisionPathAddon)],
        }
    }

    /// Register an additional explanation add-on
    pub fn with_addon(mut self, addon: Box<dyn ExplanationAddon>) -> Self {
        self.addons.push(addon);
        self
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate a request without predicting
    pub fn validate(&self, request: &PredictionRequest) -> Result<ValidationReport> {
        self.validator.validate(request)
    }

    #[instrument(skip_all, fields(symptoms = request.symptom_entries().len()))]
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        self.validator.validate(request)?;
        let (result, _) = self.predict_validated(request)?;
        Ok(result)
    }

    /// Predict every request in order; any failure fails the whole batch
    #[instrument(skip_all, fields(entries = requests.len()))]
    pub fn predict_batch(&self, requests: &[PredictionRequest]) -> Result<BatchPrediction> {
        self.validator.validate_batch(requests)?;

        let predictions = requests
            .iter()
            .enumerate()
            .map(|(index, request)| {
                self.predict_validated(request)
                    .map(|(result, _)| result)
                    .map_err(|e| e.at_index(index))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(BatchPrediction {
            count: predictions.len(),
            predictions,
            timestamp: timestamp(),
        })
    }

    /// Prediction plus rationale, importances and add-on attachments
    #[instrument(skip_all)]
    pub fn explain(&self, request: &PredictionRequest) -> Result<Explanation> {
        self.validator.validate(request)?;
        let (prediction, features) = self.predict_validated(request)?;
        let explanation = explanation_text(&prediction, request);

        let (feature_importance, feature_importance_note) = if features.used_symptoms_path() {
            (None, Some(SYMPTOM_PATH_IMPORTANCE_NOTE.to_string()))
        } else {
            (Some(self.feature_importance()), None)
        };

        let attachments = if self.config.explanation_addons {
            let names = if features.used_symptoms_path() {
                self.bundle.vocabulary().map(<[String]>::to_vec).unwrap_or_default()
            } else {
                vital_feature_names()
            };
            run_addons(
                &self.addons,
                self.bundle.classifier().inner(),
                &features.values,
                &names,
            )
        } else {
            skipped_addons(&self.addons)
        };

        Ok(Explanation {
            prediction,
            explanation,
            feature_importance,
            feature_importance_note,
            attachments,
        })
    }

    /// Raw importances of the classifier; `unknown` when it has none
    pub fn feature_importance(&self) -> FeatureImportanceReport {
        let Some(importances) = self.bundle.classifier().feature_importances() else {
            return FeatureImportanceReport::unknown();
        };
        match self.bundle.vocabulary() {
            Some(vocabulary) => {
                FeatureImportanceReport::tree_based(importances, vocabulary, FeatureSchema::Symptoms)
            }
            None => FeatureImportanceReport::tree_based(
                importances,
                &vital_feature_names(),
                FeatureSchema::Vitals,
            ),
        }
    }

    pub fn model_info(&self) -> ModelInfo {
        let classifier = self.bundle.classifier();
        let capabilities = classifier.capabilities();
        ModelInfo {
            model_type: classifier.model_type().to_string(),
            feature_count: classifier.n_features(),
            features: self
                .bundle
                .vocabulary()
                .map(<[String]>::to_vec)
                .unwrap_or_else(vital_feature_names),
            disease_classes: self.bundle.labels().classes(),
            has_probability: capabilities.probabilities,
            has_feature_importance: capabilities.feature_importance,
            vocabulary_size: self.bundle.vocabulary_size(),
        }
    }

    /// Everything after validation
    fn predict_validated(&self, request: &PredictionRequest) -> Result<(PredictionResult, FeatureSet)> {
        let classifier = self.bundle.classifier();
        let builder = FeatureBuilder::new(
            self.index.as_ref(),
            self.bundle.scaler(),
            classifier.n_features(),
        );
        let features = builder.build(request)?;

        // symptom-only requests reach here with unchecked vitals
        if features.path == FeaturePath::Vitals && request.is_symptoms_only() {
            self.validator.check_vitals(request).map_err(|e| {
                warn!("Vitals fallback rejected for a symptom-only request: {}", e);
                e
            })?;
        }

        let raw = classifier.predict(&features.values).map_err(|e| {
            error!(
                "Classifier {} failed on a {:?}-path vector of length {}: {}",
                classifier.model_type(),
                features.path,
                features.values.len(),
                e
            );
            InferenceError::from(e)
        })?;

        let confidence = confidence(raw.probabilities.as_deref(), self.config.default_confidence);
        let composer = ResponseComposer::new(
            self.bundle.labels(),
            classifier.model_type(),
            self.config.risk_thresholds(),
            self.config.top_k,
        );
        let result = composer.compose(&raw, confidence, &features);

        info!(
            "Predicted {} (confidence {:.4}, path {:?}, matched {})",
            result.predicted_disease, result.confidence, features.path, result.matched_symptoms
        );
        Ok((result, features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbdt::{EnsembleKind, Node, Tree, TreeEnsemble};
    use crate::preprocessing::{LabelEncoder, LabelEncoders, LabelRole};
    use crate::types::RiskLevel;

    fn assert_send_sync<T: Send + Sync>() {}

    fn vitals_engine() -> InferenceEngine {
        let tree = Tree::new(
            vec![
                Node::internal(0, 5, 125.0, 1, 2),
                Node::leaf(1, vec![9.0, 1.0]),
                Node::leaf(2, vec![1.0, 3.0]),
            ],
            1.0,
        );
        let model = TreeEnsemble::new(EnsembleKind::DecisionTree, 7, 2, vec![tree])
            .with_feature_importances(vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let labels = LabelEncoders::new()
            .with(LabelRole::Target, LabelEncoder::new(["Healthy", "Diabetes"]));
        let bundle = ArtifactBundle::from_parts(Box::new(model), None, labels, None).unwrap();
        InferenceEngine::new(Arc::new(bundle), EngineConfig::default())
    }

    #[test]
    fn test_engine_is_shareable() {
        assert_send_sync::<InferenceEngine>();
    }

    #[test]
    fn test_vitals_prediction() {
        let engine = vitals_engine();
        let request = PredictionRequest::from_vitals([60.0, 0.0, 95.0, 150.0, 90.0, 180.0, 240.0]);
        let result = engine.predict(&request).unwrap();
        assert_eq!(result.predicted_disease, "Diabetes");
        assert_eq!(result.confidence, 0.75);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert!(!result.used_symptoms_path);
        assert_eq!(result.matched_symptoms, 0);
        assert_eq!(result.model_type, "DecisionTreeClassifier");
    }

    #[test]
    fn test_validation_runs_before_prediction() {
        let engine = vitals_engine();
        let mut request = PredictionRequest::from_vitals([60.0, 0.0, 95.0, 150.0, 90.0, 180.0, 240.0]);
        request.glucose = Some(900.0);
        assert!(matches!(
            engine.predict(&request),
            Err(InferenceError::Validation(_))
        ));
    }

    #[test]
    fn test_explain_includes_importance_and_addon() {
        let engine = vitals_engine();
        let request = PredictionRequest::from_vitals([60.0, 0.0, 95.0, 150.0, 90.0, 180.0, 240.0]);
        let explanation = engine.explain(&request).unwrap();

        assert!(explanation.explanation.contains("predicts Diabetes with 75.0% confidence"));
        assert!(explanation.explanation.contains("High glucose levels detected."));
        let importance = explanation.feature_importance.unwrap();
        assert_eq!(importance.schema, Some(FeatureSchema::Vitals));
        assert!(explanation.attachments["decision_path"].is_available());
    }

    #[test]
    fn test_model_info() {
        let info = vitals_engine().model_info();
        assert_eq!(info.feature_count, 7);
        assert_eq!(info.features[5], "glucose");
        assert_eq!(info.disease_classes, vec!["Healthy", "Diabetes"]);
        assert!(info.has_probability);
        assert!(info.has_feature_importance);
        assert_eq!(info.vocabulary_size, 0);
    }
}
