//! Prediction explanations and pluggable attribution add-ons
//!
//! Add-ons are best effort. Each one ends up as an [`Attachment`] that says
//! whether it was never attempted, attempted and failed, or produced data.

use crate::classifier::Classifier;
use crate::response::FeatureImportanceReport;
use crate::types::PredictionResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Outcome of one explainability add-on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Attachment {
    NotAttempted,
    Failed { reason: String },
    Available { data: Value },
}

impl Attachment {
    pub fn is_available(&self) -> bool {
        matches!(self, Attachment::Available { .. })
    }
}

/// An optional attribution method run after prediction
pub trait ExplanationAddon: Send + Sync {
    fn name(&self) -> &str;

    /// Explain the classifier's decision for `features`
    fn explain(
        &self,
        classifier: &dyn Classifier,
        features: &[f64],
        feature_names: &[String],
    ) -> Result<Value, String>;
}

/// Counts how often each feature is tested along the decision paths of a
/// tree ensemble
#[derive(Debug, Default, Clone, Copy)]
pub struct DecisionPathAddon;

impl ExplanationAddon for DecisionPathAddon {
    fn name(&self) -> &str {
        "decision_path"
    }

    fn explain(
        &self,
        classifier: &dyn Classifier,
        features: &[f64],
        feature_names: &[String],
    ) -> Result<Value, String> {
        let splits = classifier
            .split_features(features)
            .ok_or_else(|| format!("{} does not expose decision paths", classifier.model_type()))?;

        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for idx in &splits {
            *counts.entry(*idx).or_default() += 1;
        }

        let mut consulted: Vec<Value> = counts
            .into_iter()
            .map(|(idx, splits)| {
                let name = feature_names
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| format!("feature_{idx}"));
                json!({ "feature": name, "index": idx, "splits": splits })
            })
            .collect();
        // most consulted first; index order among equals
        consulted.sort_by(|a, b| b["splits"].as_u64().cmp(&a["splits"].as_u64()));

        Ok(json!({
            "total_splits": splits.len(),
            "features": consulted,
        }))
    }
}

/// Full explanation of one prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub prediction: PredictionResult,
    pub explanation: String,
    /// Omitted on the symptom path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_importance: Option<FeatureImportanceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_importance_note: Option<String>,
    pub attachments: BTreeMap<String, Attachment>,
}

/// Run every add-on, never failing the caller
pub fn run_addons(
    addons: &[Box<dyn ExplanationAddon>],
    classifier: &dyn Classifier,
    features: &[f64],
    feature_names: &[String],
) -> BTreeMap<String, Attachment> {
    addons
        .iter()
        .map(|addon| {
            let attachment = match addon.explain(classifier, features, feature_names) {
                Ok(data) => Attachment::Available { data },
                Err(reason) => {
                    tracing::debug!("Explanation add-on '{}' failed: {}", addon.name(), reason);
                    Attachment::Failed { reason }
                }
            };
            (addon.name().to_string(), attachment)
        })
        .collect()
}

/// Mark every add-on as skipped
pub fn skipped_addons(addons: &[Box<dyn ExplanationAddon>]) -> BTreeMap<String, Attachment> {
    addons
        .iter()
        .map(|addon| (addon.name().to_string(), Attachment::NotAttempted))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Capabilities;
    use crate::errors::ClassifierError;
    use crate::gbdt::{EnsembleKind, Node, Tree, TreeEnsemble};

    #[derive(Debug)]
    struct Opaque;

    impl Classifier for Opaque {
        fn model_type(&self) -> &str {
            "Opaque"
        }
        fn n_features(&self) -> usize {
            1
        }
        fn n_classes(&self) -> usize {
            2
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities::default()
        }
        fn predict(&self, _features: &[f64]) -> Result<usize, ClassifierError> {
            Ok(0)
        }
    }

    fn two_feature_forest() -> TreeEnsemble {
        let t1 = Tree::new(
            vec![
                Node::internal(0, 0, 10.0, 1, 2),
                Node::internal(1, 1, 5.0, 3, 4),
                Node::leaf(2, vec![0.0, 1.0]),
                Node::leaf(3, vec![1.0, 0.0]),
                Node::leaf(4, vec![0.5, 0.5]),
            ],
            1.0,
        );
        let t2 = Tree::new(
            vec![
                Node::internal(0, 1, 3.0, 1, 2),
                Node::leaf(1, vec![1.0, 0.0]),
                Node::leaf(2, vec![0.0, 1.0]),
            ],
            1.0,
        );
        TreeEnsemble::new(EnsembleKind::RandomForest, 2, 2, vec![t1, t2])
    }

    #[test]
    fn test_decision_path_counts_splits() {
        let model = two_feature_forest();
        let names = vec!["glucose".to_string(), "age".to_string()];
        let data = DecisionPathAddon.explain(&model, &[1.0, 4.0], &names).unwrap();

        assert_eq!(data["total_splits"], 3);
        assert_eq!(data["features"][0]["feature"], "age");
        assert_eq!(data["features"][0]["splits"], 2);
        assert_eq!(data["features"][1]["feature"], "glucose");
    }

    #[test]
    fn test_failed_addon_is_recorded() {
        let addons: Vec<Box<dyn ExplanationAddon>> = vec![Box::new(DecisionPathAddon)];
        let attachments = run_addons(&addons, &Opaque, &[0.0], &[]);
        assert!(matches!(
            attachments.get("decision_path"),
            Some(Attachment::Failed { .. })
        ));

        let skipped = skipped_addons(&addons);
        assert_eq!(skipped.get("decision_path"), Some(&Attachment::NotAttempted));
    }

    #[test]
    fn test_attachment_serialization() {
        let json = serde_json::to_value(Attachment::Failed {
            reason: "nope".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "nope");
    }
}
