//! Tree-ensemble classifier
//!
//! One artifact format covers single decision trees, random forests and
//! gradient-boosted ensembles:
//! - `decision_tree` / `random_forest`: leaves hold class distributions
//!   (or counts); probabilities are the weighted mean of the normalized
//!   leaf distributions.
//! - `gradient_boosting`: leaves hold per-class raw scores; probabilities
//!   are `softmax(init_scores + learning_rate * sum(weight * leaf))`.
//!
//! The predicted class is the arg-max of the class scores, ties going to
//! the lowest class index.

use super::tree::Tree;
use crate::classifier::{Capabilities, Classifier};
use crate::errors::{ArtifactError, ClassifierError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Supported ensemble families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsembleKind {
    DecisionTree,
    RandomForest,
    GradientBoosting,
}

impl EnsembleKind {
    /// Model type name reported to callers
    pub fn model_type(self) -> &'static str {
        match self {
            EnsembleKind::DecisionTree => "DecisionTreeClassifier",
            EnsembleKind::RandomForest => "RandomForestClassifier",
            EnsembleKind::GradientBoosting => "GradientBoostingClassifier",
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_learning_rate() -> f64 {
    1.0
}

/// Tree-ensemble classifier loaded from `model.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeEnsemble {
    /// Artifact format version (always 1 for now)
    pub version: i32,

    pub kind: EnsembleKind,

    /// Input dimensionality the trees were trained on
    pub n_features: usize,

    pub n_classes: usize,

    /// Whether the model exposes class probabilities
    #[serde(default = "default_true")]
    pub probability: bool,

    /// Initial raw scores (gradient boosting only)
    #[serde(default)]
    pub init_scores: Option<Vec<f64>>,

    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Per-feature importances, when the trainer exported them
    #[serde(default)]
    pub feature_importances: Option<Vec<f64>>,

    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Create a probabilistic ensemble without importances
    pub fn new(kind: EnsembleKind, n_features: usize, n_classes: usize, trees: Vec<Tree>) -> Self {
        Self {
            version: 1,
            kind,
            n_features,
            n_classes,
            probability: true,
            init_scores: None,
            learning_rate: 1.0,
            feature_importances: None,
            trees,
        }
    }

    pub fn with_feature_importances(mut self, importances: Vec<f64>) -> Self {
        self.feature_importances = Some(importances);
        self
    }

    /// Declare the model non-probabilistic
    pub fn without_probability(mut self) -> Self {
        self.probability = false;
        self
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.version != 1 {
            return Err(ArtifactError::Invalid(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }
        if self.n_features == 0 {
            return Err(ArtifactError::Invalid("Model has zero input features".into()));
        }
        if self.n_classes == 0 {
            return Err(ArtifactError::Invalid("Model has zero classes".into()));
        }
        if self.trees.is_empty() {
            return Err(ArtifactError::Invalid("Model has no trees".into()));
        }
        if !self.learning_rate.is_finite() {
            return Err(ArtifactError::Invalid(format!(
                "Invalid learning rate: {}",
                self.learning_rate
            )));
        }
        if let Some(init) = &self.init_scores {
            if init.len() != self.n_classes || init.iter().any(|v| !v.is_finite()) {
                return Err(ArtifactError::Invalid(format!(
                    "init_scores must hold {} finite values",
                    self.n_classes
                )));
            }
        }
        if let Some(importances) = &self.feature_importances {
            if importances.len() != self.n_features {
                return Err(ArtifactError::Invalid(format!(
                    "feature_importances has {} entries, expected {}",
                    importances.len(),
                    self.n_features
                )));
            }
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.n_classes)
                .map_err(|e| ArtifactError::Invalid(format!("Tree {i} validation failed: {e}")))?;

            if self.kind != EnsembleKind::GradientBoosting {
                let negative_leaf = tree
                    .nodes
                    .iter()
                    .filter_map(|n| n.leaf.as_ref())
                    .any(|values| values.iter().any(|v| *v < 0.0));
                if negative_leaf {
                    return Err(ArtifactError::Invalid(format!(
                        "Tree {i} has negative class frequencies"
                    )));
                }
            }
        }

        if self.kind != EnsembleKind::GradientBoosting
            && self.trees.iter().map(|t| t.weight).sum::<f64>() <= 0.0
        {
            return Err(ArtifactError::Invalid("Trees have zero total weight".into()));
        }

        Ok(())
    }

    /// Parse and validate a model from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, ArtifactError> {
        let model: TreeEnsemble = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Load model from JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    fn check_dimension(&self, features: &[f64]) -> Result<(), ClassifierError> {
        if features.len() != self.n_features {
            return Err(ClassifierError::DimensionMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }
        Ok(())
    }

    fn leaf<'a>(&self, tree: &'a Tree, index: usize, features: &[f64]) -> Result<&'a [f64], ClassifierError> {
        tree.evaluate(features)
            .ok_or_else(|| ClassifierError::Evaluation(format!("Tree {index} did not reach a leaf")))
    }

    /// Class probabilities, regardless of the declared capability
    fn class_distribution(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        self.check_dimension(features)?;

        match self.kind {
            EnsembleKind::DecisionTree | EnsembleKind::RandomForest => {
                let mut acc = vec![0.0; self.n_classes];
                let mut total_weight = 0.0;

                for (i, tree) in self.trees.iter().enumerate() {
                    let leaf = self.leaf(tree, i, features)?;
                    let sum: f64 = leaf.iter().sum();
                    for (slot, value) in acc.iter_mut().zip(leaf) {
                        *slot += if sum > 0.0 {
                            tree.weight * value / sum
                        } else {
                            tree.weight / self.n_classes as f64
                        };
                    }
                    total_weight += tree.weight;
                }

                if total_weight <= 0.0 {
                    return Err(ClassifierError::Evaluation(
                        "Ensemble has zero total weight".into(),
                    ));
                }
                acc.iter_mut().for_each(|p| *p /= total_weight);
                Ok(acc)
            }
            EnsembleKind::GradientBoosting => {
                let mut raw = self
                    .init_scores
                    .clone()
                    .unwrap_or_else(|| vec![0.0; self.n_classes]);

                for (i, tree) in self.trees.iter().enumerate() {
                    let leaf = self.leaf(tree, i, features)?;
                    for (slot, value) in raw.iter_mut().zip(leaf) {
                        *slot += self.learning_rate * tree.weight * value;
                    }
                }

                Ok(softmax(&raw))
            }
        }
    }
}

/// Numerically stable softmax
pub fn softmax(raw: &[f64]) -> Vec<f64> {
    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = raw.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; ties resolve to the lowest index
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

impl Classifier for TreeEnsemble {
    fn model_type(&self) -> &str {
        self.kind.model_type()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            probabilities: self.probability,
            feature_importance: self.feature_importances.is_some(),
        }
    }

    fn predict(&self, features: &[f64]) -> Result<usize, ClassifierError> {
        let distribution = self.class_distribution(features)?;
        argmax(&distribution)
            .ok_or_else(|| ClassifierError::Evaluation("Empty class distribution".into()))
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        if !self.probability {
            return Err(ClassifierError::Capability("probabilities"));
        }
        self.class_distribution(features)
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }

    fn split_features(&self, features: &[f64]) -> Option<Vec<usize>> {
        if features.len() != self.n_features {
            return None;
        }
        let mut consulted = Vec::new();
        for tree in &self.trees {
            let path = tree.decision_path(features)?;
            consulted.extend(
                path.iter()
                    .map(|&i| &tree.nodes[i])
                    .filter(|node| !node.is_leaf())
                    .map(|node| node.feature_idx as usize),
            );
        }
        Some(consulted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbdt::tree::Node;

    fn forest() -> TreeEnsemble {
        let tree1 = Tree::new(
            vec![
                Node::internal(0, 0, 50.0, 1, 2),
                Node::leaf(1, vec![8.0, 2.0]),
                Node::leaf(2, vec![1.0, 9.0]),
            ],
            1.0,
        );
        let tree2 = Tree::new(
            vec![
                Node::internal(0, 1, 30.0, 1, 2),
                Node::leaf(1, vec![0.6, 0.4]),
                Node::leaf(2, vec![0.0, 1.0]),
            ],
            1.0,
        );
        TreeEnsemble::new(EnsembleKind::RandomForest, 2, 2, vec![tree1, tree2])
    }

    #[test]
    fn test_forest_probabilities_average_normalized_leaves() {
        let model = forest();
        assert!(model.validate().is_ok());

        let proba = model.predict_proba(&[30.0, 20.0]).unwrap();
        assert!((proba[0] - 0.7).abs() < 1e-12);
        assert!((proba[1] - 0.3).abs() < 1e-12);
        assert_eq!(model.predict(&[30.0, 20.0]).unwrap(), 0);

        let proba = model.predict_proba(&[60.0, 40.0]).unwrap();
        assert!((proba[1] - 0.95).abs() < 1e-12);
        assert_eq!(model.predict(&[60.0, 40.0]).unwrap(), 1);
    }

    #[test]
    fn test_gradient_boosting_softmax() {
        let tree = Tree::new(
            vec![
                Node::internal(0, 0, 0.5, 1, 2),
                Node::leaf(1, vec![1.0, 0.0, 0.0]),
                Node::leaf(2, vec![0.0, 0.0, 2.0]),
            ],
            1.0,
        );
        let mut model = TreeEnsemble::new(EnsembleKind::GradientBoosting, 1, 3, vec![tree]);
        model.init_scores = Some(vec![0.0, 0.5, 0.0]);
        assert!(model.validate().is_ok());

        let proba = model.predict_proba(&[1.0]).unwrap();
        let sum: f64 = proba.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(model.predict(&[1.0]).unwrap(), 2);
        assert_eq!(model.predict(&[0.0]).unwrap(), 0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let model = forest();
        assert_eq!(
            model.predict(&[1.0]),
            Err(ClassifierError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_non_probabilistic_model() {
        let model = forest().without_probability();
        assert!(!model.capabilities().probabilities);
        assert_eq!(
            model.predict_proba(&[1.0, 1.0]),
            Err(ClassifierError::Capability("probabilities"))
        );
        assert!(model.predict(&[1.0, 1.0]).is_ok());
    }

    #[test]
    fn test_argmax_ties_pick_lowest_index() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), Some(0));
        assert_eq!(argmax(&[0.1, 0.45, 0.45]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_model_validation() {
        let mut invalid = forest();
        invalid.version = 2;
        assert!(invalid.validate().is_err());

        let invalid = forest().with_feature_importances(vec![1.0]);
        assert!(invalid.validate().is_err());

        let mut invalid = forest();
        invalid.trees[0].nodes[1] = Node::leaf(1, vec![-1.0, 2.0]);
        assert!(invalid.validate().is_err());

        let mut invalid = forest();
        invalid.trees.clear();
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip_preserves_inference() {
        let original = forest().with_feature_importances(vec![0.25, 0.75]);
        let json = serde_json::to_string(&original).unwrap();
        let restored = TreeEnsemble::from_json_str(&json).unwrap();
        assert_eq!(original, restored);
        assert_eq!(
            original.predict_proba(&[30.0, 20.0]).unwrap(),
            restored.predict_proba(&[30.0, 20.0]).unwrap()
        );
    }

    #[test]
    fn test_split_features_follow_decision_paths() {
        let model = forest();
        assert_eq!(model.split_features(&[30.0, 20.0]), Some(vec![0, 1]));
        assert_eq!(model.split_features(&[30.0]), None);
    }
}
