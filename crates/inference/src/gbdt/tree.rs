//! Decision tree structures for ensemble inference
//!
//! Nodes are stored flat; node 0 is the root. Leaves carry one value per
//! class (a class distribution for forests, raw score contributions for
//! gradient boosting).

use serde::{Deserialize, Serialize};

/// A decision tree node (internal or leaf)
///
/// For internal nodes:
/// - `feature_idx >= 0`: index into feature vector
/// - `left` and `right` point to child node indices
/// - `leaf` is `None`
///
/// For leaf nodes:
/// - `feature_idx == -1`
/// - `leaf` contains one value per class
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Node ID (for reference, not used in traversal)
    #[serde(default)]
    pub id: i32,

    /// Left child index (-1 for leaf nodes)
    pub left: i32,

    /// Right child index (-1 for leaf nodes)
    pub right: i32,

    /// Feature index to split on (-1 for leaf nodes)
    #[serde(rename = "feature", alias = "feature_idx")]
    pub feature_idx: i32,

    /// Split threshold; traversal goes left when `x <= threshold`
    #[serde(default)]
    pub threshold: f64,

    /// Per-class leaf values
    #[serde(default)]
    pub leaf: Option<Vec<f64>>,
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(id: i32, feature_idx: i32, threshold: f64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
        }
    }

    /// Create a new leaf node
    pub fn leaf(id: i32, values: Vec<f64>) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0.0,
            leaf: Some(values),
        }
    }

    /// Check if this node is a leaf
    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }
}

/// A single decision tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    /// Tree nodes (node 0 is the root)
    pub nodes: Vec<Node>,

    /// Tree weight in the ensemble
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Tree {
    pub fn new(nodes: Vec<Node>, weight: f64) -> Self {
        Self { nodes, weight }
    }

    /// Walk from the root to a leaf, returning the visited node indices.
    ///
    /// Returns `None` on a malformed tree or a feature index beyond the
    /// input; validated trees never hit either case.
    pub fn decision_path(&self, features: &[f64]) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut idx = 0usize;

        // children always have larger indices than their parent, so a
        // path can never be longer than the node count
        for _ in 0..self.nodes.len() {
            let node = self.nodes.get(idx)?;
            path.push(idx);

            if node.is_leaf() {
                return Some(path);
            }

            let value = *features.get(node.feature_idx as usize)?;
            let next = if value <= node.threshold {
                node.left
            } else {
                node.right
            };
            if next < 0 {
                return None;
            }
            idx = next as usize;
        }

        None
    }

    /// Evaluate this tree, returning the reached leaf's values
    pub fn evaluate(&self, features: &[f64]) -> Option<&[f64]> {
        let path = self.decision_path(features)?;
        let last = *path.last()?;
        self.nodes[last].leaf.as_deref()
    }

    /// Validate tree structure against the model shape
    pub fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(format!("Invalid tree weight: {}", self.weight));
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                let values = node
                    .leaf
                    .as_ref()
                    .ok_or_else(|| format!("Leaf node {i} has no leaf value"))?;
                if values.len() != n_classes {
                    return Err(format!(
                        "Leaf node {i} has {} values, expected {n_classes}",
                        values.len()
                    ));
                }
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(format!("Leaf node {i} has a non-finite value"));
                }
                continue;
            }

            if node.feature_idx < 0 || node.feature_idx as usize >= n_features {
                return Err(format!(
                    "Internal node {i} has invalid feature index: {}",
                    node.feature_idx
                ));
            }

            if !node.threshold.is_finite() {
                return Err(format!("Internal node {i} has a non-finite threshold"));
            }

            for (side, child) in [("left", node.left), ("right", node.right)] {
                if child < 0 || child as usize >= self.nodes.len() {
                    return Err(format!("Node {i} has invalid {side} child: {child}"));
                }
                if child as usize <= i {
                    return Err(format!(
                        "Node {i} has {side} child {child} that does not follow it"
                    ));
                }
            }
        }

        Ok(())
    }
}
