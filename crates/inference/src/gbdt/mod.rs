//! Tree-ensemble inference
//!
//! Models are loaded from JSON with the following structure:
//!
//! ```json
//! {
//!   "version": 1,
//!   "kind": "random_forest",
//!   "n_features": 7,
//!   "n_classes": 2,
//!   "probability": true,
//!   "feature_importances": [0.1, 0.0, 0.2, 0.3, 0.1, 0.2, 0.1],
//!   "trees": [
//!     {
//!       "nodes": [
//!         {"id":0,"left":1,"right":2,"feature":5,"threshold":125.0,"leaf":null},
//!         {"id":1,"left":-1,"right":-1,"feature":-1,"threshold":0,"leaf":[40.0, 2.0]},
//!         {"id":2,"left":-1,"right":-1,"feature":-1,"threshold":0,"leaf":[3.0, 35.0]}
//!       ],
//!       "weight": 1.0
//!     }
//!   ]
//! }
//! ```
//!
//! # Usage
//!
//! ```rust
//! use medipredict_inference::classifier::Classifier;
//! use medipredict_inference::gbdt::{EnsembleKind, Node, Tree, TreeEnsemble};
//!
//! let tree = Tree::new(
//!     vec![
//!         Node::internal(0, 0, 50.0, 1, 2),
//!         Node::leaf(1, vec![0.9, 0.1]),
//!         Node::leaf(2, vec![0.2, 0.8]),
//!     ],
//!     1.0,
//! );
//! let model = TreeEnsemble::new(EnsembleKind::DecisionTree, 1, 2, vec![tree]);
//! model.validate().unwrap();
//!
//! assert_eq!(model.predict(&[30.0]).unwrap(), 0);
//! let proba = model.predict_proba(&[70.0]).unwrap();
//! assert!((proba[1] - 0.8).abs() < 1e-12);
//! ```
//!
//! Traversal goes left when `x[feature] <= threshold`, and a child index is
//! always larger than its parent's, so every walk terminates.

pub mod model;
pub mod tree;

pub use model::{argmax, softmax, EnsembleKind, TreeEnsemble};
pub use tree::{Node, Tree};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::classifier::Classifier;

    fn vitals_forest() -> TreeEnsemble {
        // glucose (5) and systolic pressure (3) decide between three classes
        let by_glucose = Tree::new(
            vec![
                Node::internal(0, 5, 125.0, 1, 2),
                Node::leaf(1, vec![30.0, 5.0, 5.0]),
                Node::leaf(2, vec![2.0, 36.0, 2.0]),
            ],
            1.0,
        );
        let by_pressure = Tree::new(
            vec![
                Node::internal(0, 3, 140.0, 1, 2),
                Node::leaf(1, vec![0.7, 0.2, 0.1]),
                Node::leaf(2, vec![0.1, 0.1, 0.8]),
            ],
            1.0,
        );
        TreeEnsemble::new(EnsembleKind::RandomForest, 7, 3, vec![by_glucose, by_pressure])
    }

    #[test]
    fn test_three_class_inference() {
        let model = vitals_forest();
        model.validate().unwrap();

        let healthy = [45.0, 1.0, 75.0, 120.0, 80.0, 90.0, 180.0];
        assert_eq!(model.predict(&healthy).unwrap(), 0);

        let diabetic = [60.0, 0.0, 95.0, 125.0, 85.0, 210.0, 220.0];
        assert_eq!(model.predict(&diabetic).unwrap(), 1);

        let proba = model.predict_proba(&diabetic).unwrap();
        assert_eq!(proba.len(), 3);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_deterministic_inference_repeated() {
        let model = vitals_forest();
        let features = [52.0, 1.0, 88.0, 150.0, 95.0, 130.0, 240.0];
        let first = model.predict_proba(&features).unwrap();
        for _ in 0..100 {
            assert_eq!(model.predict_proba(&features).unwrap(), first);
        }
    }
}
