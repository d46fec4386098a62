//! Disease prediction inference engine
//!
//! Turns a request carrying free-text symptoms, the seven vitals, or both
//! into a fixed-length feature vector, runs a pre-trained tree-ensemble
//! classifier on it and composes an explainable result.
//!
//! Modules:
//! - `normalizer`: Canonical form and suffix variants of symptom text
//! - `vocabulary`: Lookup from symptom surface forms to one-hot positions
//! - `features`: Symptom-path / vitals-path feature construction
//! - `classifier`: Classifier trait, capability-tagged adapter, top-k ranking
//! - `gbdt`: JSON tree-ensemble classifier
//! - `preprocessing`: Vitals scaler and label encoders
//! - `artifacts`: Artifact bundle loading and invariants
//! - `validation`: Request shape and range checks
//! - `response`: Risk tiers, result composition, rationale text
//! - `explain`: Explanations and attribution add-ons
//! - `engine`: The `InferenceEngine` façade
//!
//! ```rust
//! use medipredict_inference::gbdt::{EnsembleKind, Node, Tree, TreeEnsemble};
//! use medipredict_inference::{ArtifactBundle, EngineConfig, InferenceEngine, PredictionRequest};
//! use medipredict_inference::preprocessing::LabelEncoders;
//! use std::sync::Arc;
//!
//! let tree = Tree::new(
//!     vec![
//!         Node::internal(0, 5, 125.0, 1, 2),
//!         Node::leaf(1, vec![0.9, 0.1]),
//!         Node::leaf(2, vec![0.2, 0.8]),
//!     ],
//!     1.0,
//! );
//! let model = TreeEnsemble::new(EnsembleKind::DecisionTree, 7, 2, vec![tree]);
//! let bundle = ArtifactBundle::from_parts(Box::new(model), None, LabelEncoders::new(), None).unwrap();
//! let engine = InferenceEngine::new(Arc::new(bundle), EngineConfig::default());
//!
//! let request = PredictionRequest::from_vitals([45.0, 1.0, 75.0, 130.0, 85.0, 110.0, 200.0]);
//! let result = engine.predict(&request).unwrap();
//! assert_eq!(result.disease_code, 0);
//! assert!(!result.used_symptoms_path);
//! ```

pub mod artifacts;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod errors;
pub mod explain;
pub mod features;
pub mod gbdt;
pub mod normalizer;
pub mod preprocessing;
pub mod response;
pub mod types;
pub mod validation;
pub mod vocabulary;

pub use artifacts::{ArtifactBundle, ArtifactPaths};
pub use classifier::{Capabilities, Classifier, ClassifierAdapter};
pub use config::EngineConfig;
pub use engine::InferenceEngine;
pub use errors::{ArtifactError, ClassifierError, ConfigError, ErrorKind, InferenceError};
pub use explain::{Attachment, Explanation, ExplanationAddon};
pub use response::{FeatureImportanceReport, RiskThresholds};
pub use types::{
    BatchPrediction, FeaturePath, ModelInfo, PredictionRequest, PredictionResult, RiskLevel,
    SymptomEntry, TopKEntry, VitalField,
};
pub use validation::{InputValidator, ValidationReport, ValidationWarning};

/// Crate version string reported by the service
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
