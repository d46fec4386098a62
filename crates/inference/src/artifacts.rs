//! Artifact bundle loading
//!
//! The bundle is the classifier plus its companion scaler, label encoders and
//! symptom vocabulary. It is validated as a unit and immutable afterwards.

use crate::classifier::{Classifier, ClassifierAdapter};
use crate::errors::ArtifactError;
use crate::gbdt::TreeEnsemble;
use crate::preprocessing::{LabelEncoders, StandardScaler};
use crate::types::VITALS_DIMENSION;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const MODEL_FILE: &str = "model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const LABEL_ENCODERS_FILE: &str = "label_encoders.json";
pub const VOCABULARY_FILE: &str = "symptom_vocabulary.json";

/// Locations of the artifact files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
    pub label_encoders: PathBuf,
    pub vocabulary: PathBuf,
}

impl ArtifactPaths {
    /// Default file names inside `dir`
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            model: dir.join(MODEL_FILE),
            scaler: dir.join(SCALER_FILE),
            label_encoders: dir.join(LABEL_ENCODERS_FILE),
            vocabulary: dir.join(VOCABULARY_FILE),
        }
    }
}

/// Loaded, validated artifacts
#[derive(Debug)]
pub struct ArtifactBundle {
    classifier: ClassifierAdapter,
    scaler: Option<StandardScaler>,
    labels: LabelEncoders,
    vocabulary: Option<Vec<String>>,
}

impl ArtifactBundle {
    /// Assemble a bundle from in-memory parts and check its invariants
    pub fn from_parts(
        classifier: Box<dyn Classifier>,
        scaler: Option<StandardScaler>,
        labels: LabelEncoders,
        vocabulary: Option<Vec<String>>,
    ) -> Result<Self, ArtifactError> {
        let classifier = ClassifierAdapter::new(classifier);
        // an empty vocabulary carries no symptom schema
        let vocabulary = vocabulary.filter(|v| !v.is_empty());

        match &vocabulary {
            Some(vocab) if vocab.len() != classifier.n_features() => {
                return Err(ArtifactError::Invalid(format!(
                    "Vocabulary has {} entries but the classifier expects {} features",
                    vocab.len(),
                    classifier.n_features()
                )));
            }
            None if classifier.n_features() != VITALS_DIMENSION => {
                return Err(ArtifactError::Invalid(format!(
                    "Classifier expects {} features but no vocabulary is loaded and the vitals schema has {VITALS_DIMENSION}",
                    classifier.n_features()
                )));
            }
            _ => {}
        }

        if let Some(scaler) = &scaler {
            scaler.validate()?;
        }
        labels.validate()?;

        Ok(Self {
            classifier,
            scaler,
            labels,
            vocabulary,
        })
    }

    /// Load every artifact from disk; only the model file is required
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        if !paths.model.exists() {
            return Err(ArtifactError::Missing(paths.model.clone()));
        }
        let model = TreeEnsemble::load_json(&paths.model)?;
        info!(
            "Loaded {} with {} trees from {}",
            model.kind.model_type(),
            model.num_trees(),
            paths.model.display()
        );

        let scaler: Option<StandardScaler> = read_optional(&paths.scaler)?;
        let labels: LabelEncoders = read_optional(&paths.label_encoders)?.unwrap_or_default();
        let vocabulary: Option<Vec<String>> = read_optional(&paths.vocabulary)?;

        let bundle = Self::from_parts(Box::new(model), scaler, labels, vocabulary)?;
        info!(
            "Artifact bundle ready: scaler={}, classes={}, vocabulary={}",
            bundle.scaler.is_some(),
            bundle.labels.classes().len(),
            bundle.vocabulary_size()
        );
        Ok(bundle)
    }

    /// Load from a directory using the default file names
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, ArtifactError> {
        Self::load(&ArtifactPaths::in_dir(dir))
    }

    pub fn classifier(&self) -> &ClassifierAdapter {
        &self.classifier
    }

    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    pub fn labels(&self) -> &LabelEncoders {
        &self.labels
    }

    pub fn vocabulary(&self) -> Option<&[String]> {
        self.vocabulary.as_deref()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.as_ref().map_or(0, Vec::len)
    }
}

/// Parse a JSON artifact that may be absent
fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ArtifactError> {
    if !path.exists() {
        debug!("Optional artifact {} not present", path.display());
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    let value = serde_json::from_str(&text)?;
    debug!("Loaded optional artifact {}", path.display());
    Ok(Some(value))
}
