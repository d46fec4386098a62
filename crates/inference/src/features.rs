//! Feature construction
//!
//! Turns a request into exactly one of two feature representations:
//! - the symptom path: a one-hot vector over the trained vocabulary,
//!   unscaled, used when at least one symptom matched;
//! - the vitals path: the seven vitals in [`VitalField::ALL`] order, scaled
//!   when a scaler is loaded.
//!
//! The choice is a pure function of the request and the artifact bundle.

use crate::errors::{InferenceError, Result};
use crate::normalizer::normalize;
use crate::preprocessing::StandardScaler;
use crate::types::{FeaturePath, PredictionRequest, VitalField, VITALS_DIMENSION};
use crate::vocabulary::VocabularyIndex;
use tracing::{debug, info, warn};

/// Message for requests that carry neither matching symptoms nor vitals
pub const NO_SIGNAL_MESSAGE: &str =
    "No valid symptoms matched vocabulary and vitals are missing. Please add symptoms or vitals.";

/// Message for symptom-trained models that cannot fall back to vitals
pub const NO_SYMPTOM_MATCH_MESSAGE: &str =
    "None of the provided symptoms matched the model vocabulary. Please provide recognised symptoms.";

/// A feature vector plus the diagnostics of how it was built
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub values: Vec<f64>,
    pub path: FeaturePath,
    /// Input phrases that matched the vocabulary
    pub matched: Vec<String>,
    /// Input phrases that did not match
    pub unmatched: Vec<String>,
    /// Distinct one-hot positions set; zero on the vitals path
    pub active_positions: usize,
}

impl FeatureSet {
    pub fn used_symptoms_path(&self) -> bool {
        self.path == FeaturePath::Symptoms
    }
}

/// Builds feature vectors against one artifact bundle
#[derive(Debug, Clone, Copy)]
pub struct FeatureBuilder<'a> {
    index: Option<&'a VocabularyIndex>,
    scaler: Option<&'a StandardScaler>,
    /// Input dimension of the classifier
    expected_dim: usize,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(
        index: Option<&'a VocabularyIndex>,
        scaler: Option<&'a StandardScaler>,
        expected_dim: usize,
    ) -> Self {
        Self {
            index,
            scaler,
            expected_dim,
        }
    }

    /// Build the feature vector for one request
    pub fn build(&self, request: &PredictionRequest) -> Result<FeatureSet> {
        let mut matched = Vec::new();
        let mut unmatched = Vec::new();

        if let Some(index) = self.index {
            if !request.symptom_entries().is_empty() {
                let mut one_hot = vec![0.0; index.size()];

                for name in request.symptom_entries().iter().filter_map(|e| e.as_name()) {
                    match index.match_symptom(name) {
                        Some(hit) => {
                            debug!("Symptom '{}' matched '{}' at {}", name, hit.key, hit.position);
                            one_hot[hit.position] = 1.0;
                            matched.push(name.to_string());
                        }
                        // blank after normalization: not a symptom at all
                        None if normalize(name).is_empty() => {}
                        None => unmatched.push(name.to_string()),
                    }
                }

                info!(
                    "Matched {} of {} symptoms (vocabulary size {})",
                    matched.len(),
                    request.symptom_entries().len(),
                    index.size()
                );
                if !unmatched.is_empty() {
                    warn!("Unmatched {} symptoms: {:?}", unmatched.len(), unmatched);
                }

                let active_positions = one_hot.iter().filter(|v| **v != 0.0).count();
                if active_positions > 0 {
                    info!("Using symptom path with {} active features", active_positions);
                    return Ok(FeatureSet {
                        values: one_hot,
                        path: FeaturePath::Symptoms,
                        matched,
                        unmatched,
                        active_positions,
                    });
                }

                warn!("No symptoms matched vocabulary, falling back to vitals path");
            }
        } else {
            debug!("No symptom vocabulary loaded, using vitals path");
        }

        let values = self.vitals_vector(request)?;
        Ok(FeatureSet {
            values,
            path: FeaturePath::Vitals,
            matched,
            unmatched,
            active_positions: 0,
        })
    }

    fn vitals_vector(&self, request: &PredictionRequest) -> Result<Vec<f64>> {
        let present: Vec<Option<f64>> = VitalField::ALL.iter().map(|f| request.vital(*f)).collect();

        if present.iter().all(Option::is_none) {
            return Err(InferenceError::NoUsableSignal(NO_SIGNAL_MESSAGE.into()));
        }
        if let Some(pos) = present.iter().position(Option::is_none) {
            return Err(InferenceError::Validation(format!(
                "Missing required field: {}",
                VitalField::ALL[pos].name()
            )));
        }

        let raw: Vec<f64> = present.into_iter().flatten().collect();
        if raw.iter().any(|v| !v.is_finite()) || raw.iter().all(|v| *v == 0.0) {
            return Err(InferenceError::NoUsableSignal(NO_SIGNAL_MESSAGE.into()));
        }

        if self.expected_dim != VITALS_DIMENSION {
            debug!(
                "Classifier expects {} features, vitals path cannot serve it",
                self.expected_dim
            );
            return Err(InferenceError::NoUsableSignal(NO_SYMPTOM_MATCH_MESSAGE.into()));
        }

        match self.scaler {
            Some(scaler) => Ok(scaler.transform(&raw)?),
            None => Ok(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SymptomEntry;

    fn vitals() -> PredictionRequest {
        PredictionRequest::from_vitals([45.0, 1.0, 75.0, 130.0, 85.0, 110.0, 200.0])
    }

    #[test]
    fn test_symptom_path_one_hot() {
        let index = VocabularyIndex::build(&["chest pain", "fever", "cough"]);
        let builder = FeatureBuilder::new(Some(&index), None, 3);

        let request = PredictionRequest::from_symptoms(&["Chest Pain!", "coughing", "FEVER", "fever"]);
        let set = builder.build(&request).unwrap();
        assert_eq!(set.path, FeaturePath::Symptoms);
        assert_eq!(set.values, vec![1.0, 1.0, 1.0]);
        assert_eq!(set.matched.len(), 4);
        assert_eq!(set.active_positions, 3);
        assert!(set.unmatched.is_empty());
    }

    #[test]
    fn test_symptom_path_is_never_scaled() {
        let index = VocabularyIndex::build(&["a", "b", "c", "d", "e", "f", "g"]);
        let scaler = StandardScaler::new(vec![5.0; 7], vec![2.0; 7]);
        let builder = FeatureBuilder::new(Some(&index), Some(&scaler), 7);

        let set = builder.build(&PredictionRequest::from_symptoms(&["b"])).unwrap();
        assert_eq!(set.values, vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_vitals_path_is_scaled() {
        let scaler = StandardScaler::new(vec![0.0; 7], vec![10.0; 7]);
        let builder = FeatureBuilder::new(None, Some(&scaler), 7);

        let set = builder.build(&vitals()).unwrap();
        assert_eq!(set.path, FeaturePath::Vitals);
        assert_eq!(set.values, vec![4.5, 0.1, 7.5, 13.0, 8.5, 11.0, 20.0]);
        assert_eq!(set.active_positions, 0);
    }

    #[test]
    fn test_unmatched_symptoms_fall_back_to_vitals() {
        let index = VocabularyIndex::build(&["a", "b", "c", "d", "e", "f", "g"]);
        let builder = FeatureBuilder::new(Some(&index), None, 7);

        let mut request = vitals();
        request.symptoms = Some(vec!["qwerty_nonexistent".into()]);
        let set = builder.build(&request).unwrap();
        assert_eq!(set.path, FeaturePath::Vitals);
        assert_eq!(set.unmatched, vec!["qwerty_nonexistent".to_string()]);

        let request = PredictionRequest::from_symptoms(&["qwerty_nonexistent"]);
        assert!(matches!(
            builder.build(&request),
            Err(InferenceError::NoUsableSignal(_))
        ));
    }

    #[test]
    fn test_flags_and_blank_strings_are_ignored() {
        let index = VocabularyIndex::build(&["fever"]);
        let builder = FeatureBuilder::new(Some(&index), None, 1);

        let mut request = PredictionRequest::default();
        request.symptoms = Some(vec![
            SymptomEntry::Flag(1.0),
            "!!!".into(),
            "fever".into(),
        ]);
        let set = builder.build(&request).unwrap();
        assert_eq!(set.values, vec![1.0]);
        assert_eq!(set.matched, vec!["fever".to_string()]);
        assert!(set.unmatched.is_empty());
    }

    #[test]
    fn test_partial_and_degenerate_vitals() {
        let builder = FeatureBuilder::new(None, None, 7);

        let mut partial = PredictionRequest::default();
        partial.age = Some(40.0);
        let err = builder.build(&partial).unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: gender");

        let zeros = PredictionRequest::from_vitals([0.0; 7]);
        assert!(matches!(
            builder.build(&zeros),
            Err(InferenceError::NoUsableSignal(_))
        ));

        let mut infinite = vitals();
        infinite.glucose = Some(f64::INFINITY);
        assert!(matches!(
            builder.build(&infinite),
            Err(InferenceError::NoUsableSignal(_))
        ));

        assert_eq!(
            builder.build(&PredictionRequest::default()).unwrap_err().to_string(),
            NO_SIGNAL_MESSAGE
        );
    }

    #[test]
    fn test_symptom_model_cannot_use_vitals() {
        let index = VocabularyIndex::build(&["fever", "cough"]);
        let builder = FeatureBuilder::new(Some(&index), None, 2);

        let mut request = vitals();
        request.symptoms = Some(vec!["sneezing".into()]);
        assert_eq!(
            builder.build(&request).unwrap_err().to_string(),
            NO_SYMPTOM_MATCH_MESSAGE
        );
    }
}
