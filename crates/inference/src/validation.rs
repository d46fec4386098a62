//! Request validation
//!
//! Runs before feature construction. Hard failures are returned as
//! [`InferenceError::Validation`]; symptom phrases outside the curated
//! reference set only produce warnings.

use crate::errors::{InferenceError, Result};
use crate::normalizer::normalize;
use crate::types::{PredictionRequest, SymptomEntry, VitalField};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default cap on the symptom list length
pub const MAX_SYMPTOMS: usize = 50;

/// Default cap on batch size
pub const MAX_BATCH: usize = 100;

/// Symptom phrases the validator recognises without a warning
pub const SUPPORTED_SYMPTOMS: &[&str] = &[
    "chest pain",
    "shortness of breath",
    "fatigue",
    "dizziness",
    "headache",
    "fever",
    "cough",
    "runny nose",
    "sore throat",
    "nausea",
    "vomiting",
    "diarrhea",
    "loss of appetite",
    "abdominal pain",
    "joint pain",
    "muscle pain",
    "body aches",
    "body pain",
    "rash",
    "chills",
    "congestion",
    "dry mouth",
    "weakness",
    "sweating",
    "tremor",
    "anxiety",
    "insomnia",
    "back pain",
    "neck pain",
    "shoulder pain",
    "arm pain",
    "leg pain",
    "numbness",
    "tingling",
    "itching",
    "bruising",
    "swelling",
];

/// Soft validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub warning_type: String,
    pub message: String,
}

/// Outcome of a successful validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Request is in symptom-only mode and vitals were not required
    pub symptoms_only: bool,
    pub warnings: Vec<ValidationWarning>,
}

/// Inclusive range check for one vital
struct VitalRule {
    field: VitalField,
    min: f64,
    max: f64,
    message: &'static str,
}

const VITAL_RULES: [VitalRule; 7] = [
    VitalRule {
        field: VitalField::Age,
        min: 0.0,
        max: 150.0,
        message: "Age must be a number between 0 and 150",
    },
    VitalRule {
        field: VitalField::Gender,
        min: 0.0,
        max: 1.0,
        message: "Gender must be 0 (Female) or 1 (Male)",
    },
    VitalRule {
        field: VitalField::Weight,
        min: 20.0,
        max: 300.0,
        message: "Weight must be between 20 and 300 kg",
    },
    VitalRule {
        field: VitalField::BloodPressureSystolic,
        min: 50.0,
        max: 250.0,
        message: "Systolic BP must be between 50 and 250",
    },
    VitalRule {
        field: VitalField::BloodPressureDiastolic,
        min: 30.0,
        max: 150.0,
        message: "Diastolic BP must be between 30 and 150",
    },
    VitalRule {
        field: VitalField::Glucose,
        min: 40.0,
        max: 400.0,
        message: "Glucose must be between 40 and 400 mg/dL",
    },
    VitalRule {
        field: VitalField::Cholesterol,
        min: 50.0,
        max: 500.0,
        message: "Cholesterol must be between 50 and 500 mg/dL",
    },
];

impl VitalRule {
    fn accepts(&self, value: f64) -> bool {
        match self.field {
            // gender is categorical
            VitalField::Gender => value == 0.0 || value == 1.0,
            _ => (self.min..=self.max).contains(&value),
        }
    }
}

/// Shape and range checks for prediction requests
#[derive(Debug, Clone)]
pub struct InputValidator {
    max_symptoms: usize,
    max_batch: usize,
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new(MAX_SYMPTOMS, MAX_BATCH)
    }
}

impl InputValidator {
    pub fn new(max_symptoms: usize, max_batch: usize) -> Self {
        Self {
            max_symptoms,
            max_batch,
        }
    }

    /// Validate a single request
    pub fn validate(&self, request: &PredictionRequest) -> Result<ValidationReport> {
        let symptoms_only = request.is_symptoms_only();

        if !symptoms_only {
            self.check_vitals(request)?;
        }

        let warnings = self.check_symptoms(request.symptom_entries())?;

        Ok(ValidationReport {
            symptoms_only,
            warnings,
        })
    }

    /// Presence and range checks for the seven vitals.
    ///
    /// Symptom-only requests skip these in [`InputValidator::validate`]; the
    /// engine runs them once such a request falls back to the vitals path.
    pub fn check_vitals(&self, request: &PredictionRequest) -> Result<()> {
        for field in VitalField::ALL {
            if request.vital(field).is_none() {
                return Err(InferenceError::Validation(format!(
                    "Missing required field: {}",
                    field.name()
                )));
            }
        }
        for rule in &VITAL_RULES {
            let value = request.vital(rule.field).unwrap_or(f64::NAN);
            if !rule.accepts(value) {
                return Err(InferenceError::Validation(rule.message.to_string()));
            }
        }
        Ok(())
    }

    /// Validate a batch; the first failing entry fails the batch with its index
    pub fn validate_batch(&self, requests: &[PredictionRequest]) -> Result<Vec<ValidationReport>> {
        if requests.is_empty() {
            return Err(InferenceError::Validation(
                "Predictions list cannot be empty".into(),
            ));
        }
        if requests.len() > self.max_batch {
            return Err(InferenceError::Validation(format!(
                "Maximum {} predictions per batch",
                self.max_batch
            )));
        }

        requests
            .iter()
            .enumerate()
            .map(|(index, request)| self.validate(request).map_err(|e| e.at_index(index)))
            .collect()
    }

    fn check_symptoms(&self, symptoms: &[SymptomEntry]) -> Result<Vec<ValidationWarning>> {
        if symptoms.len() > self.max_symptoms {
            return Err(InferenceError::Validation(format!(
                "Maximum {} symptoms allowed",
                self.max_symptoms
            )));
        }

        let mut unrecognized = Vec::new();
        for entry in symptoms {
            match entry {
                SymptomEntry::Flag(flag) if *flag != 0.0 && *flag != 1.0 => {
                    return Err(InferenceError::Validation(
                        "Each symptom must be a string or 0/1".into(),
                    ));
                }
                SymptomEntry::Flag(_) => {}
                SymptomEntry::Name(name) => {
                    let canonical = normalize(name);
                    if !canonical.is_empty() && !SUPPORTED_SYMPTOMS.contains(&canonical.as_str()) {
                        unrecognized.push(name.clone());
                    }
                }
            }
        }

        if unrecognized.is_empty() {
            return Ok(Vec::new());
        }

        warn!(
            "Unrecognized symptoms: {:?}. Model may have lower accuracy.",
            unrecognized
        );
        Ok(unrecognized
            .into_iter()
            .map(|name| ValidationWarning {
                warning_type: "unrecognized_symptom".to_string(),
                message: format!("Unrecognized symptom '{name}'; model accuracy may be lower"),
            })
            .collect())
    }
}
