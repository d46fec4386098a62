//! Request and result types shared across the engine

use serde::{Deserialize, Serialize};

/// The seven vitals, in the order the vitals-path feature vector uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalField {
    Age,
    Gender,
    Weight,
    BloodPressureSystolic,
    BloodPressureDiastolic,
    Glucose,
    Cholesterol,
}

impl VitalField {
    /// All fields in feature-vector order
    pub const ALL: [VitalField; 7] = [
        VitalField::Age,
        VitalField::Gender,
        VitalField::Weight,
        VitalField::BloodPressureSystolic,
        VitalField::BloodPressureDiastolic,
        VitalField::Glucose,
        VitalField::Cholesterol,
    ];

    /// Wire name of the field
    pub fn name(self) -> &'static str {
        match self {
            VitalField::Age => "age",
            VitalField::Gender => "gender",
            VitalField::Weight => "weight",
            VitalField::BloodPressureSystolic => "blood_pressure_systolic",
            VitalField::BloodPressureDiastolic => "blood_pressure_diastolic",
            VitalField::Glucose => "glucose",
            VitalField::Cholesterol => "cholesterol",
        }
    }
}

/// Number of features on the vitals path
pub const VITALS_DIMENSION: usize = VitalField::ALL.len();

/// Vitals feature names in vector order
pub fn vital_feature_names() -> Vec<String> {
    VitalField::ALL.iter().map(|f| f.name().to_string()).collect()
}

/// One entry of the `symptoms` list: a free-text phrase or a 0/1 flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SymptomEntry {
    Name(String),
    Flag(f64),
}

impl SymptomEntry {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            SymptomEntry::Name(name) => Some(name),
            SymptomEntry::Flag(_) => None,
        }
    }
}

impl From<&str> for SymptomEntry {
    fn from(value: &str) -> Self {
        SymptomEntry::Name(value.to_string())
    }
}

/// A single prediction request
///
/// Either a symptom list, the seven vitals, or both. Unknown JSON fields are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<Vec<SymptomEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure_systolic: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure_diastolic: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glucose: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cholesterol: Option<f64>,
}

impl PredictionRequest {
    /// Request carrying only free-text symptoms
    pub fn from_symptoms<S: AsRef<str>>(symptoms: &[S]) -> Self {
        Self {
            symptoms: Some(
                symptoms
                    .iter()
                    .map(|s| SymptomEntry::Name(s.as_ref().to_string()))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Request carrying the seven vitals in feature-vector order
    pub fn from_vitals(values: [f64; VITALS_DIMENSION]) -> Self {
        let mut request = Self::default();
        for (field, value) in VitalField::ALL.iter().zip(values) {
            request.set_vital(*field, value);
        }
        request
    }

    /// Value of one vital, if present
    pub fn vital(&self, field: VitalField) -> Option<f64> {
        match field {
            VitalField::Age => self.age,
            VitalField::Gender => self.gender,
            VitalField::Weight => self.weight,
            VitalField::BloodPressureSystolic => self.blood_pressure_systolic,
            VitalField::BloodPressureDiastolic => self.blood_pressure_diastolic,
            VitalField::Glucose => self.glucose,
            VitalField::Cholesterol => self.cholesterol,
        }
    }

    pub fn set_vital(&mut self, field: VitalField, value: f64) {
        let slot = match field {
            VitalField::Age => &mut self.age,
            VitalField::Gender => &mut self.gender,
            VitalField::Weight => &mut self.weight,
            VitalField::BloodPressureSystolic => &mut self.blood_pressure_systolic,
            VitalField::BloodPressureDiastolic => &mut self.blood_pressure_diastolic,
            VitalField::Glucose => &mut self.glucose,
            VitalField::Cholesterol => &mut self.cholesterol,
        };
        *slot = Some(value);
    }

    /// Symptom entries, empty when the field is absent
    pub fn symptom_entries(&self) -> &[SymptomEntry] {
        self.symptoms.as_deref().unwrap_or(&[])
    }

    /// Symptom-only mode: a non-empty list whose first element is a string
    pub fn is_symptoms_only(&self) -> bool {
        matches!(self.symptom_entries().first(), Some(SymptomEntry::Name(_)))
    }
}

/// Which feature representation produced the vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeaturePath {
    Symptoms,
    Vitals,
}

/// Discrete risk tier derived from confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(s)
    }
}

/// One ranked alternative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopKEntry {
    pub label: String,
    pub probability: f64,
}

/// Result of a single prediction. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_disease: String,
    pub disease_code: usize,
    pub confidence: f64,
    pub confidence_percent: f64,
    pub risk_level: RiskLevel,
    pub used_symptoms_path: bool,
    pub matched_symptoms: usize,
    pub model_type: String,
    pub top_k: Vec<TopKEntry>,
    pub timestamp: String,
    /// False when confidence is the placeholder for non-probabilistic models
    pub confidence_calibrated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmatched_symptoms: Vec<String>,
}

/// Result of a batch prediction, in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPrediction {
    pub count: usize,
    pub predictions: Vec<PredictionResult>,
    pub timestamp: String,
}

/// Static description of the loaded model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub feature_count: usize,
    pub features: Vec<String>,
    pub disease_classes: Vec<String>,
    pub has_probability: bool,
    pub has_feature_importance: bool,
    pub vocabulary_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_mixed_symptoms() {
        let request: PredictionRequest =
            serde_json::from_str(r#"{"symptoms":["fever",1,0],"age":45,"extra":"ignored"}"#)
                .unwrap();
        let symptoms = request.symptom_entries();
        assert_eq!(symptoms.len(), 3);
        assert_eq!(symptoms[0], SymptomEntry::Name("fever".into()));
        assert_eq!(symptoms[1], SymptomEntry::Flag(1.0));
        assert_eq!(request.age, Some(45.0));
        assert!(request.is_symptoms_only());
    }

    #[test]
    fn test_symptoms_only_requires_leading_string() {
        let request: PredictionRequest = serde_json::from_str(r#"{"symptoms":[1,"fever"]}"#).unwrap();
        assert!(!request.is_symptoms_only());
        assert!(!PredictionRequest::default().is_symptoms_only());
        assert!(!PredictionRequest::from_symptoms::<&str>(&[]).is_symptoms_only());
    }

    #[test]
    fn test_wrong_vital_type_is_rejected() {
        let parsed = serde_json::from_str::<PredictionRequest>(r#"{"age":"old"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_from_vitals_order() {
        let request = PredictionRequest::from_vitals([45.0, 1.0, 75.0, 130.0, 85.0, 110.0, 200.0]);
        assert_eq!(request.vital(VitalField::Age), Some(45.0));
        assert_eq!(request.vital(VitalField::BloodPressureDiastolic), Some(85.0));
        assert_eq!(request.vital(VitalField::Cholesterol), Some(200.0));
    }

    #[test]
    fn test_risk_level_serializes_capitalized() {
        assert_eq!(serde_json::to_string(&RiskLevel::Medium).unwrap(), "\"Medium\"");
        assert_eq!(serde_json::to_string(&FeaturePath::Vitals).unwrap(), "\"vitals\"");
    }
}
