use std::path::PathBuf;

use medipredict_inference::{ArtifactError, PredictionRequest, RiskLevel};
use medipredict_service::{load_engine, ServiceConfig};

fn shipped_models() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models")
}

#[test]
fn shipped_artifacts_load() {
    let config = ServiceConfig {
        model_dir: shipped_models(),
        ..ServiceConfig::default()
    };
    let engine = load_engine(&config).unwrap();

    let info = engine.model_info();
    assert_eq!(info.model_type, "RandomForestClassifier");
    assert_eq!(info.feature_count, 7);
    assert_eq!(info.vocabulary_size, 0);

    // high glucose and normal pressure land in the Diabetes leaves of both trees
    let request = PredictionRequest::from_vitals([58.0, 0.0, 92.0, 130.0, 85.0, 190.0, 210.0]);
    let result = engine.predict(&request).unwrap();
    assert_eq!(result.predicted_disease, "Diabetes");
    assert_eq!(result.risk_level, RiskLevel::Medium);
}

#[test]
fn missing_model_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig {
        model_dir: dir.path().to_path_buf(),
        ..ServiceConfig::default()
    };
    assert!(matches!(load_engine(&config), Err(ArtifactError::Missing(_))));
}
