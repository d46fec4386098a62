//! Error types for the inference engine

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the artifact bundle.
///
/// These are startup failures: an engine is never built from a bundle that
/// produced one of these.
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// A required artifact file does not exist
    #[error("Required artifact not found: {}", .0.display())]
    Missing(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON artifact
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Artifact parsed but violates a structural invariant
    #[error("Invalid artifact: {0}")]
    Invalid(String),
}

/// Engine configuration rejected at startup
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid engine configuration: {0}")]
    Invalid(String),
}

/// Errors raised by a classifier at prediction time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// Feature vector length differs from the trained input dimension
    #[error("Feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Capability was requested that the classifier did not declare
    #[error("Classifier does not support {0}")]
    Capability(&'static str),

    /// Model evaluation failed
    #[error("Model evaluation failed: {0}")]
    Evaluation(String),
}

/// Coarse classification used by callers to map errors onto responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller supplied a bad request; never retried
    Validation,
    /// Model artifacts are not loaded
    Unavailable,
    /// Internal fault; details are logged, not surfaced
    Internal,
}

/// Request-time errors of the inference engine
#[derive(Error, Debug)]
pub enum InferenceError {
    /// Malformed or out-of-range request
    #[error("{0}")]
    Validation(String),

    /// Neither the symptom path nor the vitals path carries usable signal
    #[error("{0}")]
    NoUsableSignal(String),

    /// Artifact bundle is not loaded
    #[error("Model not loaded: {0}")]
    ArtifactUnavailable(String),

    /// One entry of a batch failed
    #[error("Prediction {index}: {source}")]
    BatchEntry {
        index: usize,
        #[source]
        source: Box<InferenceError>,
    },

    /// Any other internal fault
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl InferenceError {
    /// Error class used to pick a response status
    pub fn kind(&self) -> ErrorKind {
        match self {
            InferenceError::Validation(_) | InferenceError::NoUsableSignal(_) => {
                ErrorKind::Validation
            }
            InferenceError::ArtifactUnavailable(_) => ErrorKind::Unavailable,
            InferenceError::BatchEntry { source, .. } => source.kind(),
            InferenceError::Unexpected(_) => ErrorKind::Internal,
        }
    }

    /// Wrap an error with the index of the batch entry that produced it
    pub fn at_index(self, index: usize) -> Self {
        InferenceError::BatchEntry {
            index,
            source: Box::new(self),
        }
    }
}

impl From<ClassifierError> for InferenceError {
    fn from(err: ClassifierError) -> Self {
        InferenceError::Unexpected(err.to_string())
    }
}

/// Result type for inference operations
pub type Result<T> = std::result::Result<T, InferenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_entry_inherits_kind() {
        let err = InferenceError::NoUsableSignal("nothing".into()).at_index(2);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "Prediction 2: nothing");

        let err = InferenceError::Unexpected("boom".into()).at_index(0);
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn classifier_errors_are_internal() {
        let err: InferenceError = ClassifierError::DimensionMismatch {
            expected: 7,
            actual: 3,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
