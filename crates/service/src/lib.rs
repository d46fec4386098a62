//! MediPredict HTTP service
//!
//! Configuration loading, artifact bootstrap and the axum router around
//! [`medipredict_inference::InferenceEngine`].

pub mod config;
pub mod server;

use std::sync::Arc;

use medipredict_inference::{ArtifactBundle, ArtifactError, InferenceEngine};
use tracing::info;

pub use config::{ConfigError, ConfigManager, ServiceConfig};
pub use server::{build_router, start_server, AppState, SharedState};

/// Load the artifact bundle named by `config` and build the engine over it
pub fn load_engine(config: &ServiceConfig) -> Result<InferenceEngine, ArtifactError> {
    let paths = config.artifact_paths();
    info!("Loading model artifacts from {}", paths.model.display());
    let bundle = ArtifactBundle::load(&paths)?;
    Ok(InferenceEngine::new(Arc::new(bundle), config.engine.clone()))
}
