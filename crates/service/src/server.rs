use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use medipredict_inference::response::timestamp;
use medipredict_inference::{
    BatchPrediction, ErrorKind, Explanation, FeatureImportanceReport, InferenceEngine,
    InferenceError, InputValidator, ModelInfo, PredictionRequest, PredictionResult,
    ValidationReport, VERSION,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServiceConfig;

const SERVICE_NAME: &str = "MediPredict Disease Prediction API";

#[derive(Clone)]
pub struct AppState {
    /// `None` while serving degraded after a failed artifact load
    pub engine: Option<Arc<InferenceEngine>>,
    pub validator: InputValidator,
    pub cors: bool,
    pub max_body_bytes: usize,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(engine: Option<Arc<InferenceEngine>>, config: &ServiceConfig) -> Self {
        Self {
            engine,
            validator: InputValidator::new(config.engine.max_symptoms, config.engine.max_batch),
            cors: config.cors,
            max_body_bytes: config.max_body_bytes,
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.engine.is_some()
    }

    fn require_engine(&self) -> Result<&InferenceEngine, InferenceError> {
        self.engine.as_deref().ok_or_else(|| {
            InferenceError::ArtifactUnavailable(
                "model artifacts failed to load at startup".to_string(),
            )
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    pub model_loaded: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub predictions: Vec<PredictionRequest>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub message: String,
    #[serde(flatten)]
    pub report: ValidationReport,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
    kind: &'static str,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, kind: &'static str, message: S) -> Self {
        Self {
            status,
            message: message.into(),
            kind,
        }
    }

    fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    fn method_not_allowed() -> Self {
        Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "Method not allowed",
        )
    }

    fn service_unavailable<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "model_unavailable", message)
    }

    /// Opaque to the caller; the detail only reaches the log
    fn internal(detail: impl std::fmt::Display) -> Self {
        error!("Request failed: {}", detail);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_error",
            "Internal server error",
        )
    }
}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        match err.kind() {
            ErrorKind::Validation => Self::bad_request(err.to_string()),
            ErrorKind::Unavailable => Self::service_unavailable(err.to_string()),
            ErrorKind::Internal => Self::internal(err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => Self::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                rejection.body_text(),
            ),
            _ => Self::bad_request(rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let payload = Json(ErrorResponse {
            error: self.message,
            kind: self.kind.to_string(),
        });
        (self.status, payload).into_response()
    }
}

pub async fn start_server(state: AppState, addr: &str) -> Result<()> {
    let shared = Arc::new(state);
    let app = build_router(shared);
    let listener = bind_listener(addr).await?;
    info!("MediPredict API listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind HTTP listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind HTTP listener on {addr}"))
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", err);
        return;
    }
    info!("Shutdown signal received, draining connections");
}

pub fn build_router(state: SharedState) -> Router {
    let mut router = Router::new()
        .route("/health", get(handle_health).fallback(handle_method_not_allowed))
        .route("/predict", post(handle_predict).fallback(handle_method_not_allowed))
        .route(
            "/predict-batch",
            post(handle_predict_batch).fallback(handle_method_not_allowed),
        )
        .route(
            "/feature-importance",
            get(handle_feature_importance).fallback(handle_method_not_allowed),
        )
        .route("/model-info", get(handle_model_info).fallback(handle_method_not_allowed))
        .route("/explain", post(handle_explain).fallback(handle_method_not_allowed))
        .route("/validate", post(handle_validate).fallback(handle_method_not_allowed))
        .fallback(handle_not_found)
        // oversized bodies surface as a JSON rejection in the extractors
        .layer(DefaultBodyLimit::max(state.max_body_bytes));

    if state.cors {
        router = router.layer(CorsLayer::permissive());
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn handle_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: VERSION.to_string(),
        timestamp: timestamp(),
        model_loaded: state.model_loaded(),
    })
}

async fn handle_predict(
    State(state): State<SharedState>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(request) = payload?;
    let engine = state.require_engine()?;
    Ok(Json(engine.predict(&request)?))
}

async fn handle_predict_batch(
    State(state): State<SharedState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchPrediction>, ApiError> {
    let Json(batch) = payload?;
    let engine = state.require_engine()?;
    Ok(Json(engine.predict_batch(&batch.predictions)?))
}

async fn handle_feature_importance(
    State(state): State<SharedState>,
) -> Result<Json<FeatureImportanceReport>, ApiError> {
    let engine = state.require_engine()?;
    Ok(Json(engine.feature_importance()))
}

async fn handle_model_info(State(state): State<SharedState>) -> Result<Json<ModelInfo>, ApiError> {
    let engine = state.require_engine()?;
    Ok(Json(engine.model_info()))
}

async fn handle_explain(
    State(state): State<SharedState>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<Explanation>, ApiError> {
    let Json(request) = payload?;
    let engine = state.require_engine()?;
    Ok(Json(engine.explain(&request)?))
}

async fn handle_validate(
    State(state): State<SharedState>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let Json(request) = payload?;
    let report = state.validator.validate(&request)?;
    Ok(Json(ValidateResponse {
        valid: true,
        message: "Input data is valid".to_string(),
        report,
    }))
}

async fn handle_not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Endpoint not found: {}", uri.path()))
}

async fn handle_method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}
