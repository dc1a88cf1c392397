//! HTTP API for predictions, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use farmintel_lib::{
    error::ServiceError,
    models::ErrorBody,
    observability::{ServiceMetrics, StructuredLogger, CROP_MODEL_LABEL, PRICE_MODEL_LABEL},
    service::PredictionService,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared application state
pub struct AppState {
    pub service: PredictionService,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(service: PredictionService, metrics: ServiceMetrics, logger: StructuredLogger) -> Self {
        Self {
            service,
            metrics,
            logger,
        }
    }
}

/// Request failure rendered as `{"error": ...}`
#[derive(Debug)]
pub enum ApiError {
    /// Body was not JSON at all
    MalformedBody(String),
    Service(ServiceError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(ServiceError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Service(ServiceError::ModelNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Service(ServiceError::ServiceUnavailable { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Service(ServiceError::PredictionFailed(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Metric label for the error category
    fn kind(&self) -> &'static str {
        match self {
            ApiError::MalformedBody(_) => "malformed",
            ApiError::Service(ServiceError::Validation(_)) => "validation",
            ApiError::Service(ServiceError::ModelNotFound(_)) => "not_found",
            ApiError::Service(ServiceError::ServiceUnavailable { .. }) => "unavailable",
            ApiError::Service(ServiceError::PredictionFailed(_)) => "internal",
        }
    }

    /// Client-facing text; internal detail stays in the logs
    fn message(&self) -> String {
        match self {
            ApiError::MalformedBody(detail) => format!("Invalid JSON body: {}", detail),
            ApiError::Service(ServiceError::ServiceUnavailable { component, .. }) => {
                format!("{} not available", component)
            }
            ApiError::Service(ServiceError::PredictionFailed(_)) => "Prediction failed".to_string(),
            ApiError::Service(e) => e.to_string(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError::Service(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody { error: self.message() })).into_response()
    }
}

/// Run one prediction, recording latency, counters and a log event
async fn observed<T, F>(state: &AppState, model: &'static str, subject: F) -> Result<Json<T>, ApiError>
where
    F: Future<Output = Result<(T, String), ApiError>>,
{
    let start = Instant::now();
    let outcome = subject.await;
    let elapsed = start.elapsed();
    state
        .metrics
        .observe_prediction_latency(model, elapsed.as_secs_f64());

    match outcome {
        Ok((body, summary)) => {
            state.metrics.inc_predictions_served(model);
            state
                .logger
                .log_prediction(model, &summary, "ok", elapsed.as_micros());
            Ok(Json(body))
        }
        Err(e) => {
            state.metrics.inc_prediction_errors(model, e.kind());
            let detail = match &e {
                ApiError::Service(inner) => inner.to_string(),
                ApiError::MalformedBody(_) => e.message(),
            };
            state.logger.log_prediction_failure(model, e.kind(), &detail);
            Err(e)
        }
    }
}

/// Service banner listing the endpoints
async fn index() -> impl IntoResponse {
    Json(json!({
        "message": "FarmIntel API is running",
        "version": SERVICE_VERSION,
        "endpoints": {
            "health": "/health",
            "predict_crop": "/predict",
            "predict_price": "/predict_price",
            "metrics": "/metrics"
        }
    }))
}

/// Always 200 while the process runs; component detail in the body
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.service.health()))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    observed(&state, CROP_MODEL_LABEL, async {
        let Json(body) = payload?;
        let prediction = state.service.predict_crop(&body)?;
        let summary = prediction.predicted_crop.clone();
        Ok::<_, ApiError>((prediction, summary))
    })
    .await
}

async fn predict_price(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    observed(&state, PRICE_MODEL_LABEL, async {
        let Json(body) = payload?;
        let prediction = state.service.handle_price_request(&body)?;
        let summary = body
            .get("plantType")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok::<_, ApiError>((prediction, summary))
    })
    .await
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {}", e),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/predict_price", post(predict_price))
        .route("/metrics", get(metrics))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Start the API server, stopping when `shutdown` resolves
pub async fn serve<S>(addr: &str, state: Arc<AppState>, shutdown: S) -> anyhow::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
