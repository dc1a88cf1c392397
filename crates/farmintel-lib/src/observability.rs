//! Observability for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, request and error counters, model state)
//! - Structured JSON logging events with tracing

use crate::predictor::ClassificationReport;
use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter_vec, register_int_gauge, Gauge,
    HistogramVec, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Latency buckets in seconds
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Label value for the crop recommendation model
pub const CROP_MODEL_LABEL: &str = "crop";
/// Label value for the price regressors
pub const PRICE_MODEL_LABEL: &str = "price";

static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: HistogramVec,
    predictions_served: IntCounterVec,
    prediction_errors: IntCounterVec,
    price_models_loaded: IntGauge,
    crop_model_ready: IntGauge,
    crop_model_accuracy: Gauge,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram_vec!(
                "farmintel_prediction_latency_seconds",
                "Time spent validating, aligning and scoring a prediction request",
                &["model"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_served: register_int_counter_vec!(
                "farmintel_predictions_served_total",
                "Predictions returned successfully",
                &["model"]
            )
            .expect("Failed to register predictions_served"),

            prediction_errors: register_int_counter_vec!(
                "farmintel_prediction_errors_total",
                "Prediction requests answered with an error",
                &["model", "kind"]
            )
            .expect("Failed to register prediction_errors"),

            price_models_loaded: register_int_gauge!(
                "farmintel_price_models_loaded",
                "Number of per-crop price models available"
            )
            .expect("Failed to register price_models_loaded"),

            crop_model_ready: register_int_gauge!(
                "farmintel_crop_model_ready",
                "1 when the crop recommendation model is ready"
            )
            .expect("Failed to register crop_model_ready"),

            crop_model_accuracy: register_gauge!(
                "farmintel_crop_model_accuracy",
                "Hold-out accuracy of the crop recommendation model"
            )
            .expect("Failed to register crop_model_accuracy"),
        }
    }
}

/// Handle to the process-wide metrics
///
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, model: &str, duration_secs: f64) {
        self.inner()
            .prediction_latency_seconds
            .with_label_values(&[model])
            .observe(duration_secs);
    }

    pub fn inc_predictions_served(&self, model: &str) {
        self.inner().predictions_served.with_label_values(&[model]).inc();
    }

    /// `kind` is the error category reported to the client
    pub fn inc_prediction_errors(&self, model: &str, kind: &str) {
        self.inner()
            .prediction_errors
            .with_label_values(&[model, kind])
            .inc();
    }

    pub fn set_price_models_loaded(&self, count: usize) {
        self.inner().price_models_loaded.set(count as i64);
    }

    pub fn set_crop_model_state(&self, ready: bool, accuracy: Option<f64>) {
        self.inner().crop_model_ready.set(ready as i64);
        self.inner().crop_model_accuracy.set(accuracy.unwrap_or(0.0));
    }

    pub fn predictions_served(&self, model: &str) -> u64 {
        self.inner().predictions_served.with_label_values(&[model]).get()
    }
}

/// Structured logger for service lifecycle and prediction events
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, address: &str) {
        info!(
            event = "service_started",
            service = %self.service_name,
            version = %version,
            address = %address,
            "Prediction service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Prediction service shutting down"
        );
    }

    /// Log the outcome of loading one model artifact
    pub fn log_artifact(&self, name: &str, kind: &str, loaded: bool, detail: &str) {
        if loaded {
            info!(
                event = "artifact_loaded",
                service = %self.service_name,
                artifact = %name,
                kind = %kind,
                detail = %detail,
                "Model artifact loaded"
            );
        } else {
            warn!(
                event = "artifact_unavailable",
                service = %self.service_name,
                artifact = %name,
                reason = %detail,
                "Model artifact unavailable"
            );
        }
    }

    pub fn log_evaluation(&self, report: &ClassificationReport) {
        let test_samples: usize = report.per_class.iter().map(|c| c.support).sum();
        info!(
            event = "classifier_evaluated",
            service = %self.service_name,
            accuracy = report.accuracy,
            macro_f1 = report.macro_f1,
            weighted_f1 = report.weighted_f1,
            macro_roc_auc = %format_score(report.macro_roc_auc),
            weighted_roc_auc = %format_score(report.weighted_roc_auc),
            test_samples = test_samples,
            "Crop classifier scored on hold-out split"
        );
    }

    pub fn log_prediction(&self, model: &str, subject: &str, outcome: &str, elapsed_us: u128) {
        info!(
            event = "prediction_served",
            service = %self.service_name,
            model = %model,
            subject = %subject,
            outcome = %outcome,
            elapsed_us = elapsed_us as u64,
            "Prediction served"
        );
    }

    pub fn log_prediction_failure(&self, model: &str, kind: &str, error: &str) {
        warn!(
            event = "prediction_failed",
            service = %self.service_name,
            model = %model,
            kind = %kind,
            error = %error,
            "Prediction request failed"
        );
    }
}

/// Four-decimal score, or `N/A` when the classifier could not provide one
pub fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| "N/A".to_string(), |v| format!("{:.4}", v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_metrics_shared_registry() {
        let metrics = ServiceMetrics::new();
        let clone = ServiceMetrics::new();

        let before = metrics.predictions_served(PRICE_MODEL_LABEL);
        clone.inc_predictions_served(PRICE_MODEL_LABEL);
        assert_eq!(metrics.predictions_served(PRICE_MODEL_LABEL), before + 1);

        metrics.observe_prediction_latency(CROP_MODEL_LABEL, 0.002);
        metrics.inc_prediction_errors(CROP_MODEL_LABEL, "validation");
        metrics.set_price_models_loaded(3);
        metrics.set_crop_model_state(true, Some(0.97));
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(Some(0.98765)), "0.9877");
        assert_eq!(format_score(None), "N/A");
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("farmintel");
        assert_eq!(logger.service_name, "farmintel");
        logger.log_prediction(CROP_MODEL_LABEL, "rice", "ok", 120);
    }
}
