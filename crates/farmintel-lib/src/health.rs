//! Health reporting for the prediction service
//!
//! The service answers `/health` as long as it is running; per-component
//! detail says which models can actually serve.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Liveness value reported while the process serves requests
pub const SERVICE_HEALTHY: &str = "healthy";

/// State of one model component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Ready,
    Unavailable,
}

impl ComponentStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ComponentStatus::Ready)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn ready(message: Option<String>) -> Self {
        Self {
            status: ComponentStatus::Ready,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Unavailable,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub crop_model_loaded: bool,
    pub price_models_loaded: bool,
    /// Crops with a loaded price model, sorted
    pub price_models: Vec<String>,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthResponse {
    pub fn new(components: BTreeMap<String, ComponentHealth>, price_models: Vec<String>) -> Self {
        let ready = |name: &str| {
            components
                .get(name)
                .map(|c| c.status.is_ready())
                .unwrap_or(false)
        };
        Self {
            status: SERVICE_HEALTHY.to_string(),
            crop_model_loaded: ready(components::CROP_RECOMMENDER),
            price_models_loaded: ready(components::PRICE_MODELS),
            price_models,
            components,
        }
    }
}

/// Component names for health tracking
pub mod components {
    pub const CROP_RECOMMENDER: &str = "crop_recommender";
    pub const PRICE_MODELS: &str = "price_models";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_healthy_even_when_unavailable() {
        let mut map = BTreeMap::new();
        map.insert(
            components::CROP_RECOMMENDER.to_string(),
            ComponentHealth::unavailable("dataset missing"),
        );
        map.insert(components::PRICE_MODELS.to_string(), ComponentHealth::ready(None));

        let health = HealthResponse::new(map, vec!["wheat".into()]);
        assert_eq!(health.status, "healthy");
        assert!(!health.crop_model_loaded);
        assert!(health.price_models_loaded);
    }

    #[test]
    fn test_missing_component_is_not_loaded() {
        let health = HealthResponse::new(BTreeMap::new(), vec![]);
        assert!(!health.crop_model_loaded);
        assert!(!health.price_models_loaded);
    }

    #[test]
    fn test_serialization_shape() {
        let mut map = BTreeMap::new();
        map.insert(components::PRICE_MODELS.to_string(), ComponentHealth::unavailable("none"));
        let value = serde_json::to_value(HealthResponse::new(map, vec![])).unwrap();

        assert_eq!(value["status"], "healthy");
        assert_eq!(value["components"]["price_models"]["status"], "unavailable");
        assert_eq!(value["components"]["price_models"]["message"], "none");
        assert_eq!(value["price_models"], serde_json::json!([]));
    }
}
