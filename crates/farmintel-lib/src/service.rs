//! Prediction service
//!
//! Owns the crop recommender and the price artifact store. Each component
//! is independently ready or unavailable; a failed component answers its
//! requests with [`ServiceError::ServiceUnavailable`] while the rest keep
//! serving. Everything here is read-only after [`PredictionService::initialize`].

use crate::artifact::{manifest_file_name, ArtifactStore};
use crate::error::{ServiceError, ServiceResult};
use crate::health::{components, ComponentHealth, HealthResponse};
use crate::models::{CropPrediction, PricePrediction};
use crate::observability::StructuredLogger;
use crate::recommender::{CropRecommender, RecommenderSettings};
use crate::validation;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{error, warn};

/// A model component that either loaded or carries the reason it did not
#[derive(Debug)]
pub enum Component<T> {
    Ready(T),
    Unavailable { reason: String },
}

impl<T> Component<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Component::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Component::Ready(_))
    }

    pub fn as_ready(&self) -> Option<&T> {
        match self {
            Component::Ready(value) => Some(value),
            Component::Unavailable { .. } => None,
        }
    }

    fn get(&self, name: &'static str) -> ServiceResult<&T> {
        match self {
            Component::Ready(value) => Ok(value),
            Component::Unavailable { reason } => Err(ServiceError::ServiceUnavailable {
                component: name,
                reason: reason.clone(),
            }),
        }
    }
}

/// Startup inputs for both components
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub recommender: RecommenderSettings,
    /// Base directory for relative price manifest paths
    pub price_model_dir: PathBuf,
    /// Crop display name to manifest path
    pub price_model_files: BTreeMap<String, PathBuf>,
}

impl ServiceSettings {
    /// Map each crop to its conventional `<crop>_price_model.json` file
    pub fn price_files_for<S: AsRef<str>>(crops: &[S]) -> BTreeMap<String, PathBuf> {
        crops
            .iter()
            .map(|c| c.as_ref().trim())
            .filter(|c| !c.is_empty())
            .map(|c| (c.to_string(), PathBuf::from(manifest_file_name(c))))
            .collect()
    }
}

pub struct PredictionService {
    recommender: Component<CropRecommender>,
    price_models: Component<ArtifactStore>,
}

impl PredictionService {
    /// Load every component, degrading failures instead of returning them
    pub fn initialize(settings: &ServiceSettings) -> Self {
        let logger = StructuredLogger::new("farmintel");

        let recommender = match CropRecommender::setup(&settings.recommender) {
            Ok(recommender) => {
                logger.log_artifact(
                    components::CROP_RECOMMENDER,
                    recommender.classifier_kind(),
                    true,
                    &settings.recommender.dataset_path.display().to_string(),
                );
                if let Some(report) = recommender.report() {
                    logger.log_evaluation(report);
                }
                Component::Ready(recommender)
            }
            Err(e) => {
                error!(error = %e, "Crop recommendation model unavailable");
                logger.log_artifact(components::CROP_RECOMMENDER, "classifier", false, &e.to_string());
                Component::unavailable(e.to_string())
            }
        };

        let store = ArtifactStore::load(&settings.price_model_dir, &settings.price_model_files);
        for crop in store.crops() {
            if let Ok(artifact) = store.lookup(&crop) {
                logger.log_artifact(
                    &crop,
                    artifact.predictor_kind(),
                    true,
                    &artifact.source().display().to_string(),
                );
            }
        }

        Self::new(recommender, Self::price_component(store))
    }

    pub fn new(recommender: Component<CropRecommender>, price_models: Component<ArtifactStore>) -> Self {
        Self {
            recommender,
            price_models,
        }
    }

    /// An empty store cannot serve any crop, so it counts as unavailable
    pub fn price_component(store: ArtifactStore) -> Component<ArtifactStore> {
        if store.is_empty() {
            warn!("No price models loaded");
            Component::unavailable("no price models loaded")
        } else {
            Component::Ready(store)
        }
    }

    /// Recommend a crop for a raw request body
    ///
    /// Every training feature must be present and numeric; extra keys are
    /// ignored.
    pub fn predict_crop(&self, body: &Value) -> ServiceResult<CropPrediction> {
        let recommender = self.recommender.get("Crop recommendation model")?;
        let body = validation::as_object(body)?;
        let record = validation::require_features(body, recommender.feature_order())?;

        let predicted_crop = recommender
            .recommend(&record)
            .map_err(|e| prediction_failed("crop", e))?;
        Ok(CropPrediction { predicted_crop })
    }

    /// Predict the price of `crop_name` from a raw body holding
    /// `year`, `month` and `rainfall`
    pub fn predict_price(&self, crop_name: &str, body: &Value) -> ServiceResult<f64> {
        let store = self.price_models.get("Price prediction models")?;
        let artifact = store.lookup(crop_name)?;
        let record = validation::price_inputs(validation::as_object(body)?)?;

        artifact
            .predict(&record)
            .map_err(|e| prediction_failed(artifact.crop(), e))
    }

    /// Full `/predict_price` request: crop name taken from `plantType`
    pub fn handle_price_request(&self, body: &Value) -> ServiceResult<PricePrediction> {
        self.price_models.get("Price prediction models")?;
        let crop = validation::plant_type(validation::as_object(body)?)?;
        let price = self.predict_price(&crop, body)?;
        Ok(PricePrediction::wpi(price))
    }

    pub fn crop_model_loaded(&self) -> bool {
        self.recommender.is_ready()
    }

    pub fn price_models_loaded(&self) -> bool {
        self.price_models.is_ready()
    }

    pub fn recommender(&self) -> Option<&CropRecommender> {
        self.recommender.as_ready()
    }

    /// Crops with a loaded price model, sorted
    pub fn price_crops(&self) -> Vec<String> {
        self.price_models
            .as_ready()
            .map(ArtifactStore::crops)
            .unwrap_or_default()
    }

    pub fn health(&self) -> HealthResponse {
        let mut map = BTreeMap::new();
        map.insert(
            components::CROP_RECOMMENDER.to_string(),
            match &self.recommender {
                Component::Ready(r) => ComponentHealth::ready(Some(format!(
                    "{} classifier, {} classes",
                    r.classifier_kind(),
                    r.classes().len()
                ))),
                Component::Unavailable { reason } => ComponentHealth::unavailable(reason.clone()),
            },
        );
        map.insert(
            components::PRICE_MODELS.to_string(),
            match &self.price_models {
                Component::Ready(store) => {
                    ComponentHealth::ready(Some(format!("{} crops", store.len())))
                }
                Component::Unavailable { reason } => ComponentHealth::unavailable(reason.clone()),
            },
        );
        HealthResponse::new(map, self.price_crops())
    }
}

fn prediction_failed(subject: &str, e: anyhow::Error) -> ServiceError {
    let detail = format!("{:#}", e);
    error!(subject = %subject, error = %detail, "Prediction failed");
    ServiceError::PredictionFailed(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Artifact;
    use crate::error::ValidationError;
    use crate::predictor::LinearModel;
    use crate::testing::crop_csv;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn recommender() -> CropRecommender {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(crop_csv().as_bytes()).unwrap();
        CropRecommender::setup(&RecommenderSettings::new(file.path())).unwrap()
    }

    /// price = 100 + 2*year + 10*month + 0.5*rainfall, with an `msp` column
    /// the requests never provide
    fn wheat_store() -> ArtifactStore {
        let schema = ["year", "month", "rainfall", "msp"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let model = LinearModel::new(100.0, vec![2.0, 10.0, 0.5, 1.0]);
        let mut store = ArtifactStore::new();
        store.insert(Artifact::new("Wheat", schema, Box::new(model)).unwrap());
        store
    }

    fn service() -> PredictionService {
        PredictionService::new(Component::Ready(recommender()), Component::Ready(wheat_store()))
    }

    fn rice_body() -> Value {
        json!({"N": 90, "P": 42, "K": 43, "temperature": 20.8, "humidity": 82.0, "ph": 6.5, "rainfall": 202.9})
    }

    #[test]
    fn test_predict_crop() {
        let prediction = service().predict_crop(&rice_body()).unwrap();
        assert_eq!(prediction.predicted_crop, "rice");
    }

    #[test]
    fn test_predict_crop_accepts_numeric_strings_and_extra_keys() {
        let mut body = rice_body();
        body["N"] = json!("90");
        body["farmer"] = json!("asha");
        assert_eq!(service().predict_crop(&body).unwrap().predicted_crop, "rice");
    }

    #[test]
    fn test_predict_crop_missing_feature() {
        let mut body = rice_body();
        body.as_object_mut().unwrap().remove("K");
        let err = service().predict_crop(&body).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::MissingFeature(ref name)) if name == "K"
        ));
    }

    #[test]
    fn test_predict_crop_non_numeric_feature() {
        let mut body = rice_body();
        body["ph"] = json!("acidic");
        let err = service().predict_crop(&body).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::InvalidFeatureType(_))
        ));
    }

    #[test]
    fn test_predict_crop_unavailable() {
        let service = PredictionService::new(
            Component::unavailable("dataset file not found"),
            Component::Ready(wheat_store()),
        );
        let err = service.predict_crop(&rice_body()).unwrap_err();
        assert!(matches!(err, ServiceError::ServiceUnavailable { .. }));
        assert!(!service.crop_model_loaded());
        assert!(service.price_models_loaded());
    }

    #[test]
    fn test_predict_price_fills_missing_schema_columns() {
        let body = json!({"year": 2023, "month": 6, "rainfall": 120.0});
        let price = service().predict_price("Wheat", &body).unwrap();
        // msp absent, filled with 0
        assert_eq!(price, 100.0 + 2.0 * 2023.0 + 60.0 + 60.0);
    }

    #[test]
    fn test_predict_price_case_insensitive() {
        let body = json!({"year": 2023, "month": 6, "rainfall": 120.0});
        let service = service();
        let upper = service.predict_price("WHEAT", &body).unwrap();
        let lower = service.predict_price("wheat", &body).unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_predict_price_unknown_crop() {
        let body = json!({"year": 2023, "month": 6, "rainfall": 120.0});
        let err = service().predict_price("Mango", &body).unwrap_err();
        assert!(matches!(err, ServiceError::ModelNotFound(ref c) if c == "Mango"));
        assert_eq!(err.to_string(), "No model for crop: Mango");
    }

    #[test]
    fn test_predict_price_non_finite_output_fails() {
        let schema = ["year", "month", "rainfall"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let model = LinearModel::new(0.0, vec![1.0, 1.0, 10.0]);
        let mut store = ArtifactStore::new();
        store.insert(Artifact::new("Rice", schema, Box::new(model)).unwrap());
        let service = PredictionService::new(Component::Ready(recommender()), Component::Ready(store));

        let body = json!({"year": 2023, "month": 6, "rainfall": 1e308});
        let err = service.predict_price("Rice", &body).unwrap_err();
        assert!(matches!(err, ServiceError::PredictionFailed(ref detail) if detail.contains("non-finite")));
    }

    #[test]
    fn test_predict_crop_extreme_input_fails() {
        let mut body = rice_body();
        body["N"] = json!(1e100);
        let err = service().predict_crop(&body).unwrap_err();
        assert!(matches!(err, ServiceError::PredictionFailed(_)));
    }

    #[test]
    fn test_handle_price_request() {
        let body = json!({"plantType": "wheat", "year": 2023, "month": 6, "rainfall": 120.0});
        let prediction = service().handle_price_request(&body).unwrap();
        assert_eq!(prediction.currency, "WPI");
        assert!(prediction.predicted_price > 0.0);
    }

    #[test]
    fn test_handle_price_request_missing_parameter() {
        let body = json!({"plantType": "Wheat", "year": 2023, "month": 6});
        let err = service().handle_price_request(&body).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::MissingParameter(ref p)) if p == "rainfall"
        ));
    }

    #[test]
    fn test_handle_price_request_checks_availability_first() {
        let service = PredictionService::new(
            Component::Ready(recommender()),
            PredictionService::price_component(ArtifactStore::new()),
        );
        let err = service.handle_price_request(&json!({})).unwrap_err();
        assert!(matches!(err, ServiceError::ServiceUnavailable { .. }));
    }

    #[test]
    fn test_health_reports_components() {
        let service = PredictionService::new(
            Component::Ready(recommender()),
            PredictionService::price_component(ArtifactStore::new()),
        );
        let health = service.health();
        assert_eq!(health.status, "healthy");
        assert!(health.crop_model_loaded);
        assert!(!health.price_models_loaded);
        assert!(health.price_models.is_empty());
        assert!(health.components[components::PRICE_MODELS].message.is_some());
    }

    #[test]
    fn test_initialize_degrades_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ServiceSettings {
            recommender: RecommenderSettings::new(dir.path().join("missing.csv")),
            price_model_dir: dir.path().to_path_buf(),
            price_model_files: ServiceSettings::price_files_for(&["Wheat", "Cotton"]),
        };
        let service = PredictionService::initialize(&settings);
        assert!(!service.crop_model_loaded());
        assert!(!service.price_models_loaded());
        assert_eq!(service.health().status, "healthy");
    }

    #[test]
    fn test_price_files_for() {
        let files = ServiceSettings::price_files_for(&["Wheat", " ", "Sugarcane"]);
        assert_eq!(files.len(), 2);
        assert_eq!(files["Wheat"], PathBuf::from("wheat_price_model.json"));
    }
}
