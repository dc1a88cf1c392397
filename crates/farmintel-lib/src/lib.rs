//! FarmIntel prediction core
//!
//! Crop recommendation and per-crop price prediction behind a single
//! [`PredictionService`]. Every model input is aligned to the exact
//! feature schema the model was fitted on before it is scored.

pub mod artifact;
pub mod dataset;
pub mod error;
pub mod frame;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod preprocess;
pub mod recommender;
pub mod service;
pub mod validation;

#[cfg(test)]
mod testing;

pub use artifact::{Artifact, ArtifactManifest, ArtifactStore, PredictorSpec};
pub use error::{ConfigurationError, ServiceError, ServiceResult, ValidationError};
pub use frame::{align, FeatureFrame};
pub use health::{ComponentHealth, ComponentStatus, HealthResponse};
pub use models::{CropPrediction, ErrorBody, FeatureRecord, PricePrediction};
pub use observability::{ServiceMetrics, StructuredLogger};
pub use recommender::{CropRecommender, RecommenderSettings};
pub use service::{Component, PredictionService, ServiceSettings};
