//! Core data models for the prediction service

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Input features of the crop recommendation model, in training order
pub const CROP_FEATURES: [&str; 7] = ["N", "P", "K", "temperature", "humidity", "ph", "rainfall"];

/// Class column of the crop recommendation dataset
pub const CROP_LABEL_COLUMN: &str = "label";

/// Unit reported alongside every price prediction (wholesale price index)
pub const PRICE_CURRENCY: &str = "WPI";

/// Per-request mapping from feature name to numeric value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecord(BTreeMap<String, f64>);

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate features in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FeatureRecord {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Body of a successful `/predict` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropPrediction {
    pub predicted_crop: String,
}

/// Body of a successful `/predict_price` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePrediction {
    pub predicted_price: f64,
    pub currency: String,
}

impl PricePrediction {
    pub fn wpi(predicted_price: f64) -> Self {
        Self {
            predicted_price,
            currency: PRICE_CURRENCY.to_string(),
        }
    }
}

/// Error body shared by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
