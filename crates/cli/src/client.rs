//! API client for communicating with the FarmIntel prediction service

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

/// Non-success answer from the service
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },
}

impl ClientError {
    pub fn status(&self) -> StatusCode {
        match self {
            ClientError::Api { status, .. } => *status,
        }
    }
}

/// API client for the prediction service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Service errors carry {"error": "..."}; fall back to the raw body
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(ClientError::Api { status, message }.into());
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn recommend_crop(&self, request: &CropRequest) -> Result<CropPrediction> {
        self.post("predict", request).await
    }

    pub async fn predict_price(&self, request: &PriceRequest) -> Result<PricePrediction> {
        self.post("predict_price", request).await
    }

    pub async fn health(&self) -> Result<HealthReport> {
        self.get("health").await
    }
}

// API request and response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropRequest {
    #[serde(rename = "N")]
    pub n: f64,
    #[serde(rename = "P")]
    pub p: f64,
    #[serde(rename = "K")]
    pub k: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub rainfall: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRequest {
    #[serde(rename = "plantType")]
    pub plant_type: String,
    pub year: i32,
    pub month: u32,
    pub rainfall: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropPrediction {
    pub predicted_crop: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePrediction {
    pub predicted_price: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub crop_model_loaded: bool,
    pub price_models_loaded: bool,
    #[serde(default)]
    pub price_models: Vec<String>,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_recommend_crop_posts_feature_names() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predict")
            .match_body(Matcher::PartialJson(json!({"N": 90.0, "ph": 6.5})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"predicted_crop":"rice"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let request = CropRequest {
            n: 90.0,
            p: 42.0,
            k: 43.0,
            temperature: 20.8,
            humidity: 82.0,
            ph: 6.5,
            rainfall: 202.9,
        };
        let prediction = client.recommend_crop(&request).await.unwrap();

        assert_eq!(prediction.predicted_crop, "rice");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_predict_price_sends_plant_type() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predict_price")
            .match_body(Matcher::PartialJson(json!({"plantType": "Wheat", "month": 6})))
            .with_status(200)
            .with_body(r#"{"predicted_price":2150.5,"currency":"WPI"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let request = PriceRequest {
            plant_type: "Wheat".into(),
            year: 2023,
            month: 6,
            rainfall: 120.0,
        };
        let prediction = client.predict_price(&request).await.unwrap();

        assert_eq!(prediction.predicted_price, 2150.5);
        assert_eq!(prediction.currency, "WPI");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict_price")
            .with_status(404)
            .with_body(r#"{"error":"No model for crop: Mango"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let request = PriceRequest {
            plant_type: "Mango".into(),
            year: 2023,
            month: 6,
            rainfall: 120.0,
        };
        let err = client.predict_price(&request).await.unwrap_err();
        let api_err = err.downcast_ref::<ClientError>().unwrap();

        assert_eq!(api_err.status(), StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("No model for crop: Mango"));
    }

    #[tokio::test]
    async fn test_non_json_error_body_kept_raw() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.health().await.unwrap_err();
        assert!(err.to_string().contains("bad gateway"));
    }

    #[tokio::test]
    async fn test_health_parses_components() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(
                json!({
                    "status": "healthy",
                    "crop_model_loaded": true,
                    "price_models_loaded": false,
                    "price_models": [],
                    "components": {
                        "price_models": {"status": "unavailable", "message": "no price models loaded", "last_check_timestamp": 0}
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health = client.health().await.unwrap();
        assert!(health.crop_model_loaded);
        assert_eq!(health.components["price_models"].status, "unavailable");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
