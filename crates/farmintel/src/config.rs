//! Server configuration

use anyhow::{Context, Result};
use farmintel_lib::recommender::{RecommenderSettings, DEFAULT_TEST_FRACTION};
use farmintel_lib::service::ServiceSettings;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Optional config file looked up next to the working directory
/// (`farmintel.toml`, `farmintel.yaml`, `farmintel.json`, ...)
pub const CONFIG_FILE_STEM: &str = "farmintel";

const ENV_PREFIX: &str = "FARMINTEL";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// Falls back to the bare `PORT` variable when unset
    #[serde(default = "default_port")]
    pub port: u16,

    /// Labelled crop dataset
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,

    /// Exported crop classifier; the built-in model is trained when unset
    #[serde(default)]
    pub crop_model_path: Option<PathBuf>,

    /// Directory holding `<crop>_price_model.json` manifests
    #[serde(default = "default_price_model_dir")]
    pub price_model_dir: PathBuf,

    #[serde(default = "default_price_crops")]
    pub price_crops: Vec<String>,

    /// Share of each crop class held out for evaluation
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("Crop_recommendation.csv")
}

fn default_price_model_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_price_crops() -> Vec<String> {
    ["Wheat", "Cotton", "Sugarcane", "Bajra", "Jowar"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_test_fraction() -> f64 {
    DEFAULT_TEST_FRACTION
}

impl ServerConfig {
    /// Load configuration from the config file and process environment
    pub fn load() -> Result<Self> {
        Self::from_sources(Some(CONFIG_FILE_STEM), std::env::vars().collect())
    }

    /// Build from an optional config file and an explicit variable map
    ///
    /// `FARMINTEL_*` variables override file values.
    pub fn from_sources(file: Option<&str>, vars: HashMap<String, String>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(port) = vars.get("PORT") {
            builder = builder.set_default("port", port.as_str())?;
        }
        if let Some(file) = file {
            builder = builder.add_source(config::File::with_name(file).required(false));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("price_crops")
                    .source(Some(vars)),
            )
            .build()
            .context("Failed to read configuration")?;

        let config: ServerConfig = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            anyhow::bail!(
                "test_fraction must be between 0 and 1 (exclusive), got {}",
                self.test_fraction
            );
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            recommender: RecommenderSettings {
                dataset_path: self.dataset_path.clone(),
                classifier_path: self.crop_model_path.clone(),
                test_fraction: self.test_fraction,
            },
            price_model_dir: self.price_model_dir.clone(),
            price_model_files: ServiceSettings::price_files_for(&self.price_crops),
        }
    }
}
