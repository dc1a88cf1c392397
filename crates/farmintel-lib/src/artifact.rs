//! Persisted price-model artifacts
//!
//! An artifact pairs a fitted predictor with the ordered feature schema it
//! was trained on. Each crop has one JSON manifest on disk:
//!
//! ```json
//! {
//!   "schema": ["year", "month", "rainfall", "msp"],
//!   "predictor": { "type": "linear", "intercept": 1250.0, "coefficients": [2.1, 3.0, 0.4, 0.01] }
//! }
//! ```
//!
//! or a reference to an exported ONNX model next to it:
//!
//! ```json
//! {
//!   "schema": ["year", "month", "rainfall"],
//!   "predictor": { "type": "onnx", "path": "wheat_price_model.onnx", "sha256": "…" }
//! }
//! ```

use crate::error::{ConfigurationError, ServiceError};
use crate::frame::{align, DEFAULT_FILL};
use crate::models::FeatureRecord;
use crate::predictor::{LinearModel, OnnxPredictor, Predictor};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name convention for a crop's manifest
pub fn manifest_file_name(crop: &str) -> String {
    format!("{}_price_model.json", crop.trim().to_lowercase())
}

/// Predictor section of a manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PredictorSpec {
    Linear(LinearModel),
    Onnx {
        /// Relative paths resolve against the manifest's directory
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sha256: Option<String>,
    },
}

/// On-disk form of an [`Artifact`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub schema: Vec<String>,
    pub predictor: PredictorSpec,
}

impl ArtifactManifest {
    /// Write the manifest atomically (temp file, then rename)
    pub fn save(&self, path: &Path) -> Result<(), ConfigurationError> {
        let io_err = |source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        };
        let bytes = serde_json::to_vec_pretty(self).map_err(|e| ConfigurationError::CorruptArtifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        fs::rename(&temp_path, path).map_err(io_err)?;
        Ok(())
    }
}

/// Immutable bundle of a fitted predictor and its training schema
pub struct Artifact {
    crop: String,
    schema: Vec<String>,
    predictor: Box<dyn Predictor>,
    source: PathBuf,
    checksum: String,
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("crop", &self.crop)
            .field("schema", &self.schema)
            .field("predictor", &self.predictor.kind())
            .field("source", &self.source)
            .field("checksum", &self.checksum)
            .finish()
    }
}

impl Artifact {
    /// Pair a predictor with its schema after checking they agree
    pub fn new(
        crop: impl Into<String>,
        schema: Vec<String>,
        predictor: Box<dyn Predictor>,
    ) -> Result<Self, String> {
        validate_schema(&schema)?;
        if predictor.n_features() != schema.len() {
            return Err(format!(
                "predictor expects {} features but schema lists {}",
                predictor.n_features(),
                schema.len()
            ));
        }
        Ok(Self {
            crop: crop.into(),
            schema,
            predictor,
            source: PathBuf::new(),
            checksum: String::new(),
        })
    }

    /// Read, validate and materialize a manifest
    ///
    /// A missing file yields [`ConfigurationError::ArtifactNotFound`]; any
    /// other problem (unreadable JSON, empty or duplicate schema, predictor
    /// that does not fit the schema) yields
    /// [`ConfigurationError::CorruptArtifact`].
    pub fn load(crop: &str, path: &Path) -> Result<Self, ConfigurationError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigurationError::ArtifactNotFound(path.to_path_buf()));
            }
            Err(source) => {
                return Err(ConfigurationError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let corrupt = |reason: String| ConfigurationError::CorruptArtifact {
            path: path.to_path_buf(),
            reason,
        };

        let manifest: ArtifactManifest =
            serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;
        validate_schema(&manifest.schema).map_err(corrupt)?;

        let predictor: Box<dyn Predictor> = match manifest.predictor {
            PredictorSpec::Linear(model) => {
                model.validate().map_err(|e| corrupt(e.to_string()))?;
                Box::new(model)
            }
            PredictorSpec::Onnx {
                path: model_path,
                sha256,
            } => {
                let model_path = match path.parent() {
                    Some(dir) if model_path.is_relative() => dir.join(model_path),
                    _ => model_path,
                };
                let model_bytes = fs::read(&model_path)
                    .map_err(|e| corrupt(format!("cannot read {}: {}", model_path.display(), e)))?;
                if let Some(expected) = sha256 {
                    let computed = compute_checksum(&model_bytes);
                    if !computed.eq_ignore_ascii_case(&expected) {
                        return Err(corrupt(format!(
                            "checksum mismatch: expected {}, got {}",
                            expected, computed
                        )));
                    }
                }
                let model = OnnxPredictor::new(&model_bytes, manifest.schema.len())
                    .map_err(|e| corrupt(format!("{:#}", e)))?;
                Box::new(model)
            }
        };

        let mut artifact = Artifact::new(crop, manifest.schema, predictor).map_err(corrupt)?;
        artifact.source = path.to_path_buf();
        artifact.checksum = compute_checksum(&bytes);
        Ok(artifact)
    }

    pub fn crop(&self) -> &str {
        &self.crop
    }

    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    pub fn predictor_kind(&self) -> &'static str {
        self.predictor.kind()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Align the record on the frozen schema and run the predictor
    pub fn predict(&self, record: &FeatureRecord) -> Result<f64> {
        let frame = align(record, &self.schema, DEFAULT_FILL);
        let outputs = self.predictor.predict(&frame)?;
        let value = match outputs.as_slice() {
            [value] => *value,
            other => anyhow::bail!("expected one prediction, model returned {}", other.len()),
        };
        if !value.is_finite() {
            anyhow::bail!("model returned non-finite value {}", value);
        }
        Ok(value)
    }
}

fn validate_schema(schema: &[String]) -> Result<(), String> {
    if schema.is_empty() {
        return Err("schema is empty".to_string());
    }
    let mut seen = HashSet::with_capacity(schema.len());
    for name in schema {
        if name.trim().is_empty() {
            return Err("schema contains an empty column name".to_string());
        }
        if !seen.insert(name.as_str()) {
            return Err(format!("schema lists column '{}' twice", name));
        }
    }
    Ok(())
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Artifacts keyed by lower-cased crop name
#[derive(Debug, Default)]
pub struct ArtifactStore {
    artifacts: HashMap<String, Artifact>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every configured crop's artifact
    ///
    /// `files` maps crop display names to manifest paths; relative paths
    /// resolve against `dir`. Missing files are skipped quietly, corrupt ones
    /// are logged and skipped. Neither stops the load.
    pub fn load(dir: &Path, files: &BTreeMap<String, PathBuf>) -> Self {
        let mut store = Self::new();
        for (crop, file) in files {
            let path = if file.is_relative() {
                dir.join(file)
            } else {
                file.clone()
            };
            match Artifact::load(crop, &path) {
                Ok(artifact) => {
                    info!(
                        crop = %crop,
                        path = %path.display(),
                        predictor = artifact.predictor_kind(),
                        features = artifact.schema().len(),
                        checksum = %artifact.checksum(),
                        "Loaded price model"
                    );
                    store.insert(artifact);
                }
                Err(e) if e.is_not_found() => {
                    debug!(crop = %crop, path = %path.display(), "Price model not found, skipping");
                }
                Err(e) => {
                    warn!(crop = %crop, error = %e, "Skipping corrupt price model");
                }
            }
        }
        store
    }

    /// Add or replace the artifact for its crop
    pub fn insert(&mut self, artifact: Artifact) -> Option<Artifact> {
        self.artifacts.insert(normalize(&artifact.crop), artifact)
    }

    /// Case-insensitive lookup
    pub fn lookup(&self, crop: &str) -> Result<&Artifact, ServiceError> {
        self.artifacts
            .get(&normalize(crop))
            .ok_or_else(|| ServiceError::ModelNotFound(crop.to_string()))
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Display names of loaded crops, sorted
    pub fn crops(&self) -> Vec<String> {
        let mut crops: Vec<String> = self.artifacts.values().map(|a| a.crop.clone()).collect();
        crops.sort();
        crops
    }
}

fn normalize(crop: &str) -> String {
    crop.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn linear_manifest(schema: &[&str], intercept: f64, coefficients: Vec<f64>) -> ArtifactManifest {
        ArtifactManifest {
            schema: schema.iter().map(|s| s.to_string()).collect(),
            predictor: PredictorSpec::Linear(LinearModel::new(intercept, coefficients)),
        }
    }

    fn files(crops: &[&str]) -> BTreeMap<String, PathBuf> {
        crops
            .iter()
            .map(|c| (c.to_string(), PathBuf::from(manifest_file_name(c))))
            .collect()
    }

    #[test]
    fn test_manifest_file_name() {
        assert_eq!(manifest_file_name("Wheat"), "wheat_price_model.json");
    }

    #[test]
    fn test_manifest_json_shape() {
        let json = r#"{
            "schema": ["year", "month"],
            "predictor": {"type": "linear", "intercept": 1.0, "coefficients": [0.5, 0.25]}
        }"#;
        let manifest: ArtifactManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest, linear_manifest(&["year", "month"], 1.0, vec![0.5, 0.25]));
    }

    #[test]
    fn test_save_and_load_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wheat_price_model.json");
        linear_manifest(&["year", "month", "rainfall"], 10.0, vec![1.0, 2.0, 0.5])
            .save(&path)
            .unwrap();

        let artifact = Artifact::load("Wheat", &path).unwrap();
        assert_eq!(artifact.crop(), "Wheat");
        assert_eq!(artifact.schema(), &["year", "month", "rainfall"]);
        assert_eq!(artifact.predictor_kind(), "linear");
        assert_eq!(artifact.checksum().len(), 64);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_predict_fills_training_only_columns() {
        let predictor = Box::new(LinearModel::new(0.0, vec![1.0, 1.0, 100.0]));
        let artifact = Artifact::new(
            "Wheat",
            vec!["year".into(), "month".into(), "msp".into()],
            predictor,
        )
        .unwrap();
        let record: FeatureRecord = [("year", 2000.0), ("month", 6.0), ("rainfall", 999.0)]
            .into_iter()
            .collect();
        // msp absent -> 0, rainfall ignored
        assert_eq!(artifact.predict(&record).unwrap(), 2006.0);
    }

    #[test]
    fn test_new_rejects_width_mismatch() {
        let predictor = Box::new(LinearModel::new(0.0, vec![1.0]));
        assert!(Artifact::new("Wheat", vec!["a".into(), "b".into()], predictor).is_err());
    }

    #[test]
    fn test_corrupt_manifests_rejected() {
        let dir = TempDir::new().unwrap();

        let empty_schema = dir.path().join("empty.json");
        linear_manifest(&[], 0.0, vec![1.0]).save(&empty_schema).unwrap();
        assert!(matches!(
            Artifact::load("x", &empty_schema),
            Err(ConfigurationError::CorruptArtifact { .. })
        ));

        let duplicate = dir.path().join("dup.json");
        linear_manifest(&["a", "a"], 0.0, vec![1.0, 1.0]).save(&duplicate).unwrap();
        assert!(matches!(
            Artifact::load("x", &duplicate),
            Err(ConfigurationError::CorruptArtifact { .. })
        ));

        let no_predictor = dir.path().join("nopred.json");
        fs::write(&no_predictor, r#"{"schema": ["a"]}"#).unwrap();
        assert!(matches!(
            Artifact::load("x", &no_predictor),
            Err(ConfigurationError::CorruptArtifact { .. })
        ));

        let bad_width = dir.path().join("width.json");
        linear_manifest(&["a", "b"], 0.0, vec![1.0]).save(&bad_width).unwrap();
        assert!(matches!(
            Artifact::load("x", &bad_width),
            Err(ConfigurationError::CorruptArtifact { .. })
        ));
    }

    #[test]
    fn test_onnx_checksum_mismatch() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("model.onnx"), b"weights").unwrap();
        let manifest = ArtifactManifest {
            schema: vec!["year".into()],
            predictor: PredictorSpec::Onnx {
                path: PathBuf::from("model.onnx"),
                sha256: Some("00".repeat(32)),
            },
        };
        let path = dir.path().join("cotton_price_model.json");
        manifest.save(&path).unwrap();

        match Artifact::load("Cotton", &path) {
            Err(ConfigurationError::CorruptArtifact { reason, .. }) => {
                assert!(reason.contains("checksum mismatch"), "{}", reason);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_artifact_is_not_found() {
        let err = Artifact::load("Jowar", Path::new("/nonexistent/jowar_price_model.json")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_store_skips_missing_and_corrupt() {
        let dir = TempDir::new().unwrap();
        linear_manifest(&["year"], 1.0, vec![1.0])
            .save(&dir.path().join(manifest_file_name("Wheat")))
            .unwrap();
        fs::write(dir.path().join(manifest_file_name("Cotton")), "not json").unwrap();

        let store = ArtifactStore::load(dir.path(), &files(&["Wheat", "Cotton", "Bajra"]));
        assert_eq!(store.len(), 1);
        assert_eq!(store.crops(), vec!["Wheat"]);
        assert!(matches!(
            store.lookup("Cotton"),
            Err(ServiceError::ModelNotFound(_))
        ));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut store = ArtifactStore::new();
        store.insert(
            Artifact::new("Wheat", vec!["year".into()], Box::new(LinearModel::new(0.0, vec![1.0])))
                .unwrap(),
        );
        let a = store.lookup("wheat").unwrap() as *const Artifact;
        let b = store.lookup("Wheat").unwrap() as *const Artifact;
        let c = store.lookup("WHEAT").unwrap() as *const Artifact;
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert!(store.lookup(" wheat ").is_ok());
        assert!(store.lookup("Unicorn").is_err());
    }

    #[test]
    fn test_checksum_consistency() {
        let data = b"price model";
        assert_eq!(compute_checksum(data), compute_checksum(data));
        assert_eq!(compute_checksum(data).len(), 64);
    }
}
