//! Error taxonomy for the prediction service
//!
//! Library errors are plain values. Only the HTTP layer decides which
//! status code a variant maps to.

use std::path::PathBuf;
use thiserror::Error;

/// Startup failures: missing or malformed datasets and artifacts.
///
/// A configuration error degrades the affected component to unavailable;
/// it never stops the process.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("dataset file not found: {0}")]
    DatasetNotFound(PathBuf),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("dataset {path} has no rows")]
    EmptyDataset { path: PathBuf },

    #[error("invalid value {value:?} in column '{column}' at row {row}")]
    InvalidCell {
        row: usize,
        column: String,
        value: String,
    },

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("artifact not found: {0}")]
    ArtifactNotFound(PathBuf),

    #[error("corrupt artifact {path}: {reason}")]
    CorruptArtifact { path: PathBuf, reason: String },

    #[error("failed to build classifier: {0}")]
    Classifier(String),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigurationError {
    /// Artifact files that are simply absent are skipped without noise
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ConfigurationError::ArtifactNotFound(_) | ConfigurationError::DatasetNotFound(_)
        )
    }
}

/// Client-supplied record is missing fields or carries the wrong types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("request body must be a JSON object")]
    NotAnObject,

    #[error("Missing feature: {0}")]
    MissingFeature(String),

    #[error("Invalid value for feature '{0}': expected a number")]
    InvalidFeatureType(String),

    #[error("Missing {0}")]
    MissingParameter(String),

    #[error("Invalid value for '{name}': expected {expected}")]
    InvalidType { name: String, expected: &'static str },

    #[error("Value for '{name}' out of range: {reason}")]
    OutOfRange { name: String, reason: String },
}

/// Column layout violations inside a [`FeatureFrame`](crate::frame::FeatureFrame)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("row {row} has {got} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("unknown column '{0}'")]
    UnknownColumn(String),
}

/// Failures of the fitted encoder/scaler pair
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreprocessError {
    #[error("schema mismatch: expected columns {expected:?}, got {got:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },

    #[error("unknown class code {code} (encoder has {classes} classes)")]
    UnknownCode { code: usize, classes: usize },

    #[error("label '{0}' was not seen at fit time")]
    UnknownLabel(String),

    #[error("cannot fit on an empty frame")]
    EmptyFrame,
}

/// Per-request failure surfaced by the prediction service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No model for crop: {0}")]
    ModelNotFound(String),

    #[error("Prediction failed: {0}")]
    PredictionFailed(String),

    #[error("{component} not available: {reason}")]
    ServiceUnavailable {
        component: &'static str,
        reason: String,
    },
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
