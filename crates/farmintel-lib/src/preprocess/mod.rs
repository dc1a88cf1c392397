//! Fitted encoder and scaler shared by training and inference
//!
//! The same [`Preprocessor`] instance standardizes the training split and
//! every later request, so a classifier always sees inputs built with
//! identical statistics and column order.

mod encoder;
mod scaler;

pub use encoder::LabelEncoder;
pub use scaler::{StandardScaler, MIN_SCALE};

use crate::dataset::LabelledDataset;
use crate::error::PreprocessError;
use crate::frame::FeatureFrame;

/// Label encoder plus standard scaler, frozen after [`Preprocessor::fit`]
#[derive(Debug, Clone)]
pub struct Preprocessor {
    label_encoder: LabelEncoder,
    scaler: StandardScaler,
    feature_order: Vec<String>,
}

impl Preprocessor {
    /// Fit on a labelled dataset
    ///
    /// The feature order is the dataset's column order; the encoder covers
    /// every class seen in `dataset.labels`.
    pub fn fit(dataset: &LabelledDataset) -> Result<Self, PreprocessError> {
        let label_encoder = LabelEncoder::fit(&dataset.labels)?;
        let scaler = StandardScaler::fit(&dataset.features)?;
        Ok(Self {
            feature_order: dataset.features.columns().to_vec(),
            label_encoder,
            scaler,
        })
    }

    /// Standardize a frame holding every fitted feature column
    ///
    /// Columns are projected onto the fitted feature order first, so a frame
    /// in any column order scales the same way.
    pub fn apply(&self, frame: &FeatureFrame) -> Result<FeatureFrame, PreprocessError> {
        let ordered = frame
            .select(&self.feature_order)
            .map_err(|_| PreprocessError::SchemaMismatch {
                expected: self.feature_order.clone(),
                got: frame.columns().to_vec(),
            })?;
        self.scaler.transform(&ordered)
    }

    pub fn encode_label(&self, name: &str) -> Result<usize, PreprocessError> {
        self.label_encoder.encode(name)
    }

    pub fn decode_label(&self, code: usize) -> Result<&str, PreprocessError> {
        self.label_encoder.decode(code)
    }

    pub fn feature_order(&self) -> &[String] {
        &self.feature_order
    }

    pub fn label_encoder(&self) -> &LabelEncoder {
        &self.label_encoder
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn n_classes(&self) -> usize {
        self.label_encoder.len()
    }
}
