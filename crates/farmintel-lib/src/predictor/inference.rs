//! ONNX inference using tract
//!
//! Runs models exported from the training environment (price regressors or
//! the crop classifier) with a fixed `[1, n_features]` f32 input.

use super::{check_width, Predictor};
use crate::frame::FeatureFrame;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Per-row inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based predictor using tract for lightweight inference
pub struct OnnxPredictor {
    model: TractModel,
    n_features: usize,
}

impl OnnxPredictor {
    /// Create a predictor from model bytes
    pub fn new(model_bytes: &[u8], n_features: usize) -> Result<Self> {
        let model = Self::load_model(model_bytes, n_features)?;
        Ok(Self { model, n_features })
    }

    pub fn from_path(path: &Path, n_features: usize) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read ONNX model {:?}", path))?;
        Self::new(&bytes, n_features)
    }

    /// Load and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8], n_features: usize) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, n_features]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    fn row_to_tensor(&self, row: &[f64]) -> Result<Tensor> {
        let data: Vec<f32> = row.iter().map(|v| *v as f32).collect();
        Ok(tract_ndarray::Array2::from_shape_vec((1, self.n_features), data)?.into())
    }

    /// First scalar of the first output, whatever its numeric type
    fn first_value(output: &Tensor) -> Result<f64> {
        if let Ok(view) = output.to_array_view::<f32>() {
            return view.iter().next().map(|v| *v as f64).context("Empty model output");
        }
        if let Ok(view) = output.to_array_view::<i64>() {
            return view.iter().next().map(|v| *v as f64).context("Empty model output");
        }
        if let Ok(view) = output.to_array_view::<f64>() {
            return view.iter().next().copied().context("Empty model output");
        }
        anyhow::bail!("Unsupported model output type {:?}", output.datum_type())
    }

    fn run_row(&self, row: &[f64]) -> Result<f64> {
        let start = Instant::now();
        let input = self.row_to_tensor(row)?;

        let result = self.model.run(tvec!(input.into()))?;
        let output = result.first().context("No output from model")?;
        let value = Self::first_value(output)?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }
        Ok(value)
    }
}

impl Predictor for OnnxPredictor {
    fn predict(&self, frame: &FeatureFrame) -> Result<Vec<f64>> {
        check_width(frame, self.n_features)?;
        frame.rows().iter().map(|row| self.run_row(row)).collect()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_model_bytes_rejected() {
        let err = OnnxPredictor::new(b"definitely not onnx", 3).err().unwrap();
        assert!(format!("{:#}", err).contains("Failed to parse ONNX model"));
    }

    #[test]
    fn test_missing_model_file() {
        let err = OnnxPredictor::from_path(Path::new("/nonexistent/model.onnx"), 3)
            .err()
            .unwrap();
        assert!(err.to_string().contains("Failed to read ONNX model"));
    }
}
