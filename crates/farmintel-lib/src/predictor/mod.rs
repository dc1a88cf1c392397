//! ML prediction engine
//!
//! Fitted models sit behind the [`Predictor`] trait. The service never
//! looks inside them: it hands over a frame whose columns already match the
//! model's schema and reads back one value per row.

mod centroid;
mod evaluation;
mod inference;
mod linear;

pub use centroid::NearestCentroid;
pub use evaluation::{ClassMetrics, ClassificationReport};
pub use inference::OnnxPredictor;
pub use linear::LinearModel;

use crate::frame::FeatureFrame;
use anyhow::Result;

/// Trait for fitted models
pub trait Predictor: Send + Sync {
    /// One output per input row: a regression value or a class code
    fn predict(&self, frame: &FeatureFrame) -> Result<Vec<f64>>;

    /// Number of input columns the model was fit on
    fn n_features(&self) -> usize;

    /// Short model family name for logs and metrics
    fn kind(&self) -> &'static str;

    /// Per-class ranking scores for each row, higher meaning more likely
    ///
    /// Models that only emit a class code return `None`.
    fn class_scores(&self, _frame: &FeatureFrame) -> Result<Option<Vec<Vec<f64>>>> {
        Ok(None)
    }
}

/// Reject frames whose width differs from the fitted input width
pub(crate) fn check_width(frame: &FeatureFrame, expected: usize) -> Result<()> {
    if frame.n_columns() != expected {
        anyhow::bail!(
            "Model expects {} input features, frame has {}",
            expected,
            frame.n_columns()
        );
    }
    Ok(())
}

/// Convert a classifier output to a class code
pub fn as_class_code(value: f64) -> Result<usize> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        anyhow::bail!("Classifier produced invalid class code {}", value);
    }
    Ok(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_code_conversion() {
        assert_eq!(as_class_code(3.0).unwrap(), 3);
        assert!(as_class_code(-1.0).is_err());
        assert!(as_class_code(1.5).is_err());
        assert!(as_class_code(f64::NAN).is_err());
    }
}
