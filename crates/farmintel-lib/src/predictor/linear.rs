//! Linear regression model stored inline in an artifact manifest

use super::{check_width, Predictor};
use crate::frame::FeatureFrame;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// `intercept + Σ coefficients[i] * x[i]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn new(intercept: f64, coefficients: Vec<f64>) -> Self {
        Self {
            intercept,
            coefficients,
        }
    }

    /// Check parameters before the model is put into service
    pub fn validate(&self) -> Result<()> {
        if self.coefficients.is_empty() {
            anyhow::bail!("linear model has no coefficients");
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            anyhow::bail!("linear model has non-finite parameters");
        }
        Ok(())
    }
}

impl Predictor for LinearModel {
    fn predict(&self, frame: &FeatureFrame) -> Result<Vec<f64>> {
        check_width(frame, self.coefficients.len())?;
        Ok(frame
            .rows()
            .iter()
            .map(|row| {
                self.intercept
                    + row
                        .iter()
                        .zip(&self.coefficients)
                        .map(|(x, c)| x * c)
                        .sum::<f64>()
            })
            .collect())
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn kind(&self) -> &'static str {
        "linear"
    }
}
