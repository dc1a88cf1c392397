//! Standard scaling of numeric features

use crate::error::PreprocessError;
use crate::frame::FeatureFrame;

/// Standard deviations below this are treated as constant columns
pub const MIN_SCALE: f64 = 1e-12;

/// Per-column mean and scale computed over a training frame
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    columns: Vec<String>,
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit mean and population standard deviation per column
    ///
    /// A column whose deviation is below [`MIN_SCALE`] gets a scale of 1.0,
    /// so constant columns are centred but never divided by zero.
    pub fn fit(frame: &FeatureFrame) -> Result<Self, PreprocessError> {
        if frame.n_rows() == 0 {
            return Err(PreprocessError::EmptyFrame);
        }
        let n = frame.n_rows() as f64;
        let width = frame.n_columns();

        let mut means = vec![0.0; width];
        for row in frame.rows() {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut scales = vec![0.0; width];
        for row in frame.rows() {
            for ((s, v), m) in scales.iter_mut().zip(row).zip(&means) {
                *s += (v - m).powi(2);
            }
        }
        for s in scales.iter_mut() {
            let std = (*s / n).sqrt();
            *s = if std < MIN_SCALE { 1.0 } else { std };
        }

        Ok(Self {
            columns: frame.columns().to_vec(),
            means,
            scales,
        })
    }

    /// `(x - mean) / scale` per column; columns must match the fitted order
    pub fn transform(&self, frame: &FeatureFrame) -> Result<FeatureFrame, PreprocessError> {
        if !frame.has_columns(&self.columns) {
            return Err(PreprocessError::SchemaMismatch {
                expected: self.columns.clone(),
                got: frame.columns().to_vec(),
            });
        }
        let rows = frame
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.means.iter().zip(&self.scales))
                    .map(|(v, (m, s))| (v - m) / s)
                    .collect()
            })
            .collect();
        FeatureFrame::new(self.columns.clone(), rows).map_err(|_| PreprocessError::SchemaMismatch {
            expected: self.columns.clone(),
            got: frame.columns().to_vec(),
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }
}
