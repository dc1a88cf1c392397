//! Training dataset loading
//!
//! Reads a labelled CSV file into a numeric [`FeatureFrame`] plus the class
//! label of every row.

use crate::error::ConfigurationError;
use crate::frame::FeatureFrame;
use std::path::Path;
use tracing::info;

/// Feature frame plus one class label per row
#[derive(Debug, Clone)]
pub struct LabelledDataset {
    pub features: FeatureFrame,
    pub labels: Vec<String>,
}

impl LabelledDataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Load `feature_columns` and `label_column` from a CSV file with headers
    ///
    /// Columns other than the requested ones are ignored. Every required
    /// column must be present, every feature cell must parse as a finite
    /// number.
    pub fn from_csv(
        path: &Path,
        feature_columns: &[&str],
        label_column: &str,
    ) -> Result<Self, ConfigurationError> {
        if !path.exists() {
            return Err(ConfigurationError::DatasetNotFound(path.to_path_buf()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;
        let headers = reader.headers()?.clone();
        let header_count = headers.len();

        let position = |name: &str| headers.iter().position(|h| h == name);
        let missing: Vec<String> = feature_columns
            .iter()
            .copied()
            .chain(std::iter::once(label_column))
            .filter(|c| position(*c).is_none())
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigurationError::MissingColumns(missing));
        }

        let feature_idx: Vec<usize> = feature_columns
            .iter()
            .filter_map(|c| position(*c))
            .collect();
        let label_idx = position(label_column)
            .ok_or_else(|| ConfigurationError::MissingColumns(vec![label_column.to_string()]))?;

        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let mut values = Vec::with_capacity(feature_idx.len());
            for (&idx, &column) in feature_idx.iter().zip(feature_columns) {
                let raw = record.get(idx).unwrap_or_default();
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| ConfigurationError::InvalidCell {
                        row: row + 1,
                        column: column.to_string(),
                        value: raw.to_string(),
                    })?;
                values.push(value);
            }
            rows.push(values);
            labels.push(record.get(label_idx).unwrap_or_default().to_string());
        }

        if rows.is_empty() {
            return Err(ConfigurationError::EmptyDataset {
                path: path.to_path_buf(),
            });
        }

        info!(
            path = %path.display(),
            rows = rows.len(),
            columns = header_count,
            "Loaded training dataset"
        );

        let columns = feature_columns.iter().map(|c| c.to_string()).collect();
        Ok(Self {
            features: FeatureFrame::new(columns, rows)?,
            labels,
        })
    }

    /// Deterministic stratified hold-out split
    ///
    /// Within each class, samples are taken in file order and every sample
    /// that crosses a `test_fraction` boundary goes to the test split (every
    /// fifth one for 0.2). Classes too small to reach a boundary stay
    /// entirely in the training split. Returns `(train, test)` row indices.
    pub fn stratified_split(&self, test_fraction: f64) -> (Vec<usize>, Vec<usize>) {
        let fraction = test_fraction.clamp(0.0, 1.0);
        let mut seen_per_class: std::collections::HashMap<&str, usize> =
            std::collections::HashMap::new();
        let mut train = Vec::new();
        let mut test = Vec::new();

        for (i, label) in self.labels.iter().enumerate() {
            let j = seen_per_class.entry(label.as_str()).or_insert(0);
            let before = (*j as f64 * fraction).floor();
            let after = ((*j + 1) as f64 * fraction).floor();
            if after > before {
                test.push(i);
            } else {
                train.push(i);
            }
            *j += 1;
        }
        (train, test)
    }

    /// Subset of rows, preserving the given order
    pub fn subset(&self, indices: &[usize]) -> LabelledDataset {
        LabelledDataset {
            features: self.features.take_rows(indices),
            labels: indices
                .iter()
                .filter_map(|&i| self.labels.get(i).cloned())
                .collect(),
        }
    }
}
