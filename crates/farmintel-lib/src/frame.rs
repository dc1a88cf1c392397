//! Ordered-column feature frames and schema alignment
//!
//! Fitted models consume their inputs by position, not by name. Every
//! record therefore passes through [`align`] before it reaches a predictor:
//! the result has exactly the training-time columns, in training-time order,
//! with absent columns filled and unexpected ones dropped.

use crate::error::FrameError;
use crate::models::FeatureRecord;
use std::collections::{HashMap, HashSet};

/// Value used for schema columns the record does not supply
pub const DEFAULT_FILL: f64 = 0.0;

/// Numeric table with an ordered, duplicate-free column list
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureFrame {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, FrameError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(FrameError::DuplicateColumn(name.clone()));
            }
        }
        for (row, values) in rows.iter().enumerate() {
            if values.len() != columns.len() {
                return Err(FrameError::RowWidth {
                    row,
                    expected: columns.len(),
                    got: values.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Single-row frame holding the record's features in name order
    pub fn from_record(record: &FeatureRecord) -> Self {
        let (columns, values): (Vec<String>, Vec<f64>) =
            record.iter().map(|(k, v)| (k.to_string(), v)).unzip();
        Self {
            columns,
            rows: vec![values],
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Copy out one column's values
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }

    pub fn has_columns(&self, names: &[String]) -> bool {
        self.columns.as_slice() == names
    }

    /// Reindex every row onto `schema`, filling absent columns with `default`
    ///
    /// Columns not named in `schema` are dropped. The output column order is
    /// exactly `schema`.
    pub fn reindex(&self, schema: &[String], default: f64) -> FeatureFrame {
        let positions: HashMap<&str, usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        let sources: Vec<Option<usize>> = schema
            .iter()
            .map(|name| positions.get(name.as_str()).copied())
            .collect();

        let rows = self
            .rows
            .iter()
            .map(|row| {
                sources
                    .iter()
                    .map(|src| src.map_or(default, |i| row[i]))
                    .collect()
            })
            .collect();

        FeatureFrame {
            columns: schema.to_vec(),
            rows,
        }
    }

    /// Strict projection: every requested column must exist
    pub fn select(&self, names: &[String]) -> Result<FeatureFrame, FrameError> {
        if let Some(missing) = names.iter().find(|n| self.column_index(n).is_none()) {
            return Err(FrameError::UnknownColumn(missing.clone()));
        }
        Ok(self.reindex(names, DEFAULT_FILL))
    }

    /// Keep only the rows at `indices`, in the given order
    pub fn take_rows(&self, indices: &[usize]) -> FeatureFrame {
        FeatureFrame {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }
}

/// Reindex a request record onto a model schema
///
/// For every schema name the output holds `record[name]` when present and
/// `default` otherwise; the result is a single row in schema order.
pub fn align(record: &FeatureRecord, schema: &[String], default: f64) -> FeatureFrame {
    let values = schema
        .iter()
        .map(|name| record.get(name).unwrap_or(default))
        .collect();
    FeatureFrame {
        columns: schema.to_vec(),
        rows: vec![values],
    }
}
