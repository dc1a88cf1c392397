//! Nearest-centroid classifier
//!
//! Built-in classifier used when no exported model is configured. It is fit
//! on standardized features, so every column weighs the same in the
//! distance.

use super::{check_width, Predictor};
use crate::frame::FeatureFrame;
use anyhow::Result;

/// Assigns each row the code of the closest class mean (Euclidean)
#[derive(Debug, Clone)]
pub struct NearestCentroid {
    centroids: Vec<Option<Vec<f64>>>,
    n_features: usize,
}

impl NearestCentroid {
    /// Fit one centroid per class code in `0..n_classes`
    ///
    /// Classes without training rows get no centroid and are never
    /// predicted.
    pub fn fit(frame: &FeatureFrame, codes: &[usize], n_classes: usize) -> Result<Self> {
        if frame.n_rows() != codes.len() {
            anyhow::bail!(
                "{} training rows but {} class codes",
                frame.n_rows(),
                codes.len()
            );
        }
        if frame.n_rows() == 0 {
            anyhow::bail!("cannot fit a classifier on an empty frame");
        }
        let width = frame.n_columns();
        let mut sums = vec![vec![0.0; width]; n_classes];
        let mut counts = vec![0usize; n_classes];

        for (row, &code) in frame.rows().iter().zip(codes) {
            if code >= n_classes {
                anyhow::bail!("class code {} outside 0..{}", code, n_classes);
            }
            counts[code] += 1;
            for (s, v) in sums[code].iter_mut().zip(row) {
                *s += v;
            }
        }

        let centroids = sums
            .into_iter()
            .zip(counts)
            .map(|(sum, count)| {
                (count > 0).then(|| sum.into_iter().map(|s| s / count as f64).collect())
            })
            .collect();

        Ok(Self {
            centroids,
            n_features: width,
        })
    }

    /// Code of the closest centroid
    ///
    /// Fails when no class was fitted or when the two closest centroids are
    /// exactly equidistant, which happens once an input is so far out that
    /// rounding swamps the differences between classes.
    fn classify(&self, row: &[f64]) -> Result<usize> {
        let mut best: Option<(usize, f64)> = None;
        let mut tied = false;
        for (code, centroid) in self.centroids.iter().enumerate() {
            let Some(centroid) = centroid else { continue };
            let distance = squared_distance(row, centroid);
            match best {
                Some((_, d)) if distance > d => {}
                Some((_, d)) if distance == d => tied = true,
                _ => {
                    best = Some((code, distance));
                    tied = false;
                }
            }
        }
        match best {
            None => anyhow::bail!("classifier has no fitted classes"),
            Some((_, distance)) if tied => {
                anyhow::bail!("input is equidistant from several classes (distance {})", distance)
            }
            Some((code, _)) => Ok(code),
        }
    }
}

impl Predictor for NearestCentroid {
    fn predict(&self, frame: &FeatureFrame) -> Result<Vec<f64>> {
        check_width(frame, self.n_features)?;
        frame
            .rows()
            .iter()
            .map(|row| {
                if row.iter().any(|v| !v.is_finite()) {
                    anyhow::bail!("non-finite input value");
                }
                self.classify(row).map(|code| code as f64)
            })
            .collect()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn kind(&self) -> &'static str {
        "nearest_centroid"
    }

    /// Negated squared distance to each centroid; unfitted classes rank last
    fn class_scores(&self, frame: &FeatureFrame) -> Result<Option<Vec<Vec<f64>>>> {
        check_width(frame, self.n_features)?;
        let scores = frame
            .rows()
            .iter()
            .map(|row| {
                self.centroids
                    .iter()
                    .map(|c| c.as_ref().map_or(f64::NEG_INFINITY, |c| -squared_distance(row, c)))
                    .collect()
            })
            .collect();
        Ok(Some(scores))
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}
