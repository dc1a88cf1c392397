//! Crop recommendation model setup and inference
//!
//! Setup loads the labelled dataset, fits the [`Preprocessor`], splits off
//! a stratified hold-out set, obtains a classifier and scores it. Inference
//! runs the same preprocessor on each request.

use crate::dataset::LabelledDataset;
use crate::error::ConfigurationError;
use crate::frame::{align, DEFAULT_FILL};
use crate::models::{FeatureRecord, CROP_FEATURES, CROP_LABEL_COLUMN};
use crate::predictor::{as_class_code, ClassificationReport, NearestCentroid, OnnxPredictor, Predictor};
use crate::preprocess::Preprocessor;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Default share of each class held out for evaluation
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Inputs for building the recommender at startup
#[derive(Debug, Clone)]
pub struct RecommenderSettings {
    pub dataset_path: PathBuf,
    /// Exported classifier; the built-in nearest-centroid model is fit when absent
    pub classifier_path: Option<PathBuf>,
    pub test_fraction: f64,
}

impl RecommenderSettings {
    pub fn new(dataset_path: impl Into<PathBuf>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            classifier_path: None,
            test_fraction: DEFAULT_TEST_FRACTION,
        }
    }
}

/// Fitted preprocessor plus classifier, read-only after setup
pub struct CropRecommender {
    preprocessor: Preprocessor,
    classifier: Box<dyn Predictor>,
    report: Option<ClassificationReport>,
}

impl CropRecommender {
    /// Load the dataset named in `settings` and build the recommender
    pub fn setup(settings: &RecommenderSettings) -> Result<Self, ConfigurationError> {
        let start = Instant::now();
        let dataset =
            LabelledDataset::from_csv(&settings.dataset_path, &CROP_FEATURES, CROP_LABEL_COLUMN)?;
        let recommender = Self::from_dataset(
            &dataset,
            settings.classifier_path.as_deref(),
            settings.test_fraction,
        )?;
        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            classes = recommender.preprocessor.n_classes(),
            classifier = recommender.classifier.kind(),
            "Crop recommendation setup complete"
        );
        Ok(recommender)
    }

    /// Fit on an in-memory dataset
    pub fn from_dataset(
        dataset: &LabelledDataset,
        classifier_path: Option<&Path>,
        test_fraction: f64,
    ) -> Result<Self, ConfigurationError> {
        let preprocessor = Preprocessor::fit(dataset)?;
        info!(features = ?preprocessor.feature_order(), "Features scaled");

        let (train_idx, test_idx) = dataset.stratified_split(test_fraction);
        info!(train = train_idx.len(), test = test_idx.len(), "Data split");
        let train = dataset.subset(&train_idx);
        let test = dataset.subset(&test_idx);

        let classifier: Box<dyn Predictor> = match classifier_path {
            Some(path) => {
                let model = OnnxPredictor::from_path(path, preprocessor.feature_order().len())
                    .map_err(|e| ConfigurationError::Classifier(format!("{:#}", e)))?;
                Box::new(model)
            }
            None => {
                let fit_start = Instant::now();
                let scaled = preprocessor.apply(&train.features)?;
                let codes = preprocessor.label_encoder().encode_all(&train.labels)?;
                let model = NearestCentroid::fit(&scaled, &codes, preprocessor.n_classes())
                    .map_err(|e| ConfigurationError::Classifier(e.to_string()))?;
                info!(
                    elapsed_ms = fit_start.elapsed().as_millis() as u64,
                    "Crop recommendation model trained"
                );
                Box::new(model)
            }
        };

        let mut recommender = Self::from_parts(preprocessor, classifier)?;
        recommender.report = recommender.evaluate(&test);
        Ok(recommender)
    }

    /// Combine an already fitted preprocessor and classifier
    pub fn from_parts(
        preprocessor: Preprocessor,
        classifier: Box<dyn Predictor>,
    ) -> Result<Self, ConfigurationError> {
        if classifier.n_features() != preprocessor.feature_order().len() {
            return Err(ConfigurationError::Classifier(format!(
                "classifier expects {} features, preprocessor provides {}",
                classifier.n_features(),
                preprocessor.feature_order().len()
            )));
        }
        Ok(Self {
            preprocessor,
            classifier,
            report: None,
        })
    }

    /// Score the classifier on a held-out split
    ///
    /// Failures are logged and reported as `None`; they never abort setup.
    pub fn evaluate(&self, test: &LabelledDataset) -> Option<ClassificationReport> {
        if test.is_empty() {
            warn!("Empty test split, skipping evaluation");
            return None;
        }
        let outcome = (|| -> Result<ClassificationReport> {
            let scaled = self.preprocessor.apply(&test.features)?;
            let y_true = self.preprocessor.label_encoder().encode_all(&test.labels)?;
            let y_pred = self
                .classifier
                .predict(&scaled)?
                .into_iter()
                .map(as_class_code)
                .collect::<Result<Vec<_>>>()?;
            let report = ClassificationReport::compute(
                &y_true,
                &y_pred,
                self.preprocessor.label_encoder().classes(),
            )
            .context("predicted codes outside the label set")?;
            Ok(match self.classifier.class_scores(&scaled)? {
                Some(scores) => report.with_roc_auc(&y_true, &scores),
                None => report,
            })
        })();

        match outcome {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Classifier evaluation failed");
                None
            }
        }
    }

    /// Predict the class name for a validated record
    pub fn recommend(&self, record: &FeatureRecord) -> Result<String> {
        let frame = align(record, self.preprocessor.feature_order(), DEFAULT_FILL);
        let scaled = self.preprocessor.apply(&frame)?;
        let outputs = self.classifier.predict(&scaled)?;
        let code = match outputs.as_slice() {
            [value] => as_class_code(*value)?,
            other => anyhow::bail!("expected one prediction, classifier returned {}", other.len()),
        };
        Ok(self.preprocessor.decode_label(code)?.to_string())
    }

    pub fn feature_order(&self) -> &[String] {
        self.preprocessor.feature_order()
    }

    pub fn classes(&self) -> &[String] {
        self.preprocessor.label_encoder().classes()
    }

    pub fn classifier_kind(&self) -> &'static str {
        self.classifier.kind()
    }

    pub fn report(&self) -> Option<&ClassificationReport> {
        self.report.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FeatureFrame;
    use crate::testing::crop_csv;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn record(values: [f64; 7]) -> FeatureRecord {
        CROP_FEATURES.iter().copied().zip(values).collect()
    }

    #[test]
    fn test_setup_trains_and_evaluates() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(crop_csv().as_bytes()).unwrap();

        let recommender = CropRecommender::setup(&RecommenderSettings::new(file.path())).unwrap();
        assert_eq!(recommender.classes(), &["chickpea", "rice"]);
        assert_eq!(recommender.classifier_kind(), "nearest_centroid");

        let report = recommender.report().expect("hold-out report");
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.confusion.iter().flatten().sum::<usize>(), 4);
        assert_eq!(report.macro_roc_auc, Some(1.0));
    }

    #[test]
    fn test_recommend_known_sample() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(crop_csv().as_bytes()).unwrap();
        let recommender = CropRecommender::setup(&RecommenderSettings::new(file.path())).unwrap();

        let rice = record([90.0, 42.0, 43.0, 20.8, 82.0, 6.5, 202.9]);
        assert_eq!(recommender.recommend(&rice).unwrap(), "rice");
        let chickpea = record([41.0, 66.0, 81.0, 18.1, 16.4, 7.2, 79.0]);
        assert_eq!(recommender.recommend(&chickpea).unwrap(), "chickpea");
    }

    #[test]
    fn test_missing_dataset() {
        let err = CropRecommender::setup(&RecommenderSettings::new("/nonexistent/crops.csv"))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigurationError::DatasetNotFound(_)));
    }

    #[test]
    fn test_missing_classifier_file() {
        let dataset = LabelledDataset {
            features: FeatureFrame::new(
                CROP_FEATURES.iter().map(|c| c.to_string()).collect(),
                vec![vec![1.0; 7]],
            )
            .unwrap(),
            labels: vec!["rice".into()],
        };
        let err = CropRecommender::from_dataset(
            &dataset,
            Some(Path::new("/nonexistent/classifier.onnx")),
            DEFAULT_TEST_FRACTION,
        )
        .err()
        .unwrap();
        assert!(matches!(err, ConfigurationError::Classifier(_)));
    }
}
