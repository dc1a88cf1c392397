//! Label encoding for class targets

use crate::error::PreprocessError;
use std::collections::{BTreeSet, HashMap};

/// Bijection between class names and dense integer codes `0..K-1`
///
/// Codes are assigned in sorted (lexicographic) order of the distinct class
/// names, so the same label set always yields the same codes no matter the
/// row order of the training file.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoder {
    classes: Vec<String>,
    codes: HashMap<String, usize>,
}

impl LabelEncoder {
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Result<Self, PreprocessError> {
        if labels.is_empty() {
            return Err(PreprocessError::EmptyFrame);
        }
        let classes: Vec<String> = labels
            .iter()
            .map(|l| l.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let codes = classes
            .iter()
            .enumerate()
            .map(|(code, name)| (name.clone(), code))
            .collect();
        Ok(Self { classes, codes })
    }

    pub fn encode(&self, label: &str) -> Result<usize, PreprocessError> {
        self.codes
            .get(label)
            .copied()
            .ok_or_else(|| PreprocessError::UnknownLabel(label.to_string()))
    }

    pub fn encode_all<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>, PreprocessError> {
        labels.iter().map(|l| self.encode(l.as_ref())).collect()
    }

    pub fn decode(&self, code: usize) -> Result<&str, PreprocessError> {
        self.classes
            .get(code)
            .map(String::as_str)
            .ok_or(PreprocessError::UnknownCode {
                code,
                classes: self.classes.len(),
            })
    }

    /// Class names, indexed by code
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
