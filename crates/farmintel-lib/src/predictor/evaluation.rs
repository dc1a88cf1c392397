//! Hold-out evaluation of the crop classifier

use serde::Serialize;

/// Precision, recall and F1 of one class
#[derive(Debug, Clone, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Test-split scores; ratios with a zero denominator count as 0
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub macro_f1: f64,
    pub weighted_f1: f64,
    /// One-vs-rest ROC AUC; `None` when the classifier exposes no class scores
    pub macro_roc_auc: Option<f64>,
    pub weighted_roc_auc: Option<f64>,
    pub per_class: Vec<ClassMetrics>,
    /// `confusion[actual][predicted]`
    pub confusion: Vec<Vec<usize>>,
}

impl ClassificationReport {
    /// Score predicted codes against true codes; `classes[code]` names each code
    ///
    /// Returns `None` when there is nothing to score or a code falls outside
    /// `classes`.
    pub fn compute(y_true: &[usize], y_pred: &[usize], classes: &[String]) -> Option<Self> {
        if y_true.is_empty() || y_true.len() != y_pred.len() {
            return None;
        }
        let k = classes.len();
        let mut confusion = vec![vec![0usize; k]; k];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            if t >= k || p >= k {
                return None;
            }
            confusion[t][p] += 1;
        }

        let total = y_true.len();
        let correct: usize = (0..k).map(|i| confusion[i][i]).sum();

        let per_class: Vec<ClassMetrics> = classes
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let tp = confusion[i][i] as f64;
                let support: usize = confusion[i].iter().sum();
                let predicted: usize = confusion.iter().map(|row| row[i]).sum();
                let precision = ratio(tp, predicted as f64);
                let recall = ratio(tp, support as f64);
                let f1 = ratio(2.0 * precision * recall, precision + recall);
                ClassMetrics {
                    label: label.clone(),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        let macro_f1 = ratio(per_class.iter().map(|c| c.f1).sum(), k as f64);
        let weighted_f1 = ratio(
            per_class.iter().map(|c| c.f1 * c.support as f64).sum(),
            total as f64,
        );

        Some(Self {
            accuracy: correct as f64 / total as f64,
            macro_f1,
            weighted_f1,
            macro_roc_auc: None,
            weighted_roc_auc: None,
            per_class,
            confusion,
        })
    }

    /// Attach one-vs-rest ROC AUC computed from per-class scores
    ///
    /// `scores[i][c]` ranks sample `i` for class `c`, higher meaning more
    /// likely. Classes lacking positive or negative samples are skipped.
    pub fn with_roc_auc(mut self, y_true: &[usize], scores: &[Vec<f64>]) -> Self {
        let k = self.per_class.len();
        if y_true.len() != scores.len() || scores.iter().any(|row| row.len() != k) {
            return self;
        }

        let mut aucs = Vec::new();
        for class in 0..k {
            let mut pos = Vec::new();
            let mut neg = Vec::new();
            for (&t, row) in y_true.iter().zip(scores) {
                if t == class {
                    pos.push(row[class]);
                } else {
                    neg.push(row[class]);
                }
            }
            if pos.is_empty() || neg.is_empty() {
                continue;
            }
            aucs.push((binary_auc(&pos, &neg), pos.len()));
        }

        if !aucs.is_empty() {
            let support: usize = aucs.iter().map(|(_, n)| n).sum();
            self.macro_roc_auc = Some(aucs.iter().map(|(a, _)| a).sum::<f64>() / aucs.len() as f64);
            self.weighted_roc_auc = Some(
                aucs.iter().map(|(a, n)| a * *n as f64).sum::<f64>() / support as f64,
            );
        }
        self
    }
}

/// Probability that a positive outscores a negative, ties counting half
fn binary_auc(pos: &[f64], neg: &[f64]) -> f64 {
    let mut wins = 0.0;
    for p in pos {
        for n in neg {
            if p > n {
                wins += 1.0;
            } else if p == n {
                wins += 0.5;
            }
        }
    }
    wins / (pos.len() * neg.len()) as f64
}

fn ratio(num: f64, denom: f64) -> f64 {
    if denom == 0.0 {
        0.0
    } else {
        num / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> Vec<String> {
        vec!["a".into(), "b".into()]
    }

    #[test]
    fn test_perfect_predictions() {
        let report = ClassificationReport::compute(&[0, 1, 1], &[0, 1, 1], &classes()).unwrap();
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.macro_f1, 1.0);
        assert_eq!(report.confusion, vec![vec![1, 0], vec![0, 2]]);
    }

    #[test]
    fn test_mixed_predictions() {
        // actual a,a,b,b predicted a,b,b,b
        let report = ClassificationReport::compute(&[0, 0, 1, 1], &[0, 1, 1, 1], &classes()).unwrap();
        assert_eq!(report.accuracy, 0.75);
        let a = &report.per_class[0];
        assert_eq!(a.precision, 1.0);
        assert_eq!(a.recall, 0.5);
        let b = &report.per_class[1];
        assert!((b.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(b.recall, 1.0);
        assert_eq!(b.support, 2);
    }

    #[test]
    fn test_unpredicted_class_scores_zero() {
        let report = ClassificationReport::compute(&[0, 1], &[0, 0], &classes()).unwrap();
        assert_eq!(report.per_class[1].precision, 0.0);
        assert_eq!(report.per_class[1].f1, 0.0);
    }

    #[test]
    fn test_roc_auc_absent_without_scores() {
        let report = ClassificationReport::compute(&[0, 1], &[0, 1], &classes()).unwrap();
        assert!(report.macro_roc_auc.is_none());
        assert!(report.weighted_roc_auc.is_none());
    }

    #[test]
    fn test_roc_auc_from_scores() {
        let y_true = [0, 0, 1, 1];
        // class 1 scores rank one negative above one positive
        let scores = vec![
            vec![0.9, 0.1],
            vec![0.6, 0.7],
            vec![0.4, 0.6],
            vec![0.2, 0.8],
        ];
        let report = ClassificationReport::compute(&y_true, &[0, 1, 1, 1], &classes())
            .unwrap()
            .with_roc_auc(&y_true, &scores);
        // class 0: positives {0.9, 0.6} vs negatives {0.4, 0.2} -> 1.0
        // class 1: positives {0.6, 0.8} vs negatives {0.1, 0.7} -> 0.75
        assert_eq!(report.macro_roc_auc, Some(0.875));
        assert_eq!(report.weighted_roc_auc, Some(0.875));
    }

    #[test]
    fn test_roc_auc_skips_mismatched_scores() {
        let report = ClassificationReport::compute(&[0, 1], &[0, 1], &classes())
            .unwrap()
            .with_roc_auc(&[0, 1], &[vec![1.0]]);
        assert!(report.macro_roc_auc.is_none());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(ClassificationReport::compute(&[], &[], &classes()).is_none());
        assert!(ClassificationReport::compute(&[0], &[0, 1], &classes()).is_none());
        assert!(ClassificationReport::compute(&[0], &[5], &classes()).is_none());
    }
}
