//! Binary classification metrics
//!
//! Labels are 0/1 with 1 as the positive class. Scores are any monotone
//! confidence in the positive class (probabilities or margins).

use crate::error::{FusionError, Result};
use crate::preprocessing::feature_selection::descending_nan_last;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric names accepted as `scoring`
pub const METRIC_NAMES: [&str; 4] = ["accuracy", "roc_auc", "average_precision", "f1"];

fn check_lengths(a: &Array1<f64>, b: &Array1<f64>) -> Result<()> {
    if a.len() != b.len() {
        return Err(FusionError::Shape {
            expected: format!("{} values", a.len()),
            actual: format!("{} values", b.len()),
        });
    }
    if a.is_empty() {
        return Err(FusionError::Computation("metric over an empty set".to_string()));
    }
    Ok(())
}

fn is_positive(label: f64) -> bool {
    label > 0.5
}

/// Fraction of exact label matches
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| is_positive(**t) == is_positive(**p))
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// F1 of the positive class, 0 when precision and recall are both undefined
pub fn f1_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        match (is_positive(t), is_positive(p)) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }
    let denom = 2 * tp + fp + fn_;
    if denom == 0 {
        return Ok(0.0);
    }
    Ok(2.0 * tp as f64 / denom as f64)
}

fn class_counts(y_true: &Array1<f64>) -> (usize, usize) {
    let n_pos = y_true.iter().filter(|&&t| is_positive(t)).count();
    (n_pos, y_true.len() - n_pos)
}

/// Area under the ROC curve via the rank-sum statistic, ties averaged
pub fn roc_auc(y_true: &Array1<f64>, scores: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, scores)?;
    let (n_pos, n_neg) = class_counts(y_true);
    if n_pos == 0 || n_neg == 0 {
        return Err(FusionError::Computation(
            "roc_auc is undefined when only one class is present".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // 1-based ranks, tied blocks share their mean rank
    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        let mean_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = mean_rank;
        }
        start = end;
    }

    let pos_rank_sum: f64 = ranks
        .iter()
        .zip(y_true.iter())
        .filter(|(_, &t)| is_positive(t))
        .map(|(r, _)| r)
        .sum();
    let n_pos = n_pos as f64;
    Ok((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64))
}

/// Step-wise average precision: sum over distinct thresholds of
/// `(R_k - R_{k-1}) * P_k`
pub fn average_precision(y_true: &Array1<f64>, scores: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, scores)?;
    let (n_pos, _) = class_counts(y_true);
    if n_pos == 0 {
        return Err(FusionError::Computation(
            "average_precision is undefined without positive samples".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| descending_nan_last(scores[a], scores[b]));

    let mut ap = 0.0;
    let mut tp = 0usize;
    let mut seen = 0usize;
    let mut prev_recall = 0.0;
    let mut i = 0;
    while i < order.len() {
        let threshold = scores[order[i]];
        while i < order.len() && scores[order[i]] == threshold {
            if is_positive(y_true[order[i]]) {
                tp += 1;
            }
            seen += 1;
            i += 1;
        }
        let recall = tp as f64 / n_pos as f64;
        let precision = tp as f64 / seen as f64;
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;
    }
    Ok(ap)
}

/// The four held-out metrics of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub roc_auc: f64,
    pub average_precision: f64,
    pub f1: f64,
}

impl ClassificationMetrics {
    pub fn compute(
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        scores: &Array1<f64>,
    ) -> Result<Self> {
        Ok(Self {
            accuracy: accuracy(y_true, y_pred)?,
            roc_auc: roc_auc(y_true, scores)?,
            average_precision: average_precision(y_true, scores)?,
            f1: f1_score(y_true, y_pred)?,
        })
    }

    /// Look up a metric by its configuration name
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "accuracy" => Some(self.accuracy),
            "roc_auc" => Some(self.roc_auc),
            "average_precision" => Some(self.average_precision),
            "f1" => Some(self.f1),
            _ => None,
        }
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        METRIC_NAMES
            .iter()
            .filter_map(|name| self.get(name).map(|v| (name.to_string(), v)))
            .collect()
    }

    /// Per-metric mean over folds
    pub fn mean(folds: &[ClassificationMetrics]) -> Result<Self> {
        if folds.is_empty() {
            return Err(FusionError::Computation("no folds to average".to_string()));
        }
        let n = folds.len() as f64;
        let avg = |f: fn(&ClassificationMetrics) -> f64| folds.iter().map(f).sum::<f64>() / n;
        Ok(Self {
            accuracy: avg(|m| m.accuracy),
            roc_auc: avg(|m| m.roc_auc),
            average_precision: avg(|m| m.average_precision),
            f1: avg(|m| m.f1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_accuracy_and_f1() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        let p = array![0.0, 1.0, 1.0, 0.0];
        assert!((accuracy(&y, &p).unwrap() - 0.5).abs() < 1e-12);
        // tp=1 fp=1 fn=1
        assert!((f1_score(&y, &p).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_f1_without_positives_is_zero() {
        let y = array![0.0, 0.0];
        let p = array![0.0, 0.0];
        assert_eq!(f1_score(&y, &p).unwrap(), 0.0);
    }

    #[test]
    fn test_roc_auc_perfect_and_inverted() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        assert_eq!(roc_auc(&y, &array![0.1, 0.2, 0.8, 0.9]).unwrap(), 1.0);
        assert_eq!(roc_auc(&y, &array![0.9, 0.8, 0.2, 0.1]).unwrap(), 0.0);
    }

    #[test]
    fn test_roc_auc_ties_are_averaged() {
        let y = array![0.0, 1.0];
        assert!((roc_auc(&y, &array![0.5, 0.5]).unwrap() - 0.5).abs() < 1e-12);

        // classic example: 0.75
        let y = array![0.0, 0.0, 1.0, 1.0];
        let s = array![0.1, 0.4, 0.35, 0.8];
        assert!((roc_auc(&y, &s).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_single_class_errors() {
        let y = array![1.0, 1.0];
        let err = roc_auc(&y, &array![0.2, 0.3]).unwrap_err();
        assert!(matches!(err, FusionError::Computation(_)));
    }

    #[test]
    fn test_average_precision() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        let s = array![0.1, 0.4, 0.35, 0.8];
        // thresholds 0.8 (P=1,R=.5), 0.4 (P=.5), 0.35 (P=2/3,R=1)
        let expected = 0.5 * 1.0 + 0.5 * (2.0 / 3.0);
        assert!((average_precision(&y, &s).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_metrics_map_and_mean() {
        let a = ClassificationMetrics { accuracy: 1.0, roc_auc: 1.0, average_precision: 1.0, f1: 1.0 };
        let b = ClassificationMetrics { accuracy: 0.5, roc_auc: 0.0, average_precision: 0.5, f1: 0.0 };
        let mean = ClassificationMetrics::mean(&[a, b]).unwrap();
        assert_eq!(mean.roc_auc, 0.5);
        let map = mean.to_map();
        assert_eq!(map.len(), 4);
        assert_eq!(map["accuracy"], 0.75);
        assert!(mean.get("precision").is_none());
    }
}
