//! Unsupervised feature selection
//!
//! Provides the column filters applied to every modality:
//! - Sparsity filter (minimum non-zero fraction)
//! - Variance threshold selection
//! - Top-k by variance

use crate::error::{FusionError, Result};
use crate::utils::stats::nan_variance;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Feature selection method
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SelectionMethod {
    /// Keep features whose non-zero fraction is at least `min_fraction`.
    /// Missing cells count as non-zero.
    NonZeroFraction { min_fraction: f64 },
    /// Remove features with population variance at or below threshold
    VarianceThreshold { threshold: f64 },
    /// Keep the `k` features with the highest sample variance
    TopKVariance { k: usize },
}

/// Feature selector for dimensionality reduction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSelector {
    method: SelectionMethod,
    selected_features: Option<Vec<usize>>,
    feature_scores: Option<Vec<f64>>,
}

impl FeatureSelector {
    /// Create a new feature selector with the given method
    pub fn new(method: SelectionMethod) -> Self {
        Self {
            method,
            selected_features: None,
            feature_scores: None,
        }
    }

    /// Create sparsity selector
    pub fn non_zero_fraction(min_fraction: f64) -> Self {
        Self::new(SelectionMethod::NonZeroFraction { min_fraction })
    }

    /// Create variance threshold selector
    pub fn variance_threshold(threshold: f64) -> Self {
        Self::new(SelectionMethod::VarianceThreshold { threshold })
    }

    /// Create top-k variance selector
    pub fn top_k(k: usize) -> Self {
        Self::new(SelectionMethod::TopKVariance { k })
    }

    /// Fit the selector; the selected indices become available afterwards
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        match self.method {
            SelectionMethod::NonZeroFraction { min_fraction } => {
                self.fit_non_zero_fraction(x, min_fraction)
            }
            SelectionMethod::VarianceThreshold { threshold } => {
                self.fit_variance_threshold(x, threshold)
            }
            SelectionMethod::TopKVariance { k } => self.fit_top_k(x, k),
        }
        Ok(())
    }

    /// Transform data by keeping only the selected columns
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let selected = self.selected_features.as_ref().ok_or(FusionError::ModelNotFitted)?;
        Ok(x.select(ndarray::Axis(1), selected))
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Selected column indices. Top-k returns them in ranking order,
    /// the filters in original order.
    pub fn selected_indices(&self) -> Option<&[usize]> {
        self.selected_features.as_deref()
    }

    /// Per-column score computed during fit
    pub fn scores(&self) -> Option<&[f64]> {
        self.feature_scores.as_deref()
    }

    fn fit_non_zero_fraction(&mut self, x: &Array2<f64>, min_fraction: f64) {
        let denom = x.nrows().max(1) as f64;
        let scores: Vec<f64> = x
            .columns()
            .into_iter()
            .map(|col| col.iter().filter(|v| **v != 0.0).count() as f64 / denom)
            .collect();

        self.selected_features = Some(
            scores
                .iter()
                .enumerate()
                .filter(|(_, s)| **s >= min_fraction)
                .map(|(i, _)| i)
                .collect(),
        );
        self.feature_scores = Some(scores);
    }

    fn fit_variance_threshold(&mut self, x: &Array2<f64>, threshold: f64) {
        let scores: Vec<f64> = x
            .columns()
            .into_iter()
            .map(|col| nan_variance(col, 0).unwrap_or(f64::NAN))
            .collect();

        // an all-missing column has undefined variance and never passes
        self.selected_features = Some(
            scores
                .iter()
                .enumerate()
                .filter(|(_, v)| **v > threshold)
                .map(|(i, _)| i)
                .collect(),
        );
        self.feature_scores = Some(scores);
    }

    fn fit_top_k(&mut self, x: &Array2<f64>, k: usize) {
        let scores: Vec<f64> = x
            .columns()
            .into_iter()
            .map(|col| nan_variance(col, 1).unwrap_or(f64::NAN))
            .collect();

        let mut ranking: Vec<usize> = (0..scores.len()).collect();
        if k < scores.len() {
            // stable sort: equal variances keep their original order
            ranking.sort_by(|&a, &b| descending_nan_last(scores[a], scores[b]));
            ranking.truncate(k);
        }

        self.selected_features = Some(ranking);
        self.feature_scores = Some(scores);
    }
}

pub(crate) fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_non_zero_fraction() {
        let x = array![
            [0.0, 1.0, f64::NAN],
            [0.0, 0.0, 0.0],
            [2.0, 3.0, 0.0],
            [0.0, 4.0, 0.0],
        ];
        let mut selector = FeatureSelector::non_zero_fraction(0.5);
        selector.fit(&x).unwrap();
        assert_eq!(selector.selected_indices().unwrap(), &[1]);
        assert_eq!(selector.scores().unwrap()[2], 0.25);
    }

    #[test]
    fn test_variance_threshold() {
        let x = array![[1.0, 5.0, 0.0], [1.0, 6.0, 2.0], [1.0, 7.0, 4.0]];
        let mut selector = FeatureSelector::variance_threshold(1.0);
        selector.fit(&x).unwrap();
        // population variances: 0, 2/3, 8/3
        assert_eq!(selector.selected_indices().unwrap(), &[2]);
    }

    #[test]
    fn test_top_k_ranking_order() {
        let x = array![
            [0.0, 10.0, 1.0, 0.0],
            [0.0, 20.0, 2.0, 5.0],
            [0.0, 30.0, 3.0, 10.0],
        ];
        let mut selector = FeatureSelector::top_k(2);
        let out = selector.fit_transform(&x).unwrap();
        assert_eq!(selector.selected_indices().unwrap(), &[1, 3]);
        assert_eq!(out.ncols(), 2);
        assert_eq!(out[[2, 0]], 30.0);
    }

    #[test]
    fn test_top_k_ties_and_nan() {
        let x = array![
            [f64::NAN, 1.0, 1.0],
            [f64::NAN, 2.0, 2.0],
        ];
        let mut selector = FeatureSelector::top_k(2);
        selector.fit(&x).unwrap();
        assert_eq!(selector.selected_indices().unwrap(), &[1, 2]);
    }

    #[test]
    fn test_top_k_noop_when_wide_enough() {
        let x = array![[1.0, 9.0], [2.0, 0.0]];
        let mut selector = FeatureSelector::top_k(5);
        selector.fit(&x).unwrap();
        assert_eq!(selector.selected_indices().unwrap(), &[0, 1]);
    }
}
