//! Supervised training over an integrated feature matrix
//!
//! Extracts the binary target from the clinical frame, fits the configured
//! estimator on a stratified split, scores it on the held-out part and runs
//! stratified k-fold cross-validation over the whole matrix.

use super::cross_validation::StratifiedKFold;
use super::estimator::{
    build_estimator, extract_importances, predict_with_score, Classifier, FeatureImportance,
};
use super::metrics::ClassificationMetrics;
use super::split::stratified_split;
use crate::config::{ClassWeight, ModelConfig};
use crate::error::{FusionError, Result};
use crate::table::{ClinicalTable, OmicsTable};
use crate::utils::ParallelConfig;
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Prediction for one held-out sample, labels in the original encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPrediction {
    pub sample_id: String,
    pub true_label: f64,
    pub predicted_label: f64,
    pub score: f64,
}

/// Everything produced by [`train`]
#[derive(Debug, Clone)]
pub struct ModelResult {
    /// Estimator as written in the config, aliases included; the canonical
    /// family is `estimator.name()`
    pub estimator_name: String,
    /// Held-out metrics
    pub metrics: BTreeMap<String, f64>,
    /// Mean cross-validation metrics
    pub cv_metrics: BTreeMap<String, f64>,
    pub feature_importances: Vec<FeatureImportance>,
    pub test_predictions: Vec<TestPrediction>,
    /// Estimator fitted on the training partition
    pub estimator: Arc<dyn Classifier>,
}

impl ModelResult {
    /// Cross-validated value of the configured scoring metric
    pub fn primary_score(&self, scoring: &str) -> Option<f64> {
        self.cv_metrics.get(scoring).copied()
    }

    /// `sample_id, true_label, predicted_label, score`
    pub fn predictions_frame(&self) -> Result<DataFrame> {
        let p = &self.test_predictions;
        let df = df! {
            "sample_id" => p.iter().map(|r| r.sample_id.clone()).collect::<Vec<_>>(),
            "true_label" => p.iter().map(|r| r.true_label).collect::<Vec<_>>(),
            "predicted_label" => p.iter().map(|r| r.predicted_label).collect::<Vec<_>>(),
            "score" => p.iter().map(|r| r.score).collect::<Vec<_>>(),
        }?;
        Ok(df)
    }

    /// `feature, importance` in ranking order
    pub fn importances_frame(&self) -> Result<DataFrame> {
        let f = &self.feature_importances;
        let df = df! {
            "feature" => f.iter().map(|r| r.feature.clone()).collect::<Vec<_>>(),
            "importance" => f.iter().map(|r| r.importance).collect::<Vec<_>>(),
        }?;
        Ok(df)
    }
}

/// Binary target mapped to 0/1 plus the original `[negative, positive]` labels
struct Target {
    y: Array1<f64>,
    labels: [f64; 2],
}

impl Target {
    fn extract(clinical: &ClinicalTable, column: &str) -> Result<Self> {
        let values = clinical.numeric_column(column)?;

        let mut observed = Vec::with_capacity(values.len());
        for (sample, value) in clinical.samples().iter().zip(values) {
            match value {
                Some(v) if v.is_finite() => observed.push(v),
                _ => {
                    return Err(FusionError::Data(format!(
                        "target '{}' is missing for sample '{}'",
                        column, sample
                    )))
                }
            }
        }

        let mut distinct = observed.clone();
        distinct.sort_by(f64::total_cmp);
        distinct.dedup();
        if distinct.len() != 2 {
            return Err(FusionError::Data(format!(
                "target '{}' must have exactly two classes, found {}: {:?}",
                column,
                distinct.len(),
                distinct
            )));
        }
        let labels = [distinct[0], distinct[1]];
        let y = observed
            .into_iter()
            .map(|v| if v == labels[1] { 1.0 } else { 0.0 })
            .collect();
        Ok(Self { y, labels })
    }

    fn decode(&self, encoded: f64) -> f64 {
        if encoded > 0.5 {
            self.labels[1]
        } else {
            self.labels[0]
        }
    }
}

/// `n / (2 * n_class)` per sample
fn balanced_weights(y: &Array1<f64>) -> Array1<f64> {
    let n = y.len() as f64;
    let n_pos = y.iter().filter(|&&v| v > 0.5).count() as f64;
    let n_neg = n - n_pos;
    y.mapv(|v| {
        let count = if v > 0.5 { n_pos } else { n_neg };
        n / (2.0 * count)
    })
}

fn sample_weights(config: &ModelConfig, y: &Array1<f64>) -> Option<Array1<f64>> {
    match config.class_weight {
        Some(ClassWeight::Balanced) => Some(balanced_weights(y)),
        None => None,
    }
}

fn fit_and_score(
    config: &ModelConfig,
    x: &Array2<f64>,
    y: &Array1<f64>,
    train: &[usize],
    test: &[usize],
) -> Result<(Box<dyn Classifier>, Array1<f64>, Array1<f64>, ClassificationMetrics)> {
    let x_train = x.select(Axis(0), train);
    let y_train = y.select(Axis(0), train);
    let x_test = x.select(Axis(0), test);
    let y_test = y.select(Axis(0), test);

    let mut model = build_estimator(config)?;
    let weights = sample_weights(config, &y_train);
    model.fit(&x_train, &y_train, weights.as_ref())?;

    let (labels, scores) = predict_with_score(model.as_ref(), &x_test)?;
    let metrics = ClassificationMetrics::compute(&y_test, &labels, &scores)?;
    Ok((model, labels, scores, metrics))
}

/// Fit, evaluate and cross-validate `config.estimator` on `features`.
///
/// `features` and `clinical` must share the same sample order.
pub fn train(
    features: &OmicsTable,
    clinical: &ClinicalTable,
    config: &ModelConfig,
) -> Result<ModelResult> {
    let start = Instant::now();

    if features.samples() != clinical.samples() {
        return Err(FusionError::Data(
            "feature matrix and clinical frame are not aligned on samples".to_string(),
        ));
    }
    if features.has_missing() {
        return Err(FusionError::UnresolvedMissing(format!(
            "feature matrix '{}'; configure an impute_strategy",
            features.name()
        )));
    }

    let target = Target::extract(clinical, &config.target_column)?;
    let x = features.data();
    let y = &target.y;

    let split = stratified_split(y, config.test_size, config.random_state)?;
    let folds = StratifiedKFold::new(config.cv_folds)
        .with_random_state(config.random_state)
        .split(y)?;
    debug!(
        n_train = split.train_indices.len(),
        n_test = split.test_indices.len(),
        n_folds = folds.len(),
        "Split prepared"
    );

    let pool = ParallelConfig::from_n_jobs(config.n_jobs);
    let (held_out, cv_folds) = pool.install(|| {
        let held_out = fit_and_score(config, x, y, &split.train_indices, &split.test_indices);
        let cv_folds: Result<Vec<ClassificationMetrics>> = folds
            .par_iter()
            .map(|fold| {
                fit_and_score(config, x, y, &fold.train_indices, &fold.test_indices)
                    .map(|(_, _, _, metrics)| metrics)
            })
            .collect();
        (held_out, cv_folds)
    })?;

    let (model, labels, scores, metrics) = held_out?;
    let cv_metrics = ClassificationMetrics::mean(&cv_folds?)?;

    let feature_importances = extract_importances(model.as_ref(), features.features())?;

    let test_predictions = split
        .test_indices
        .iter()
        .enumerate()
        .map(|(row, &idx)| TestPrediction {
            sample_id: features.samples()[idx].clone(),
            true_label: target.decode(y[idx]),
            predicted_label: target.decode(labels[row]),
            score: scores[row],
        })
        .collect();

    let estimator_name = config.estimator.clone();
    info!(
        estimator = %estimator_name,
        family = model.name(),
        n_samples = x.nrows(),
        n_features = x.ncols(),
        test_roc_auc = metrics.roc_auc,
        cv_roc_auc = cv_metrics.roc_auc,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Model trained"
    );

    Ok(ModelResult {
        estimator_name,
        metrics: metrics.to_map(),
        cv_metrics: cv_metrics.to_map(),
        feature_importances,
        test_predictions,
        estimator: Arc::from(model),
    })
}
