//! Penalised logistic regression

use super::estimator::Classifier;
use crate::error::{FusionError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Regularisation penalty shared by the linear families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    L2,
    L1,
    ElasticNet,
    None,
}

impl Penalty {
    /// Split a strength into (l2, l1) parts
    pub(crate) fn split(&self, strength: f64, l1_ratio: f64) -> (f64, f64) {
        match self {
            Penalty::L2 => (strength, 0.0),
            Penalty::L1 => (0.0, strength),
            Penalty::ElasticNet => (strength * (1.0 - l1_ratio), strength * l1_ratio),
            Penalty::None => (0.0, 0.0),
        }
    }
}

impl FromStr for Penalty {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "l2" => Ok(Penalty::L2),
            "l1" => Ok(Penalty::L1),
            "elasticnet" | "elastic_net" => Ok(Penalty::ElasticNet),
            "none" => Ok(Penalty::None),
            other => Err(FusionError::invalid_param(
                "penalty",
                other,
                "expected l2, l1, elasticnet or none",
            )),
        }
    }
}

pub(crate) fn soft_threshold(val: f64, threshold: f64) -> f64 {
    if val > threshold {
        val - threshold
    } else if val < -threshold {
        val + threshold
    } else {
        0.0
    }
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Logistic regression fitted by proximal gradient descent.
///
/// Minimises `mean_i(w_i * logloss_i) + R(beta) / (C * n)` where `R` is the
/// configured penalty. The step size is derived from a Lipschitz bound of
/// the weighted log-loss, so no learning rate needs tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: f64,
    /// Whether to fit intercept
    pub fit_intercept: bool,
    /// Inverse regularisation strength
    pub c: f64,
    pub penalty: Penalty,
    /// L1 share of an elastic-net penalty
    pub l1_ratio: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance on the largest coefficient change
    pub tol: f64,
    /// Whether model is fitted
    pub is_fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
            c: 1.0,
            penalty: Penalty::L2,
            l1_ratio: 0.5,
            max_iter: 1000,
            tol: 1e-4,
            is_fitted: false,
        }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_penalty(mut self, penalty: Penalty) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_l1_ratio(mut self, l1_ratio: f64) -> Self {
        self.l1_ratio = l1_ratio;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Fit the model
    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: Option<&Array1<f64>>,
    ) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(FusionError::Shape {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(FusionError::InsufficientSamples("empty training set".to_string()));
        }

        let weights = match sample_weight {
            Some(w) if w.len() == n_samples => w.clone(),
            Some(w) => {
                return Err(FusionError::Shape {
                    expected: format!("{} sample weights", n_samples),
                    actual: format!("{} sample weights", w.len()),
                })
            }
            None => Array1::ones(n_samples),
        };

        let n = n_samples as f64;
        let max_weight = weights.iter().cloned().fold(0.0_f64, f64::max).max(1e-12);
        let intercept_term = if self.fit_intercept { n } else { 0.0 };
        // log-loss curvature is at most 1/4
        let lipschitz = 0.25 * max_weight * (x.mapv(|v| v * v).sum() + intercept_term) / n;
        let strength = 1.0 / (self.c * n);
        let (l2, l1) = self.penalty.split(strength, self.l1_ratio);
        let step = 1.0 / (lipschitz + l2).max(1e-12);

        let mut beta: Array1<f64> = Array1::zeros(n_features);
        let mut bias = 0.0;

        for _iter in 0..self.max_iter {
            let linear = x.dot(&beta) + bias;
            let errors: Array1<f64> = linear
                .iter()
                .zip(y.iter())
                .zip(weights.iter())
                .map(|((&z, &yi), &wi)| wi * (sigmoid(z) - yi))
                .collect();

            let grad = x.t().dot(&errors) / n + l2 * &beta;
            let next: Array1<f64> = (&beta - &(step * &grad)).mapv(|v| soft_threshold(v, step * l1));
            let max_change = next
                .iter()
                .zip(beta.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0_f64, f64::max);
            beta = next;

            let mut bias_change = 0.0;
            if self.fit_intercept {
                let db = errors.sum() / n;
                bias -= step * db;
                bias_change = (step * db).abs();
            }

            if max_change.max(bias_change) < self.tol {
                break;
            }
        }

        self.coefficients = Some(beta);
        self.intercept = bias;
        self.is_fitted = true;
        Ok(self)
    }

    /// Signed margin `x . beta + b`
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coef = self.coefficients.as_ref().ok_or(FusionError::ModelNotFitted)?;
        if x.ncols() != coef.len() {
            return Err(FusionError::Shape {
                expected: format!("{} features", coef.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(coef) + self.intercept)
    }

    /// Predict probabilities of the positive class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }

    /// Predict labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .decision_function(x)?
            .mapv(|z| if z > 0.0 { 1.0 } else { 0.0 }))
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &'static str {
        match self.penalty {
            Penalty::ElasticNet => "elastic_net",
            _ => "logistic_regression",
        }
    }

    fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: Option<&Array1<f64>>,
    ) -> Result<()> {
        LogisticRegression::fit(self, x, y, sample_weight).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        LogisticRegression::predict(self, x)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Option<Result<Array1<f64>>> {
        Some(LogisticRegression::predict_proba(self, x))
    }

    fn decision_function(&self, x: &Array2<f64>) -> Option<Result<Array1<f64>>> {
        Some(LogisticRegression::decision_function(self, x))
    }

    fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}
