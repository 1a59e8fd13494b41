//! Stochastic Gradient Descent (SGD) classifier
//!
//! Supports log, hinge and modified Huber losses with elastic-net style
//! penalties. Processes one sample at a time in a seeded shuffled order.

use super::estimator::Classifier;
use super::linear_models::{sigmoid, soft_threshold, Penalty};
use crate::error::{FusionError, Result};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SGDLoss {
    Hinge,         // SVM-like
    Log,           // Logistic regression
    ModifiedHuber, // Smooth hinge
}

impl FromStr for SGDLoss {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hinge" => Ok(SGDLoss::Hinge),
            "log_loss" | "log" => Ok(SGDLoss::Log),
            "modified_huber" => Ok(SGDLoss::ModifiedHuber),
            other => Err(FusionError::invalid_param(
                "loss",
                other,
                "expected log_loss, hinge or modified_huber",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LearningRateSchedule {
    Constant,
    Optimal,    // 1 / (alpha * (t + t0))
    InvScaling, // eta0 / t^power_t
    Adaptive,   // Halve when loss stops improving
}

impl FromStr for LearningRateSchedule {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "constant" => Ok(LearningRateSchedule::Constant),
            "optimal" => Ok(LearningRateSchedule::Optimal),
            "invscaling" => Ok(LearningRateSchedule::InvScaling),
            "adaptive" => Ok(LearningRateSchedule::Adaptive),
            other => Err(FusionError::invalid_param(
                "learning_rate",
                other,
                "expected constant, optimal, invscaling or adaptive",
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SGDConfig {
    pub loss: SGDLoss,
    pub penalty: Penalty,
    pub alpha: f64,    // regularization strength
    pub l1_ratio: f64, // ElasticNet mixing (0 = L2, 1 = L1)
    pub max_iter: usize,
    pub tol: f64,
    pub learning_rate: LearningRateSchedule,
    pub eta0: f64,
    pub power_t: f64, // For InvScaling schedule
    pub random_state: Option<u64>,
}

impl Default for SGDConfig {
    fn default() -> Self {
        Self {
            loss: SGDLoss::Log,
            penalty: Penalty::ElasticNet,
            alpha: 0.0001,
            l1_ratio: 0.15,
            max_iter: 1000,
            tol: 1e-3,
            learning_rate: LearningRateSchedule::Optimal,
            eta0: 0.01,
            power_t: 0.5,
            random_state: Some(42),
        }
    }
}

fn get_lr(config: &SGDConfig, t: usize) -> f64 {
    match config.learning_rate {
        LearningRateSchedule::Constant => config.eta0,
        LearningRateSchedule::Optimal => {
            let t0 = 1.0 / (config.alpha * config.eta0);
            1.0 / (config.alpha * (t as f64 + t0))
        }
        LearningRateSchedule::InvScaling => config.eta0 / (t as f64 + 1.0).powf(config.power_t),
        LearningRateSchedule::Adaptive => config.eta0, // adjusted externally
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SGDClassifier {
    pub config: SGDConfig,
    pub weights: Option<Array1<f64>>,
    pub bias: f64,
}

impl SGDClassifier {
    pub fn new(config: SGDConfig) -> Self {
        Self { config, weights: None, bias: 0.0 }
    }

    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: Option<&Array1<f64>>,
    ) -> Result<()> {
        let n = x.nrows();
        let p = x.ncols();
        if n == 0 {
            return Err(FusionError::InsufficientSamples("empty training set".into()));
        }
        if y.len() != n {
            return Err(FusionError::Shape {
                expected: format!("y length = {}", n),
                actual: format!("y length = {}", y.len()),
            });
        }
        let sw: Vec<f64> = match sample_weight {
            Some(w) => w.to_vec(),
            None => vec![1.0; n],
        };

        // Convert labels: 0/1 → -1/+1 for hinge losses
        let y_signed: Vec<f64> = y.iter().map(|&v| if v > 0.5 { 1.0 } else { -1.0 }).collect();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state.unwrap_or(42));
        let mut w = Array1::zeros(p);
        let mut b = 0.0;
        let mut indices: Vec<usize> = (0..n).collect();
        let mut prev_loss = f64::MAX;
        let mut current_eta = self.config.eta0;
        let mut t = 1usize;
        let (l2_coeff, l1_coeff) = self.config.penalty.split(self.config.alpha, self.config.l1_ratio);

        for epoch in 0..self.config.max_iter {
            indices.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for &i in &indices {
                let xi = x.row(i);
                let margin = xi.dot(&w) + b;
                let yi = y_signed[i];

                let lr = match self.config.learning_rate {
                    LearningRateSchedule::Adaptive => current_eta,
                    _ => get_lr(&self.config, t),
                };

                let (loss, dloss) = match self.config.loss {
                    SGDLoss::Hinge => {
                        if yi * margin < 1.0 {
                            (1.0 - yi * margin, -yi)
                        } else {
                            (0.0, 0.0)
                        }
                    }
                    SGDLoss::Log => {
                        let prob = sigmoid(margin);
                        let y01 = if yi > 0.0 { 1.0 } else { 0.0 };
                        let loss = -(y01 * prob.max(1e-15).ln()
                            + (1.0 - y01) * (1.0 - prob).max(1e-15).ln());
                        (loss, prob - y01)
                    }
                    SGDLoss::ModifiedHuber => {
                        let z = yi * margin;
                        if z >= 1.0 {
                            (0.0, 0.0)
                        } else if z >= -1.0 {
                            ((1.0 - z) * (1.0 - z), -2.0 * (1.0 - z) * yi)
                        } else {
                            (-4.0 * z, -4.0 * yi)
                        }
                    }
                };
                epoch_loss += sw[i] * loss;
                let dloss = sw[i] * dloss;

                for j in 0..p {
                    let grad = dloss * xi[j] + l2_coeff * w[j];
                    w[j] -= lr * grad;
                    w[j] = soft_threshold(w[j], lr * l1_coeff);
                }
                b -= lr * dloss;
                t += 1;
            }

            epoch_loss /= n as f64;

            if matches!(self.config.learning_rate, LearningRateSchedule::Adaptive)
                && epoch_loss > prev_loss - self.config.tol
            {
                current_eta *= 0.5;
                if current_eta < 1e-10 {
                    break;
                }
            }

            if (prev_loss - epoch_loss).abs() < self.config.tol && epoch > 0 {
                break;
            }
            prev_loss = epoch_loss;
        }

        self.weights = Some(w);
        self.bias = b;
        Ok(())
    }

    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let w = self.weights.as_ref().ok_or(FusionError::ModelNotFitted)?;
        if x.ncols() != w.len() {
            return Err(FusionError::Shape {
                expected: format!("{} features", w.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(w) + self.bias)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .decision_function(x)?
            .mapv(|margin| if margin > 0.0 { 1.0 } else { 0.0 }))
    }

    /// Positive-class probability; hinge loss has none
    pub fn predict_proba(&self, x: &Array2<f64>) -> Option<Result<Array1<f64>>> {
        let loss = self.config.loss;
        if loss == SGDLoss::Hinge {
            return None;
        }
        Some(self.decision_function(x).map(|margins| {
            margins.mapv(|z| match loss {
                SGDLoss::ModifiedHuber => (z.clamp(-1.0, 1.0) + 1.0) / 2.0,
                _ => sigmoid(z),
            })
        }))
    }
}

impl Classifier for SGDClassifier {
    fn name(&self) -> &'static str {
        "sgd"
    }

    fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: Option<&Array1<f64>>,
    ) -> Result<()> {
        SGDClassifier::fit(self, x, y, sample_weight)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        SGDClassifier::predict(self, x)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Option<Result<Array1<f64>>> {
        SGDClassifier::predict_proba(self, x)
    }

    fn decision_function(&self, x: &Array2<f64>) -> Option<Result<Array1<f64>>> {
        Some(SGDClassifier::decision_function(self, x))
    }

    fn coefficients(&self) -> Option<&Array1<f64>> {
        self.weights.as_ref()
    }

    fn is_fitted(&self) -> bool {
        self.weights.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::estimator::predict_with_score;

    fn make_classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((100, 2), |(i, j)| {
            let base = if i < 50 { -1.0 } else { 1.0 };
            base + 0.01 * ((i * 7 + j * 3) % 11) as f64
        });
        let y = Array1::from_vec((0..100).map(|i| if i < 50 { 0.0 } else { 1.0 }).collect());
        (x, y)
    }

    #[test]
    fn test_sgd_classifier_log() {
        let (x, y) = make_classification_data();
        let config = SGDConfig { max_iter: 200, ..Default::default() };
        let mut model = SGDClassifier::new(config);
        model.fit(&x, &y, None).unwrap();
        let preds = model.predict(&x).unwrap();
        let acc = preds.iter().zip(y.iter()).filter(|(&p, &t)| p == t).count() as f64 / 100.0;
        assert!(acc > 0.9, "Accuracy too low: {}", acc);

        let proba = model.predict_proba(&x).unwrap().unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_sgd_hinge_scores_with_decision_function() {
        let (x, y) = make_classification_data();
        let config = SGDConfig { loss: SGDLoss::Hinge, max_iter: 200, ..Default::default() };
        let mut model = SGDClassifier::new(config);
        model.fit(&x, &y, None).unwrap();
        assert!(model.predict_proba(&x).is_none());

        let (labels, scores) = predict_with_score(&model, &x).unwrap();
        assert_eq!(labels.len(), 100);
        // margins, not probabilities
        assert!(scores.iter().any(|s| *s < 0.0));
    }

    #[test]
    fn test_sgd_deterministic() {
        let (x, y) = make_classification_data();
        let mut a = SGDClassifier::new(SGDConfig::default());
        let mut b = SGDClassifier::new(SGDConfig::default());
        a.fit(&x, &y, None).unwrap();
        b.fit(&x, &y, None).unwrap();
        assert_eq!(a.weights, b.weights);
    }
}
