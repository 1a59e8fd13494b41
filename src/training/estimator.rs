//! Estimator capability trait and name-based factory

use super::linear_models::{LogisticRegression, Penalty};
use super::random_forest::{MaxFeatures, RandomForest};
use super::sgd::{LearningRateSchedule, SGDClassifier, SGDConfig, SGDLoss};
use crate::config::ModelConfig;
use crate::error::{FusionError, Result};
use crate::preprocessing::feature_selection::descending_nan_last;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Binary classifier over labels `0.0` / `1.0`.
///
/// Only `fit` and `predict` are mandatory; the remaining capabilities
/// return `None` when a family does not offer them.
pub trait Classifier: Send + Sync + fmt::Debug {
    /// Canonical family name
    fn name(&self) -> &'static str;

    /// Fit on `x` with optional per-sample weights
    fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: Option<&Array1<f64>>,
    ) -> Result<()>;

    /// Predicted labels (`0.0` or `1.0`)
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Probability of the positive class
    fn predict_proba(&self, _x: &Array2<f64>) -> Option<Result<Array1<f64>>> {
        None
    }

    /// Signed distance to the decision boundary
    fn decision_function(&self, _x: &Array2<f64>) -> Option<Result<Array1<f64>>> {
        None
    }

    /// Linear coefficients, one per feature
    fn coefficients(&self) -> Option<&Array1<f64>> {
        None
    }

    /// Impurity-based importances, one per feature
    fn impurity_importances(&self) -> Option<&Array1<f64>> {
        None
    }

    fn is_fitted(&self) -> bool;
}

/// Supported estimator families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    LogisticRegression,
    ElasticNet,
    Sgd,
    RandomForest,
}

impl EstimatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimatorKind::LogisticRegression => "logistic_regression",
            EstimatorKind::ElasticNet => "elastic_net",
            EstimatorKind::Sgd => "sgd",
            EstimatorKind::RandomForest => "random_forest",
        }
    }
}

impl FromStr for EstimatorKind {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "logistic" | "logistic_regression" => Ok(EstimatorKind::LogisticRegression),
            "elastic_net" | "elasticnet" => Ok(EstimatorKind::ElasticNet),
            "sgd" | "sgd_classifier" => Ok(EstimatorKind::Sgd),
            "rf" | "random_forest" | "randomforest" => Ok(EstimatorKind::RandomForest),
            _ => Err(FusionError::UnknownEstimator(s.to_string())),
        }
    }
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build an unfitted estimator from the model configuration.
///
/// Unknown names fail with `UnknownEstimator`; parameters that the family
/// does not understand, or that have the wrong type, fail with
/// `InvalidParameter`.
pub fn build_estimator(config: &ModelConfig) -> Result<Box<dyn Classifier>> {
    let kind: EstimatorKind = config.estimator.parse()?;
    let mut params = ParamReader::new(kind, &config.estimator_params);

    let estimator: Box<dyn Classifier> = match kind {
        EstimatorKind::LogisticRegression | EstimatorKind::ElasticNet => {
            let penalty = if kind == EstimatorKind::ElasticNet {
                Penalty::ElasticNet
            } else {
                params.parse("penalty", Penalty::L2)?
            };
            // the solver is always proximal gradient descent
            params.string("solver", "saga")?;
            let mut model = LogisticRegression::new()
                .with_penalty(penalty)
                .with_c(params.positive_f64("C", 1.0)?)
                .with_max_iter(params.usize("max_iter", 1000)?)
                .with_tol(params.positive_f64("tol", 1e-4)?)
                .with_fit_intercept(params.bool("fit_intercept", true)?);
            if penalty == Penalty::ElasticNet {
                model = model.with_l1_ratio(params.fraction("l1_ratio", 0.5)?);
            }
            Box::new(model)
        }
        EstimatorKind::Sgd => {
            let sgd = SGDConfig {
                loss: params.parse("loss", SGDLoss::Log)?,
                penalty: params.parse("penalty", Penalty::ElasticNet)?,
                alpha: params.positive_f64("alpha", 1e-4)?,
                l1_ratio: params.fraction("l1_ratio", 0.15)?,
                max_iter: params.usize("max_iter", 1000)?,
                tol: params.positive_f64("tol", 1e-3)?,
                learning_rate: params.parse("learning_rate", LearningRateSchedule::Optimal)?,
                eta0: params.positive_f64("eta0", 0.01)?,
                power_t: params.positive_f64("power_t", 0.5)?,
                random_state: Some(config.random_state),
            };
            Box::new(SGDClassifier::new(sgd))
        }
        EstimatorKind::RandomForest => {
            let mut forest = RandomForest::new_classifier(params.usize("n_estimators", 300)?)
                .with_min_samples_split(params.usize("min_samples_split", 2)?)
                .with_min_samples_leaf(params.usize("min_samples_leaf", 1)?)
                .with_max_features(params.max_features("max_features", MaxFeatures::Sqrt)?)
                .with_bootstrap(params.bool("bootstrap", true)?)
                .with_random_state(config.random_state);
            if let Some(depth) = params.optional_usize("max_depth")? {
                forest = forest.with_max_depth(depth);
            }
            if forest.n_estimators == 0 {
                return Err(FusionError::invalid_param("n_estimators", 0, "must be positive"));
            }
            Box::new(forest)
        }
    };

    params.finish()?;
    Ok(estimator)
}

/// Labels plus a continuous score: positive-class probability when
/// available, else the decision function, else the labels themselves
pub fn predict_with_score(
    model: &dyn Classifier,
    x: &Array2<f64>,
) -> Result<(Array1<f64>, Array1<f64>)> {
    let labels = model.predict(x)?;
    let scores = match model.predict_proba(x) {
        Some(proba) => proba?,
        None => match model.decision_function(x) {
            Some(decision) => decision?,
            None => labels.clone(),
        },
    };
    Ok((labels, scores))
}

/// One ranked feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Absolute coefficients, else impurity importances, sorted descending.
/// Ties keep feature order. Empty when the model offers neither.
pub fn extract_importances(model: &dyn Classifier, features: &[String]) -> Result<Vec<FeatureImportance>> {
    let values = if let Some(coef) = model.coefficients() {
        coef.mapv(f64::abs)
    } else if let Some(importances) = model.impurity_importances() {
        importances.clone()
    } else {
        return Ok(Vec::new());
    };

    if values.len() != features.len() {
        return Err(FusionError::Shape {
            expected: format!("{} importances", features.len()),
            actual: format!("{} importances", values.len()),
        });
    }

    let mut ranked: Vec<FeatureImportance> = features
        .iter()
        .zip(values.iter())
        .map(|(feature, &importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| descending_nan_last(a.importance, b.importance));
    Ok(ranked)
}

/// Typed access to the free-form parameter map; tracks consumed keys
struct ParamReader<'a> {
    kind: EstimatorKind,
    params: &'a BTreeMap<String, Value>,
    consumed: BTreeSet<&'a str>,
}

impl<'a> ParamReader<'a> {
    fn new(kind: EstimatorKind, params: &'a BTreeMap<String, Value>) -> Self {
        Self {
            kind,
            params,
            consumed: BTreeSet::new(),
        }
    }

    fn get(&mut self, key: &str) -> Option<&'a Value> {
        let (k, v) = self.params.get_key_value(key)?;
        self.consumed.insert(k.as_str());
        Some(v)
    }

    fn f64(&mut self, key: &str, default: f64) -> Result<f64> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v
                .as_f64()
                .ok_or_else(|| FusionError::invalid_param(key, v, "expected a number")),
        }
    }

    fn positive_f64(&mut self, key: &str, default: f64) -> Result<f64> {
        let value = self.f64(key, default)?;
        if value > 0.0 && value.is_finite() {
            Ok(value)
        } else {
            Err(FusionError::invalid_param(key, value, "must be positive"))
        }
    }

    fn fraction(&mut self, key: &str, default: f64) -> Result<f64> {
        let value = self.f64(key, default)?;
        if (0.0..=1.0).contains(&value) {
            Ok(value)
        } else {
            Err(FusionError::invalid_param(key, value, "must lie in [0, 1]"))
        }
    }

    fn usize(&mut self, key: &str, default: usize) -> Result<usize> {
        Ok(self.optional_usize(key)?.unwrap_or(default))
    }

    fn optional_usize(&mut self, key: &str) -> Result<Option<usize>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_u64()
                .map(|n| Some(n as usize))
                .ok_or_else(|| FusionError::invalid_param(key, v, "expected a non-negative integer")),
        }
    }

    fn bool(&mut self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v
                .as_bool()
                .ok_or_else(|| FusionError::invalid_param(key, v, "expected true or false")),
        }
    }

    fn string(&mut self, key: &str, default: &str) -> Result<String> {
        match self.get(key) {
            None => Ok(default.to_string()),
            Some(v) => v
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| FusionError::invalid_param(key, v, "expected a string")),
        }
    }

    fn parse<T>(&mut self, key: &str, default: T) -> Result<T>
    where
        T: FromStr<Err = FusionError>,
    {
        match self.get(key) {
            None => Ok(default),
            Some(Value::String(s)) => s.parse(),
            Some(v) => Err(FusionError::invalid_param(key, v, "expected a string")),
        }
    }

    fn max_features(&mut self, key: &str, default: MaxFeatures) -> Result<MaxFeatures> {
        match self.get(key) {
            None => Ok(default),
            Some(Value::Null) => Ok(MaxFeatures::All),
            Some(Value::String(s)) => match s.as_str() {
                "sqrt" | "auto" => Ok(MaxFeatures::Sqrt),
                "log2" => Ok(MaxFeatures::Log2),
                "all" => Ok(MaxFeatures::All),
                other => Err(FusionError::invalid_param(key, other, "expected sqrt, log2 or all")),
            },
            Some(Value::Number(n)) => {
                if let Some(k) = n.as_u64() {
                    if k == 0 {
                        return Err(FusionError::invalid_param(key, k, "must be positive"));
                    }
                    Ok(MaxFeatures::Fixed(k as usize))
                } else {
                    match n.as_f64() {
                        Some(f) if f > 0.0 && f <= 1.0 => Ok(MaxFeatures::Fraction(f)),
                        _ => Err(FusionError::invalid_param(key, n, "fraction must lie in (0, 1]")),
                    }
                }
            }
            Some(v) => Err(FusionError::invalid_param(key, v, "expected a string or number")),
        }
    }

    /// Fail on the first key nobody asked for
    fn finish(self) -> Result<()> {
        match self.params.iter().find(|(k, _)| !self.consumed.contains(k.as_str())) {
            None => Ok(()),
            Some((key, value)) => Err(FusionError::invalid_param(
                key,
                value,
                &format!("not a parameter of {}", self.kind),
            )),
        }
    }
}
